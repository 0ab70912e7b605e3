use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::{
    logger::TracingLogger,
    mailchimp::{MailchimpApi, MailchimpClient},
    runtime::Runtime,
};

pub const USERNAME_ENV: &str = "DM_MAILCHIMP_USERNAME";
pub const API_KEY_ENV: &str = "DM_MAILCHIMP_API_KEY";

const USER_AGENT: &str = "dmutils";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub client: Client,
    pub api_url: Option<String>,
    pub retries: usize,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, api_url: Option<String>, retries: usize) -> Result<Self> {
        Self::with_timeout(runtime, api_url, retries, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        runtime: R,
        api_url: Option<String>,
        retries: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            runtime,
            client,
            api_url,
            retries,
        })
    }

    /// Builds a Mailchimp client from the credentials in the environment.
    pub fn mailchimp(&self) -> Result<MailchimpClient<MailchimpApi, TracingLogger>> {
        let username = self
            .runtime
            .env_var(USERNAME_ENV)
            .with_context(|| format!("{} is not set", USERNAME_ENV))?;
        let api_key = self
            .runtime
            .env_var(API_KEY_ENV)
            .with_context(|| format!("{} is not set", API_KEY_ENV))?;

        debug!(
            "Using Mailchimp credentials for {}: {} (retries: {})",
            username,
            mask_secret(&api_key),
            self.retries
        );

        let api = MailchimpApi::new(self.client.clone(), &username, &api_key, self.api_url.clone())?;
        Ok(MailchimpClient::new(api, TracingLogger, self.retries))
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
