use anyhow::{Context, Result, bail};
use futures_util::TryStreamExt;
use log::{debug, info};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::pin::pin;

use crate::{
    runtime::Runtime,
    session,
    status::{
        DEFAULT_LOW_DISK_PERCENT_THRESHOLD, Dependency, HttpStatusSource, StatusOptions,
        StatusSource, app_status, version_label,
    },
};

pub mod config;

pub use config::Config;

pub const DATA_API_TOKEN_ENV: &str = "DM_DATA_API_AUTH_TOKEN";
pub const SEARCH_API_TOKEN_ENV: &str = "DM_SEARCH_API_AUTH_TOKEN";

/// Subscribe every address to the list; fails if any address failed hard.
#[tracing::instrument(skip(config, email_addresses))]
pub async fn subscribe<R: Runtime>(
    config: &Config<R>,
    list_id: &str,
    email_addresses: &[String],
) -> Result<()> {
    let client = config.mailchimp()?;

    let failed = client
        .subscribe_new_emails_to_list_detailed(list_id, email_addresses)
        .await;
    if !failed.is_empty() {
        bail!(
            "Failed to subscribe {} of {} address(es) to list {}: {}",
            failed.len(),
            email_addresses.len(),
            list_id,
            failed.join(", ")
        );
    }

    info!(
        "Subscribed {} address(es) to list {}",
        email_addresses.len(),
        list_id
    );
    Ok(())
}

/// Print every member address of the list, one per line.
#[tracing::instrument(skip(config))]
pub async fn members<R: Runtime>(config: &Config<R>, list_id: &str, page_size: usize) -> Result<()> {
    let client = config.mailchimp()?;

    let mut addresses = pin!(client.email_addresses_from_list(list_id, page_size).into_stream());
    let mut count = 0;
    while let Some(email_address) = addresses
        .try_next()
        .await
        .with_context(|| format!("Failed to list members of {}", list_id))?
    {
        println!("{}", email_address);
        count += 1;
    }

    debug!("Listed {} member(s) of {}", count, list_id);
    Ok(())
}

#[tracing::instrument(skip(config))]
pub async fn send_campaign<R: Runtime>(config: &Config<R>, campaign_id: &str) -> Result<()> {
    let client = config.mailchimp()?;

    if !client.send_campaign(campaign_id).await {
        bail!("Failed to send campaign {}", campaign_id);
    }

    info!("Campaign {} sent", campaign_id);
    Ok(())
}

/// Print the Redis URL the web session store should use.
#[tracing::instrument(skip(config))]
pub fn session_redis_url<R: Runtime>(config: &Config<R>) -> Result<()> {
    let url = session::redis_url(&config.runtime).context("Failed to resolve session Redis URL")?;
    println!("{}", url);
    Ok(())
}

/// Options for the `status` command.
#[derive(Debug, Clone)]
pub struct StatusCommand {
    pub ignore_dependencies: bool,
    pub low_disk_percent_threshold: u8,
    /// Directory holding the `version_label` file.
    pub version_dir: Option<PathBuf>,
    pub data_api_url: Option<String>,
    pub search_api_url: Option<String>,
}

impl Default for StatusCommand {
    fn default() -> Self {
        Self {
            ignore_dependencies: false,
            low_disk_percent_threshold: DEFAULT_LOW_DISK_PERCENT_THRESHOLD,
            version_dir: None,
            data_api_url: None,
            search_api_url: None,
        }
    }
}

/// Print the app's `_status` document; fails if the status is not ok.
#[tracing::instrument(skip(config))]
pub async fn status<R: Runtime>(config: &Config<R>, command: &StatusCommand) -> Result<()> {
    let runtime = &config.runtime;

    let version = command
        .version_dir
        .as_deref()
        .and_then(|dir| version_label(runtime, dir))
        .unwrap_or_else(|| env!("DMUTILS_VERSION").to_string());

    let environment: Map<String, Value> = runtime
        .env_vars()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let options = StatusOptions {
        version,
        config: environment,
        ignore_dependencies: command.ignore_dependencies,
        low_disk_percent_threshold: command.low_disk_percent_threshold,
    };

    let data_api = command.data_api_url.as_deref().map(|url| {
        HttpStatusSource::new(
            config.client.clone(),
            url,
            runtime.env_var(DATA_API_TOKEN_ENV).ok(),
        )
    });
    let search_api = command.search_api_url.as_deref().map(|url| {
        HttpStatusSource::new(
            config.client.clone(),
            url,
            runtime.env_var(SEARCH_API_TOKEN_ENV).ok(),
        )
    });

    let mut dependencies = Vec::new();
    if let Some(source) = &data_api {
        dependencies.push(Dependency::data_api(source as &dyn StatusSource));
    }
    if let Some(source) = &search_api {
        dependencies.push(Dependency::search_api(source as &dyn StatusSource));
    }

    let report = app_status(runtime, &options, &dependencies, &[]).await?;

    println!("{}", serde_json::to_string_pretty(&report.body)?);

    if !report.is_ok() {
        bail!("Status check failed ({})", report.status);
    }
    Ok(())
}
