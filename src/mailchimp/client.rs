//! Campaign and list-subscription operations over a [`MarketingApi`].

use log::debug;
use serde_json::{Value, json};
use std::future::Future;

use crate::http::RequestError;
use crate::logger::Logger;
use crate::timing::log_external_request;

use super::api::MarketingApi;
use super::hash::email_hash;
use super::members::ListMembers;
use super::retry::with_timeout_retry;
use super::SERVICE_NAME;

const FAKE_OR_INVALID_DETAIL: &str = "looks fake or invalid";
const ALREADY_A_MEMBER_DETAIL: &str = "is already a list member.";

/// Mailchimp client holding one API session, a logger, and a retry budget
/// for gateway timeouts. Immutable after construction.
pub struct MailchimpClient<A: MarketingApi, L: Logger> {
    api: A,
    logger: L,
    retries: usize,
}

impl<A: MarketingApi, L: Logger> MailchimpClient<A, L> {
    pub fn new(api: A, logger: L, retries: usize) -> Self {
        Self {
            api,
            logger,
            retries,
        }
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub(super) fn api(&self) -> &A {
        &self.api
    }

    /// Retries `operation` on HTTP 504 using this client's retry budget.
    pub async fn timeout_retry<F, Fut, T>(&self, operation: F) -> Result<T, RequestError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        with_timeout_retry(self.retries, operation).await
    }

    /// Creates a campaign and returns its id, or `None` after logging the failure.
    #[tracing::instrument(skip(self, campaign_data))]
    pub async fn create_campaign(&self, campaign_data: &Value) -> Option<String> {
        let result = log_external_request(SERVICE_NAME, self.api.create_campaign(campaign_data))
            .await
            .and_then(|campaign| campaign_id(&campaign));

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                let message = match campaign_title(campaign_data) {
                    Some(title) => format!("Mailchimp failed to create campaign for '{}'", title),
                    None => "Mailchimp failed to create campaign".to_string(),
                };
                self.logger.error(&message, &error_context(&e));
                None
            }
        }
    }

    /// Sets the campaign's content, returning the updated content document or
    /// `None` after logging the failure.
    #[tracing::instrument(skip(self, content_data))]
    pub async fn set_campaign_content(
        &self,
        campaign_id: &str,
        content_data: &Value,
    ) -> Option<Value> {
        let result = log_external_request(
            SERVICE_NAME,
            self.api.update_campaign_content(campaign_id, content_data),
        )
        .await;

        match result {
            Ok(content) => Some(content),
            Err(e) => {
                self.logger.error(
                    &format!(
                        "Mailchimp failed to set content for campaign id '{}'",
                        campaign_id
                    ),
                    &error_context(&e),
                );
                None
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn send_campaign(&self, campaign_id: &str) -> bool {
        let result = log_external_request(SERVICE_NAME, self.api.send_campaign(campaign_id)).await;

        match result {
            Ok(()) => true,
            Err(e) => {
                self.logger.error(
                    &format!("Mailchimp failed to send campaign id '{}'", campaign_id),
                    &error_context(&e),
                );
                false
            }
        }
    }

    /// Subscribes `email_address` to the list unless it is already a member.
    ///
    /// Returns `true` on success and for the two failures the caller cannot
    /// act on: an address Mailchimp flags as fake or invalid (which is also
    /// how it reports members who asked never to be re-added), and an address
    /// that is already on the list.
    #[tracing::instrument(skip(self, email_address))]
    pub async fn subscribe_new_email_to_list(&self, list_id: &str, email_address: &str) -> bool {
        let hashed_email = email_hash(email_address);
        let member_data = json!({
            "email_address": email_address,
            "status_if_new": "subscribed",
        });

        let result = log_external_request(
            SERVICE_NAME,
            self.api
                .create_or_update_member(list_id, &hashed_email, &member_data),
        )
        .await;

        let e = match result {
            Ok(_) => return true,
            Err(e) => e,
        };

        let response = e.response_json();
        let detail = response
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let extra = json!({
            "error": e.to_string(),
            "mailchimp_response": response,
        });

        if detail.contains(FAKE_OR_INVALID_DETAIL) {
            self.logger.error(
                &format!(
                    "Expected error: Mailchimp failed to add user ({}) to list ({}). \
                     API error: The email address looks fake or invalid, please enter a real email address.",
                    hashed_email, list_id
                ),
                &extra,
            );
            true
        } else if detail.contains(ALREADY_A_MEMBER_DETAIL) {
            self.logger.warning(
                &format!(
                    "Expected error: Mailchimp failed to add user ({}) to list ({}). \
                     API error: This email address is already subscribed.",
                    hashed_email, list_id
                ),
                &extra,
            );
            true
        } else {
            self.logger.error(
                &format!(
                    "Mailchimp failed to add user ({}) to list ({})",
                    hashed_email, list_id
                ),
                &extra,
            );
            false
        }
    }

    /// Subscribes every address, in order, and returns `true` only if all of
    /// them succeeded. A failure does not stop the remaining addresses.
    #[tracing::instrument(skip(self, email_addresses))]
    pub async fn subscribe_new_emails_to_list<I, S>(&self, list_id: &str, email_addresses: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.subscribe_new_emails_to_list_detailed(list_id, email_addresses)
            .await
            .is_empty()
    }

    /// Like [`Self::subscribe_new_emails_to_list`], but returns the addresses
    /// that failed.
    #[tracing::instrument(skip(self, email_addresses))]
    pub async fn subscribe_new_emails_to_list_detailed<I, S>(
        &self,
        list_id: &str,
        email_addresses: I,
    ) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut failed = Vec::new();
        for email_address in email_addresses {
            let email_address = email_address.as_ref();
            let subscribed = log_external_request(
                SERVICE_NAME,
                self.subscribe_new_email_to_list(list_id, email_address),
            )
            .await;
            if !subscribed {
                failed.push(email_address.to_string());
            }
        }

        debug!(
            "Subscribed to list {} with {} failure(s)",
            list_id,
            failed.len()
        );
        failed
    }

    /// Lazily pages through the list's members, `page_size` at a time.
    /// Each call starts again from the first page.
    pub fn email_addresses_from_list(&self, list_id: &str, page_size: usize) -> ListMembers<'_, A, L> {
        ListMembers::new(self, list_id, page_size)
    }
}

fn campaign_id(campaign: &Value) -> Result<String, RequestError> {
    campaign
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RequestError::InvalidResponse("campaign response without an id".to_string()))
}

fn campaign_title(campaign_data: &Value) -> Option<&str> {
    campaign_data
        .get("settings")
        .and_then(|settings| settings.get("title"))
        .and_then(Value::as_str)
}

fn error_context(e: &RequestError) -> Value {
    json!({
        "error": e.to_string(),
        "mailchimp_response": e.response_json(),
    })
}
