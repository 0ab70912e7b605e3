//! Mailchimp Marketing API (v3.0) resources used by the client.

use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::http::{HttpClient, RequestError};

/// The vendor calls the client is built on.
///
/// Responses are the raw JSON documents Mailchimp returns: creation returns a
/// mapping with an `"id"`, member pages a mapping with a `"members"` array.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketingApi: Send + Sync {
    async fn create_campaign(&self, campaign_data: &Value) -> Result<Value, RequestError>;

    async fn update_campaign_content(
        &self,
        campaign_id: &str,
        content_data: &Value,
    ) -> Result<Value, RequestError>;

    async fn send_campaign(&self, campaign_id: &str) -> Result<(), RequestError>;

    async fn create_or_update_member(
        &self,
        list_id: &str,
        subscriber_hash: &str,
        member_data: &Value,
    ) -> Result<Value, RequestError>;

    async fn list_members(
        &self,
        list_id: &str,
        count: usize,
        offset: usize,
    ) -> Result<Value, RequestError>;
}

/// Derives the API root from the datacenter suffix of an API key
/// (`0123abcd-us6` -> `https://us6.api.mailchimp.com/3.0`).
pub fn datacenter_url(api_key: &str) -> Result<String> {
    match api_key.rsplit_once('-') {
        Some((key, dc)) if !key.is_empty() && !dc.is_empty() => {
            Ok(format!("https://{}.api.mailchimp.com/3.0", dc))
        }
        _ => bail!("Invalid Mailchimp API key: expected a '-<datacenter>' suffix."),
    }
}

/// [`MarketingApi`] over HTTP.
#[derive(Clone)]
pub struct MailchimpApi {
    http_client: HttpClient,
}

impl MailchimpApi {
    /// Creates a session for `username`/`api_key`. When `api_url` is `None`
    /// the URL is derived from the key's datacenter.
    #[tracing::instrument(skip(client, api_key))]
    pub fn new(
        client: Client,
        username: &str,
        api_key: &str,
        api_url: Option<String>,
    ) -> Result<Self> {
        let api_url = match api_url {
            Some(url) => url,
            None => datacenter_url(api_key)?,
        };
        Ok(Self::from_http_client(HttpClient::new(
            client, api_url, username, api_key,
        )))
    }

    /// Create from an existing HttpClient.
    pub fn from_http_client(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }
}

#[async_trait]
impl MarketingApi for MailchimpApi {
    async fn create_campaign(&self, campaign_data: &Value) -> Result<Value, RequestError> {
        self.http_client.post_json("campaigns", campaign_data).await
    }

    async fn update_campaign_content(
        &self,
        campaign_id: &str,
        content_data: &Value,
    ) -> Result<Value, RequestError> {
        let path = format!("campaigns/{}/content", campaign_id);
        self.http_client.put_json(&path, content_data).await
    }

    async fn send_campaign(&self, campaign_id: &str) -> Result<(), RequestError> {
        let path = format!("campaigns/{}/actions/send", campaign_id);
        self.http_client.post_empty(&path).await
    }

    async fn create_or_update_member(
        &self,
        list_id: &str,
        subscriber_hash: &str,
        member_data: &Value,
    ) -> Result<Value, RequestError> {
        let path = format!("lists/{}/members/{}", list_id, subscriber_hash);
        self.http_client.put_json(&path, member_data).await
    }

    async fn list_members(
        &self,
        list_id: &str,
        count: usize,
        offset: usize,
    ) -> Result<Value, RequestError> {
        let path = format!("lists/{}/members", list_id);
        self.http_client
            .get_json_with_query(
                &path,
                &[("count", count.to_string()), ("offset", offset.to_string())],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::StatusCode;
    use serde_json::json;

    fn api_for(url: &str) -> MailchimpApi {
        MailchimpApi::new(Client::new(), "dm-user", "0123abcd-us6", Some(url.to_string()))
            .unwrap()
    }

    #[test]
    fn test_datacenter_url() {
        assert_eq!(
            datacenter_url("0123abcd-us6").unwrap(),
            "https://us6.api.mailchimp.com/3.0"
        );
        assert_eq!(
            datacenter_url("abc-def-us21").unwrap(),
            "https://us21.api.mailchimp.com/3.0"
        );
    }

    #[test]
    fn test_datacenter_url_invalid() {
        assert!(datacenter_url("0123abcd").is_err());
        assert!(datacenter_url("0123abcd-").is_err());
        assert!(datacenter_url("-us6").is_err());
    }

    #[test]
    fn test_new_derives_url_from_key() {
        let api = MailchimpApi::new(Client::new(), "dm-user", "0123abcd-us6", None).unwrap();
        assert_eq!(
            api.http_client().base_url(),
            "https://us6.api.mailchimp.com/3.0"
        );
    }

    #[test]
    fn test_new_rejects_key_without_datacenter() {
        assert!(MailchimpApi::new(Client::new(), "dm-user", "0123abcd", None).is_err());
    }

    #[tokio::test]
    async fn test_create_campaign() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/campaigns")
            .match_body(Matcher::Json(json!({"settings": {"title": "Digest"}})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "100", "status": "save"}"#)
            .create_async()
            .await;

        let api = api_for(&server.url());
        let campaign = api
            .create_campaign(&json!({"settings": {"title": "Digest"}}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(campaign["id"], "100");
    }

    #[tokio::test]
    async fn test_update_campaign_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/campaigns/100/content")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"html": "<p>hi</p>"}"#)
            .create_async()
            .await;

        let api = api_for(&server.url());
        let content = api
            .update_campaign_content("100", &json!({"html": "<p>hi</p>"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(content["html"], "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_send_campaign() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/campaigns/100/actions/send")
            .with_status(204)
            .create_async()
            .await;

        let api = api_for(&server.url());
        api.send_campaign("100").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_or_update_member() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/lists/list1/members/hash1")
            .match_body(Matcher::Json(json!({
                "email_address": "a@example.com",
                "status_if_new": "subscribed"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"email_address": "a@example.com", "status": "subscribed"}"#)
            .create_async()
            .await;

        let api = api_for(&server.url());
        let member = api
            .create_or_update_member(
                "list1",
                "hash1",
                &json!({"email_address": "a@example.com", "status_if_new": "subscribed"}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(member["status"], "subscribed");
    }

    #[tokio::test]
    async fn test_list_members_gateway_timeout() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/lists/list1/members?count=100&offset=0")
            .with_status(504)
            .create_async()
            .await;

        let api = api_for(&server.url());
        let err = api.list_members("list1", 100, 0).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.status(), Some(StatusCode::GATEWAY_TIMEOUT));
        assert!(err.is_gateway_timeout());
    }
}
