//! Authenticated JSON client for a remote REST API.

use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};

use super::error::RequestError;

/// HTTP client bound to one API base URL and one set of basic-auth credentials.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RequestError> {
        let url = self.url(path);
        debug!("GET JSON from {} with query {:?}...", url, query);

        let response = self.execute(self.client.get(&url).query(query)).await?;
        parse_json(response).await
    }

    /// POSTs a JSON body and deserializes the JSON response.
    #[tracing::instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST JSON to {}...", url);

        let response = self.execute(self.client.post(&url).json(body)).await?;
        parse_json(response).await
    }

    /// PUTs a JSON body and deserializes the JSON response.
    #[tracing::instrument(skip(self, body))]
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("PUT JSON to {}...", url);

        let response = self.execute(self.client.put(&url).json(body)).await?;
        parse_json(response).await
    }

    /// POSTs without a body, discarding whatever the server answers on success.
    #[tracing::instrument(skip(self))]
    pub async fn post_empty(&self, path: &str) -> Result<(), RequestError> {
        let url = self.url(path);
        debug!("POST to {}...", url);

        self.execute(self.client.post(&url)).await?;
        Ok(())
    }

    /// Sends the request and turns any non-2xx answer into [`RequestError::Status`],
    /// keeping the body so callers can inspect the vendor's error document.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, RequestError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        debug!("{} answered {}: {}", url, status, body);

        Err(RequestError::Status { status, url, body })
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RequestError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
}
