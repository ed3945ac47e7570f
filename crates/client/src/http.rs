// HTTP client wrapper for the Conductor API
// Decision: Paths are built from segments so task type names and ids are percent-encoded

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::trace;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ClientError, Result};

const AUTH_HEADER: &str = "X-Authorization";

/// Low-level client shared by the resource APIs
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(config.server_url.trim_end_matches('/'))
            .map_err(|_| ConfigError::InvalidServerUrl(config.server_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidServerUrl(config.server_url.clone()).into());
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value =
                HeaderValue::from_str(token).map_err(|_| ConfigError::InvalidAuthToken)?;
            value.set_sensitive(true);
            headers.insert(AUTH_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { base_url, http })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL can carry path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.http.get(self.url(segments)).query(query);
        let body = self.send(request).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET that treats `204 No Content` or an empty body as `None`
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let request = self.http.get(self.url(segments)).query(query);
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// POST a JSON body and return the raw response text
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        body: &B,
    ) -> Result<String> {
        let request = self.http.post(self.url(segments)).query(query).json(body);
        let text = self.send(request).await?.text().await?;
        Ok(text)
    }

    /// POST without a body
    pub async fn post_empty(&self, segments: &[&str], query: &[(&str, String)]) -> Result<()> {
        let request = self.http.post(self.url(segments)).query(query);
        self.send(request).await?;
        Ok(())
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<()> {
        let mut request = self.http.put(self.url(segments)).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete(&self, segments: &[&str], query: &[(&str, String)]) -> Result<()> {
        let request = self.http.delete(self.url(segments)).query(query);
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "Server responded");

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}
