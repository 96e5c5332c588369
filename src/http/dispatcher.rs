//! HTTP client wrapper issuing one request per call against the Cogwit API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::DispatcherSettings;
use crate::encoder::{self, EncodeOptions, EncodeValue};
use crate::http::types::{
    ApiResponse, DispatchError, ErrorEnvelope, Headers, HttpMethod, SuccessEnvelope,
};

const USER_AGENT: &str = concat!("cogwit-sdk/", env!("CARGO_PKG_VERSION"));

/// Path segment placed between the base URL and every endpoint path.
pub const API_PREFIX: &str = "/api";

/// Seam between the endpoint client and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and classify the response into exactly one envelope.
    ///
    /// `method` is validated before any I/O. Body-bearing methods encode `payload`
    /// through the structural encoder; other methods ignore it.
    async fn send(
        &self,
        endpoint: &str,
        method: &str,
        headers: &Headers,
        payload: Option<&EncodeValue>,
    ) -> Result<ApiResponse, DispatchError>;
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    pub(crate) base_url: String,
    pub(crate) settings: DispatcherSettings,
}

impl HttpDispatcher {
    /// Construct a dispatcher for `base_url` with default timeouts.
    pub fn new(base_url: &str) -> Result<Self, DispatchError> {
        Self::with_settings(base_url, DispatcherSettings::default())
    }

    /// Construct a dispatcher with explicit timeouts.
    pub fn with_settings(
        base_url: &str,
        settings: DispatcherSettings,
    ) -> Result<Self, DispatchError> {
        let base_url = normalize_base_url(base_url).map_err(DispatchError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            request_timeout_secs = settings.request_timeout.as_secs(),
            connect_timeout_secs = settings.connect_timeout.as_secs(),
            "Initialized Cogwit HTTP dispatcher"
        );
        Ok(Self { base_url, settings })
    }

    /// Normalized service root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_client(&self) -> Result<Client, DispatchError> {
        Ok(Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.settings.request_timeout)
            .connect_timeout(self.settings.connect_timeout)
            .build()?)
    }
}

#[async_trait]
impl Transport for HttpDispatcher {
    async fn send(
        &self,
        endpoint: &str,
        method: &str,
        headers: &Headers,
        payload: Option<&EncodeValue>,
    ) -> Result<ApiResponse, DispatchError> {
        let method: HttpMethod = method.parse()?;
        let url = format_endpoint(&self.base_url, endpoint);

        let body = match payload {
            Some(payload) if method.has_payload() => {
                Some(encoder::encode(payload, &EncodeOptions::default())?)
            }
            _ => None,
        };

        // Scoped to this call; dropping it releases pooled connections.
        let client = self.build_client()?;
        let mut request = client.request(method.to_reqwest(), &url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        tracing::debug!(%method, url = %url, has_body = body.is_some(), "Dispatching Cogwit request");
        let response = request.send().await.map_err(|err| {
            tracing::error!(%method, url = %url, error = %err, "Cogwit request failed");
            DispatchError::Transport(err)
        })?;

        let status = response.status();
        let text = response.text().await?;
        let expects_json = declares_json(headers);

        if status.is_success() {
            let data = if expects_json && text.trim().is_empty() {
                Value::Null
            } else if expects_json {
                serde_json::from_str(&text).map_err(DispatchError::Decode)?
            } else {
                Value::String(text)
            };
            tracing::debug!(%method, url = %url, status = status.as_u16(), "Cogwit request succeeded");
            return Ok(ApiResponse::Success(SuccessEnvelope {
                status: status.as_u16(),
                data,
            }));
        }

        let error = if expects_json && status != StatusCode::INTERNAL_SERVER_ERROR {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };
        tracing::warn!(%method, url = %url, status = status.as_u16(), "Cogwit responded with an error status");
        Ok(ApiResponse::Error(ErrorEnvelope {
            status: status.as_u16(),
            error,
        }))
    }
}

/// Whether the caller declared a JSON `Content-Type`; response bodies are parsed accordingly.
fn declares_json(headers: &Headers) -> bool {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, value)| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}

fn format_endpoint(base: &str, endpoint: &str) -> String {
    let base = base.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}{API_PREFIX}/{endpoint}")
}
