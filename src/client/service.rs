//! Typed operations against the Cogwit API.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::payloads::{
    AddOptions, AddPayload, CognifyRequest, MemifyPayload, SearchOptions, SearchPayload,
};
use crate::client::types::{
    AddResponse, ApiOutcome, CognifyResponse, CogwitError, ErrorResponse, PipelineRunInfo,
    SearchResults, SearchType,
};
use crate::config::CogwitConfig;
use crate::encoder::{Encode, StringList};
use crate::http::{Headers, HttpDispatcher, HttpMethod, Transport};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Client for the Cogwit ingest, graph-build, and search endpoints.
pub struct Cogwit {
    config: CogwitConfig,
    transport: Arc<dyn Transport>,
}

impl Cogwit {
    /// Construct a client that talks HTTP to `config.base_url`.
    pub fn new(config: CogwitConfig) -> Result<Self, CogwitError> {
        let dispatcher = HttpDispatcher::new(&config.base_url)?;
        Ok(Self::with_transport(config, Arc::new(dispatcher)))
    }

    /// Construct a client over a caller-supplied transport.
    pub fn with_transport(config: CogwitConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &CogwitConfig {
        &self.config
    }

    /// Ingest text into a dataset. A single string is sent as a one-element list.
    pub async fn add(
        &self,
        data: impl Into<StringList>,
        dataset_name: &str,
        options: AddOptions,
    ) -> Result<ApiOutcome<AddResponse>, CogwitError> {
        let payload = AddPayload {
            text_data: data.into(),
            dataset_id: options.dataset_id,
            dataset_name: dataset_name.to_string(),
            node_set: options.node_set,
        };
        let outcome = self.post("/add", &payload).await?;
        decode_outcome("add", outcome)
    }

    /// Build the knowledge graph for the requested datasets.
    pub async fn cognify(
        &self,
        request: CognifyRequest,
    ) -> Result<ApiOutcome<CognifyResponse>, CogwitError> {
        let outcome = self.post("/cognify", &request).await?;
        decode_outcome("cognify", outcome)
    }

    /// Enrich an existing graph with derived memory.
    pub async fn memify(
        &self,
        dataset_name: &str,
    ) -> Result<ApiOutcome<PipelineRunInfo>, CogwitError> {
        let payload = MemifyPayload {
            dataset_name: dataset_name.to_string(),
        };
        let outcome = self.post("/memify", &payload).await?;
        decode_outcome("memify", outcome)
    }

    /// Query the graph. The successful shape depends on the search type and options.
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        options: SearchOptions,
    ) -> Result<ApiOutcome<SearchResults>, CogwitError> {
        let payload = SearchPayload {
            search_type,
            query: query.to_string(),
            options,
        };
        let outcome = self.post("/search", &payload).await?;
        Ok(match outcome {
            Ok(data) => ApiOutcome::Success(SearchResults::from_value(data)),
            Err(error) => ApiOutcome::Error(error),
        })
    }

    /// Cognify the dataset an [`AddResponse`] points at.
    pub async fn cognify_added(
        &self,
        added: &AddResponse,
    ) -> Result<ApiOutcome<CognifyResponse>, CogwitError> {
        self.cognify(CognifyRequest::for_dataset_ids([added.dataset_id]))
            .await
    }

    async fn post<P: Encode>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<Result<Value, ErrorResponse>, CogwitError> {
        let headers = self.headers();
        let body = payload.to_encode_value();
        let response = self
            .transport
            .send(endpoint, HttpMethod::Post.as_str(), &headers, Some(&body))
            .await?;

        match response.classify() {
            Ok(envelope) => Ok(Ok(envelope.data)),
            Err(envelope) => {
                tracing::warn!(
                    endpoint,
                    status = envelope.status,
                    error = %envelope.error,
                    "Cogwit reported a failure"
                );
                Ok(Err(envelope.into()))
            }
        }
    }

    fn headers(&self) -> Headers {
        Headers::from([
            (API_KEY_HEADER.to_string(), self.config.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }
}

fn decode_outcome<T: DeserializeOwned>(
    operation: &'static str,
    outcome: Result<Value, ErrorResponse>,
) -> Result<ApiOutcome<T>, CogwitError> {
    match outcome {
        Ok(data) => {
            let decoded = serde_json::from_value(data)
                .map_err(|source| CogwitError::Decode { operation, source })?;
            tracing::debug!(operation, "Decoded Cogwit response");
            Ok(ApiOutcome::Success(decoded))
        }
        Err(error) => Ok(ApiOutcome::Error(error)),
    }
}
