//! Typed results and errors returned by the endpoint client.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::encoder::{Encode, EncodeValue, EnumValue};
use crate::http::{DispatchError, ErrorEnvelope};

/// Errors raised by endpoint operations. Server-reported failures are returned as
/// [`ApiOutcome::Error`] instead.
#[derive(Debug, Error)]
pub enum CogwitError {
    /// Dispatch failed before a response could be classified.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// A success body did not match the operation's result shape.
    #[error("Unexpected {operation} response shape: {source}")]
    Decode {
        /// Operation whose response failed to decode.
        operation: &'static str,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Error value produced for any non-success response.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("Cogwit responded with status {status}: {error}")]
pub struct ErrorResponse {
    /// HTTP status reported by the service.
    pub status: u16,
    /// Error body, JSON when the service sent JSON.
    pub error: Value,
}

impl From<ErrorEnvelope> for ErrorResponse {
    fn from(envelope: ErrorEnvelope) -> Self {
        Self {
            status: envelope.status,
            error: envelope.error,
        }
    }
}

/// Error value returned by [`crate::client::Cogwit::add`].
pub type AddError = ErrorResponse;
/// Error value returned by [`crate::client::Cogwit::cognify`].
pub type CognifyError = ErrorResponse;
/// Error value returned by [`crate::client::Cogwit::memify`].
pub type MemifyError = ErrorResponse;
/// Error value returned by [`crate::client::Cogwit::search`].
pub type SearchError = ErrorResponse;

/// Either the typed result of an operation or the error the service reported.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    /// 2xx response decoded into the operation's result type.
    Success(T),
    /// Any other response.
    Error(ErrorResponse),
}

impl<T> ApiOutcome<T> {
    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<T, ErrorResponse> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Error(error) => Err(error),
        }
    }

    /// Borrow the success value, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Borrow the error value, if any.
    pub fn error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Success(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

/// Result of ingesting text into a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResponse {
    /// Pipeline status reported by the service, e.g. `PipelineRunCompleted`.
    pub status: String,
    /// Dataset the data landed in.
    pub dataset_id: Uuid,
    /// Pipeline run triggered by the ingestion.
    pub pipeline_run_id: Uuid,
    /// Dataset name.
    pub dataset_name: String,
}

/// Per-dataset pipeline result returned by cognify and memify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunInfo {
    /// Pipeline status reported by the service.
    pub status: String,
    /// Dataset processed by the run.
    pub dataset_id: Uuid,
    /// Identifier of the run.
    pub pipeline_run_id: Uuid,
    /// Dataset name.
    pub dataset_name: String,
}

/// Cognify results keyed by dataset id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CognifyResponse(BTreeMap<String, PipelineRunInfo>);

impl CognifyResponse {
    /// Result for one dataset.
    pub fn get(&self, dataset_id: &Uuid) -> Option<&PipelineRunInfo> {
        self.0.get(&dataset_id.to_string())
    }

    /// Iterate results in dataset-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PipelineRunInfo)> {
        self.0.iter()
    }

    /// Number of datasets processed.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no dataset was processed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, PipelineRunInfo> {
        self.0
    }
}

/// Dataset referenced by a combined-context search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultDataset {
    /// Dataset id.
    pub id: Uuid,
    /// Dataset name.
    pub name: String,
}

/// Search answer aggregated across datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSearchResult {
    /// Answer payload; shape depends on the search type.
    #[serde(default)]
    pub result: Option<Value>,
    /// Context the answer was built from.
    pub context: Map<String, Value>,
    /// Graph snapshots keyed by dataset.
    #[serde(default)]
    pub graphs: Option<Map<String, Value>>,
    /// Datasets that contributed to the answer.
    #[serde(default)]
    pub datasets: Option<Vec<SearchResultDataset>>,
}

/// Search answer for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Answer payload; shape depends on the search type.
    pub search_result: Value,
    /// Dataset the answer came from.
    #[serde(default)]
    pub dataset_id: Option<Uuid>,
    /// Dataset name.
    #[serde(default)]
    pub dataset_name: Option<String>,
}

/// Successful search response, by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResults {
    /// Combined-context answer.
    Combined(CombinedSearchResult),
    /// One answer per dataset.
    PerDataset(Vec<SearchResult>),
    /// Body matching neither shape, passed through untouched.
    Raw(Value),
}

impl SearchResults {
    /// First matching shape wins: combined object, then per-dataset list, then raw.
    pub fn from_value(value: Value) -> Self {
        if value.is_object()
            && let Ok(combined) = CombinedSearchResult::deserialize(&value)
        {
            return Self::Combined(combined);
        }
        if value.is_array()
            && let Ok(results) = Vec::<SearchResult>::deserialize(&value)
        {
            return Self::PerDataset(results);
        }
        Self::Raw(value)
    }
}

/// Retrieval strategy used by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchType {
    /// Pre-computed summaries.
    Summaries,
    /// Relationship insights from the graph.
    Insights,
    /// Raw text chunks.
    Chunks,
    /// Lexical chunk matching.
    ChunksLexical,
    /// LLM completion over retrieved chunks.
    RagCompletion,
    /// LLM completion over graph context.
    GraphCompletion,
    /// Graph completion over summarized context.
    GraphSummaryCompletion,
    /// Graph completion with chain-of-thought.
    GraphCompletionCot,
    /// Graph completion with iterative context extension.
    GraphCompletionContextExtension,
    /// Code retrieval.
    Code,
    /// Raw Cypher query.
    Cypher,
    /// Natural language translated to a graph query.
    NaturalLanguage,
    /// Let the service pick a strategy.
    FeelingLucky,
    /// Feedback on a previous interaction.
    Feedback,
    /// Time-aware retrieval.
    Temporal,
    /// Coding rules retrieval.
    CodingRules,
}

impl SearchType {
    /// Wire value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summaries => "SUMMARIES",
            Self::Insights => "INSIGHTS",
            Self::Chunks => "CHUNKS",
            Self::ChunksLexical => "CHUNKS_LEXICAL",
            Self::RagCompletion => "RAG_COMPLETION",
            Self::GraphCompletion => "GRAPH_COMPLETION",
            Self::GraphSummaryCompletion => "GRAPH_SUMMARY_COMPLETION",
            Self::GraphCompletionCot => "GRAPH_COMPLETION_COT",
            Self::GraphCompletionContextExtension => "GRAPH_COMPLETION_CONTEXT_EXTENSION",
            Self::Code => "CODE",
            Self::Cypher => "CYPHER",
            Self::NaturalLanguage => "NATURAL_LANGUAGE",
            Self::FeelingLucky => "FEELING_LUCKY",
            Self::Feedback => "FEEDBACK",
            Self::Temporal => "TEMPORAL",
            Self::CodingRules => "CODING_RULES",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Encode for SearchType {
    fn to_encode_value(&self) -> EncodeValue {
        EnumValue::new("SearchType", format!("{self:?}"), self.as_str()).into()
    }
}
