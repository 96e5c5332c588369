//! Endpoint client for the Cogwit ingest, graph-build, and search API.

mod payloads;
mod service;
mod types;

pub use payloads::{AddOptions, CognifyRequest, SearchOptions};
pub use service::{API_KEY_HEADER, Cogwit};
pub use types::{
    AddError, AddResponse, ApiOutcome, CognifyError, CognifyResponse, CogwitError,
    CombinedSearchResult, ErrorResponse, MemifyError, PipelineRunInfo, SearchError, SearchResult,
    SearchResultDataset, SearchResults, SearchType,
};
