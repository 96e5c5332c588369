#![deny(missing_docs)]

//! Client SDK for the hosted Cogwit knowledge-graph API.

/// Typed add, cognify, memify, and search operations.
pub mod client;
/// Environment-driven configuration management.
pub mod config;
/// Structural encoder flattening rich values into JSON.
pub mod encoder;
/// HTTP request dispatch and response envelopes.
pub mod http;
/// Structured logging and tracing setup.
pub mod logging;

pub use client::{
    AddOptions, AddResponse, ApiOutcome, CognifyRequest, CognifyResponse, Cogwit, CogwitError,
    ErrorResponse, PipelineRunInfo, SearchOptions, SearchResults, SearchType,
};
pub use config::CogwitConfig;
pub use encoder::{Encode, EncodeOptions, EncodeValue, EncodingError, encode, to_json};
pub use http::{ApiResponse, DispatchError, HttpDispatcher, HttpMethod, Transport};
