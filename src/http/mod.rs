//! HTTP request dispatch and response envelopes.

pub mod dispatcher;
pub mod types;

pub use dispatcher::{API_PREFIX, HttpDispatcher, Transport};
pub use types::{
    ApiResponse, DispatchError, ErrorEnvelope, Headers, HttpMethod, SuccessEnvelope, is_success,
};
