//! # Domain Module
//!
//! Errors, wire messages and the per-transaction workflow context.

pub mod context;
pub mod errors;
pub mod messages;

pub use context::BatchWorkflowContext;
pub use errors::ResendError;
pub use messages::{
    PushBatchRequest, ResendBatchRequest, ResendBatchResponse, ResendRequest, ResendRequestKind,
    ResendResponse,
};
