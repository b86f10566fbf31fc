//! # Adapters Module
//!
//! Fan-out publishing and the client-backed batch publisher.

pub mod async_publisher;
pub mod client_publisher;
pub mod latch;

pub use async_publisher::AsyncBatchPayloadPublisher;
pub use client_publisher::ClientResendBatchPublisher;
pub use latch::CancellableCountDownLatch;
