//! Network utilities for release traffic.
//!
//! This module provides:
//! - An HTTP client with per-call deadlines
//! - A bounded retry policy with exponential backoff and jitter
//! - Release-metadata lookup for resolving `"latest"`

mod client;
mod releases;
mod retry;

pub use client::{status_error, with_deadline, HttpClient};
pub use releases::{ReleaseInfo, ReleaseResolver};
pub use retry::{retry_async, RetryPolicy, RetryStats};
