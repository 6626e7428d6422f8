//! # Types Module
//!
//! Request and result types exchanged between request handlers, the
//! [`CachedAnalyzer`](crate::analyzer::CachedAnalyzer), and inference backends.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TaskType`] | Analysis task (sentiment polarity or emotion) |
//! | [`SentimentRequest`] | Single-text analysis request |
//! | [`BatchSentimentRequest`] | Ordered multi-text analysis request |
//! | [`SentimentResult`] | Result for one text |
//! | [`BatchSentimentResult`] | Index-aligned results for a batch |

pub mod request;
pub mod response;

pub use request::{BatchSentimentRequest, SentimentRequest, TaskType};
pub use response::{BatchSentimentResult, SentimentResult};
