//! Analysis result types. These are what the cache tiers store.

use serde::{Deserialize, Serialize};

use super::request::TaskType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub model: String,
    /// Polarity label for sentiment tasks, emotion label for emotion tasks.
    pub sentiment: String,
    pub confidence: f64,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSentimentResult {
    pub results: Vec<SentimentResult>,
    pub total_processing_time_ms: u64,
    pub items_processed: usize,
}

impl BatchSentimentResult {
    pub fn new(results: Vec<SentimentResult>, total_processing_time_ms: u64) -> Self {
        let items_processed = results.len();
        Self {
            results,
            total_processing_time_ms,
            items_processed,
        }
    }
}
