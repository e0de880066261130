use serde::{Deserialize, Serialize};

/// Value of `HealthResponse::status` when the API itself is up
pub const HEALTHY_STATUS: &str = "healthy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Vector store reachable
    pub pinecone_connected: bool,
    /// Language model reachable
    pub gemini_connected: bool,
}

impl HealthResponse {
    pub fn api_healthy(&self) -> bool {
        self.status == HEALTHY_STATUS
    }

    /// All three checks must pass
    pub fn is_healthy(&self) -> bool {
        self.api_healthy() && self.pinecone_connected && self.gemini_connected
    }
}

/// Vector index usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_vector_count: u64,
    pub dimension: u32,
    pub index_fullness: f64,
}

impl StatsResponse {
    /// Index fullness as a percentage clamped to `0..=100`
    pub fn fullness_percent(&self) -> f64 {
        if self.index_fullness.is_nan() {
            return 0.0;
        }
        (self.index_fullness * 100.0).clamp(0.0, 100.0)
    }
}
