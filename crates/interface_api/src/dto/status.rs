//! Side-effect-free status and health responses

use std::collections::BTreeMap;

use serde::Serialize;

use core_kernel::HealthCheckResult;

/// Answer to an unauthenticated `GET` on a trigger path
#[derive(Debug, Serialize)]
pub struct TriggerStatus {
    pub endpoint: &'static str,
    pub status: &'static str,
    /// Whether `POST` can be authorized at all
    pub cron_configured: bool,
    pub counts: BTreeMap<&'static str, usize>,
}

impl TriggerStatus {
    pub fn new(endpoint: &'static str, cron_configured: bool) -> Self {
        Self {
            endpoint,
            status: "ok",
            cron_configured,
            counts: BTreeMap::new(),
        }
    }

    pub fn count(mut self, name: &'static str, value: usize) -> Self {
        self.counts.insert(name, value);
        self
    }

    /// Marks the probe degraded when the store could not be read
    pub fn degraded(mut self) -> Self {
        self.status = "degraded";
        self
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: Vec<HealthCheckResult>,
}
