//! Processing policies shared by the processors

use std::time::Duration;

use serde::{Deserialize, Serialize};

use core_kernel::batch::{DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY};
use core_kernel::BatchRunner;

/// Deadlines, cadence and throughput limits for the processors
///
/// The filing SLA, follow-up cadence and refund deadline are independent: a
/// claim can be overdue for filing (and alerted on) long before it becomes
/// eligible for an automatic refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingPolicy {
    /// Days after submission by which a claim should be filed
    pub filing_sla_days: i64,
    /// Days between follow-ups when the airline sets no expectation
    pub follow_up_cadence_days: i64,
    /// Days after submission after which an unfiled claim is refunded
    pub refund_deadline_days: i64,
    pub filing_concurrency: usize,
    pub refund_concurrency: usize,
    /// Upper bound on any single external call
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,
    /// Recipient of operator alerts
    pub operator_email: String,
}

impl Default for ProcessingPolicy {
    fn default() -> Self {
        Self {
            filing_sla_days: 7,
            follow_up_cadence_days: 14,
            refund_deadline_days: 30,
            filing_concurrency: DEFAULT_CONCURRENCY,
            refund_concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            operator_email: "operations@flightclaims.example".to_string(),
        }
    }
}

impl ProcessingPolicy {
    pub fn filing_runner(&self) -> BatchRunner {
        BatchRunner::new(self.filing_concurrency, self.call_timeout)
    }

    pub fn refund_runner(&self) -> BatchRunner {
        BatchRunner::new(self.refund_concurrency, self.call_timeout)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
