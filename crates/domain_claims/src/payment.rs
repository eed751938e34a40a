//! Service-fee payments

use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, Money, PaymentId};

/// Payment status as reported by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// The passenger's service-fee payment, one per claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub claim_id: ClaimId,
    /// Processor-side transaction id
    pub transaction_id: String,
    pub amount: Money,
    pub status: PaymentStatus,
}

impl Payment {
    /// Only captured payments can be refunded
    pub fn is_refundable(&self) -> bool {
        self.status == PaymentStatus::Succeeded && self.amount.is_positive()
    }
}
