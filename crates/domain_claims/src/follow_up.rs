//! Follow-up and overdue detection
//!
//! Detection is read-only. The run wrapper turns the two candidate sets into
//! operator alerts: one digest for overdue claims and one reminder per
//! airline for claims due a follow-up.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::AirlineCode;

use crate::alerts;
use crate::claim::{Claim, ClaimStatus, ClaimSummary};
use crate::context::EngineContext;
use crate::error::ClaimError;

/// Claims needing attention, found by one follow-up run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpReport {
    pub overdue: Vec<ClaimSummary>,
    /// Follow-up candidates keyed by airline code
    pub follow_ups: BTreeMap<AirlineCode, Vec<ClaimSummary>>,
    pub alerts_queued: usize,
    pub errors: Vec<String>,
}

/// Claim is past the deadline: strictly more than `deadline_days` since submission
pub fn is_overdue(claim: &Claim, now: DateTime<Utc>, deadline_days: i64) -> bool {
    now - claim.submitted_at > Duration::days(deadline_days)
}

/// Monitoring claim whose follow-up date has arrived
///
/// Claims without a scheduled date fall back to `filed_at + cadence_days`.
pub fn is_due_for_follow_up(claim: &Claim, now: DateTime<Utc>, cadence_days: i64) -> bool {
    if claim.status != ClaimStatus::Monitoring {
        return false;
    }
    match (claim.next_follow_up_date, claim.filed_at) {
        (Some(next), _) => next <= now,
        (None, Some(filed_at)) => filed_at + Duration::days(cadence_days) <= now,
        (None, None) => false,
    }
}

/// Groups claims by airline, keeping the first occurrence of each claim
pub fn group_by_airline(claims: &[Claim]) -> BTreeMap<AirlineCode, Vec<ClaimSummary>> {
    let mut seen = HashSet::new();
    let mut groups: BTreeMap<AirlineCode, Vec<ClaimSummary>> = BTreeMap::new();
    for claim in claims {
        if seen.insert(claim.claim_id.clone()) {
            groups
                .entry(claim.airline_code.clone())
                .or_default()
                .push(claim.summary());
        }
    }
    groups
}

pub struct FollowUpDetector {
    ctx: EngineContext,
}

impl FollowUpDetector {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Unfiled or just-filed claims older than `deadline_days`
    pub async fn detect_overdue(&self, deadline_days: i64) -> Result<Vec<Claim>, ClaimError> {
        let now = self.ctx.clock.now();
        let mut overdue = Vec::new();
        for status in [ClaimStatus::ReadyToFile, ClaimStatus::Filed] {
            let claims = core_kernel::with_timeout(
                "store get_by_status",
                self.ctx.policy.call_timeout,
                self.ctx.store.get_by_status(status),
            )
            .await?;
            overdue.extend(claims.into_iter().filter(|c| is_overdue(c, now, deadline_days)));
        }
        Ok(overdue)
    }

    /// Monitoring claims whose follow-up date is due
    pub async fn detect_needing_follow_up(&self) -> Result<Vec<Claim>, ClaimError> {
        let now = self.ctx.clock.now();
        let claims = core_kernel::with_timeout(
            "store get_by_status",
            self.ctx.policy.call_timeout,
            self.ctx.store.get_by_status(ClaimStatus::Monitoring),
        )
        .await?;
        Ok(claims
            .into_iter()
            .filter(|c| is_due_for_follow_up(c, now, self.ctx.policy.follow_up_cadence_days))
            .collect())
    }

    /// Runs both detections and queues operator alerts
    ///
    /// A failing detection is recorded in `errors` and does not stop the other.
    #[instrument(skip(self))]
    pub async fn run_follow_up_check(&self) -> FollowUpReport {
        let mut report = FollowUpReport::default();
        let operator = self.ctx.policy.operator_email.clone();
        let deadline_days = self.ctx.policy.filing_sla_days;

        match self.detect_overdue(deadline_days).await {
            Ok(claims) => {
                let mut seen = HashSet::new();
                report.overdue = claims
                    .iter()
                    .filter(|c| seen.insert(c.claim_id.clone()))
                    .map(Claim::summary)
                    .collect();
                if !report.overdue.is_empty()
                    && alerts::enqueue(
                        &self.ctx.queue,
                        alerts::overdue_claims(&operator, deadline_days, &report.overdue),
                    )
                    .await
                {
                    report.alerts_queued += 1;
                }
            }
            Err(e) => {
                warn!(error = %e, "overdue detection failed");
                report.errors.push(format!("overdue detection: {}", e));
            }
        }

        match self.detect_needing_follow_up().await {
            Ok(claims) => {
                report.follow_ups = group_by_airline(&claims);
                for (airline, claims) in &report.follow_ups {
                    let airline_name = self.ctx.registry.display_name(airline);
                    if alerts::enqueue(&self.ctx.queue, alerts::follow_up(&operator, &airline_name, claims)).await {
                        report.alerts_queued += 1;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "follow-up detection failed");
                report.errors.push(format!("follow-up detection: {}", e));
            }
        }

        info!(
            overdue = report.overdue.len(),
            follow_up_airlines = report.follow_ups.len(),
            alerts = report.alerts_queued,
            errors = report.errors.len(),
            "follow-up check finished"
        );
        report
    }
}
