//! Emails raised by the processors

use tracing::warn;

use domain_notification::{EmailPriority, EmailRequest, EmailTemplate, NotificationQueue};

use crate::claim::{Claim, ClaimSummary, RefundTrigger};
use crate::payment::Payment;

pub(crate) fn claim_filed(claim: &Claim, airline_name: &str, reference: &str) -> EmailRequest {
    EmailRequest::new(&claim.passenger_email, EmailTemplate::ClaimFiled)
        .var("passenger_name", &claim.passenger_name)
        .var("claim_id", &claim.claim_id)
        .var("airline_name", airline_name)
        .var("airline_reference", reference)
        .var("flight_number", &claim.flight_number)
        .priority(EmailPriority::Normal)
}

pub(crate) fn refund_issued(claim: &Claim, payment: &Payment, trigger: RefundTrigger) -> EmailRequest {
    EmailRequest::new(&claim.passenger_email, EmailTemplate::RefundIssued)
        .var("passenger_name", &claim.passenger_name)
        .var("claim_id", &claim.claim_id)
        .var("amount", payment.amount)
        .var("reason", trigger.description())
        .priority(EmailPriority::High)
}

pub(crate) fn filing_failures(operator: &str, failures: &[(String, String)]) -> EmailRequest {
    let details = failures
        .iter()
        .map(|(claim_id, error)| format!("{}: {}", claim_id, error))
        .collect::<Vec<_>>()
        .join("\n");
    EmailRequest::new(operator, EmailTemplate::FilingFailureAlert)
        .var("failed_count", failures.len())
        .var("details", details)
        .priority(EmailPriority::High)
}

pub(crate) fn overdue_claims(operator: &str, deadline_days: i64, claims: &[ClaimSummary]) -> EmailRequest {
    EmailRequest::new(operator, EmailTemplate::OverdueClaimsAlert)
        .var("count", claims.len())
        .var("deadline_days", deadline_days)
        .var("claim_list", claim_list(claims))
        .priority(EmailPriority::High)
}

pub(crate) fn follow_up(operator: &str, airline_name: &str, claims: &[ClaimSummary]) -> EmailRequest {
    EmailRequest::new(operator, EmailTemplate::FollowUpReminder)
        .var("airline_name", airline_name)
        .var("count", claims.len())
        .var("claim_list", claim_list(claims))
        .priority(EmailPriority::Normal)
}

fn claim_list(claims: &[ClaimSummary]) -> String {
    claims
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Enqueues an email; a rejected request is logged and never fails the caller
pub(crate) async fn enqueue(queue: &NotificationQueue, request: EmailRequest) -> bool {
    let template = request.template;
    match queue.enqueue(request).await {
        Ok(_) => true,
        Err(e) => {
            warn!(template = template.name(), error = %e, "notification not queued");
            false
        }
    }
}
