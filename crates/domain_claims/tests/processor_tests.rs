//! Filing, follow-up and refund processors against in-memory collaborators

use std::time::Duration as StdDuration;

use chrono::Duration;

use core_kernel::AirlineCode;
use domain_claims::{
    ClaimStatus, DocumentationStatus, ErrorKind, FlightEligibility, ProcessingPolicy, RefundTrigger,
};
use domain_notification::{EmailStatus, EmailTemplate};
use test_utils::{
    assert_claim_status, assert_refund_failed, assert_refund_summary, refund_outcome, ClaimBuilder,
    PaymentBuilder, TestHarness, TimeFixtures,
};

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Automatic filing
// ============================================================================

mod filing_tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_claim_is_filed() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::ReadyToFile).submitted_days_ago(2).build())
            .await;

        let run = harness.filing().process_automatic_filing().await.unwrap();

        assert_eq!(run.summary.total, 1);
        assert_eq!(run.summary.filed, 1);
        assert!(!run.alert_queued);

        let claim = harness.claim("CLM001").await;
        assert_claim_status(&claim, ClaimStatus::Filed);
        assert_eq!(claim.filed_at, Some(TimeFixtures::now()));
        assert_eq!(claim.airline_reference, run.results[0].airline_reference);
        // Lufthansa answers within 21 days
        assert_eq!(claim.next_follow_up_date, Some(TimeFixtures::now() + Duration::days(21)));
        assert_eq!(claim.status_history.len(), 1);

        let queued = harness.queue.list(Some(EmailStatus::Pending)).await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].template, EmailTemplate::ClaimFiled);
        assert_eq!(queued[0].to, claim.passenger_email);
    }

    #[tokio::test]
    async fn test_filed_claim_is_not_refiled() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::ReadyToFile).build())
            .await;

        let first = harness.filing().process_automatic_filing().await.unwrap();
        assert_eq!(first.summary.filed, 1);

        let second = harness.filing().process_automatic_filing().await.unwrap();
        assert_eq!(second.summary.total, 0);
        assert!(second.results.is_empty());
        assert_eq!(harness.airlines.submissions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_only_ready_claims_are_candidates() {
        let harness = TestHarness::new();
        harness.seed(ClaimBuilder::new("CLM001").status(ClaimStatus::Validated).build()).await;
        harness.seed(ClaimBuilder::new("CLM002").status(ClaimStatus::Monitoring).build()).await;

        let run = harness.filing().process_automatic_filing().await.unwrap();

        assert_eq!(run.summary.total, 0);
        assert_claim_status(&harness.claim("CLM001").await, ClaimStatus::Validated);
    }

    #[tokio::test]
    async fn test_unknown_airline_is_a_configuration_error() {
        let harness = TestHarness::new();
        harness
            .seed(
                ClaimBuilder::new("CLM003")
                    .status(ClaimStatus::ReadyToFile)
                    .airline("ZZ", "ZZ123")
                    .build(),
            )
            .await;

        let run = harness.filing().process_automatic_filing().await.unwrap();

        assert_eq!(run.summary.failed, 1);
        assert_eq!(run.results[0].error_kind, Some(ErrorKind::Configuration));
        assert_claim_status(&harness.claim("CLM003").await, ClaimStatus::ReadyToFile);

        assert!(run.alert_queued);
        let queued = harness.queue.list(None).await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].template, EmailTemplate::FilingFailureAlert);
        assert_eq!(queued[0].to, harness.ctx.policy.operator_email);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_a_validation_error() {
        let harness = TestHarness::new();
        harness
            .seed(
                ClaimBuilder::new("CLM004")
                    .status(ClaimStatus::ReadyToFile)
                    .without_booking_reference()
                    .build(),
            )
            .await;

        let run = harness.filing().process_automatic_filing().await.unwrap();

        let result = &run.results[0];
        assert_eq!(result.error_kind, Some(ErrorKind::Validation));
        assert!(result.error.as_deref().unwrap().contains("booking_reference"));
        assert!(harness.airlines.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_airline_failure_is_isolated() {
        let harness = TestHarness::new();
        harness.airlines.fail_for("BA").await;
        harness
            .seed(ClaimBuilder::new("CLM005").status(ClaimStatus::ReadyToFile).airline("BA", "BA117").build())
            .await;
        harness
            .seed(ClaimBuilder::new("CLM006").status(ClaimStatus::ReadyToFile).build())
            .await;

        let run = harness.filing().process_automatic_filing().await.unwrap();

        assert_eq!(run.summary.filed, 1);
        assert_eq!(run.summary.failed, 1);
        let failed = run.results.iter().find(|r| r.claim_id == "CLM005").unwrap();
        assert_eq!(failed.error_kind, Some(ErrorKind::ExternalService));
        assert_claim_status(&harness.claim("CLM005").await, ClaimStatus::ReadyToFile);
        assert_claim_status(&harness.claim("CLM006").await, ClaimStatus::Filed);
    }

    #[tokio::test]
    async fn test_stalled_airline_times_out() {
        let policy = ProcessingPolicy {
            call_timeout: StdDuration::from_millis(50),
            ..Default::default()
        };
        let harness = TestHarness::with_policy(policy);
        harness.airlines.stall_for("LH").await;
        harness
            .seed(ClaimBuilder::new("CLM007").status(ClaimStatus::ReadyToFile).build())
            .await;

        let run = harness.filing().process_automatic_filing().await.unwrap();

        let result = &run.results[0];
        assert_eq!(result.error_kind, Some(ErrorKind::ExternalService));
        assert!(result.error.as_deref().unwrap().contains("airline submission"));
        assert_claim_status(&harness.claim("CLM007").await, ClaimStatus::ReadyToFile);
    }

    #[tokio::test]
    async fn test_store_outage_fails_the_run() {
        let harness = TestHarness::new();
        harness.store.fail_status_query(ClaimStatus::ReadyToFile).await;

        let err = harness.filing().process_automatic_filing().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
    }
}

// ============================================================================
// Follow-up and overdue detection
// ============================================================================

mod follow_up_tests {
    use super::*;

    #[tokio::test]
    async fn test_clm001_is_overdue() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::ReadyToFile).submitted_days_ago(3).build())
            .await;

        let overdue = harness.follow_up().detect_overdue(2).await.unwrap();

        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].claim_id.as_str(), "CLM001");
    }

    #[tokio::test]
    async fn test_overdue_boundary() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM010").status(ClaimStatus::Filed).submitted_days_ago(7).build())
            .await;

        assert!(harness.follow_up().detect_overdue(7).await.unwrap().is_empty());

        harness.clock.advance(Duration::seconds(1));
        assert_eq!(harness.follow_up().detect_overdue(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clm002_needs_follow_up() {
        let harness = TestHarness::new();
        harness
            .seed(
                ClaimBuilder::new("CLM002")
                    .status(ClaimStatus::Monitoring)
                    .submitted_days_ago(40)
                    .next_follow_up(TimeFixtures::days_ago(1))
                    .build(),
            )
            .await;
        harness
            .seed(
                ClaimBuilder::new("CLM020")
                    .status(ClaimStatus::Monitoring)
                    .next_follow_up(TimeFixtures::now() + Duration::days(3))
                    .build(),
            )
            .await;

        let due = harness.follow_up().detect_needing_follow_up().await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].claim_id.as_str(), "CLM002");

        let report = harness.follow_up().run_follow_up_check().await;
        assert!(report.errors.is_empty());
        assert_eq!(report.follow_ups.len(), 1);
        let lh = &report.follow_ups[&AirlineCode::new("LH").unwrap()];
        assert_eq!(lh.len(), 1);
        assert_eq!(lh[0].claim_id.as_str(), "CLM002");
    }

    #[tokio::test]
    async fn test_detection_is_read_only() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::ReadyToFile).submitted_days_ago(30).build())
            .await;

        harness.follow_up().detect_overdue(7).await.unwrap();
        harness.follow_up().detect_needing_follow_up().await.unwrap();

        assert_eq!(harness.store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_run_queues_one_alert_per_airline_and_a_digest() {
        let harness = TestHarness::new();
        for (id, airline, flight) in [("CLM030", "LH", "LH400"), ("CLM031", "LH", "LH402"), ("CLM032", "BA", "BA117")] {
            harness
                .seed(
                    ClaimBuilder::new(id)
                        .status(ClaimStatus::Monitoring)
                        .airline(airline, flight)
                        .next_follow_up(TimeFixtures::days_ago(2))
                        .build(),
                )
                .await;
        }
        harness
            .seed(ClaimBuilder::new("CLM033").status(ClaimStatus::ReadyToFile).submitted_days_ago(10).build())
            .await;

        let report = harness.follow_up().run_follow_up_check().await;

        assert_eq!(report.overdue.len(), 1);
        assert_eq!(report.follow_ups.len(), 2);
        assert_eq!(report.alerts_queued, 3);

        let templates: Vec<EmailTemplate> = harness.queue.list(None).await.into_iter().map(|e| e.template).collect();
        assert_eq!(templates.iter().filter(|t| **t == EmailTemplate::FollowUpReminder).count(), 2);
        assert_eq!(templates.iter().filter(|t| **t == EmailTemplate::OverdueClaimsAlert).count(), 1);
    }

    #[tokio::test]
    async fn test_failing_query_does_not_block_the_other() {
        let harness = TestHarness::new();
        harness.store.fail_status_query(ClaimStatus::Monitoring).await;
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::ReadyToFile).submitted_days_ago(10).build())
            .await;

        let report = harness.follow_up().run_follow_up_check().await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("follow-up detection"));
        assert_eq!(report.overdue.len(), 1);
        assert!(report.follow_ups.is_empty());
    }
}

// ============================================================================
// Automatic refunds
// ============================================================================

mod refund_tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use core_kernel::{ClaimId, DomainPort, PaymentId, PortError};
    use domain_claims::ports::mock::InMemoryClaimStore;
    use domain_claims::{Claim, ClaimPatch, ClaimStorePort, Payment, RefundProcessor};

    #[tokio::test]
    async fn test_clm001_refund_then_repeat_is_skipped() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::ReadyToFile).submitted_days_ago(3).build())
            .await;

        let first = harness
            .refunds()
            .process_batch_automatic_refunds(ids(&["CLM001"]), RefundTrigger::ClaimNotFiledDeadline, "cron")
            .await;

        assert_refund_summary(&first, 1, 0, 0);
        let claim = harness.claim("CLM001").await;
        assert_claim_status(&claim, ClaimStatus::Refunded);
        assert_eq!(claim.refund_reason, Some(RefundTrigger::ClaimNotFiledDeadline));
        assert_eq!(claim.refunded_at, Some(TimeFixtures::now()));
        assert_eq!(harness.payments.refund_calls(), 1);

        let second = harness
            .refunds()
            .process_batch_automatic_refunds(ids(&["CLM001"]), RefundTrigger::ClaimNotFiledDeadline, "cron")
            .await;

        assert_refund_summary(&second, 0, 1, 0);
        let outcome = refund_outcome(&second, "CLM001");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("already refunded"));
        assert_eq!(harness.payments.refund_calls(), 1);
    }

    #[tokio::test]
    async fn test_refund_queues_high_priority_email() {
        let harness = TestHarness::new();
        let claim = ClaimBuilder::new("CLM040")
            .status(ClaimStatus::Rejected)
            .passenger("Grace Hopper", "grace@example.com")
            .build();
        harness.seed(claim).await;

        let batch = harness
            .refunds()
            .process_batch_automatic_refunds(ids(&["CLM040"]), RefundTrigger::ClaimRejectedByAirline, "ops@example.com")
            .await;

        assert_eq!(batch.summary.total_amount, rust_decimal_macros::dec!(49.00));
        assert_eq!(batch.initiated_by, "ops@example.com");

        harness.queue.process_batch().await;
        let sent = harness.email.sent_to("grace@example.com").await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("CLM040"));
        assert!(sent[0].text.contains("The airline rejected your claim"));
    }

    #[tokio::test]
    async fn test_per_item_failures_are_classified() {
        let harness = TestHarness::new();
        harness.seed(ClaimBuilder::new("CLM050").status(ClaimStatus::DocumentsPrepared).build()).await;

        let failed_payment = ClaimBuilder::new("CLM051").status(ClaimStatus::Submitted).build();
        harness.store.insert_payment(PaymentBuilder::for_claim(&failed_payment).failed().build()).await;
        harness.store.insert_claim(failed_payment).await;

        let declined = ClaimBuilder::new("CLM052").status(ClaimStatus::Submitted).build();
        harness.seed(declined).await;
        harness.payments.fail_for("ch_clm052").await;

        harness.seed(ClaimBuilder::new("CLM053").status(ClaimStatus::Validated).build()).await;

        let batch = harness
            .refunds()
            .process_batch_automatic_refunds(
                ids(&["CLM050", "CLM051", "CLM052", "  ", "CLM404", "CLM053"]),
                RefundTrigger::InsufficientDocumentation,
                "cron",
            )
            .await;

        assert_refund_summary(&batch, 1, 0, 5);
        assert_refund_failed(&batch, "CLM050", ErrorKind::IllegalTransition);
        assert_refund_failed(&batch, "CLM051", ErrorKind::Validation);
        assert_refund_failed(&batch, "CLM052", ErrorKind::ExternalService);
        assert_refund_failed(&batch, "  ", ErrorKind::Validation);
        assert_refund_failed(&batch, "CLM404", ErrorKind::Validation);

        // Only the declined charge and CLM053 reached the processor
        assert_eq!(harness.payments.refund_calls(), 2);
        assert_claim_status(&harness.claim("CLM052").await, ClaimStatus::Submitted);
        assert_claim_status(&harness.claim("CLM053").await, ClaimStatus::Refunded);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let harness = TestHarness::new();
        for id in ["CLM063", "CLM061", "CLM062"] {
            harness.seed(ClaimBuilder::new(id).status(ClaimStatus::Submitted).build()).await;
        }

        let batch = harness
            .refunds()
            .process_batch_automatic_refunds(ids(&["CLM063", "CLM061", "CLM062"]), RefundTrigger::IneligibleFlight, "cron")
            .await;

        let order: Vec<&str> = batch.results.iter().map(|r| r.claim_id.as_str()).collect();
        assert_eq!(order, vec!["CLM063", "CLM061", "CLM062"]);
    }

    #[tokio::test]
    async fn test_candidates_are_disjoint_by_precedence() {
        let harness = TestHarness::new();
        harness.seed(ClaimBuilder::new("CLM070").status(ClaimStatus::Rejected).build()).await;
        harness
            .seed(
                ClaimBuilder::new("CLM071")
                    .status(ClaimStatus::Validated)
                    .eligibility(FlightEligibility::Ineligible)
                    .documentation(DocumentationStatus::Insufficient)
                    .submitted_days_ago(45)
                    .build(),
            )
            .await;
        harness
            .seed(
                ClaimBuilder::new("CLM072")
                    .status(ClaimStatus::Submitted)
                    .documentation(DocumentationStatus::Insufficient)
                    .submitted_days_ago(45)
                    .build(),
            )
            .await;
        harness
            .seed(ClaimBuilder::new("CLM073").status(ClaimStatus::ReadyToFile).submitted_days_ago(31).build())
            .await;
        harness
            .seed(ClaimBuilder::new("CLM074").status(ClaimStatus::ReadyToFile).submitted_days_ago(29).build())
            .await;
        harness
            .seed(ClaimBuilder::new("CLM075").status(ClaimStatus::Monitoring).submitted_days_ago(90).build())
            .await;

        let candidates = harness.refunds().get_claims_needing_automatic_refunds().await.unwrap();

        let ids_of = |trigger| -> Vec<String> {
            candidates.bucket(trigger).iter().map(|c| c.claim_id.to_string()).collect()
        };
        assert_eq!(ids_of(RefundTrigger::ClaimRejectedByAirline), vec!["CLM070"]);
        assert_eq!(ids_of(RefundTrigger::IneligibleFlight), vec!["CLM071"]);
        assert_eq!(ids_of(RefundTrigger::InsufficientDocumentation), vec!["CLM072"]);
        assert_eq!(ids_of(RefundTrigger::ClaimNotFiledDeadline), vec!["CLM073"]);
        assert_eq!(candidates.total(), 4);
        assert_eq!(harness.store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_automatic_refunds_run_one_batch_per_trigger() {
        let harness = TestHarness::new();
        harness.seed(ClaimBuilder::new("CLM080").status(ClaimStatus::Rejected).build()).await;
        harness
            .seed(ClaimBuilder::new("CLM081").status(ClaimStatus::ReadyToFile).submitted_days_ago(60).build())
            .await;

        let batches = harness.refunds().process_automatic_refunds("cron").await.unwrap();

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.summary.successful == 1));
        assert_claim_status(&harness.claim("CLM080").await, ClaimStatus::Refunded);
        assert_claim_status(&harness.claim("CLM081").await, ClaimStatus::Refunded);

        // Nothing left to refund on the next run
        let again = harness.refunds().process_automatic_refunds("cron").await.unwrap();
        assert!(again.is_empty());
        assert_eq!(harness.payments.refund_calls(), 2);
    }

    #[tokio::test]
    async fn test_deadline_bucket_matches_overdue_statuses() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM090").status(ClaimStatus::Filed).submitted_days_ago(45).build())
            .await;
        harness
            .seed(ClaimBuilder::new("CLM091").status(ClaimStatus::Submitted).submitted_days_ago(45).build())
            .await;
        harness
            .seed(ClaimBuilder::new("CLM092").status(ClaimStatus::Validated).submitted_days_ago(45).build())
            .await;

        let overdue = harness.follow_up().detect_overdue(30).await.unwrap();
        let candidates = harness.refunds().get_claims_needing_automatic_refunds().await.unwrap();

        let overdue_ids: Vec<String> = overdue.iter().map(|c| c.claim_id.to_string()).collect();
        let bucket_ids: Vec<String> = candidates
            .bucket(RefundTrigger::ClaimNotFiledDeadline)
            .iter()
            .map(|c| c.claim_id.to_string())
            .collect();
        assert_eq!(overdue_ids, vec!["CLM090"]);
        assert_eq!(bucket_ids, overdue_ids);
        assert_eq!(candidates.total(), 1);

        let batches = harness.refunds().process_automatic_refunds("cron").await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].summary.successful, 1);

        let claim = harness.claim("CLM090").await;
        assert_claim_status(&claim, ClaimStatus::Refunded);
        assert_eq!(claim.filed_at, None);
        assert!(claim.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_overlapping_batches_refund_once() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM093").status(ClaimStatus::ReadyToFile).submitted_days_ago(40).build())
            .await;

        let first = harness.refunds();
        let second = harness.refunds();
        let (a, b) = tokio::join!(
            first.process_batch_automatic_refunds(ids(&["CLM093"]), RefundTrigger::ClaimNotFiledDeadline, "cron"),
            second.process_batch_automatic_refunds(ids(&["CLM093"]), RefundTrigger::ClaimNotFiledDeadline, "cron"),
        );

        assert_eq!(a.summary.failed + b.summary.failed, 0);
        assert_eq!(a.summary.successful + a.summary.skipped, 1);
        assert_eq!(b.summary.successful + b.summary.skipped, 1);
        assert_eq!(harness.payments.refunds_executed().await, 1);
        assert_claim_status(&harness.claim("CLM093").await, ClaimStatus::Refunded);
    }

    #[tokio::test]
    async fn test_stale_precheck_still_refunds_once() {
        let harness = TestHarness::new();
        let claim = ClaimBuilder::new("CLM094").status(ClaimStatus::ReadyToFile).submitted_days_ago(40).build();
        harness.seed(claim.clone()).await;

        // Both runs read the claim before either one records the refund
        let mut ctx = harness.ctx.clone();
        ctx.store = Arc::new(StaleReadStore {
            inner: harness.store.clone(),
            snapshot: claim,
        });

        for _ in 0..2 {
            let batch = RefundProcessor::new(ctx.clone())
                .process_batch_automatic_refunds(ids(&["CLM094"]), RefundTrigger::ClaimNotFiledDeadline, "cron")
                .await;
            assert_eq!(batch.summary.failed, 0);
        }

        assert_eq!(harness.payments.refund_calls(), 2);
        assert_eq!(harness.payments.refunds_executed().await, 1);
        assert_claim_status(&harness.claim("CLM094").await, ClaimStatus::Refunded);
    }

    /// Store whose `get_by_id` keeps returning the claim as first read
    struct StaleReadStore {
        inner: Arc<InMemoryClaimStore>,
        snapshot: Claim,
    }

    impl DomainPort for StaleReadStore {}

    #[async_trait]
    impl ClaimStorePort for StaleReadStore {
        async fn get_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError> {
            self.inner.get_by_status(status).await
        }

        async fn get_by_id(&self, _claim_id: &ClaimId) -> Result<Option<Claim>, PortError> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn update(&self, claim_id: &ClaimId, patch: &ClaimPatch) -> Result<bool, PortError> {
            self.inner.update(claim_id, patch).await
        }

        async fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PortError> {
            self.inner.get_payment(payment_id).await
        }
    }
}
