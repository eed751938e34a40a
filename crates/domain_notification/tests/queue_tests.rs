//! Email queue behaviour against the in-memory sender

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use core_kernel::FixedClock;
use domain_notification::ports::mock::MockEmailSender;
use domain_notification::{
    EmailPriority, EmailRequest, EmailStatus, EmailTemplate, NotificationError, NotificationQueue,
    QueueConfig,
};

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()))
}

fn refund_email(to: &str) -> EmailRequest {
    EmailRequest::new(to, EmailTemplate::RefundIssued)
        .var("passenger_name", "Grace")
        .var("claim_id", "CLM002")
        .var("amount", "€ 49.00")
        .var("reason", "claim_not_filed_deadline")
}

fn queue(sender: Arc<MockEmailSender>, clock: Arc<FixedClock>) -> NotificationQueue {
    NotificationQueue::new(sender, clock, QueueConfig::default())
}

#[tokio::test]
async fn test_exhausted_email_ends_failed_and_stays_failed() {
    let sender = Arc::new(MockEmailSender::new());
    sender.set_fail_all(true);
    let clock = clock();
    let queue = queue(sender.clone(), clock.clone());

    let id = queue.enqueue(refund_email("grace@example.com")).await.unwrap();

    for _ in 0..3 {
        queue.process_batch().await;
        clock.advance(Duration::minutes(5));
    }

    let item = queue.get(id).await.unwrap();
    assert_eq!(item.status, EmailStatus::Failed);
    assert_eq!(item.attempts, 3);
    assert!(item.error.is_some());

    // Further cycles never pick it up again
    sender.set_fail_all(false);
    for _ in 0..3 {
        let report = queue.process_batch().await;
        assert_eq!(report.attempted, 0);
        clock.advance(Duration::minutes(5));
    }
    assert_eq!(queue.get(id).await.unwrap().status, EmailStatus::Failed);
    assert!(sender.sent().await.is_empty());
}

#[tokio::test]
async fn test_success_on_second_attempt_records_two_attempts() {
    let sender = Arc::new(MockEmailSender::new());
    sender.fail_next("grace@example.com", 1).await;
    let clock = clock();
    let queue = queue(sender.clone(), clock.clone());

    let id = queue.enqueue(refund_email("grace@example.com")).await.unwrap();

    let first = queue.process_batch().await;
    assert_eq!(first.retried, 1);

    clock.advance(Duration::minutes(5));
    let second = queue.process_batch().await;
    assert_eq!(second.sent, 1);

    let item = queue.get(id).await.unwrap();
    assert_eq!(item.status, EmailStatus::Sent);
    assert_eq!(item.attempts, 2);
    assert_eq!(item.message_id.as_deref(), Some("msg_1"));
    assert!(item.error.is_none());
}

#[tokio::test]
async fn test_rendered_message_reaches_provider() {
    let sender = Arc::new(MockEmailSender::new());
    let queue = queue(sender.clone(), clock());

    queue.enqueue(refund_email("grace@example.com")).await.unwrap();
    queue.process_batch().await;

    let sent = sender.sent_to("grace@example.com").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Refund issued for claim CLM002");
    assert!(sent[0].text.contains("Grace"));
}

#[tokio::test]
async fn test_batch_size_limits_each_cycle() {
    let sender = Arc::new(MockEmailSender::new());
    let queue = queue(sender.clone(), clock());

    for n in 0..25 {
        queue
            .enqueue(refund_email(&format!("passenger{}@example.com", n)))
            .await
            .unwrap();
    }

    assert_eq!(queue.process_batch().await.sent, 10);
    assert_eq!(queue.process_batch().await.sent, 10);
    assert_eq!(queue.process_batch().await.sent, 5);
    assert_eq!(queue.metrics().await.sent, 25);
}

#[tokio::test]
async fn test_high_priority_alert_jumps_the_queue() {
    let sender = Arc::new(MockEmailSender::new());
    let clock = clock();
    let config = QueueConfig {
        batch_size: 1,
        ..Default::default()
    };
    let queue = NotificationQueue::new(sender.clone(), clock, config);

    queue.enqueue(refund_email("first@example.com")).await.unwrap();
    queue
        .enqueue(
            EmailRequest::new("ops@example.com", EmailTemplate::OverdueClaimsAlert)
                .var("count", 1)
                .var("deadline_days", 7)
                .var("claim_list", "CLM009")
                .priority(EmailPriority::High),
        )
        .await
        .unwrap();

    queue.process_batch().await;
    let sent = sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ops@example.com");
}

#[tokio::test]
async fn test_operator_retry_only_for_failed_emails() {
    let sender = Arc::new(MockEmailSender::new());
    sender.set_fail_all(true);
    let clock = clock();
    let queue = queue(sender.clone(), clock.clone());

    let id = queue.enqueue(refund_email("grace@example.com")).await.unwrap();

    // Pending is not retryable
    let err = queue.retry_failed_email(id).await.unwrap_err();
    assert!(matches!(err, NotificationError::NotRetryable { status: EmailStatus::Pending, .. }));

    for _ in 0..3 {
        queue.process_batch().await;
        clock.advance(Duration::minutes(5));
    }
    assert_eq!(queue.get(id).await.unwrap().status, EmailStatus::Failed);

    queue.retry_failed_email(id).await.unwrap();
    let item = queue.get(id).await.unwrap();
    assert_eq!(item.status, EmailStatus::Pending);
    assert_eq!(item.attempts, 0);

    sender.set_fail_all(false);
    queue.process_batch().await;
    assert_eq!(queue.get(id).await.unwrap().status, EmailStatus::Sent);
}

#[tokio::test]
async fn test_retry_unknown_email() {
    let queue = queue(Arc::new(MockEmailSender::new()), clock());
    let id = core_kernel::EmailId::new_v7();

    let err = queue.retry_failed_email(id).await.unwrap_err();
    assert!(matches!(err, NotificationError::EmailNotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_invalid_recipient_rejected() {
    let queue = queue(Arc::new(MockEmailSender::new()), clock());

    let err = queue.enqueue(refund_email("not-an-address")).await.unwrap_err();
    assert!(matches!(err, NotificationError::InvalidRecipient(_)));
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let sender = Arc::new(MockEmailSender::new());
    sender.fail_next("bounce@example.com", 1).await;
    let queue = queue(sender, clock());

    queue.enqueue(refund_email("grace@example.com")).await.unwrap();
    queue.enqueue(refund_email("bounce@example.com")).await.unwrap();
    queue.process_batch().await;

    let retrying = queue.list(Some(EmailStatus::Retry)).await;
    assert_eq!(retrying.len(), 1);
    assert_eq!(retrying[0].to, "bounce@example.com");
    assert_eq!(queue.list(None).await.len(), 2);
}

proptest! {
    #[test]
    fn prop_metrics_always_sum_to_total(
        recipients in prop::collection::vec(0usize..4, 1..20),
        failures in prop::collection::vec(0u32..5, 4),
        cycles in 1usize..6,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let sender = Arc::new(MockEmailSender::new());
            for (idx, times) in failures.iter().enumerate() {
                sender.fail_next(&format!("p{}@example.com", idx), *times).await;
            }
            let clock = clock();
            let queue = queue(sender, clock.clone());

            for r in &recipients {
                queue.enqueue(refund_email(&format!("p{}@example.com", r))).await.unwrap();
            }

            for _ in 0..cycles {
                queue.process_batch().await;
                let metrics = queue.metrics().await;
                prop_assert!(metrics.is_consistent());
                prop_assert_eq!(metrics.total, recipients.len());
                prop_assert_eq!(metrics.processing, 0);
                clock.advance(Duration::minutes(5));
            }

            for item in queue.list(None).await {
                prop_assert!(item.attempts <= item.max_attempts);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
