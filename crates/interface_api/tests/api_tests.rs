//! Router tests driving the trigger and operator surface with in-memory collaborators

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use domain_claims::{ClaimStatus, ProcessingPolicy};
use interface_api::auth::{create_token, roles};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{assert_claim_status, ClaimBuilder, TestHarness, TimeFixtures};

const CRON_SECRET: &str = "test-cron-secret";
const JWT_SECRET: &str = "test-jwt-secret";

fn config() -> ApiConfig {
    ApiConfig {
        cron_secret: Some(CRON_SECRET.to_string()),
        jwt_secret: JWT_SECRET.to_string(),
        ..ApiConfig::default()
    }
}

fn app(harness: &TestHarness) -> Router {
    create_router(AppState::new(harness.ctx.clone(), config()))
}

fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn operator_token(roles: &[&str]) -> String {
    create_token(
        "op-1",
        roles.iter().map(|r| r.to_string()).collect(),
        JWT_SECRET,
        3600,
    )
    .unwrap()
}

async fn seed_ready_claim(harness: &TestHarness, id: &str) {
    harness
        .seed(
            ClaimBuilder::new(id)
                .status(ClaimStatus::ReadyToFile)
                .submitted_days_ago(3)
                .build(),
        )
        .await;
}

mod cron_auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_secret_is_401_without_side_effects() {
        let harness = TestHarness::new();
        seed_ready_claim(&harness, "CLM001").await;

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/automatic-filing", None, None),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(harness.store.update_count(), 0);
        assert!(harness.airlines.submissions().await.is_empty());
        assert_claim_status(&harness.claim("CLM001").await, ClaimStatus::ReadyToFile);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_401() {
        let harness = TestHarness::new();
        seed_ready_claim(&harness, "CLM001").await;

        for uri in [
            "/api/cron/automatic-filing",
            "/api/cron/follow-up",
            "/api/cron/automatic-refunds",
            "/api/cron/process-email-queue",
        ] {
            let (status, _) = send(
                app(&harness),
                request(Method::POST, uri, Some("not-the-secret"), None),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        }
        assert_eq!(harness.store.update_count(), 0);
        assert_eq!(harness.payments.refund_calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_secret_is_503() {
        let harness = TestHarness::new();
        let app = create_router(AppState::new(harness.ctx.clone(), ApiConfig::default()));

        let (status, _) = send(
            app,
            request(Method::POST, "/api/cron/automatic-filing", Some("anything"), None),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_get_reports_counts_without_side_effects() {
        let harness = TestHarness::new();
        seed_ready_claim(&harness, "CLM001").await;
        seed_ready_claim(&harness, "CLM002").await;

        let (status, body) = send(
            app(&harness),
            request(Method::GET, "/api/cron/automatic-filing", None, None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cron_configured"], true);
        assert_eq!(body["counts"]["ready_to_file"], 2);
        assert_eq!(harness.store.update_count(), 0);
        assert!(harness.airlines.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_refund_probe_counts_candidates() {
        let harness = TestHarness::with_policy(ProcessingPolicy {
            refund_deadline_days: 2,
            ..ProcessingPolicy::default()
        });
        seed_ready_claim(&harness, "CLM001").await;

        let (status, body) = send(
            app(&harness),
            request(Method::GET, "/api/cron/automatic-refunds", None, None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["counts"]["claim_not_filed_deadline"], 1);
        assert_eq!(body["counts"]["total"], 1);
        assert_eq!(harness.payments.refund_calls(), 0);
    }
}

mod cron_run_tests {
    use super::*;

    #[tokio::test]
    async fn test_filing_run_shape() {
        let harness = TestHarness::new();
        seed_ready_claim(&harness, "CLM001").await;

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/automatic-filing", Some(CRON_SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["results"]["summary"]["filed"], 1);
        assert_eq!(body["results"]["details"][0]["claim_id"], "CLM001");
        assert!(body.get("errors").is_none());
        assert_claim_status(&harness.claim("CLM001").await, ClaimStatus::Filed);
    }

    #[tokio::test]
    async fn test_filing_failures_listed_in_errors() {
        let harness = TestHarness::new();
        harness.airlines.fail_for("LH").await;
        seed_ready_claim(&harness, "CLM001").await;

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/automatic-filing", Some(CRON_SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["results"]["summary"]["failed"], 1);
        assert_eq!(body["results"]["details"][0]["error_kind"], "external_service");
        assert!(body["errors"][0].as_str().unwrap().starts_with("CLM001: "));
    }

    #[tokio::test]
    async fn test_store_outage_fails_the_run() {
        let harness = TestHarness::new();
        harness.store.fail_status_query(ClaimStatus::ReadyToFile).await;

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/automatic-filing", Some(CRON_SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_follow_up_run_groups_by_airline() {
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

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/follow-up", Some(CRON_SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["summary"]["follow_ups"], 1);
        assert_eq!(body["results"]["summary"]["airlines"], 1);
        assert_eq!(body["results"]["details"]["follow_ups"]["LH"][0]["claim_id"], "CLM002");
    }

    #[tokio::test]
    async fn test_refund_run_then_rerun_skips_nothing_new() {
        let harness = TestHarness::with_policy(ProcessingPolicy {
            refund_deadline_days: 2,
            ..ProcessingPolicy::default()
        });
        seed_ready_claim(&harness, "CLM001").await;

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/automatic-refunds", Some(CRON_SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["summary"]["batches"], 1);
        assert_eq!(body["results"]["summary"]["successful"], 1);
        assert_eq!(body["results"]["details"][0]["trigger"], "claim_not_filed_deadline");
        assert_claim_status(&harness.claim("CLM001").await, ClaimStatus::Refunded);

        let (_, again) = send(
            app(&harness),
            request(Method::POST, "/api/cron/automatic-refunds", Some(CRON_SECRET), None),
        )
        .await;
        assert_eq!(again["results"]["summary"]["total"], 0);
        assert_eq!(harness.payments.refund_calls(), 1);
    }

    #[tokio::test]
    async fn test_email_queue_drain() {
        let harness = TestHarness::new();
        seed_ready_claim(&harness, "CLM001").await;
        harness.filing().process_automatic_filing().await.unwrap();

        let (status, body) = send(
            app(&harness),
            request(Method::POST, "/api/cron/process-email-queue", Some(CRON_SECRET), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["summary"]["sent"], 1);
        assert_eq!(body["results"]["details"]["sent"], 1);
        assert_eq!(harness.email.sent().await.len(), 1);
    }
}

mod admin_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_requires_token() {
        let harness = TestHarness::new();

        let (status, _) = send(
            app(&harness),
            request(Method::GET, "/api/admin/email-queue", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app(&harness),
            request(Method::GET, "/api/admin/email-queue", Some(CRON_SECRET), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_requires_operator_role() {
        let harness = TestHarness::new();
        let token = operator_token(&["auditor"]);

        let (status, _) = send(
            app(&harness),
            request(Method::GET, "/api/admin/email-queue", Some(&token), None),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_manual_refund() {
        let harness = TestHarness::new();
        harness
            .seed(ClaimBuilder::new("CLM001").status(ClaimStatus::Rejected).build())
            .await;
        let token = operator_token(&[roles::OPERATOR]);

        let (status, body) = send(
            app(&harness),
            request(
                Method::POST,
                "/api/admin/refunds",
                Some(&token),
                Some(json!({"claim_ids": ["CLM001"], "trigger": "claim_rejected_by_airline"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"]["summary"]["successful"], 1);
        assert_eq!(body["results"]["details"]["initiated_by"], "operator:op-1");
        let claim = harness.claim("CLM001").await;
        assert_claim_status(&claim, ClaimStatus::Refunded);
    }

    #[tokio::test]
    async fn test_manual_refund_rejects_empty_list() {
        let harness = TestHarness::new();
        let token = operator_token(&[roles::ADMIN]);

        let (status, _) = send(
            app(&harness),
            request(
                Method::POST,
                "/api/admin/refunds",
                Some(&token),
                Some(json!({"claim_ids": [], "trigger": "ineligible_flight"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(harness.payments.refund_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_email_retry_and_clear() {
        let harness = TestHarness::new();
        seed_ready_claim(&harness, "CLM001").await;
        harness.filing().process_automatic_filing().await.unwrap();
        harness.email.set_fail_all(true);

        for _ in 0..3 {
            harness.queue.process_batch().await;
            harness.clock.advance(Duration::seconds(301));
        }
        harness.email.set_fail_all(false);

        let token = operator_token(&[roles::OPERATOR]);
        let (status, body) = send(
            app(&harness),
            request(Method::GET, "/api/admin/email-queue?status=failed", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metrics"]["failed"], 1);
        let id = body["emails"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app(&harness),
            request(
                Method::POST,
                &format!("/api/admin/email-queue/{}/retry", id),
                Some(&token),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");

        harness.queue.process_batch().await;
        let (status, body) = send(
            app(&harness),
            request(Method::DELETE, "/api/admin/email-queue/sent", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 1);
    }

    #[tokio::test]
    async fn test_retry_unknown_or_malformed_id() {
        let harness = TestHarness::new();
        let token = operator_token(&[roles::OPERATOR]);

        let (status, _) = send(
            app(&harness),
            request(
                Method::POST,
                "/api/admin/email-queue/EML-0190b1e2-7c3a-7d4e-9f10-2b3c4d5e6f70/retry",
                Some(&token),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app(&harness),
            request(Method::POST, "/api/admin/email-queue/nope/retry", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_and_readiness() {
        let harness = TestHarness::new();

        let (status, body) = send(app(&harness), request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) =
            send(app(&harness), request(Method::GET, "/health/ready", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }
}
