//! Claims repository implementation
//!
//! Rows are mapped onto the domain `Claim` and `Payment` types at this
//! boundary. A row that does not parse (unknown status, bad currency) is a
//! `SerializationError`, never a silently defaulted claim.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;

use core_kernel::{AirlineCode, ClaimId, Currency, Money, PaymentId};
use domain_claims::{
    Claim, ClaimPatch, ClaimStatus, Payment, PaymentStatus, RefundTrigger, StatusChange,
};

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    claim_id, passenger_name, passenger_email, flight_number, flight_date,
    airline_code, departure_airport, arrival_airport, delay_minutes,
    booking_reference, status, documentation_status, eligibility,
    submitted_at, filed_at, airline_reference, next_follow_up_date,
    compensation_amount, compensation_currency, payment_id, refunded_at,
    refund_reason, status_history, updated_at
"#;

/// Raw `claims` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: String,
    pub passenger_name: String,
    pub passenger_email: String,
    pub flight_number: String,
    pub flight_date: NaiveDate,
    pub airline_code: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub delay_minutes: i32,
    pub booking_reference: Option<String>,
    pub status: String,
    pub documentation_status: String,
    pub eligibility: String,
    pub submitted_at: DateTime<Utc>,
    pub filed_at: Option<DateTime<Utc>>,
    pub airline_reference: Option<String>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
    pub compensation_amount: Decimal,
    pub compensation_currency: String,
    pub payment_id: String,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub status_history: Json<Vec<StatusChange>>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `payments` row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: String,
    pub claim_id: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
}

/// Parses a snake_case enum column through its serde representation
fn parse_column<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| DatabaseError::serialization(field, value))
}

fn column_text<T: Serialize>(field: &str, value: &T) -> Result<String, DatabaseError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(DatabaseError::SerializationError(format!("{} is not a text value", field))),
    }
}

fn parse_id<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, DatabaseError> {
    value.parse().map_err(|_| DatabaseError::serialization(field, value))
}

impl TryFrom<ClaimRow> for Claim {
    type Error = DatabaseError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        let status: ClaimStatus = parse_id("status", &row.status)?;
        let refund_reason = row
            .refund_reason
            .as_deref()
            .map(|r| parse_id::<RefundTrigger>("refund_reason", r))
            .transpose()?;
        let currency: Currency = parse_id("compensation_currency", &row.compensation_currency)?;
        let delay_minutes = u32::try_from(row.delay_minutes)
            .map_err(|_| DatabaseError::serialization("delay_minutes", row.delay_minutes))?;

        Ok(Claim {
            claim_id: parse_id::<ClaimId>("claim_id", &row.claim_id)?,
            passenger_name: row.passenger_name,
            passenger_email: row.passenger_email,
            flight_number: row.flight_number,
            flight_date: row.flight_date,
            airline_code: parse_id::<AirlineCode>("airline_code", &row.airline_code)?,
            departure_airport: row.departure_airport,
            arrival_airport: row.arrival_airport,
            delay_minutes,
            booking_reference: row.booking_reference,
            status,
            documentation_status: parse_column("documentation_status", &row.documentation_status)?,
            eligibility: parse_column("eligibility", &row.eligibility)?,
            submitted_at: row.submitted_at,
            filed_at: row.filed_at,
            airline_reference: row.airline_reference,
            next_follow_up_date: row.next_follow_up_date,
            estimated_compensation: Money::new(row.compensation_amount, currency),
            payment_id: parse_id::<PaymentId>("payment_id", &row.payment_id)?,
            refunded_at: row.refunded_at,
            refund_reason,
            status_history: row.status_history.0,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency: Currency = parse_id("currency", &row.currency)?;
        Ok(Payment {
            payment_id: parse_id::<PaymentId>("payment_id", &row.payment_id)?,
            claim_id: parse_id::<ClaimId>("claim_id", &row.claim_id)?,
            transaction_id: row.transaction_id,
            amount: Money::new(row.amount, currency),
            status: parse_column::<PaymentStatus>("status", &row.status)?,
        })
    }
}

/// Repository for claim records and their service-fee payments
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// All claims in `status`, oldest submission first
    pub async fn get_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM claims WHERE status = $1 ORDER BY submitted_at, claim_id",
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        debug!(status = %status, count = rows.len(), "loaded claims by status");
        rows.into_iter().map(Claim::try_from).collect()
    }

    pub async fn get_by_id(&self, claim_id: &ClaimId) -> Result<Option<Claim>, DatabaseError> {
        let sql = format!("SELECT {} FROM claims WHERE claim_id = $1", CLAIM_COLUMNS);
        sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Claim::try_from)
            .transpose()
    }

    /// Applies a partial update in one statement
    ///
    /// Unset patch fields keep their stored value, except `filed_at` when the
    /// patch clears it; history entries are appended. Returns whether a row
    /// was updated.
    pub async fn apply_patch(
        &self,
        claim_id: &ClaimId,
        patch: &ClaimPatch,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE claims SET
                status = COALESCE($2, status),
                filed_at = CASE WHEN $10 THEN NULL ELSE COALESCE($3, filed_at) END,
                airline_reference = COALESCE($4, airline_reference),
                next_follow_up_date = COALESCE($5, next_follow_up_date),
                refunded_at = COALESCE($6, refunded_at),
                refund_reason = COALESCE($7, refund_reason),
                status_history = status_history || $8::jsonb,
                updated_at = COALESCE($9, now())
            WHERE claim_id = $1
            "#,
        )
        .bind(claim_id.as_str())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.filed_at)
        .bind(patch.airline_reference.as_deref())
        .bind(patch.next_follow_up_date)
        .bind(patch.refunded_at)
        .bind(patch.refund_reason.map(|r| r.as_str()))
        .bind(Json(&patch.history))
        .bind(patch.updated_at)
        .bind(patch.clear_filed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, claim_id, transaction_id, amount, currency, status
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Payment::try_from)
        .transpose()
    }

    /// Inserts a payment record
    pub async fn insert_payment(&self, payment: &Payment) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, claim_id, transaction_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.payment_id.as_str())
        .bind(payment.claim_id.as_str())
        .bind(&payment.transaction_id)
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(column_text("status", &payment.status)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts a claim record; the payment must already exist
    pub async fn insert_claim(&self, claim: &Claim) -> Result<(), DatabaseError> {
        let delay_minutes = i32::try_from(claim.delay_minutes)
            .map_err(|_| DatabaseError::serialization("delay_minutes", claim.delay_minutes))?;

        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, passenger_name, passenger_email, flight_number, flight_date,
                airline_code, departure_airport, arrival_airport, delay_minutes,
                booking_reference, status, documentation_status, eligibility,
                submitted_at, filed_at, airline_reference, next_follow_up_date,
                compensation_amount, compensation_currency, payment_id, refunded_at,
                refund_reason, status_history, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
            )
            "#,
        )
        .bind(claim.claim_id.as_str())
        .bind(&claim.passenger_name)
        .bind(&claim.passenger_email)
        .bind(&claim.flight_number)
        .bind(claim.flight_date)
        .bind(claim.airline_code.as_str())
        .bind(&claim.departure_airport)
        .bind(&claim.arrival_airport)
        .bind(delay_minutes)
        .bind(claim.booking_reference.as_deref())
        .bind(claim.status.as_str())
        .bind(column_text("documentation_status", &claim.documentation_status)?)
        .bind(column_text("eligibility", &claim.eligibility)?)
        .bind(claim.submitted_at)
        .bind(claim.filed_at)
        .bind(claim.airline_reference.as_deref())
        .bind(claim.next_follow_up_date)
        .bind(claim.estimated_compensation.amount())
        .bind(claim.estimated_compensation.currency().code())
        .bind(claim.payment_id.as_str())
        .bind(claim.refunded_at)
        .bind(claim.refund_reason.map(|r| r.as_str()))
        .bind(Json(&claim.status_history))
        .bind(claim.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
