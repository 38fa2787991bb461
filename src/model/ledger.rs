use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const REASON_APPROVAL_POST: &str = "approval_post";
pub const REASON_ADJUSTMENT: &str = "adjustment";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LedgerEntry {
    pub id: i64,
    pub employee_id: i64,
    pub school_year_id: i64,
    pub leave_type_id: i64,
    /// signed; debits are negative
    #[schema(example = -2.0)]
    pub qty_days: f64,
    #[schema(example = "approval_post")]
    pub reason: String,
    #[schema(nullable = true)]
    pub reference_id: Option<i64>,
    /// JSON text
    #[schema(nullable = true)]
    pub metadata: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub employee_id: i64,
    pub school_year_id: i64,
    pub leave_type_id: i64,
    pub qty_days: f64,
    pub reason: String,
    pub reference_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBooking {
    pub id: i64,
    pub employee_id: i64,
    pub leave_type_id: i64,
    pub leave_request_id: i64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
