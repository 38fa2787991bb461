use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A staffing window joined with one of its rules; one row per rule.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffingWindowRule {
    pub rule_id: i64,
    pub window_id: i64,
    pub window_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub role_code: Option<String>,
    pub employment_class: Option<String>,
    pub leave_type_id: Option<i64>,
    pub max_on_leave_count: Option<i64>,
    pub max_on_leave_percent: Option<f64>,
}
