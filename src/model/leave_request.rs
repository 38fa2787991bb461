use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::period::DateRange;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    EnumString,
    Display,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Posted,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Statuses that hold staffing capacity.
    pub const IN_FLIGHT: [LeaveStatus; 4] = [
        LeaveStatus::Submitted,
        LeaveStatus::UnderReview,
        LeaveStatus::Approved,
        LeaveStatus::Posted,
    ];

    /// Statuses from which an approver may still act, or the filer may cancel.
    pub fn is_pending_decision(self) -> bool {
        matches!(self, LeaveStatus::Submitted | LeaveStatus::UnderReview)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    EnumString,
    Display,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PartDay {
    Am,
    Pm,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 1000)]
    pub employee_id: i64,
    #[schema(example = 4)]
    pub school_year_id: i64,
    #[schema(example = 2)]
    pub leave_type_id: i64,
    #[schema(example = 1, nullable = true)]
    pub charge_to_leave_type_id: Option<i64>,
    /// first day of leave
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    /// first day back (exclusive)
    #[schema(example = "2026-03-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(nullable = true)]
    pub part_day: Option<PartDay>,
    #[schema(nullable = true)]
    pub reason: Option<String>,
    pub status: LeaveStatus,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub decided_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub posted_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn period(&self) -> DateRange {
        DateRange::new_unchecked(self.start_date, self.end_date)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    EnumString,
    Display,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ApprovalStep {
    pub id: i64,
    pub leave_request_id: i64,
    #[schema(example = 1)]
    pub step_order: i64,
    #[schema(example = "UNIT_HEAD")]
    pub approver_role: String,
    pub approver_employee_id: i64,
    pub status: StepStatus,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub acted_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub remarks: Option<String>,
}

pub const MED_CERT: &str = "med_cert";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SupportingDocument {
    pub id: i64,
    pub leave_request_id: i64,
    #[schema(example = "med_cert")]
    pub doc_type: String,
    #[schema(example = "clinic-note.pdf")]
    pub file_name: String,
    #[schema(format = "date-time", value_type = String)]
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_matches_storage_form() {
        assert_eq!(LeaveStatus::UnderReview.to_string(), "under_review");
        assert_eq!("posted".parse::<LeaveStatus>().unwrap(), LeaveStatus::Posted);
        assert!(LeaveStatus::Submitted.is_pending_decision());
        assert!(!LeaveStatus::Approved.is_pending_decision());
        assert_eq!("am".parse::<PartDay>().unwrap(), PartDay::Am);
    }
}
