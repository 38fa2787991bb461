//! Per-school-year policy rows layered over a leave type's own defaults.

use sqlx::SqliteConnection;

use crate::error::LeaveResult;
use crate::leave::directory;
use crate::model::leave_type::{LeavePolicy, LeaveType};

/// Rules in force for one request after applying the policy override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveRules {
    pub requires_med_cert: bool,
    pub prior_notice_days: i64,
}

pub fn effective_rules(leave_type: &LeaveType, policy: Option<&LeavePolicy>) -> EffectiveRules {
    EffectiveRules {
        requires_med_cert: policy
            .and_then(|p| p.requires_med_cert)
            .unwrap_or(leave_type.requires_med_cert),
        prior_notice_days: policy
            .and_then(|p| p.prior_notice_days)
            .unwrap_or(leave_type.requires_prior_notice_days),
    }
}

/// The class-specific policy row for the employee's employment class if one
/// exists, else the generic row, else `None`.
pub async fn resolve_policy(
    conn: &mut SqliteConnection,
    school_year_id: i64,
    leave_type_id: i64,
    employee_id: i64,
) -> LeaveResult<Option<LeavePolicy>> {
    let employee = directory::employee(conn, employee_id).await?;

    // `employment_class = NULL` never matches, so a classless employee only sees generic rows.
    let policy = sqlx::query_as::<_, LeavePolicy>(
        r#"
        SELECT id, school_year_id, leave_type_id, employment_class, requires_med_cert, prior_notice_days
        FROM leave_policies
        WHERE school_year_id = ?
          AND leave_type_id = ?
          AND (employment_class = ? OR employment_class IS NULL)
        ORDER BY employment_class IS NULL, id
        LIMIT 1
        "#,
    )
    .bind(school_year_id)
    .bind(leave_type_id)
    .bind(employee.employment_class.as_deref())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sick_leave() -> LeaveType {
        LeaveType {
            id: 2,
            code: "SL".into(),
            name: "Sick Leave".into(),
            counts_against_balance: true,
            requires_med_cert: true,
            requires_prior_notice_days: 0,
        }
    }

    #[test]
    fn type_defaults_apply_without_policy() {
        let rules = effective_rules(&sick_leave(), None);
        assert!(rules.requires_med_cert);
        assert_eq!(rules.prior_notice_days, 0);
    }

    #[test]
    fn policy_overrides_only_the_fields_it_sets() {
        let policy = LeavePolicy {
            id: 1,
            school_year_id: 4,
            leave_type_id: 2,
            employment_class: Some("faculty".into()),
            requires_med_cert: Some(false),
            prior_notice_days: None,
        };
        let rules = effective_rules(&sick_leave(), Some(&policy));
        assert!(!rules.requires_med_cert);
        assert_eq!(rules.prior_notice_days, 0);
    }
}
