//! Staffing-window capacity: how many people of a unit may be on leave at once.

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::error::LeaveResult;
use crate::leave::directory;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::staffing::StaffingWindowRule;

/// Absorbs float noise in percent comparisons.
const PERCENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Count,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityBlock {
    pub window_id: i64,
    pub window_name: String,
    pub rule_id: i64,
    pub kind: BlockKind,
    /// people (count) or projected percentage (percent)
    pub current: f64,
    pub limit: f64,
}

impl CapacityBlock {
    pub fn reason(&self) -> String {
        match self.kind {
            BlockKind::Count => format!(
                "{}: {} of {} allowed staff already on leave",
                self.window_name, self.current, self.limit
            ),
            BlockKind::Percent => format!(
                "{}: {:.1}% of staff would be on leave, cap is {:.1}%",
                self.window_name, self.current, self.limit
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CapacityReport {
    pub allowed: bool,
    pub blocks: Vec<CapacityBlock>,
}

impl CapacityReport {
    pub fn reasons(&self) -> Vec<String> {
        self.blocks.iter().map(CapacityBlock::reason).collect()
    }
}

/// Checks one rule given the in-flight count (excluding this request) and
/// the size of the staff group the rule protects.
pub fn evaluate_rule(rule: &StaffingWindowRule, current_count: i64, group_size: i64) -> Vec<CapacityBlock> {
    let mut blocks = Vec::new();
    let block = |kind, current, limit| CapacityBlock {
        window_id: rule.window_id,
        window_name: rule.window_name.clone(),
        rule_id: rule.rule_id,
        kind,
        current,
        limit,
    };

    if let Some(max) = rule.max_on_leave_count {
        if current_count + 1 > max {
            blocks.push(block(BlockKind::Count, current_count as f64, max as f64));
        }
    }

    if let Some(max_percent) = rule.max_on_leave_percent {
        let group = group_size.max(1) as f64;
        let projected = (current_count + 1) as f64 / group * 100.0;
        if projected > max_percent + PERCENT_EPSILON {
            blocks.push(block(BlockKind::Percent, projected, max_percent));
        }
    }

    blocks
}

async fn rules_overlapping(
    conn: &mut SqliteConnection,
    org_unit_id: i64,
    request: &LeaveRequest,
) -> LeaveResult<Vec<StaffingWindowRule>> {
    let rows = sqlx::query_as::<_, StaffingWindowRule>(
        r#"
        SELECT r.id AS rule_id, w.id AS window_id, w.name AS window_name,
               w.start_date, w.end_date,
               r.role_code, r.employment_class, r.leave_type_id,
               r.max_on_leave_count, r.max_on_leave_percent
        FROM staffing_windows w
        JOIN staffing_window_rules r ON r.window_id = w.id
        WHERE w.org_unit_id = ?
          AND w.school_year_id = ?
          AND w.start_date < ?
          AND w.end_date > ?
        ORDER BY w.id, r.id
        "#,
    )
    .bind(org_unit_id)
    .bind(request.school_year_id)
    .bind(request.end_date)
    .bind(request.start_date)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

async fn is_exempt(
    conn: &mut SqliteConnection,
    window_id: i64,
    employee_id: i64,
    leave_type_id: i64,
) -> LeaveResult<bool> {
    let hits = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM staffing_window_exemptions
        WHERE window_id = ?
          AND employee_id = ?
          AND (leave_type_id IS NULL OR leave_type_id = ?)
        "#,
    )
    .bind(window_id)
    .bind(employee_id)
    .bind(leave_type_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(hits > 0)
}

/// In-flight requests in the unit overlapping the window, membership taken
/// from each owner's assignment on their own request's start date.
async fn in_flight_count(
    conn: &mut SqliteConnection,
    org_unit_id: i64,
    rule: &StaffingWindowRule,
    exclude_request_id: i64,
) -> LeaveResult<i64> {
    let [s1, s2, s3, s4] = LeaveStatus::IN_FLIGHT.map(|s| s.to_string());
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT lr.id)
        FROM leave_requests lr
        JOIN employees e ON e.id = lr.employee_id
        JOIN role_assignments ra
          ON ra.employee_id = lr.employee_id
         AND ra.org_unit_id = ?
         AND ra.valid_from <= lr.start_date
         AND (ra.valid_to IS NULL OR ra.valid_to > lr.start_date)
        WHERE lr.status IN (?, ?, ?, ?)
          AND lr.id <> ?
          AND (? IS NULL OR lr.leave_type_id = ?)
          AND lr.start_date < ?
          AND lr.end_date > ?
          AND (? IS NULL OR ra.role_code = ?)
          AND (? IS NULL OR e.employment_class = ?)
        "#,
    )
    .bind(org_unit_id)
    .bind(s1)
    .bind(s2)
    .bind(s3)
    .bind(s4)
    .bind(exclude_request_id)
    .bind(rule.leave_type_id)
    .bind(rule.leave_type_id)
    .bind(rule.end_date)
    .bind(rule.start_date)
    .bind(rule.role_code.as_deref())
    .bind(rule.role_code.as_deref())
    .bind(rule.employment_class.as_deref())
    .bind(rule.employment_class.as_deref())
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Distinct employees in the unit matching the rule's filters on `as_of`.
async fn group_size(
    conn: &mut SqliteConnection,
    org_unit_id: i64,
    rule: &StaffingWindowRule,
    as_of: chrono::NaiveDate,
) -> LeaveResult<i64> {
    let size = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT ra.employee_id)
        FROM role_assignments ra
        JOIN employees e ON e.id = ra.employee_id
        WHERE ra.org_unit_id = ?
          AND ra.valid_from <= ?
          AND (ra.valid_to IS NULL OR ra.valid_to > ?)
          AND (? IS NULL OR ra.role_code = ?)
          AND (? IS NULL OR e.employment_class = ?)
        "#,
    )
    .bind(org_unit_id)
    .bind(as_of)
    .bind(as_of)
    .bind(rule.role_code.as_deref())
    .bind(rule.role_code.as_deref())
    .bind(rule.employment_class.as_deref())
    .bind(rule.employment_class.as_deref())
    .fetch_one(&mut *conn)
    .await?;
    Ok(size)
}

/// Evaluates every staffing rule overlapping `request` and collects all blocks.
pub async fn check(conn: &mut SqliteConnection, request: &LeaveRequest) -> LeaveResult<CapacityReport> {
    let Some(org_unit_id) =
        directory::org_unit_of(conn, request.employee_id, request.start_date).await?
    else {
        return Ok(CapacityReport {
            allowed: true,
            blocks: vec![],
        });
    };

    let rules = rules_overlapping(conn, org_unit_id, request).await?;
    if rules.is_empty() {
        return Ok(CapacityReport {
            allowed: true,
            blocks: vec![],
        });
    }

    let filer = directory::employee(conn, request.employee_id).await?;
    let filer_roles: Vec<String> = directory::assignments_on(conn, request.employee_id, request.start_date)
        .await?
        .into_iter()
        .filter(|a| a.org_unit_id == org_unit_id)
        .map(|a| a.role_code)
        .collect();

    let mut blocks = Vec::new();
    for rule in &rules {
        if rule.leave_type_id.is_some_and(|lt| lt != request.leave_type_id) {
            continue;
        }
        if rule
            .role_code
            .as_ref()
            .is_some_and(|role| !filer_roles.contains(role))
        {
            continue;
        }
        if rule.employment_class.is_some() && rule.employment_class != filer.employment_class {
            continue;
        }
        if is_exempt(conn, rule.window_id, request.employee_id, request.leave_type_id).await? {
            tracing::debug!(
                request_id = request.id,
                window_id = rule.window_id,
                "Filer exempt from staffing window"
            );
            continue;
        }

        let current = in_flight_count(conn, org_unit_id, rule, request.id).await?;
        let group = if rule.max_on_leave_percent.is_some() {
            group_size(conn, org_unit_id, rule, request.start_date).await?
        } else {
            0
        };
        blocks.extend(evaluate_rule(rule, current, group));
    }

    if !blocks.is_empty() {
        tracing::info!(request_id = request.id, blocks = blocks.len(), "Staffing capacity blocks request");
    }

    Ok(CapacityReport {
        allowed: blocks.is_empty(),
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rule(count: Option<i64>, percent: Option<f64>) -> StaffingWindowRule {
        StaffingWindowRule {
            rule_id: 1,
            window_id: 10,
            window_name: "Enrollment week".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 8).unwrap(),
            role_code: None,
            employment_class: None,
            leave_type_id: None,
            max_on_leave_count: count,
            max_on_leave_percent: percent,
        }
    }

    #[test]
    fn count_cap_blocks_the_request_that_would_exceed_it() {
        assert!(evaluate_rule(&rule(Some(2), None), 1, 0).is_empty());
        let blocks = evaluate_rule(&rule(Some(2), None), 2, 0);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Count);
        assert_eq!(blocks[0].current, 2.0);
        assert!(blocks[0].reason().contains("Enrollment week"));
    }

    #[test]
    fn percent_cap_allows_exact_limit() {
        // 1 of 4 already out; the new one makes exactly 50%
        assert!(evaluate_rule(&rule(None, Some(50.0)), 1, 4).is_empty());
        let blocks = evaluate_rule(&rule(None, Some(50.0)), 2, 4);
        assert_eq!(blocks[0].kind, BlockKind::Percent);
        assert!((blocks[0].current - 75.0).abs() < 1e-9);
    }

    #[test]
    fn percent_cap_tolerates_float_noise() {
        // 1/3 * 100 against a cap written as 33.333333333333336
        assert!(evaluate_rule(&rule(None, Some(100.0 / 3.0)), 0, 3).is_empty());
    }

    #[test]
    fn both_caps_report_independently() {
        let blocks = evaluate_rule(&rule(Some(1), Some(10.0)), 1, 5);
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BlockKind::Count, BlockKind::Percent]);
    }
}
