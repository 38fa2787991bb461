//! Builds the ordered approval chain for a submitted request by walking role
//! assignments up the org-unit tree.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::error::LeaveResult;
use crate::leave::directory;
use crate::model::leave_request::{ApprovalStep, LeaveRequest};
use crate::model::org_unit::{OrgUnit, RoleAssignment, RoleCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedStep {
    pub role: RoleCode,
    pub approver_employee_id: i64,
}

/// Snapshot of the org tree and the role assignments in effect on one date.
/// Units are addressed by id; roles are a separate relation over them.
pub struct OrgChart {
    units: HashMap<i64, OrgUnit>,
    assignments: Vec<RoleAssignment>,
}

impl OrgChart {
    pub fn new(units: Vec<OrgUnit>, assignments: Vec<RoleAssignment>) -> Self {
        Self {
            units: units.into_iter().map(|u| (u.id, u)).collect(),
            assignments,
        }
    }

    pub async fn load(conn: &mut SqliteConnection, as_of: NaiveDate) -> LeaveResult<Self> {
        let units = directory::org_units(conn).await?;
        let assignments = directory::all_assignments_on(conn, as_of).await?;
        Ok(Self::new(units, assignments))
    }

    /// Whether the employee holds `role` in any unit.
    fn holds(&self, employee_id: i64, role: RoleCode) -> bool {
        self.assignments
            .iter()
            .any(|a| a.employee_id == employee_id && a.role() == Some(role))
    }

    /// Holder of the first role in `roles` (in order) assigned in `unit`,
    /// lowest employee id first, never `exclude`.
    fn holder_in(&self, unit: i64, roles: &[RoleCode], exclude: i64) -> Option<PlannedStep> {
        roles.iter().find_map(|&role| {
            self.assignments
                .iter()
                .filter(|a| a.org_unit_id == unit && a.employee_id != exclude && a.role() == Some(role))
                .map(|a| a.employee_id)
                .min()
                .map(|approver_employee_id| PlannedStep {
                    role,
                    approver_employee_id,
                })
        })
    }

    /// Looks in `unit`, then (with `walk_up`) each ancestor in turn. Parent
    /// links are operator data, so a cycle simply ends the walk.
    pub fn find_role_holder(
        &self,
        unit: i64,
        roles: &[RoleCode],
        walk_up: bool,
        exclude: i64,
    ) -> Option<PlannedStep> {
        let mut visited = HashSet::new();
        let mut current = Some(unit);
        while let Some(id) = current {
            if !visited.insert(id) {
                tracing::warn!(org_unit_id = id, "Cycle in org-unit parent chain");
                break;
            }
            if let Some(found) = self.holder_in(id, roles, exclude) {
                return Some(found);
            }
            if !walk_up {
                break;
            }
            current = self.units.get(&id).and_then(|u| u.parent_id);
        }
        None
    }

    pub fn find_president(&self, exclude: i64) -> Option<PlannedStep> {
        self.assignments
            .iter()
            .filter(|a| a.employee_id != exclude && a.role() == Some(RoleCode::President))
            .map(|a| a.employee_id)
            .min()
            .map(|approver_employee_id| PlannedStep {
                role: RoleCode::President,
                approver_employee_id,
            })
    }

    /// President when the unit reports straight to them, otherwise the
    /// nearest VP up the tree, falling back to the president.
    fn senior_step(&self, unit: i64, requester: i64) -> Option<PlannedStep> {
        let reports_to_president = self
            .units
            .get(&unit)
            .is_some_and(|u| u.reports_to_president);
        if reports_to_president {
            return self.find_president(requester);
        }
        self.find_role_holder(unit, &[RoleCode::Vp], true, requester)
            .or_else(|| self.find_president(requester))
    }

    /// Ordered approval chain for `requester` filing from `unit`.
    pub fn plan_steps(&self, requester: i64, unit: i64) -> Vec<PlannedStep> {
        let planned: Vec<Option<PlannedStep>> = if self.holds(requester, RoleCode::President) {
            vec![]
        } else if self.holds(requester, RoleCode::Vp) {
            vec![
                self.find_role_holder(unit, &[RoleCode::President], true, requester)
                    .or_else(|| self.find_president(requester)),
            ]
        } else if self.assignments.iter().any(|a| {
            a.employee_id == requester
                && a.org_unit_id == unit
                && a.role().is_some_and(RoleCode::is_head_level)
        }) {
            vec![self.senior_step(unit, requester)]
        } else {
            vec![
                self.find_role_holder(unit, &RoleCode::HEAD_LEVEL, false, requester),
                self.senior_step(unit, requester),
            ]
        };

        let mut steps: Vec<PlannedStep> = Vec::new();
        for step in planned.into_iter().flatten() {
            if steps
                .last()
                .is_some_and(|prev| prev.approver_employee_id == step.approver_employee_id)
            {
                continue;
            }
            steps.push(step);
        }
        steps
    }
}

/// Resolves the chain for `request` from the org structure on its start date.
pub async fn build_steps(
    conn: &mut SqliteConnection,
    request: &LeaveRequest,
) -> LeaveResult<Vec<PlannedStep>> {
    let Some(unit) = directory::org_unit_of(conn, request.employee_id, request.start_date).await? else {
        tracing::warn!(
            request_id = request.id,
            employee_id = request.employee_id,
            "Filer has no org unit on leave start; no approval steps"
        );
        return Ok(vec![]);
    };
    let chart = OrgChart::load(conn, request.start_date).await?;
    let steps = chart.plan_steps(request.employee_id, unit);
    tracing::debug!(request_id = request.id, org_unit_id = unit, ?steps, "Resolved approval chain");
    Ok(steps)
}

/// Stores the chain with `step_order` starting at 1.
pub async fn persist_steps(
    conn: &mut SqliteConnection,
    request_id: i64,
    steps: &[PlannedStep],
) -> LeaveResult<()> {
    for (index, step) in steps.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO leave_approval_steps
                (leave_request_id, step_order, approver_role, approver_employee_id, status)
            VALUES (?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(request_id)
        .bind(index as i64 + 1)
        .bind(step.role.as_ref())
        .bind(step.approver_employee_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn steps_for(conn: &mut SqliteConnection, request_id: i64) -> LeaveResult<Vec<ApprovalStep>> {
    let steps = sqlx::query_as::<_, ApprovalStep>(
        r#"
        SELECT id, leave_request_id, step_order, approver_role, approver_employee_id, status, acted_at, remarks
        FROM leave_approval_steps
        WHERE leave_request_id = ?
        ORDER BY step_order
        "#,
    )
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn unit(id: i64, parent_id: Option<i64>, reports_to_president: bool) -> OrgUnit {
        OrgUnit {
            id,
            name: format!("unit-{id}"),
            parent_id,
            reports_to_president,
        }
    }

    fn assign(id: i64, employee_id: i64, org_unit_id: i64, role: &str) -> RoleAssignment {
        RoleAssignment {
            id,
            employee_id,
            org_unit_id,
            role_code: role.to_string(),
            valid_from: start(),
            valid_to: None,
        }
    }

    /// University (1) > Academic Affairs (2) > College of Science (3) > Physics (4).
    /// Registrar (5) sits under the university and reports to the president.
    fn chart() -> OrgChart {
        OrgChart::new(
            vec![
                unit(1, None, false),
                unit(2, Some(1), false),
                unit(3, Some(2), false),
                unit(4, Some(3), false),
                unit(5, Some(1), true),
            ],
            vec![
                assign(1, 100, 1, "PRESIDENT"),
                assign(2, 200, 2, "VP"),
                assign(3, 300, 3, "DEAN"),
                assign(4, 400, 4, "UNIT_HEAD"),
                assign(5, 401, 4, "STAFF"),
                assign(6, 500, 5, "DIRECTOR"),
                assign(7, 501, 5, "STAFF"),
            ],
        )
    }

    fn approvers(steps: &[PlannedStep]) -> Vec<(RoleCode, i64)> {
        steps.iter().map(|s| (s.role, s.approver_employee_id)).collect()
    }

    #[test]
    fn staff_goes_to_unit_head_then_nearest_vp() {
        let steps = chart().plan_steps(401, 4);
        assert_eq!(approvers(&steps), vec![(RoleCode::UnitHead, 400), (RoleCode::Vp, 200)]);
    }

    #[test]
    fn unit_head_goes_straight_to_vp() {
        let steps = chart().plan_steps(400, 4);
        assert_eq!(approvers(&steps), vec![(RoleCode::Vp, 200)]);
    }

    #[test]
    fn president_reporting_unit_skips_vp() {
        assert_eq!(
            approvers(&chart().plan_steps(501, 5)),
            vec![(RoleCode::Director, 500), (RoleCode::President, 100)]
        );
        assert_eq!(
            approvers(&chart().plan_steps(500, 5)),
            vec![(RoleCode::President, 100)]
        );
    }

    #[test]
    fn vp_routes_to_president_and_president_self_approves() {
        assert_eq!(approvers(&chart().plan_steps(200, 2)), vec![(RoleCode::President, 100)]);
        assert!(chart().plan_steps(100, 1).is_empty());
    }

    #[test]
    fn missing_head_is_omitted() {
        let mut c = chart();
        c.assignments.retain(|a| a.role_code != "UNIT_HEAD");
        assert_eq!(approvers(&c.plan_steps(401, 4)), vec![(RoleCode::Vp, 200)]);
    }

    #[test]
    fn no_vp_anywhere_falls_back_to_president() {
        let mut c = chart();
        c.assignments.retain(|a| a.role_code != "VP");
        assert_eq!(
            approvers(&c.plan_steps(401, 4)),
            vec![(RoleCode::UnitHead, 400), (RoleCode::President, 100)]
        );
    }

    #[test]
    fn parent_cycle_ends_the_walk() {
        let c = OrgChart::new(
            vec![unit(1, Some(2), false), unit(2, Some(1), false)],
            vec![assign(1, 10, 1, "STAFF"), assign(2, 99, 7, "PRESIDENT")],
        );
        assert!(c.find_role_holder(1, &[RoleCode::Vp], true, 10).is_none());
        assert_eq!(approvers(&c.plan_steps(10, 1)), vec![(RoleCode::President, 99)]);
    }

    #[test]
    fn filer_is_never_their_own_approver() {
        let mut c = chart();
        // 401 is also the acting head of Physics alongside 400
        c.assignments.push(assign(8, 401, 4, "UNIT_HEAD"));
        c.assignments.retain(|a| a.employee_id != 400);
        assert_eq!(approvers(&c.plan_steps(401, 4)), vec![(RoleCode::Vp, 200)]);
    }
}
