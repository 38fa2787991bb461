//! The request lifecycle: draft → submitted → under_review → approved →
//! posted, with rejected and cancelled as off-ramps.

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};

use crate::config::LeaveConfig;
use crate::db;
use crate::error::{LeaveError, LeaveResult};
use crate::leave::approver::{self, PlannedStep};
use crate::leave::clock::Clock;
use crate::leave::notify::{LeaveEvent, LeaveNotifier};
use crate::leave::posting::{self, PostingOutcome};
use crate::leave::requests::{self, DraftChanges, LeaveDraft, RequestFilter};
use crate::leave::{catalog, ledger, validation};
use crate::model::leave_request::{
    ApprovalStep, LeaveRequest, LeaveStatus, StepStatus, SupportingDocument,
};
use crate::model::leave_type::LeaveType;
use crate::model::ledger::{LedgerEntry, NewLedgerEntry, REASON_ADJUSTMENT};

/// Who is acting on a request.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub employee_id: Option<i64>,
    /// HR/Admin/System: may act on other people's requests.
    pub is_officer: bool,
}

impl Actor {
    pub fn employee(employee_id: i64) -> Self {
        Self {
            employee_id: Some(employee_id),
            is_officer: false,
        }
    }

    pub fn officer(employee_id: Option<i64>) -> Self {
        Self {
            employee_id,
            is_officer: true,
        }
    }

    fn is(&self, employee_id: i64) -> bool {
        self.employee_id == Some(employee_id)
    }
}

#[derive(Debug, Clone)]
pub struct RequestDetail {
    pub request: LeaveRequest,
    pub steps: Vec<ApprovalStep>,
    pub documents: Vec<SupportingDocument>,
}

#[derive(Clone)]
pub struct LeaveService {
    pool: SqlitePool,
    config: LeaveConfig,
    notifier: Arc<dyn LeaveNotifier>,
    clock: Arc<dyn Clock>,
}

impl LeaveService {
    pub fn new(
        pool: SqlitePool,
        config: LeaveConfig,
        notifier: Arc<dyn LeaveNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            config,
            notifier,
            clock,
        }
    }

    /* =========================
    Drafts
    ========================= */

    pub async fn create_draft(&self, actor: Actor, draft: LeaveDraft) -> LeaveResult<LeaveRequest> {
        if !actor.is(draft.employee_id) && !actor.is_officer {
            return Err(LeaveError::Forbidden(
                "cannot file leave for another employee".into(),
            ));
        }
        let mut conn = self.pool.acquire().await?;
        catalog::leave_type(&mut conn, draft.leave_type_id).await?;
        let id = requests::insert_draft(&mut conn, &draft, self.clock.now()).await?;
        tracing::info!(request_id = id, employee_id = draft.employee_id, "Leave draft created");
        requests::fetch(&mut conn, id).await
    }

    pub async fn update_draft(
        &self,
        actor: Actor,
        request_id: i64,
        changes: DraftChanges,
    ) -> LeaveResult<LeaveRequest> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch(&mut conn, request_id).await?;
        self.ensure_filer(&actor, &request)?;
        if let Some(leave_type_id) = changes.leave_type_id {
            catalog::leave_type(&mut conn, leave_type_id).await?;
        }
        let mut tx = db::begin_immediate(&mut conn).await?;
        let result = requests::update_draft(&mut tx, request_id, changes).await;
        db::finish(tx, result).await
    }

    pub async fn attach_document(
        &self,
        actor: Actor,
        request_id: i64,
        doc_type: &str,
        file_name: &str,
    ) -> LeaveResult<SupportingDocument> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch(&mut conn, request_id).await?;
        self.ensure_filer(&actor, &request)?;
        if !matches!(request.status, LeaveStatus::Draft) && !request.status.is_pending_decision() {
            return Err(LeaveError::InvalidState {
                request_id,
                expected: "draft or awaiting decision".into(),
                actual: request.status.to_string(),
            });
        }
        requests::attach_document(&mut conn, request_id, doc_type, file_name, self.clock.now()).await
    }

    /* =========================
    Submission
    ========================= */

    /// Validates, moves the request to `submitted` and materializes its
    /// approval chain. An empty chain approves the request on the spot.
    /// The checks and the transition share one write transaction.
    pub async fn submit(&self, actor: Actor, request_id: i64) -> LeaveResult<LeaveRequest> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch(&mut conn, request_id).await?;
        self.ensure_filer(&actor, &request)?;

        let mut tx = db::begin_immediate(&mut conn).await?;
        let result = self.submit_locked(&mut tx, request_id).await;
        let (request, steps) = db::finish(tx, result).await?;

        let leave_type = catalog::leave_type(&mut conn, request.leave_type_id).await?;
        self.emit_status(&request, &leave_type);
        match steps.first() {
            Some(first) => self.emit_approver_needed(&request, &leave_type, first.approver_employee_id),
            None => {
                if self.config.auto_post_on_approval {
                    return self.auto_post(&mut conn, request).await;
                }
            }
        }
        Ok(request)
    }

    async fn submit_locked(
        &self,
        conn: &mut SqliteConnection,
        request_id: i64,
    ) -> LeaveResult<(LeaveRequest, Vec<PlannedStep>)> {
        if let Err(e) =
            validation::validate_before_submit(conn, &self.config, self.clock.today(), request_id).await
        {
            tracing::warn!(request_id, error = %e, "Leave submission rejected");
            return Err(e);
        }
        let request = requests::fetch(conn, request_id).await?;
        self.open_chain(conn, request).await
    }

    async fn open_chain(
        &self,
        conn: &mut SqliteConnection,
        request: LeaveRequest,
    ) -> LeaveResult<(LeaveRequest, Vec<PlannedStep>)> {
        let now = self.clock.now();
        requests::transition(conn, &request, LeaveStatus::Submitted, now).await?;
        let submitted = requests::fetch(conn, request.id).await?;

        let steps = approver::build_steps(conn, &submitted).await?;
        approver::persist_steps(conn, submitted.id, &steps).await?;

        if steps.is_empty() {
            requests::transition(conn, &submitted, LeaveStatus::Approved, now).await?;
        }
        Ok((requests::fetch(conn, request.id).await?, steps))
    }

    /* =========================
    Approval actions
    ========================= */

    /// Approves the active step. The final approval re-checks capacity when
    /// configured, then approves the request (and posts it when auto-post is on).
    pub async fn approve(
        &self,
        actor: Actor,
        request_id: i64,
        remarks: Option<String>,
    ) -> LeaveResult<LeaveRequest> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = db::begin_immediate(&mut conn).await?;
        let result = self.approve_locked(&mut tx, &actor, request_id, remarks).await;
        let (request, next) = db::finish(tx, result).await?;

        let leave_type = catalog::leave_type(&mut conn, request.leave_type_id).await?;
        self.emit_status(&request, &leave_type);
        if let Some(next) = next {
            self.emit_approver_needed(&request, &leave_type, next.approver_employee_id);
            return Ok(request);
        }
        if self.config.auto_post_on_approval {
            return self.auto_post(&mut conn, request).await;
        }
        Ok(request)
    }

    async fn approve_locked(
        &self,
        conn: &mut SqliteConnection,
        actor: &Actor,
        request_id: i64,
        remarks: Option<String>,
    ) -> LeaveResult<(LeaveRequest, Option<ApprovalStep>)> {
        let (request, steps, active) = self.active_step(conn, actor, request_id).await?;
        let next = steps
            .iter()
            .find(|s| s.step_order > active.step_order && s.status == StepStatus::Pending)
            .cloned();

        if next.is_none() {
            if let Err(e) = validation::validate_at_approval(conn, &self.config, request_id).await {
                tracing::warn!(request_id, error = %e, "Final approval blocked");
                return Err(e);
            }
        }

        let request = self
            .record_decision(conn, &request, &active, StepStatus::Approved, remarks, next.is_some())
            .await?;
        Ok((request, next))
    }

    /// Rejecting any step rejects the request and halts the chain.
    pub async fn reject(
        &self,
        actor: Actor,
        request_id: i64,
        remarks: Option<String>,
    ) -> LeaveResult<LeaveRequest> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = db::begin_immediate(&mut conn).await?;
        let result = match self.active_step(&mut tx, &actor, request_id).await {
            Ok((request, _, active)) => {
                self.record_decision(&mut tx, &request, &active, StepStatus::Rejected, remarks, false)
                    .await
            }
            Err(e) => Err(e),
        };
        let request = db::finish(tx, result).await?;

        let leave_type = catalog::leave_type(&mut conn, request.leave_type_id).await?;
        self.emit_status(&request, &leave_type);
        Ok(request)
    }

    /// Cancels a request still awaiting a decision. Pending steps stay inert.
    pub async fn cancel(&self, actor: Actor, request_id: i64) -> LeaveResult<LeaveRequest> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch(&mut conn, request_id).await?;
        self.ensure_filer(&actor, &request)?;
        if !request.status.is_pending_decision() {
            return Err(LeaveError::InvalidState {
                request_id,
                expected: "submitted or under_review".into(),
                actual: request.status.to_string(),
            });
        }

        requests::transition(&mut conn, &request, LeaveStatus::Cancelled, self.clock.now()).await?;
        let request = requests::fetch(&mut conn, request_id).await?;
        let leave_type = catalog::leave_type(&mut conn, request.leave_type_id).await?;
        self.emit_status(&request, &leave_type);
        Ok(request)
    }

    async fn active_step(
        &self,
        conn: &mut SqliteConnection,
        actor: &Actor,
        request_id: i64,
    ) -> LeaveResult<(LeaveRequest, Vec<ApprovalStep>, ApprovalStep)> {
        let request = requests::fetch(conn, request_id).await?;
        if !request.status.is_pending_decision() {
            return Err(LeaveError::InvalidState {
                request_id,
                expected: "submitted or under_review".into(),
                actual: request.status.to_string(),
            });
        }
        let steps = approver::steps_for(conn, request_id).await?;
        let active = steps
            .iter()
            .find(|s| s.status == StepStatus::Pending)
            .cloned()
            .ok_or_else(|| LeaveError::not_found(format!("pending approval step for request {request_id}")))?;
        if !actor.is(active.approver_employee_id) {
            return Err(LeaveError::Forbidden(format!(
                "step {} of request {request_id} awaits employee {}",
                active.step_order, active.approver_employee_id
            )));
        }
        Ok((request, steps, active))
    }

    async fn record_decision(
        &self,
        conn: &mut SqliteConnection,
        request: &LeaveRequest,
        step: &ApprovalStep,
        decision: StepStatus,
        remarks: Option<String>,
        more_steps: bool,
    ) -> LeaveResult<LeaveRequest> {
        let now = self.clock.now();
        let updated = sqlx::query(
            r#"
            UPDATE leave_approval_steps
            SET status = ?, acted_at = ?, remarks = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(decision)
        .bind(now)
        .bind(remarks)
        .bind(step.id)
        .bind(StepStatus::Pending)
        .execute(&mut *conn)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(LeaveError::InvalidState {
                request_id: request.id,
                expected: format!("step {} pending", step.step_order),
                actual: "already decided".into(),
            });
        }

        let next_status = match decision {
            StepStatus::Rejected => LeaveStatus::Rejected,
            _ if more_steps => LeaveStatus::UnderReview,
            _ => LeaveStatus::Approved,
        };
        if next_status != request.status {
            requests::transition(conn, request, next_status, now).await?;
        }
        requests::fetch(conn, request.id).await
    }

    /* =========================
    Posting
    ========================= */

    pub async fn post(
        &self,
        actor: Actor,
        request_id: i64,
        charge_to_override: Option<i64>,
    ) -> LeaveResult<PostingOutcome> {
        if !actor.is_officer {
            return Err(LeaveError::Forbidden("HR/Admin only".into()));
        }
        let mut conn = self.pool.acquire().await?;
        self.post_on(&mut conn, request_id, charge_to_override).await
    }

    async fn post_on(
        &self,
        conn: &mut SqliteConnection,
        request_id: i64,
        charge_to_override: Option<i64>,
    ) -> LeaveResult<PostingOutcome> {
        let outcome =
            posting::post(conn, &self.config, request_id, charge_to_override, self.clock.now()).await?;

        self.emit_status(&outcome.request, &outcome.charged_leave_type);
        if let Some(remaining) = outcome.remaining_balance {
            if outcome.units > 0.0 && remaining <= self.config.low_balance_threshold {
                self.notifier.notify(LeaveEvent::BalanceThreshold {
                    employee_id: outcome.request.employee_id,
                    school_year_id: outcome.request.school_year_id,
                    leave_type: outcome.charged_leave_type.code.clone(),
                    remaining,
                    requested: outcome.units,
                });
            }
        }
        Ok(outcome)
    }

    /// Posting right after approval; integrity failures leave the request
    /// `approved` for an operator to resolve.
    async fn auto_post(&self, conn: &mut SqliteConnection, request: LeaveRequest) -> LeaveResult<LeaveRequest> {
        match self.post_on(conn, request.id, None).await {
            Ok(outcome) => Ok(outcome.request),
            Err(e) if e.is_integrity() => {
                tracing::warn!(request_id = request.id, error = %e, "Auto-post failed; request stays approved");
                Ok(request)
            }
            Err(e) => Err(e),
        }
    }

    /* =========================
    Balances
    ========================= */

    pub async fn balance(
        &self,
        employee_id: i64,
        school_year_id: i64,
        leave_type_id: i64,
    ) -> LeaveResult<f64> {
        let mut conn = self.pool.acquire().await?;
        catalog::leave_type(&mut conn, leave_type_id).await?;
        ledger::balance(&mut conn, employee_id, school_year_id, leave_type_id).await
    }

    pub async fn ledger_entries(
        &self,
        employee_id: i64,
        school_year_id: i64,
        leave_type_id: i64,
    ) -> LeaveResult<Vec<LedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        ledger::entries(&mut conn, employee_id, school_year_id, leave_type_id).await
    }

    /// Operator credit (positive) or debit (negative). A debit may not take a
    /// balance-counted type below zero.
    pub async fn adjust_balance(
        &self,
        actor: Actor,
        employee_id: i64,
        school_year_id: i64,
        leave_type_id: i64,
        qty_days: f64,
        note: Option<String>,
    ) -> LeaveResult<f64> {
        if !actor.is_officer {
            return Err(LeaveError::Forbidden("HR/Admin only".into()));
        }
        if !qty_days.is_finite() || qty_days == 0.0 {
            return Err(LeaveError::validation("qty_days", "adjustment must be a non-zero number of days"));
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = db::begin_immediate(&mut conn).await?;
        let result = self
            .adjust_locked(&mut tx, employee_id, school_year_id, leave_type_id, qty_days, note)
            .await;
        let balance = db::finish(tx, result).await?;
        tracing::info!(employee_id, school_year_id, leave_type_id, qty_days, balance, "Leave balance adjusted");
        Ok(balance)
    }

    async fn adjust_locked(
        &self,
        conn: &mut SqliteConnection,
        employee_id: i64,
        school_year_id: i64,
        leave_type_id: i64,
        qty_days: f64,
        note: Option<String>,
    ) -> LeaveResult<f64> {
        let leave_type: LeaveType = catalog::leave_type(conn, leave_type_id).await?;
        let balance = ledger::balance(conn, employee_id, school_year_id, leave_type_id).await?;
        if leave_type.counts_against_balance && qty_days < 0.0 {
            ledger::ensure_covers(balance, -qty_days)?;
        }
        let entry = NewLedgerEntry {
            employee_id,
            school_year_id,
            leave_type_id,
            qty_days,
            reason: REASON_ADJUSTMENT.to_string(),
            reference_id: None,
            metadata: note.map(|n| serde_json::json!({ "note": n })),
        };
        ledger::append(conn, &entry, self.clock.now()).await?;
        Ok(balance + qty_days)
    }

    /* =========================
    Reads
    ========================= */

    pub async fn detail(&self, request_id: i64) -> LeaveResult<RequestDetail> {
        let mut conn = self.pool.acquire().await?;
        Ok(RequestDetail {
            request: requests::fetch(&mut conn, request_id).await?,
            steps: approver::steps_for(&mut conn, request_id).await?,
            documents: requests::documents(&mut conn, request_id).await?,
        })
    }

    pub async fn list(&self, filter: &RequestFilter) -> LeaveResult<(Vec<LeaveRequest>, i64, u32, u32)> {
        let mut conn = self.pool.acquire().await?;
        requests::list(&mut conn, filter).await
    }

    /* =========================
    Helpers
    ========================= */

    fn ensure_filer(&self, actor: &Actor, request: &LeaveRequest) -> LeaveResult<()> {
        if actor.is(request.employee_id) || actor.is_officer {
            Ok(())
        } else {
            Err(LeaveError::Forbidden(format!(
                "leave request {} belongs to another employee",
                request.id
            )))
        }
    }

    fn emit_status(&self, request: &LeaveRequest, leave_type: &LeaveType) {
        self.notifier.notify(LeaveEvent::StatusChanged {
            request_id: request.id,
            employee_id: request.employee_id,
            status: request.status,
            leave_type: leave_type.code.clone(),
            dates: request.period().display_text(),
        });
    }

    fn emit_approver_needed(&self, request: &LeaveRequest, leave_type: &LeaveType, approver: i64) {
        self.notifier.notify(LeaveEvent::ApproverNeeded {
            request_id: request.id,
            approver_employee_id: approver,
            employee_id: request.employee_id,
            leave_type: leave_type.code.clone(),
            dates: request.period().display_text(),
        });
    }
}
