use crate::auth::auth::AuthUser;
use crate::leave::LeaveService;
use crate::leave::posting::PostingOutcome;
use crate::leave::requests::{DraftChanges, LeaveDraft, RequestFilter};
use crate::model::leave_request::{
    ApprovalStep, LeaveRequest, LeaveStatus, PartDay, SupportingDocument,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Required when an officer files on behalf of an employee
    #[schema(example = 1000)]
    pub employee_id: Option<i64>,
    #[schema(example = 4)]
    pub school_year_id: i64,
    #[schema(example = 2)]
    pub leave_type_id: i64,
    #[schema(example = 1, nullable = true)]
    pub charge_to_leave_type_id: Option<i64>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    /// Exclusive
    #[schema(example = "2026-03-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(nullable = true)]
    pub part_day: Option<PartDay>,
    #[schema(example = "Flu", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(example = 2)]
    pub leave_type_id: Option<i64>,
    #[schema(nullable = true)]
    pub charge_to_leave_type_id: Option<i64>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-03-05", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    #[schema(nullable = true)]
    pub part_day: Option<PartDay>,
    #[schema(nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AttachDocument {
    #[schema(example = "med_cert")]
    pub doc_type: String,
    #[schema(example = "clinic-note.pdf")]
    pub file_name: String,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct DecisionPayload {
    #[schema(example = "Enjoy the break", nullable = true)]
    pub remarks: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct PostPayload {
    /// Leave type to charge instead of the filed one
    #[schema(example = 1, nullable = true)]
    pub charge_to_leave_type_id: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveDetailResponse {
    pub request: LeaveRequest,
    pub steps: Vec<ApprovalStep>,
    pub documents: Vec<SupportingDocument>,
}

#[derive(Serialize, ToSchema)]
pub struct PostingResponse {
    pub request: LeaveRequest,
    #[schema(example = "SL")]
    pub charged_leave_type: String,
    #[schema(example = 3.0)]
    pub units: f64,
    #[schema(example = 7.0, nullable = true)]
    pub remaining_balance: Option<f64>,
    #[schema(example = 12)]
    pub booking_id: i64,
}

impl From<PostingOutcome> for PostingResponse {
    fn from(o: PostingOutcome) -> Self {
        Self {
            request: o.request,
            charged_leave_type: o.charged_leave_type.code,
            units: o.units,
            remaining_balance: o.remaining_balance,
            booking_id: o.booking.id,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID (officers only)
    pub employee_id: Option<i64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u32>,
}

/* =========================
Create leave draft
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(content = CreateLeave, content_type = "application/json"),
    responses(
        (status = 201, description = "Draft created", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid period")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let employee_id = match payload.employee_id {
        Some(id) => id,
        None => auth.require_employee()?,
    };

    let draft = LeaveDraft {
        employee_id,
        school_year_id: payload.school_year_id,
        leave_type_id: payload.leave_type_id,
        charge_to_leave_type_id: payload.charge_to_leave_type_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        part_day: payload.part_day,
        reason: payload.reason,
    };
    let request = service.create_draft(auth.actor(), draft).await?;
    Ok(HttpResponse::Created().json(request))
}

/* =========================
Edit a draft
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the draft to edit")),
    request_body(content = UpdateLeave, description = "Absent fields are kept; null clears", content_type = "application/json"),
    responses(
        (status = 200, description = "Draft updated", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request is no longer a draft")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
    payload: web::Json<DraftChanges>,
) -> actix_web::Result<impl Responder> {
    let request = service
        .update_draft(auth.actor(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    post,
    path = "/api/leave/{leave_id}/documents",
    params(("leave_id" = i64, Path, description = "ID of the leave request")),
    request_body(content = AttachDocument, content_type = "application/json"),
    responses(
        (status = 201, description = "Document recorded", body = SupportingDocument),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn attach_document(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
    payload: web::Json<AttachDocument>,
) -> actix_web::Result<impl Responder> {
    let doc = service
        .attach_document(auth.actor(), path.into_inner(), &payload.doc_type, &payload.file_name)
        .await?;
    Ok(HttpResponse::Created().json(doc))
}

/* =========================
Submit for approval
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/submit",
    params(("leave_id" = i64, Path, description = "ID of the draft to submit")),
    responses(
        (status = 200, description = "Submitted; approval chain created", body = LeaveRequest),
        (status = 409, description = "Capacity exceeded or not a draft", body = Object, example = json!({
            "message": "staffing capacity exceeded: Exam week: 2 on leave, limit 2",
            "reasons": ["Exam week: 2 on leave, limit 2"]
        })),
        (status = 422, description = "Validation failed", body = Object, example = json!({
            "message": "SL requires a medical certificate",
            "field": "med_cert"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let request = service.submit(auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Approve / reject (current approver)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = i64, Path, description = "ID of the leave request to approve")),
    request_body(content = DecisionPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Step approved", body = LeaveRequest),
        (status = 403, description = "Caller is not the active approver"),
        (status = 409, description = "Already decided or capacity exceeded")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
    payload: Option<web::Json<DecisionPayload>>,
) -> actix_web::Result<impl Responder> {
    let remarks = payload.and_then(|p| p.into_inner().remarks);
    let request = service.approve(auth.actor(), path.into_inner(), remarks).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = i64, Path, description = "ID of the leave request to reject")),
    request_body(content = DecisionPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 403, description = "Caller is not the active approver"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
    payload: Option<web::Json<DecisionPayload>>,
) -> actix_web::Result<impl Responder> {
    let remarks = payload.and_then(|p| p.into_inner().remarks);
    let request = service.reject(auth.actor(), path.into_inner(), remarks).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(("leave_id" = i64, Path, description = "ID of the leave request to cancel")),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 409, description = "Request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let request = service.cancel(auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Post approved leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/post",
    params(("leave_id" = i64, Path, description = "ID of the approved leave request")),
    request_body(content = PostPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Ledger debited and leave booked", body = PostingResponse),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Not approved, insufficient balance or overlapping booking", body = Object, example = json!({
            "message": "leave request 12 status is not approved (found posted)"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn post_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
    payload: Option<web::Json<PostPayload>>,
) -> actix_web::Result<impl Responder> {
    auth.require_leave_officer()?;
    let charge_to = payload.and_then(|p| p.into_inner().charge_to_leave_type_id);
    let outcome = service.post(auth.actor(), path.into_inner(), charge_to).await?;
    Ok(HttpResponse::Ok().json(PostingResponse::from(outcome)))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request 12 not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    let detail = service.detail(path.into_inner()).await?;

    let caller = auth.employee_id;
    let involved = caller == Some(detail.request.employee_id)
        || detail
            .steps
            .iter()
            .any(|s| Some(s.approver_employee_id) == caller);
    if !involved {
        auth.require_leave_officer()?;
    }

    Ok(HttpResponse::Ok().json(LeaveDetailResponse {
        request: detail.request,
        steps: detail.steps,
        documents: detail.documents,
    }))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();

    // Employees only see their own requests
    let employee_id = if auth.role.is_leave_officer() {
        query.employee_id
    } else {
        Some(auth.require_employee()?)
    };

    let filter = RequestFilter {
        employee_id,
        status: query.status,
        page: query.page,
        per_page: query.per_page,
    };
    let (data, total, page, per_page) = service.list(&filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}
