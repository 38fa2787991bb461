use crate::api::balance::{BalanceAdjustment, BalanceQuery, BalanceResponse};
use crate::api::leave_request::{
    AttachDocument, CreateLeave, DecisionPayload, LeaveDetailResponse, LeaveFilter,
    LeaveListResponse, PostPayload, PostingResponse, UpdateLeave,
};
use crate::model::leave_request::{
    ApprovalStep, LeaveRequest, LeaveStatus, PartDay, StepStatus, SupportingDocument,
};
use crate::model::ledger::LedgerEntry;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management

Leave requests move through a fixed lifecycle:
`draft → submitted → under_review → approved → posted`, with `rejected` and `cancelled` as exits.

### 🔹 Key Features
- **Requests**
  - Draft, edit, attach supporting documents, submit, cancel
- **Approvals**
  - Approval chain derived from the org chart; only the active approver can act
- **Staffing capacity**
  - Count and percentage caps per staffing window, checked at submit and final approval
- **Balances**
  - Append-only ledger; posting debits the balance and books the dates atomically

### 🔐 Security
Endpoints expect a **JWT Bearer** access token issued by the identity service.
Posting and balance adjustments are limited to **HR** and **Admin**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::attach_document,
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::post_leave,

        crate::api::balance::get_balance,
        crate::api::balance::adjust_balance
    ),
    components(
        schemas(
            CreateLeave,
            UpdateLeave,
            AttachDocument,
            DecisionPayload,
            PostPayload,
            LeaveFilter,
            LeaveRequest,
            LeaveStatus,
            PartDay,
            ApprovalStep,
            StepStatus,
            SupportingDocument,
            LeaveDetailResponse,
            LeaveListResponse,
            PostingResponse,
            BalanceQuery,
            BalanceResponse,
            BalanceAdjustment,
            LedgerEntry
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Balance", description = "Leave balance and ledger APIs"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
