//! Leave-request rows: drafts, documents, status transitions and listing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use sqlx::SqliteConnection;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, PartDay, SupportingDocument};
use crate::model::period::DateRange;

const REQUEST_COLUMNS: &str = r#"
    id, employee_id, school_year_id, leave_type_id, charge_to_leave_type_id,
    start_date, end_date, part_day, reason, status,
    submitted_at, decided_at, posted_at, created_at
"#;

#[derive(Debug, Clone)]
pub struct LeaveDraft {
    pub employee_id: i64,
    pub school_year_id: i64,
    pub leave_type_id: i64,
    pub charge_to_leave_type_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub part_day: Option<PartDay>,
    pub reason: Option<String>,
}

/// Field edits allowed while a request is still a draft. An explicit `null`
/// clears a nullable field; an absent field keeps it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftChanges {
    pub leave_type_id: Option<i64>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub charge_to_leave_type_id: Option<Option<i64>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub part_day: Option<Option<PartDay>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub reason: Option<Option<String>>,
}

fn explicit_null<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

pub fn ensure_status(request: &LeaveRequest, expected: LeaveStatus) -> LeaveResult<()> {
    if request.status != expected {
        return Err(LeaveError::InvalidState {
            request_id: request.id,
            expected: expected.to_string(),
            actual: request.status.to_string(),
        });
    }
    Ok(())
}

fn validate_period(start: NaiveDate, end: NaiveDate) -> LeaveResult<DateRange> {
    DateRange::new(start, end)
        .ok_or_else(|| LeaveError::validation("end_date", "end_date must be after start_date"))
}

pub async fn fetch(conn: &mut SqliteConnection, request_id: i64) -> LeaveResult<LeaveRequest> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| LeaveError::not_found(format!("leave request {request_id}")))
}

pub async fn insert_draft(
    conn: &mut SqliteConnection,
    draft: &LeaveDraft,
    now: DateTime<Utc>,
) -> LeaveResult<i64> {
    validate_period(draft.start_date, draft.end_date)?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, school_year_id, leave_type_id, charge_to_leave_type_id,
             start_date, end_date, part_day, reason, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(draft.employee_id)
    .bind(draft.school_year_id)
    .bind(draft.leave_type_id)
    .bind(draft.charge_to_leave_type_id)
    .bind(draft.start_date)
    .bind(draft.end_date)
    .bind(draft.part_day)
    .bind(draft.reason.as_deref())
    .bind(LeaveStatus::Draft)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_draft(
    conn: &mut SqliteConnection,
    request_id: i64,
    changes: DraftChanges,
) -> LeaveResult<LeaveRequest> {
    let current = fetch(conn, request_id).await?;
    ensure_status(&current, LeaveStatus::Draft)?;

    let start_date = changes.start_date.unwrap_or(current.start_date);
    let end_date = changes.end_date.unwrap_or(current.end_date);
    validate_period(start_date, end_date)?;

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET leave_type_id = ?, charge_to_leave_type_id = ?, start_date = ?, end_date = ?,
            part_day = ?, reason = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(changes.leave_type_id.unwrap_or(current.leave_type_id))
    .bind(changes.charge_to_leave_type_id.unwrap_or(current.charge_to_leave_type_id))
    .bind(start_date)
    .bind(end_date)
    .bind(changes.part_day.unwrap_or(current.part_day))
    .bind(changes.reason.unwrap_or(current.reason))
    .bind(request_id)
    .bind(LeaveStatus::Draft)
    .execute(&mut *conn)
    .await?;

    fetch(conn, request_id).await
}

pub async fn attach_document(
    conn: &mut SqliteConnection,
    request_id: i64,
    doc_type: &str,
    file_name: &str,
    now: DateTime<Utc>,
) -> LeaveResult<SupportingDocument> {
    let result = sqlx::query(
        r#"
        INSERT INTO leave_request_documents (leave_request_id, doc_type, file_name, uploaded_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(request_id)
    .bind(doc_type)
    .bind(file_name)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(SupportingDocument {
        id: result.last_insert_rowid(),
        leave_request_id: request_id,
        doc_type: doc_type.to_string(),
        file_name: file_name.to_string(),
        uploaded_at: now,
    })
}

pub async fn documents(conn: &mut SqliteConnection, request_id: i64) -> LeaveResult<Vec<SupportingDocument>> {
    let docs = sqlx::query_as::<_, SupportingDocument>(
        r#"
        SELECT id, leave_request_id, doc_type, file_name, uploaded_at
        FROM leave_request_documents
        WHERE leave_request_id = ?
        ORDER BY id
        "#,
    )
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(docs)
}

/// Moves the request from its loaded status to `to`, stamping the column that belongs
/// to the target state. Fails if another writer moved it first.
pub async fn transition(
    conn: &mut SqliteConnection,
    request: &LeaveRequest,
    to: LeaveStatus,
    now: DateTime<Utc>,
) -> LeaveResult<()> {
    let stamp = match to {
        LeaveStatus::Submitted => Some("submitted_at"),
        LeaveStatus::Approved | LeaveStatus::Rejected | LeaveStatus::Cancelled => Some("decided_at"),
        LeaveStatus::Posted => Some("posted_at"),
        LeaveStatus::Draft | LeaveStatus::UnderReview => None,
    };
    let sql = match stamp {
        Some(column) => {
            format!("UPDATE leave_requests SET status = ?, {column} = ? WHERE id = ? AND status = ?")
        }
        None => "UPDATE leave_requests SET status = ? WHERE id = ? AND status = ?".to_string(),
    };

    let mut query = sqlx::query(&sql).bind(to);
    if stamp.is_some() {
        query = query.bind(now);
    }
    let result = query
        .bind(request.id)
        .bind(request.status)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        let actual = fetch(conn, request.id).await?;
        return Err(LeaveError::InvalidState {
            request_id: request.id,
            expected: request.status.to_string(),
            actual: actual.status.to_string(),
        });
    }

    tracing::info!(
        request_id = request.id,
        from = %request.status,
        to = %to,
        "Leave request status changed"
    );
    Ok(())
}

pub async fn set_charge_to(
    conn: &mut SqliteConnection,
    request_id: i64,
    charge_to_leave_type_id: i64,
) -> LeaveResult<()> {
    sqlx::query("UPDATE leave_requests SET charge_to_leave_type_id = ? WHERE id = ?")
        .bind(charge_to_leave_type_id)
        .bind(request_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    pub employee_id: Option<i64>,
    pub status: Option<LeaveStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// Helper enum for typed SQLx binding
enum FilterValue {
    I64(i64),
    Status(LeaveStatus),
}

/// One page of requests, newest first, with the total match count.
pub async fn list(
    conn: &mut SqliteConnection,
    filter: &RequestFilter,
) -> LeaveResult<(Vec<LeaveRequest>, i64, u32, u32)> {
    let per_page = filter.per_page.unwrap_or(10).clamp(1, 100);
    let page = filter.page.unwrap_or(1).max(1);
    let offset = i64::from(page - 1) * i64::from(per_page);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::I64(employee_id));
    }

    if let Some(status) = filter.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Status(status));
    }

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::I64(v) => count_q.bind(*v),
            FilterValue::Status(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(&mut *conn).await?;

    let data_sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::I64(v) => data_q.bind(v),
            FilterValue::Status(s) => data_q.bind(s),
        };
    }
    let rows = data_q
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

    Ok((rows, total, page, per_page))
}
