#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use hrm_leave::config::LeaveConfig;
use hrm_leave::db::init_db;
use hrm_leave::leave::clock::FixedClock;
use hrm_leave::leave::notify::RecordingNotifier;
use hrm_leave::leave::requests::LeaveDraft;
use hrm_leave::leave::{Actor, LeaveService};
use hrm_leave::model::leave_request::PartDay;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Monday 2026-03-02.
pub fn today() -> NaiveDate {
    d(2026, 3, 2)
}

/// A migrated on-disk database; the directory lives as long as this value.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> TestDb {
    test_db_with(4).await
}

pub async fn test_db_with(max_connections: u32) -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("leave.db").display());
    let pool = init_db(&url, max_connections).await.unwrap();
    TestDb { pool, _dir: dir }
}

pub fn service(pool: &SqlitePool, config: LeaveConfig) -> (LeaveService, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = LeaveService::new(
        pool.clone(),
        config,
        notifier.clone(),
        Arc::new(FixedClock::on(today())),
    );
    (service, notifier)
}

pub fn hr() -> Actor {
    Actor::officer(None)
}

/* =========================
Seed helpers
========================= */

pub async fn employee(pool: &SqlitePool, code: &str, birth_date: NaiveDate, class: Option<&str>) -> i64 {
    sqlx::query(
        "INSERT INTO employees (employee_code, first_name, last_name, birth_date, employment_class) VALUES (?, ?, 'Test', ?, ?)",
    )
    .bind(code)
    .bind(code)
    .bind(birth_date)
    .bind(class)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn org_unit(pool: &SqlitePool, name: &str, parent_id: Option<i64>, reports_to_president: bool) -> i64 {
    sqlx::query("INSERT INTO org_units (name, parent_id, reports_to_president) VALUES (?, ?, ?)")
        .bind(name)
        .bind(parent_id)
        .bind(reports_to_president)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn assign(pool: &SqlitePool, employee_id: i64, org_unit_id: i64, role_code: &str) {
    sqlx::query(
        "INSERT INTO role_assignments (employee_id, org_unit_id, role_code, valid_from) VALUES (?, ?, ?, ?)",
    )
    .bind(employee_id)
    .bind(org_unit_id)
    .bind(role_code)
    .bind(d(2020, 1, 1))
    .execute(pool)
    .await
    .unwrap();
}

pub async fn school_year(pool: &SqlitePool) -> i64 {
    sqlx::query("INSERT INTO school_years (name, start_date, end_date) VALUES ('SY 2026', ?, ?)")
        .bind(d(2026, 1, 1))
        .bind(d(2027, 1, 1))
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn leave_type(
    pool: &SqlitePool,
    code: &str,
    counts_against_balance: bool,
    requires_med_cert: bool,
    prior_notice_days: i64,
) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO leave_types (code, name, counts_against_balance, requires_med_cert, requires_prior_notice_days)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(code)
    .bind(format!("{code} leave"))
    .bind(counts_against_balance)
    .bind(requires_med_cert)
    .bind(prior_notice_days)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn charge_target(pool: &SqlitePool, leave_type_id: i64, target: i64) {
    sqlx::query("INSERT INTO leave_type_charge_targets (leave_type_id, target_leave_type_id) VALUES (?, ?)")
        .bind(leave_type_id)
        .bind(target)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn policy(
    pool: &SqlitePool,
    school_year_id: i64,
    leave_type_id: i64,
    employment_class: Option<&str>,
    prior_notice_days: Option<i64>,
) {
    sqlx::query(
        r#"
        INSERT INTO leave_policies (school_year_id, leave_type_id, employment_class, prior_notice_days)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(school_year_id)
    .bind(leave_type_id)
    .bind(employment_class)
    .bind(prior_notice_days)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn holiday(pool: &SqlitePool, school_year_id: i64, name: &str, start: NaiveDate, end: NaiveDate) {
    sqlx::query(
        "INSERT INTO holidays (school_year_id, name, start_date, end_date, is_working_day) VALUES (?, ?, ?, ?, 0)",
    )
    .bind(school_year_id)
    .bind(name)
    .bind(start)
    .bind(end)
    .execute(pool)
    .await
    .unwrap();
}

/// Opening balance credit.
pub async fn credit(pool: &SqlitePool, employee_id: i64, school_year_id: i64, leave_type_id: i64, days: f64) {
    sqlx::query(
        r#"
        INSERT INTO leave_balance_ledger (employee_id, school_year_id, leave_type_id, qty_days, reason, created_at)
        VALUES (?, ?, ?, ?, 'opening', ?)
        "#,
    )
    .bind(employee_id)
    .bind(school_year_id)
    .bind(leave_type_id)
    .bind(days)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
}

pub async fn staffing_window(
    pool: &SqlitePool,
    org_unit_id: i64,
    school_year_id: i64,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> i64 {
    sqlx::query(
        "INSERT INTO staffing_windows (org_unit_id, school_year_id, name, start_date, end_date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(org_unit_id)
    .bind(school_year_id)
    .bind(name)
    .bind(start)
    .bind(end)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn count_rule(pool: &SqlitePool, window_id: i64, max_on_leave_count: i64) {
    sqlx::query("INSERT INTO staffing_window_rules (window_id, max_on_leave_count) VALUES (?, ?)")
        .bind(window_id)
        .bind(max_on_leave_count)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn percent_rule(pool: &SqlitePool, window_id: i64, max_on_leave_percent: f64) {
    sqlx::query("INSERT INTO staffing_window_rules (window_id, max_on_leave_percent) VALUES (?, ?)")
        .bind(window_id)
        .bind(max_on_leave_percent)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn exempt(pool: &SqlitePool, window_id: i64, employee_id: i64) {
    sqlx::query("INSERT INTO staffing_window_exemptions (window_id, employee_id) VALUES (?, ?)")
        .bind(window_id)
        .bind(employee_id)
        .execute(pool)
        .await
        .unwrap();
}

/* =========================
Standard campus
========================= */

/// University > Academic Affairs > College of Science > Physics, with three
/// physics staff and the usual leave types.
pub struct Campus {
    pub school_year: i64,
    pub physics: i64,
    pub president: i64,
    pub vp: i64,
    pub dean: i64,
    pub head: i64,
    pub staff: [i64; 3],
    pub vl: i64,
    pub sl: i64,
    pub el: i64,
    pub bl: i64,
}

pub async fn campus(pool: &SqlitePool) -> Campus {
    let school_year = school_year(pool).await;

    let university = org_unit(pool, "University", None, false).await;
    let academic = org_unit(pool, "Academic Affairs", Some(university), false).await;
    let college = org_unit(pool, "College of Science", Some(academic), false).await;
    let physics = org_unit(pool, "Physics", Some(college), false).await;

    let president = employee(pool, "P-1", d(1960, 1, 5), Some("admin")).await;
    let vp = employee(pool, "VP-1", d(1965, 2, 6), Some("admin")).await;
    let dean = employee(pool, "D-1", d(1970, 3, 7), Some("faculty")).await;
    let head = employee(pool, "H-1", d(1975, 5, 8), Some("faculty")).await;
    let s1 = employee(pool, "S-1", d(1990, 4, 10), Some("staff")).await;
    let s2 = employee(pool, "S-2", d(1991, 7, 11), Some("staff")).await;
    let s3 = employee(pool, "S-3", d(1992, 8, 12), Some("faculty")).await;

    assign(pool, president, university, "PRESIDENT").await;
    assign(pool, vp, academic, "VP").await;
    assign(pool, dean, college, "DEAN").await;
    assign(pool, head, physics, "UNIT_HEAD").await;
    for s in [s1, s2, s3] {
        assign(pool, s, physics, "STAFF").await;
    }

    let vl = leave_type(pool, "VL", true, false, 0).await;
    let sl = leave_type(pool, "SL", true, true, 0).await;
    let el = leave_type(pool, "EL", false, false, 0).await;
    let bl = leave_type(pool, "BL", false, false, 0).await;
    charge_target(pool, el, vl).await;

    Campus {
        school_year,
        physics,
        president,
        vp,
        dean,
        head,
        staff: [s1, s2, s3],
        vl,
        sl,
        el,
        bl,
    }
}

impl Campus {
    pub fn draft(&self, employee_id: i64, leave_type_id: i64, start: NaiveDate, end: NaiveDate) -> LeaveDraft {
        LeaveDraft {
            employee_id,
            school_year_id: self.school_year,
            leave_type_id,
            charge_to_leave_type_id: None,
            start_date: start,
            end_date: end,
            part_day: None,
            reason: None,
        }
    }

    pub fn half_day(&self, employee_id: i64, leave_type_id: i64, day: NaiveDate, part: PartDay) -> LeaveDraft {
        LeaveDraft {
            part_day: Some(part),
            ..self.draft(employee_id, leave_type_id, day, day.succ_opt().unwrap())
        }
    }
}
