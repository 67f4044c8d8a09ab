//! Integration tests for the employee repositories and `PgEmployeeStore`.

use assert_matches::assert_matches;
use hrhub_core::collaborators::EmployeeStore;
use hrhub_core::employee::{
    CanonicalEmployeeRecord, ChangeType, EmployeeStatus, NewChangeLogEntry,
};
use hrhub_core::types::DbId;
use hrhub_db::models::data_source::CreateDataSource;
use hrhub_db::models::ingestion_job::CreateIngestionJob;
use hrhub_db::repositories::{ChangeLogRepo, DataSourceRepo, EmployeeRepo, IngestionJobRepo};
use hrhub_db::store::PgEmployeeStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_source_and_job(pool: &PgPool) -> (DbId, DbId) {
    let source = DataSourceRepo::create(
        pool,
        &CreateDataSource {
            name: "Workday EU".to_string(),
            system_type: "workday".to_string(),
        },
    )
    .await
    .unwrap();
    let job = IngestionJobRepo::create(
        pool,
        &CreateIngestionJob {
            source_id: source.id,
            file_path: "workday/export.xml".to_string(),
        },
    )
    .await
    .unwrap();
    (source.id, job.id)
}

fn record(source_id: DbId, employee_id: &str, department: &str) -> CanonicalEmployeeRecord {
    CanonicalEmployeeRecord {
        source_id,
        source_employee_id: employee_id.to_string(),
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        email: Some("john@example.com".to_string()),
        department: Some(department.to_string()),
        job_title: None,
        hire_date: chrono::NaiveDate::from_ymd_opt(2023, 1, 15),
        status: EmployeeStatus::OnLeave,
        manager_id: None,
        salary: Some(95000.0),
        raw_data: serde_json::json!({ "employee_id": employee_id, "location": "Berlin" }),
    }
}

// ---------------------------------------------------------------------------
// EmployeeRepo
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_inserts_then_overwrites_in_place(pool: PgPool) {
    let (source_id, _) = seed_source_and_job(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let first = EmployeeRepo::upsert(&mut conn, &record(source_id, "EMP001", "Engineering"))
        .await
        .unwrap();
    assert_eq!(first.status, "On Leave");
    assert_eq!(first.raw_data["location"], "Berlin");

    let second = EmployeeRepo::upsert(&mut conn, &record(source_id, "EMP001", "Marketing"))
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.department.as_deref(), Some("Marketing"));

    let all = EmployeeRepo::list_by_source(&mut conn, source_id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn natural_key_lookup_is_scoped_to_source(pool: PgPool) {
    let (source_id, _) = seed_source_and_job(&pool).await;
    let mut conn = pool.acquire().await.unwrap();
    EmployeeRepo::upsert(&mut conn, &record(source_id, "EMP001", "Engineering"))
        .await
        .unwrap();

    let found = EmployeeRepo::find_by_natural_key(&mut conn, source_id, "EMP001")
        .await
        .unwrap();
    assert!(found.is_some());

    let other_source = EmployeeRepo::find_by_natural_key(&mut conn, source_id + 1, "EMP001")
        .await
        .unwrap();
    assert!(other_source.is_none());
}

// ---------------------------------------------------------------------------
// PgEmployeeStore
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn committed_unit_of_work_persists_row_and_entries(pool: PgPool) {
    let (source_id, job_id) = seed_source_and_job(&pool).await;
    let store = PgEmployeeStore::new(pool.clone());

    let mut uow = store.begin(source_id).await.unwrap();
    assert!(uow
        .find_by_natural_key(source_id, "EMP001")
        .await
        .unwrap()
        .is_none());
    let employee = uow
        .upsert(&record(source_id, "EMP001", "Engineering"))
        .await
        .unwrap();
    uow.append_change_log(&[NewChangeLogEntry {
        employee_id: employee.id,
        ingestion_job_id: job_id,
        field_name: "department".to_string(),
        old_value: None,
        new_value: Some("Engineering".to_string()),
        change_type: ChangeType::Created,
    }])
    .await
    .unwrap();
    uow.commit().await.unwrap();

    assert_eq!(employee.status, EmployeeStatus::OnLeave);
    let mut conn = pool.acquire().await.unwrap();
    let entries = ChangeLogRepo::list_for_job(&mut conn, job_id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].change_type, "created");
    assert_eq!(entries[0].employee_id, employee.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rolled_back_unit_of_work_leaves_nothing(pool: PgPool) {
    let (source_id, _) = seed_source_and_job(&pool).await;
    let store = PgEmployeeStore::new(pool.clone());

    let mut uow = store.begin(source_id).await.unwrap();
    uow.upsert(&record(source_id, "EMP001", "Engineering"))
        .await
        .unwrap();
    uow.rollback().await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let found = EmployeeRepo::find_by_natural_key(&mut conn, source_id, "EMP001")
        .await
        .unwrap();
    assert_matches!(found, None);
}
