//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async queries. Job and
//! source repositories take `&PgPool`; employee and change log repositories
//! take `&mut PgConnection` so they can run inside a unit of work.

pub mod change_log_repo;
pub mod data_source_repo;
pub mod employee_repo;
pub mod ingestion_job_repo;

pub use change_log_repo::ChangeLogRepo;
pub use data_source_repo::DataSourceRepo;
pub use employee_repo::EmployeeRepo;
pub use ingestion_job_repo::IngestionJobRepo;
