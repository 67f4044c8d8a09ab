//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where rows are inserted directly, a create DTO.

pub mod change_log;
pub mod data_source;
pub mod employee;
pub mod ingestion_job;
