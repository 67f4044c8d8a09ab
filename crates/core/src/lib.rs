//! Pure domain logic for HR employee ingestion.
//!
//! Everything in this crate is free of database and runtime dependencies:
//! schema parsing, field transformation, duplicate detection, change
//! detection, and the ingestion job state machine. Storage, document
//! retrieval and job bookkeeping are reached only through the traits in
//! [`collaborators`].

pub mod change_tracking;
pub mod collaborators;
pub mod duplicate_detection;
pub mod employee;
pub mod error;
pub mod ingestion_status;
pub mod schema;
pub mod transform;
pub mod types;
