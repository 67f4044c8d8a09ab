//! Ingestion orchestration for HR employee exports.
//!
//! [`IngestionPipeline`] runs one job at a time against the collaborator
//! traits from `hrhub-core`. [`memory`] holds in-memory collaborators and
//! [`document`] a local directory document source.

mod call;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod reconciler;

pub use config::{CommitScope, PipelineConfig};
pub use error::IngestError;
pub use pipeline::{IngestionPipeline, JobReport};
