//! Ingestion worker: configuration, logging setup, and the job dispatcher.

pub mod config;
pub mod dispatcher;
pub mod logging;
