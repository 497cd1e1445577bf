//! Tabular input/output.
//!
//! - source export ingest (XLSX or CSV) (`ingest`)
//! - report workbook encoding (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
