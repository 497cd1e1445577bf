//! `rev-forecast` library crate.
//!
//! The binary (`revcast`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable against in-memory storage without spawning processes
//! - the forecast model and the object store are swappable trait objects
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod math;
pub mod models;
pub mod publish;
pub mod report;
pub mod storage;
