//! exador-core: quiz model, scoring, session flow, and CSV import.
//!
//! This crate defines the data model, the data-access traits every backend
//! implements, and the logic that runs on top of them: scoring, the quiz
//! session state machine and its async driver, session persistence, the
//! question importer, and dashboard figures.

pub mod driver;
pub mod error;
pub mod importer;
pub mod model;
pub mod persistence;
pub mod progress;
pub mod scoring;
pub mod session;
pub mod traits;
