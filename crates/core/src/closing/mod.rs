//! Period closing: validation, transitions and the engine facade.

pub mod engine;
pub mod error;
pub mod report;
pub mod validator;

pub use engine::{ClosedPeriodSummary, ClosingEngine, Collaborators};
pub use error::ClosingError;
pub use report::{ValidationIssue, ValidationReport, ValidationRule};
pub use validator::ClosingValidator;
