//! `vsrcheck-recon`: scan-report extraction and ECU software reconciliation.
//!
//! Pure engine crate: takes a report document and a pre-loaded reference
//! table, returns classified results and a remediation plan. No file or
//! network IO.

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod filter;
pub mod model;
pub mod plan;

pub use config::ReconConfig;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use extract::extract;
pub use filter::ResultFilter;
pub use model::{
    ClassificationResult, EcuRecord, Priority, ReconResult, ReferenceEntry, ReferenceTable,
    RemediationPlan, Status,
};
pub use plan::plan;
