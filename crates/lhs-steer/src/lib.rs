#![deny(missing_docs)]
#![doc = "Local hidden state decision: constraint emission, the standalone \
feasibility driver, steering certificate normalization and hashed reports."]

mod certificate;
mod constraints;
mod decide;
mod hash;
mod report;
mod serde;

pub use certificate::{normalize_certificate, CertificateOpts};
pub use constraints::{
    embed_lhs_constraints, AssemblageTarget, ConstraintRow, EmbeddedLhs, LhsConstraints,
};
pub use decide::{
    decide_lhs, decide_lhs_detailed, decide_lhs_with, DecideOpts, Decision, LhsOutcome,
};
pub use hash::stable_hash_string;
pub use report::{
    analyze_assemblage, analyze_assemblage_with, LhsProvenance, LhsReport, ReportDiagnostics,
    ReportShape, SolverSummary,
};
pub use serde::{from_json_slice, to_canonical_json_bytes};
