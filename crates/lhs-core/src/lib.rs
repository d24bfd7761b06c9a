#![deny(missing_docs)]
#![doc = "Core data model for local hidden state (LHS) analysis: assemblages, \
deterministic strategies, hidden-state models, steering functionals and the \
shared error surface."]

mod assemblage;
pub mod errors;
pub mod linalg;
mod model;
pub mod rng;
pub mod sample;
pub mod strategy;
pub mod validate;

pub use assemblage::Assemblage;
pub use errors::{ErrorInfo, LhsError};
pub use linalg::CMatrix;
pub use model::{LhsModel, SteeringFunctional};
pub use rng::RngHandle;
pub use strategy::{strategy_count, strategy_digits, strategy_index, DeterministicStrategies};
pub use validate::{validate_assemblage, Normalization, ValidationOpts};
