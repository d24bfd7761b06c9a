//! Backend selection for configuration files.

use serde::{Deserialize, Serialize};

use crate::conic::{ClarabelSettings, ClarabelSolver};
use crate::gradient::{GradientSettings, ProjectedGradientSolver};
use crate::solver::PsdFeasibilitySolver;

/// Which backend to run, with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum Backend {
    /// Interior-point solve through clarabel.
    Clarabel(ClarabelSettings),
    /// First-order projected gradient.
    ProjectedGradient(GradientSettings),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Clarabel(ClarabelSettings::default())
    }
}

impl Backend {
    /// Instantiates the selected solver.
    pub fn build(&self) -> Box<dyn PsdFeasibilitySolver> {
        match self {
            Backend::Clarabel(settings) => Box::new(ClarabelSolver::new(settings.clone())),
            Backend::ProjectedGradient(settings) => {
                Box::new(ProjectedGradientSolver::new(settings.clone()))
            }
        }
    }
}
