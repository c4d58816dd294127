use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{DisorderId, TreatmentId};
use super::random::RandomSource;
use crate::catalog::{CatalogError, ReferenceCatalog, TreatmentFit};

/// Success odds for the non-deterministic outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPolicy {
    /// Correct diagnosis, treatment applicable but not first line.
    pub applicable_success_rate: f64,
    /// Wrong diagnosis, treatment still applicable to the true disorder.
    pub lucky_success_rate: f64,
}

impl Default for TreatmentPolicy {
    fn default() -> Self {
        Self {
            applicable_success_rate: 0.7,
            lucky_success_rate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOutcome {
    pub success: bool,
    pub fit: TreatmentFit,
    pub attempt: u8,
    /// Draw used for a probabilistic outcome; `None` when the result was certain.
    pub roll: Option<f64>,
}

/// Decides whether a proposed treatment works for the patient's true disorder.
#[derive(Debug, Clone, Default)]
pub struct TreatmentResolver {
    policy: TreatmentPolicy,
}

impl TreatmentResolver {
    pub fn new(policy: TreatmentPolicy) -> Self {
        Self { policy }
    }

    /// `attempt` is recorded on the outcome but never shifts the odds.
    pub fn resolve(
        &self,
        catalog: &ReferenceCatalog,
        proposed: &TreatmentId,
        true_disorder: &DisorderId,
        diagnosis_was_correct: bool,
        attempt: u8,
        random: &mut dyn RandomSource,
    ) -> Result<TreatmentOutcome, CatalogError> {
        catalog.require_disorder(true_disorder)?;
        let fit = catalog.require_treatment(proposed)?.fit_for(true_disorder);

        let odds = match (diagnosis_was_correct, fit) {
            (_, TreatmentFit::Unrelated) => 0.0,
            (true, TreatmentFit::FirstLine) => 1.0,
            (true, TreatmentFit::Applicable) => self.policy.applicable_success_rate,
            (false, _) => self.policy.lucky_success_rate,
        };

        let (success, roll) = if odds >= 1.0 {
            (true, None)
        } else if odds <= 0.0 {
            (false, None)
        } else {
            let roll = random.unit();
            (roll < odds, Some(roll))
        };

        debug!(
            treatment = %proposed,
            disorder = %true_disorder,
            diagnosis_was_correct,
            attempt,
            ?fit,
            ?roll,
            success,
            "treatment resolved"
        );

        Ok(TreatmentOutcome {
            success,
            fit,
            attempt,
            roll,
        })
    }
}
