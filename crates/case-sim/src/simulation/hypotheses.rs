use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{DisorderId, SymptomId};
use crate::catalog::Disorder;

/// Match percentage the top-ranked hypothesis needs before it is called primary.
pub const DEFAULT_PRIMARY_THRESHOLD: f64 = 60.0;

/// Candidate disorder ranked by how many of its symptoms were selected.
///
/// `match_percentage` divides by the disorder's minimum criteria count rather
/// than its symptom list, so it exceeds 100 when more symptoms than the
/// threshold are present. Presentation layers clamp; this value never is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub disorder_id: DisorderId,
    pub matched_symptom_count: usize,
    pub criteria_count: u8,
    pub match_percentage: f64,
    pub matched_symptoms: Vec<SymptomId>,
    pub primary: bool,
}

impl Hypothesis {
    /// Percentage capped at 100 for display.
    pub fn display_percentage(&self) -> u8 {
        self.match_percentage.clamp(0.0, 100.0).round() as u8
    }
}

/// Ranks `candidates` against the selected symptoms using the default primary threshold.
pub fn compute_hypotheses(
    selected: &BTreeSet<SymptomId>,
    candidates: &[Disorder],
) -> Vec<Hypothesis> {
    rank_hypotheses(selected, candidates, DEFAULT_PRIMARY_THRESHOLD)
}

/// Disorders with no matched symptom are left out. Ties keep declaration order.
pub fn rank_hypotheses(
    selected: &BTreeSet<SymptomId>,
    candidates: &[Disorder],
    primary_threshold: f64,
) -> Vec<Hypothesis> {
    if selected.is_empty() {
        return Vec::new();
    }

    let mut hypotheses: Vec<Hypothesis> = candidates
        .iter()
        .filter_map(|disorder| {
            if disorder.criteria_count == 0 {
                warn!(disorder = %disorder.id, "skipping disorder with zero criteria count");
                return None;
            }

            let matched_symptoms: Vec<SymptomId> = disorder
                .symptoms
                .iter()
                .filter(|symptom| selected.contains(*symptom))
                .cloned()
                .collect();
            if matched_symptoms.is_empty() {
                return None;
            }

            let matched_symptom_count = matched_symptoms.len();
            Some(Hypothesis {
                disorder_id: disorder.id.clone(),
                matched_symptom_count,
                criteria_count: disorder.criteria_count,
                match_percentage: matched_symptom_count as f64 * 100.0
                    / f64::from(disorder.criteria_count),
                matched_symptoms,
                primary: false,
            })
        })
        .collect();

    // `sort_by` is stable, so equal percentages stay in catalog order.
    hypotheses.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));

    if let Some(top) = hypotheses.first_mut() {
        top.primary = top.match_percentage >= primary_threshold;
    }

    hypotheses
}
