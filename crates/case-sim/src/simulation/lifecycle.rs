//! Legal transitions of a [`Case`].
//!
//! Every operation validates first and mutates second, so a rejected call
//! leaves the case exactly as it was. Outcomes that depend on chance or on the
//! clock take the random source and the current instant as arguments.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use super::domain::{
    Case, CaseStatus, DisorderId, FinalScore, LifeAspect, Message, Sender, SymptomId, TestId,
    TestResult, TreatmentId, MAX_TESTS, MAX_TREATMENT_ATTEMPTS,
};
use super::hypotheses::{rank_hypotheses, Hypothesis};
use super::random::RandomSource;
use super::scoring::compute_final_score;
use super::treatment::{TreatmentOutcome, TreatmentPolicy, TreatmentResolver};
use crate::catalog::{CatalogError, ReferenceCatalog};
use crate::config::SimulationConfig;

/// Quality at or above which a question earns rapport.
const RAPPORT_GAIN_QUALITY: u8 = 70;
/// Quality below which a question costs rapport.
const RAPPORT_LOSS_QUALITY: u8 = 40;

/// Rejections raised by case transitions. All but `Catalog` are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("cannot {operation} while the case is {status}")]
    InvalidState {
        operation: &'static str,
        status: CaseStatus,
    },
    #[error("a diagnosis has already been submitted for this case")]
    AlreadyDiagnosed,
    #[error("both treatment attempts have already been used")]
    AttemptsExhausted,
    #[error("treatment result is not ready yet ({remaining_secs}s remaining)")]
    NotReady { remaining_secs: u64 },
    #[error("no more than {max} tests can be applied to a case")]
    TestsExhausted { max: usize },
    #[error("test '{0}' was already applied")]
    TestAlreadyApplied(TestId),
    #[error("unknown symptom '{0}'")]
    UnknownSymptom(SymptomId),
    #[error("unknown disorder '{0}'")]
    UnknownDisorder(DisorderId),
    #[error("unknown treatment '{0}'")]
    UnknownTreatment(TreatmentId),
    #[error("unknown test '{0}'")]
    UnknownTest(TestId),
    #[error("raw score {raw_score} is outside the range of test '{test}'")]
    RawScoreOutOfRange { test: TestId, raw_score: u16 },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Result of toggling a symptom, with the refreshed ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomToggle {
    pub symptom: SymptomId,
    pub selected: bool,
    pub hypotheses: Vec<Hypothesis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentResolution {
    pub outcome: TreatmentOutcome,
    pub status: CaseStatus,
    pub rapport: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<FinalScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRecord {
    pub reply: String,
    pub quality_score: u8,
    pub aspects_detected: Vec<LifeAspect>,
    pub rapport: u8,
}

/// Transition rules, parameterised by the simulation settings.
#[derive(Debug, Clone)]
pub struct CaseLifecycle {
    treatment_wait: Duration,
    first_failure_penalty: u8,
    final_failure_penalty: u8,
    exchange_rapport_step: u8,
    primary_threshold: f64,
    resolver: TreatmentResolver,
}

impl Default for CaseLifecycle {
    fn default() -> Self {
        Self::new(&SimulationConfig::default(), TreatmentPolicy::default())
    }
}

impl CaseLifecycle {
    pub fn new(config: &SimulationConfig, policy: TreatmentPolicy) -> Self {
        Self {
            treatment_wait: config.treatment_wait,
            first_failure_penalty: config.first_failure_rapport_penalty,
            final_failure_penalty: config.final_failure_rapport_penalty,
            exchange_rapport_step: config.exchange_rapport_step,
            primary_threshold: config.primary_threshold,
            resolver: TreatmentResolver::new(policy),
        }
    }

    pub fn activate(&self, case: &mut Case) -> Result<(), CaseError> {
        ensure(case, "activate", |status| status == CaseStatus::New)?;

        case.status = CaseStatus::Active;
        case.sessions = case.sessions.max(1);
        log_transition(case, CaseStatus::New);
        Ok(())
    }

    pub fn record_symptom(
        &self,
        case: &mut Case,
        catalog: &ReferenceCatalog,
        symptom: SymptomId,
    ) -> Result<SymptomToggle, CaseError> {
        ensure(case, "record a symptom", CaseStatus::is_in_progress)?;
        if !catalog.knows_symptom(&symptom) {
            return Err(CaseError::UnknownSymptom(symptom));
        }

        let selected = if case.selected_symptoms.remove(&symptom) {
            false
        } else {
            case.selected_symptoms.insert(symptom.clone());
            true
        };

        Ok(SymptomToggle {
            symptom,
            selected,
            hypotheses: self.hypotheses(case, catalog),
        })
    }

    pub fn hypotheses(&self, case: &Case, catalog: &ReferenceCatalog) -> Vec<Hypothesis> {
        rank_hypotheses(
            &case.selected_symptoms,
            catalog.disorders(),
            self.primary_threshold,
        )
    }

    pub fn submit_diagnosis(
        &self,
        case: &mut Case,
        catalog: &ReferenceCatalog,
        disorder: DisorderId,
    ) -> Result<(), CaseError> {
        if case.diagnosis.is_some() {
            return Err(CaseError::AlreadyDiagnosed);
        }
        ensure(case, "submit a diagnosis", |status| status == CaseStatus::Active)?;
        if catalog.disorder(&disorder).is_none() {
            return Err(CaseError::UnknownDisorder(disorder));
        }
        require_true_disorder(case, catalog)?;

        let correct = disorder == case.patient.disorder;
        case.diagnosis = Some(disorder);
        case.diagnosis_correct = Some(correct);
        case.status = CaseStatus::AwaitingTreatment;
        log_transition(case, CaseStatus::Active);
        Ok(())
    }

    pub fn submit_treatment(
        &self,
        case: &mut Case,
        catalog: &ReferenceCatalog,
        treatment: TreatmentId,
        now: DateTime<Utc>,
    ) -> Result<(), CaseError> {
        if case.treatment_attempts >= MAX_TREATMENT_ATTEMPTS {
            return Err(CaseError::AttemptsExhausted);
        }
        ensure(case, "submit a treatment", |status| {
            matches!(
                status,
                CaseStatus::AwaitingTreatment | CaseStatus::TreatmentFailed
            )
        })?;
        if catalog.treatment(&treatment).is_none() {
            return Err(CaseError::UnknownTreatment(treatment));
        }

        let from = case.status;
        case.treatment = Some(treatment);
        case.treatment_attempts += 1;
        case.treatment_sent_at = Some(now);
        case.status = CaseStatus::AwaitingResult;
        log_transition(case, from);
        Ok(())
    }

    /// Remaining wait before the pending treatment can be resolved.
    pub fn time_until_result(&self, case: &Case, now: DateTime<Utc>) -> Option<Duration> {
        let sent_at = case.treatment_sent_at?;
        let elapsed = (now - sent_at).to_std().unwrap_or(Duration::ZERO);
        Some(self.treatment_wait.saturating_sub(elapsed))
    }

    pub fn resolve_treatment(
        &self,
        case: &mut Case,
        catalog: &ReferenceCatalog,
        now: DateTime<Utc>,
        random: &mut dyn RandomSource,
    ) -> Result<TreatmentResolution, CaseError> {
        ensure(case, "resolve a treatment", |status| {
            status == CaseStatus::AwaitingResult
        })?;
        let (Some(treatment), Some(remaining)) =
            (case.treatment.clone(), self.time_until_result(case, now))
        else {
            return Err(invalid_state(case, "resolve a treatment"));
        };
        if !remaining.is_zero() {
            return Err(CaseError::NotReady {
                remaining_secs: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
            });
        }

        let outcome = self
            .resolver
            .resolve(
                catalog,
                &treatment,
                &case.patient.disorder,
                case.diagnosis_correct.unwrap_or(false),
                case.treatment_attempts,
                random,
            )
            .map_err(|err| fatal(case, err))?;

        case.treatment_correct = Some(outcome.success);
        let final_score = if outcome.success {
            Some(finalize(case, CaseStatus::Completed))
        } else if case.treatment_attempts < MAX_TREATMENT_ATTEMPTS {
            case.adjust_rapport(-i16::from(self.first_failure_penalty));
            case.treatment = None;
            case.treatment_sent_at = None;
            case.status = CaseStatus::TreatmentFailed;
            log_transition(case, CaseStatus::AwaitingResult);
            None
        } else {
            case.adjust_rapport(-i16::from(self.final_failure_penalty));
            Some(finalize(case, CaseStatus::Failed))
        };

        Ok(TreatmentResolution {
            outcome,
            status: case.status,
            rapport: case.rapport,
            final_score,
        })
    }

    pub fn cancel(&self, case: &mut Case) -> Result<(), CaseError> {
        ensure(case, "cancel", |status| !status.is_terminal())?;

        let from = case.status;
        case.status = CaseStatus::Cancelled;
        log_transition(case, from);
        Ok(())
    }

    /// Returns whether the aspect was newly marked.
    pub fn record_life_aspect(&self, case: &mut Case, aspect: LifeAspect) -> Result<bool, CaseError> {
        ensure(case, "record a life aspect", |status| !status.is_terminal())?;

        let flag = case.life_aspects_explored.entry(aspect).or_insert(false);
        let newly = !*flag;
        *flag = true;
        Ok(newly)
    }

    pub fn apply_test(
        &self,
        case: &mut Case,
        catalog: &ReferenceCatalog,
        test: TestId,
        raw_score: u16,
    ) -> Result<TestResult, CaseError> {
        ensure(case, "apply a test", CaseStatus::is_in_progress)?;
        let Some(definition) = catalog.test(&test) else {
            return Err(CaseError::UnknownTest(test));
        };
        if case.tests_applied.contains(&test) {
            return Err(CaseError::TestAlreadyApplied(test));
        }
        if case.tests_applied.len() >= MAX_TESTS {
            return Err(CaseError::TestsExhausted { max: MAX_TESTS });
        }
        let Some(band) = definition.band_for(raw_score) else {
            return Err(CaseError::RawScoreOutOfRange { test, raw_score });
        };

        let result = TestResult {
            test_id: test.clone(),
            raw_score,
            interpretation: band.interpretation.clone(),
        };
        case.tests_applied.push(test);
        case.tests_results.push(result.clone());
        Ok(result)
    }

    /// Whether a question may be asked right now; checked again on record.
    pub fn check_exchange(&self, case: &Case) -> Result<(), CaseError> {
        ensure(case, "ask a question", CaseStatus::is_in_progress)
    }

    /// Appends a question and the patient's scored reply to the transcript.
    pub fn record_exchange(
        &self,
        case: &mut Case,
        utterance: &str,
        reply: String,
        quality_score: u8,
        now: DateTime<Utc>,
    ) -> Result<ExchangeRecord, CaseError> {
        self.check_exchange(case)?;

        let quality_score = quality_score.min(100);
        let aspects_detected = LifeAspect::detect(utterance);
        for aspect in &aspects_detected {
            case.life_aspects_explored.insert(*aspect, true);
        }

        let step = i16::from(self.exchange_rapport_step);
        if quality_score >= RAPPORT_GAIN_QUALITY {
            case.adjust_rapport(step);
        } else if quality_score < RAPPORT_LOSS_QUALITY {
            case.adjust_rapport(-step);
        }

        case.messages.push(Message {
            sender: Sender::User,
            text: utterance.to_string(),
            quality_score: None,
            sent_at: now,
        });
        case.messages.push(Message {
            sender: Sender::Patient,
            text: reply.clone(),
            quality_score: Some(quality_score),
            sent_at: now,
        });

        Ok(ExchangeRecord {
            reply,
            quality_score,
            aspects_detected,
            rapport: case.rapport,
        })
    }

    pub fn resume_session(&self, case: &mut Case) -> Result<u32, CaseError> {
        ensure(case, "resume a session", CaseStatus::is_in_progress)?;

        case.sessions += 1;
        Ok(case.sessions)
    }
}

fn ensure(
    case: &Case,
    operation: &'static str,
    allowed: impl Fn(CaseStatus) -> bool,
) -> Result<(), CaseError> {
    if allowed(case.status) {
        Ok(())
    } else {
        Err(invalid_state(case, operation))
    }
}

fn invalid_state(case: &Case, operation: &'static str) -> CaseError {
    CaseError::InvalidState {
        operation,
        status: case.status,
    }
}

fn require_true_disorder(case: &Case, catalog: &ReferenceCatalog) -> Result<(), CaseError> {
    catalog
        .require_disorder(&case.patient.disorder)
        .map(|_| ())
        .map_err(|err| fatal(case, err))
}

fn fatal(case: &Case, err: CatalogError) -> CaseError {
    error!(case_id = %case.id, error = %err, "reference catalog is inconsistent with case");
    CaseError::Catalog(err)
}

fn finalize(case: &mut Case, status: CaseStatus) -> FinalScore {
    let from = case.status;
    case.status = status;
    let score = compute_final_score(case);
    case.final_score = Some(score);
    log_transition(case, from);
    info!(
        case_id = %case.id,
        total_score = score.total_score,
        stars = score.stars,
        "case scored"
    );
    score
}

fn log_transition(case: &Case, from: CaseStatus) {
    info!(case_id = %case.id, from = from.label(), to = case.status.label(), "case transition");
}
