//! Case engine: lifecycle state machine, hypothesis ranking, treatment
//! resolution, question grading and final scoring, plus the service and HTTP
//! surface that drive them.

pub mod clock;
pub mod dialogue;
pub mod domain;
pub mod hypotheses;
pub mod lifecycle;
pub mod questions;
pub mod random;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod treatment;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock};
pub use dialogue::{
    DialogueError, DialogueGenerator, DialogueReply, DialogueRequest, LocalDialogue, ReplySource,
};
pub use domain::{
    Case, CaseId, CaseStatus, DisorderId, FinalScore, GameMode, LifeAspect, Message, Patient,
    Personality, Sender, SymptomId, TestId, TestResult, TreatmentId,
};
pub use hypotheses::{compute_hypotheses, Hypothesis};
pub use lifecycle::{CaseError, CaseLifecycle, ExchangeRecord, SymptomToggle, TreatmentResolution};
pub use questions::{score_question, score_question_with_base};
pub use random::{RandomSource, SeededRandom};
pub use repository::{CaseRepository, CaseView, RepositoryError, ResolutionView};
pub use router::case_router;
pub use scoring::compute_final_score;
pub use service::{AskOutcome, CaseService, CaseServiceError};
pub use treatment::{TreatmentOutcome, TreatmentPolicy, TreatmentResolver};
