use super::common::*;
use crate::config::SimulationConfig;
use crate::simulation::dialogue::{DialogueRequest, LocalDialogue, ReplySource};
use crate::simulation::domain::{
    CaseId, CaseStatus, DisorderId, GameMode, LifeAspect, SymptomId, TestId, TreatmentId,
};
use crate::simulation::lifecycle::CaseError;
use crate::simulation::repository::RepositoryError;
use crate::simulation::service::{CaseService, CaseServiceError};
use std::sync::Arc;
use std::time::Duration;

const FAMILY_QUESTION: &str = "¿Cómo se siente usted con su familia?";

#[test]
fn intake_assigns_sequential_ids() {
    let h = harness(canned(), &[]);

    let first = h
        .service
        .intake(patient("depresion_mayor", 50), GameMode::Training)
        .expect("intake succeeds");
    let second = h
        .service
        .intake(patient("tept", 50), GameMode::Realistic)
        .expect("intake succeeds");

    assert_eq!(first.id.as_str(), "case-000001");
    assert_eq!(second.id.as_str(), "case-000002");
    assert_eq!(first.status, CaseStatus::New);
    assert!(h.repository.stored(&second.id).is_some());
}

#[test]
fn intake_rejects_patients_with_unknown_disorders() {
    let h = harness(canned(), &[]);

    match h.service.intake(patient("licantropia", 50), GameMode::Hard) {
        Err(CaseServiceError::Case(CaseError::UnknownDisorder(id))) => {
            assert_eq!(id, DisorderId::from("licantropia"));
        }
        other => panic!("expected unknown disorder, got {other:?}"),
    }
}

#[test]
fn get_propagates_not_found() {
    let h = harness(canned(), &[]);

    match h.service.get(&CaseId::from("case-missing")) {
        Err(CaseServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found error, got {other:?}"),
    }
}

#[test]
fn unavailable_repository_surfaces_as_repository_error() {
    let service = CaseService::with_sources(
        Arc::new(UnavailableRepository),
        Arc::new(canned()),
        catalog(),
        &SimulationConfig::default(),
        Box::new(ScriptedRandom::new(&[])),
        Arc::new(ManualClock::starting_at(started_at())),
    );

    assert!(matches!(
        service.intake(patient("tept", 50), GameMode::Hard),
        Err(CaseServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn treatment_result_waits_for_the_clock() {
    let h = harness(canned(), &[]);
    let case = h
        .service
        .intake(patient("depresion_mayor", 60), GameMode::Hard)
        .expect("intake");
    h.service.activate(&case.id).expect("activate");
    h.service
        .record_symptom(&case.id, SymptomId::from("anhedonia"))
        .expect("symptom");
    h.service
        .submit_diagnosis(&case.id, DisorderId::from("depresion_mayor"))
        .expect("diagnosis");
    h.service
        .submit_treatment(&case.id, TreatmentId::from("tcc"))
        .expect("treatment");

    h.clock.advance(30);
    match h.service.resolve_treatment(&case.id) {
        Err(CaseServiceError::Case(CaseError::NotReady { remaining_secs })) => {
            assert_eq!(remaining_secs, 15);
        }
        other => panic!("expected not ready, got {other:?}"),
    }
    assert_eq!(
        h.repository.stored(&case.id).expect("stored").status,
        CaseStatus::AwaitingResult
    );

    h.clock.advance(15);
    let resolution = h.service.resolve_treatment(&case.id).expect("ready");

    assert_eq!(resolution.status, CaseStatus::Completed);
    let stored = h.repository.stored(&case.id).expect("stored");
    assert_eq!(stored.final_score, resolution.final_score);
    assert_eq!(stored.treatment_sent_at, Some(started_at()));
}

#[test]
fn simulated_test_scores_follow_the_true_disorder() {
    let h = harness(canned(), &[]);
    let case = h
        .service
        .intake(patient("depresion_mayor", 50), GameMode::Hard)
        .expect("intake");
    h.service.activate(&case.id).expect("activate");

    let targeted = h
        .service
        .apply_test(&case.id, TestId::from("bdi_ii"))
        .expect("bdi applies");
    let unrelated = h
        .service
        .apply_test(&case.id, TestId::from("gad_7"))
        .expect("gad applies");

    assert_eq!(targeted.raw_score, 29);
    assert_eq!(targeted.interpretation, "grave");
    assert_eq!(unrelated.raw_score, 0);
    assert_eq!(unrelated.interpretation, "mínima");

    assert!(matches!(
        h.service.apply_test(&case.id, TestId::from("isi")),
        Err(CaseServiceError::Case(CaseError::TestsExhausted { .. }))
    ));
}

#[test]
fn sessions_and_aspects_persist() {
    let h = harness(canned(), &[]);
    let case = h
        .service
        .intake(patient("tept", 50), GameMode::Hard)
        .expect("intake");
    h.service.activate(&case.id).expect("activate");

    let resumed = h.service.resume_session(&case.id).expect("resume");
    assert_eq!(resumed.sessions, 2);

    let updated = h
        .service
        .record_life_aspect(&case.id, LifeAspect::Childhood)
        .expect("aspect");
    assert_eq!(updated.life_aspects_explored.get(&LifeAspect::Childhood), Some(&true));

    let cancelled = h.service.cancel(&case.id).expect("cancel");
    assert_eq!(cancelled.status, CaseStatus::Cancelled);
    assert_eq!(
        h.repository.stored(&case.id).expect("stored").status,
        CaseStatus::Cancelled
    );
}

#[tokio::test]
async fn ask_scores_with_the_generator_base_score() {
    let h = harness(canned(), &[]);
    let case = h
        .service
        .intake(patient("depresion_mayor", 50), GameMode::Hard)
        .expect("intake");
    h.service.activate(&case.id).expect("activate");

    let outcome = h.service.ask(&case.id, FAMILY_QUESTION).await.expect("ask");

    assert_eq!(outcome.source, ReplySource::Generator);
    assert_eq!(outcome.exchange.reply, "Pues... no sé por dónde empezar.");
    // base 60 + open-ended 15, hard mode
    assert_eq!(outcome.exchange.quality_score, 75);
    assert_eq!(outcome.exchange.rapport, 52);
    assert_eq!(outcome.exchange.aspects_detected, vec![LifeAspect::Family]);

    let stored = h.repository.stored(&case.id).expect("stored");
    assert_eq!(stored.messages.len(), 2);
    assert_eq!(stored.messages[1].quality_score, Some(75));
    assert_eq!(stored.life_aspects_explored.get(&LifeAspect::Family), Some(&true));
}

#[tokio::test]
async fn ask_falls_back_locally_when_the_generator_fails() {
    let h = harness(FailingDialogue, &[]);
    let case = h
        .service
        .intake(patient("depresion_mayor", 50), GameMode::Hard)
        .expect("intake");
    let case = h.service.activate(&case.id).expect("activate");

    let outcome = h.service.ask(&case.id, FAMILY_QUESTION).await.expect("ask");

    let expected = LocalDialogue::new(catalog()).reply(&DialogueRequest::from_case(&case, FAMILY_QUESTION));
    assert_eq!(outcome.source, ReplySource::Fallback);
    assert_eq!(outcome.exchange.reply, expected.text);
    // scripted base is the low end of [40, 80], plus the open-ended bonus
    assert_eq!(outcome.exchange.quality_score, 55);
}

#[tokio::test(start_paused = true)]
async fn ask_falls_back_locally_when_the_generator_times_out() {
    let h = harness(StalledDialogue, &[]);
    let case = h
        .service
        .intake(patient("tept", 50), GameMode::Realistic)
        .expect("intake");
    h.service.activate(&case.id).expect("activate");

    let outcome = h.service.ask(&case.id, "¿Qué pasó aquella noche?").await.expect("ask");

    assert_eq!(outcome.source, ReplySource::Fallback);
    assert_eq!(h.repository.stored(&case.id).expect("stored").messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_an_in_flight_question_leaves_the_case_untouched() {
    let h = harness(StalledDialogue, &[]);
    let case = h
        .service
        .intake(patient("tept", 50), GameMode::Training)
        .expect("intake");
    let case = h.service.activate(&case.id).expect("activate");

    let abandoned =
        tokio::time::timeout(Duration::from_secs(1), h.service.ask(&case.id, FAMILY_QUESTION)).await;

    assert!(abandoned.is_err(), "ask should still be waiting on the generator");
    assert_eq!(h.repository.stored(&case.id), Some(case));
}

#[tokio::test]
async fn ask_requires_an_active_interview() {
    let h = harness(canned(), &[]);
    let case = h
        .service
        .intake(patient("tept", 50), GameMode::Hard)
        .expect("intake");

    match h.service.ask(&case.id, FAMILY_QUESTION).await {
        Err(CaseServiceError::Case(CaseError::InvalidState { status, .. })) => {
            assert_eq!(status, CaseStatus::New);
        }
        other => panic!("expected invalid state, got {other:?}"),
    }
    assert!(h.repository.stored(&case.id).expect("stored").messages.is_empty());
}
