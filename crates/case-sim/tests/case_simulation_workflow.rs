//! End-to-end scenarios driven through the public service facade, from intake to
//! a graded outcome, without reaching into private modules.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use case_sim::catalog::ReferenceCatalog;
    use case_sim::config::SimulationConfig;
    use case_sim::simulation::{
        Case, CaseId, CaseRepository, CaseService, Clock, DisorderId, LocalDialogue, Patient,
        Personality, RandomSource, RepositoryError, SeededRandom,
    };
    use chrono::{DateTime, TimeZone, Utc};

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        cases: Mutex<HashMap<CaseId, Case>>,
    }

    impl CaseRepository for MemoryRepository {
        fn insert(&self, case: Case) -> Result<Case, RepositoryError> {
            let mut guard = self.cases.lock().expect("repository mutex poisoned");
            if guard.contains_key(&case.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(case.id.clone(), case.clone());
            Ok(case)
        }

        fn save(&self, case: Case) -> Result<(), RepositoryError> {
            let mut guard = self.cases.lock().expect("repository mutex poisoned");
            guard.insert(case.id.clone(), case);
            Ok(())
        }

        fn load(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError> {
            let guard = self.cases.lock().expect("repository mutex poisoned");
            Ok(guard.get(id).cloned())
        }
    }

    pub(super) struct SteppingClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl SteppingClock {
        pub(super) fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().expect("clock mutex poisoned");
            *now += chrono::Duration::seconds(seconds);
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().expect("clock mutex poisoned")
        }
    }

    pub(super) type Service = CaseService<MemoryRepository, LocalDialogue>;

    pub(super) fn service_with(random: Box<dyn RandomSource>) -> (Service, Arc<SteppingClock>) {
        let catalog = Arc::new(ReferenceCatalog::standard().expect("standard catalog"));
        let clock = Arc::new(SteppingClock {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 5, 2, 16, 30, 0).unwrap()),
        });
        let service = CaseService::with_sources(
            Arc::new(MemoryRepository::default()),
            Arc::new(LocalDialogue::new(catalog.clone())),
            catalog,
            &SimulationConfig::default(),
            random,
            clock.clone(),
        );
        (service, clock)
    }

    pub(super) fn seeded_service() -> (Service, Arc<SteppingClock>) {
        service_with(Box::new(SeededRandom::seeded(7)))
    }

    pub(super) fn patient(disorder: &str) -> Patient {
        Patient {
            name: "Andrés Molina".to_string(),
            age: 29,
            disorder: DisorderId::from(disorder),
            personality: Personality::Anxious,
            rapport_baseline: 55,
        }
    }
}

use case_sim::simulation::{
    CaseError, CaseServiceError, CaseStatus, DisorderId, GameMode, ReplySource, SymptomId,
    TreatmentId,
};
use common::*;

#[tokio::test]
async fn a_well_run_interview_earns_a_high_grade() {
    let (service, clock) = seeded_service();
    let case = service
        .intake(patient("trastorno_panico"), GameMode::Training)
        .expect("intake");
    service.activate(&case.id).expect("activate");

    for question in [
        "¿Cómo se siente usted con su familia?",
        "Entiendo que debe ser difícil. ¿Qué pasa en el trabajo cuando empieza la crisis?",
        "¿Cómo duerme estas semanas?",
    ] {
        let outcome = service.ask(&case.id, question).await.expect("question recorded");
        assert_eq!(outcome.source, ReplySource::Generator);
        assert!(outcome.exchange.quality_score <= 100);
    }

    for symptom in ["palpitaciones", "miedo_a_morir"] {
        service
            .record_symptom(&case.id, SymptomId::from(symptom))
            .expect("symptom recorded");
    }
    let hypotheses = service.hypotheses(&case.id).expect("hypotheses");
    assert_eq!(
        hypotheses.first().map(|h| h.disorder_id.as_str()),
        Some("trastorno_panico")
    );

    service
        .submit_diagnosis(&case.id, DisorderId::from("trastorno_panico"))
        .expect("diagnosis");
    service
        .submit_treatment(&case.id, TreatmentId::from("tcc"))
        .expect("treatment");
    clock.advance(45);
    let resolution = service.resolve_treatment(&case.id).expect("resolution");

    assert_eq!(resolution.status, CaseStatus::Completed);
    let score = resolution.final_score.expect("graded");
    assert!(score.diagnosis_first_try);
    assert!(score.treatment_first_try);
    assert_eq!(score.life_aspects_score, 30);
    assert!(score.total_score >= 55, "got {}", score.total_score);
    assert!(score.stars >= 3);
}

#[test]
fn a_wrong_diagnosis_and_two_unrelated_treatments_fail_the_case() {
    let (service, clock) = seeded_service();
    let case = service
        .intake(patient("insomnio_cronico"), GameMode::Realistic)
        .expect("intake");
    service.activate(&case.id).expect("activate");
    service
        .submit_diagnosis(&case.id, DisorderId::from("tept"))
        .expect("diagnosis");

    for treatment in ["emdr", "hipnosis"] {
        service
            .submit_treatment(&case.id, TreatmentId::from(treatment))
            .expect("treatment");
        assert!(matches!(
            service.resolve_treatment(&case.id),
            Err(CaseServiceError::Case(CaseError::NotReady { .. }))
        ));
        clock.advance(45);
        service.resolve_treatment(&case.id).expect("resolution");
    }

    let case = service.get(&case.id).expect("stored");
    assert_eq!(case.status, CaseStatus::Failed);
    assert_eq!(case.rapport, 10);
    let score = case.final_score.expect("graded");
    assert!(!score.diagnosis_first_try);
    assert!(!score.treatment_first_try);

    assert!(matches!(
        service.submit_treatment(&case.id, TreatmentId::from("tcc_insomnio")),
        Err(CaseServiceError::Case(CaseError::AttemptsExhausted))
    ));
}
