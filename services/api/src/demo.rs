use crate::infra::{load_catalog, parse_mode, InMemoryCaseRepository};
use case_sim::catalog::{ReferenceCatalog, TreatmentFit};
use case_sim::config::SimulationConfig;
use case_sim::error::AppError;
use case_sim::simulation::{
    CaseError, CaseId, CaseService, CaseServiceError, CaseStatus, Clock, DisorderId, GameMode,
    LocalDialogue, Patient, Personality, SeededRandom, TreatmentId,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

const INTERVIEW: [&str; 5] = [
    "Buenos días. ¿Qué le trae por aquí?",
    "¿Cómo se siente usted con su familia últimamente?",
    "Entiendo que debe ser difícil. ¿Qué pasa en el trabajo estos días?",
    "¿Cómo duerme por las noches?",
    "¿Y con sus amigos, sigue quedando?",
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Disorder the simulated patient actually has
    #[arg(long, default_value = "depresion_mayor")]
    pub(crate) disorder: String,
    /// Game mode: training, hard or realistic
    #[arg(long, default_value = "training", value_parser = parse_mode)]
    pub(crate) mode: GameMode,
    /// Seed for question scores and treatment rolls
    #[arg(long, default_value_t = 7)]
    pub(crate) seed: u64,
    /// Optional JSON catalog to use instead of the built-in one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

/// Clock the demo moves forward by hand instead of sleeping through the wait.
struct DemoClock {
    now: Mutex<DateTime<Utc>>,
}

impl DemoClock {
    fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += ChronoDuration::seconds(i64::try_from(by.as_secs()).unwrap_or(i64::MAX));
    }
}

impl Clock for DemoClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        disorder,
        mode,
        seed,
        catalog,
    } = args;

    let catalog = load_catalog(catalog.as_deref())?;
    let config = SimulationConfig::default();
    let clock = Arc::new(DemoClock {
        now: Mutex::new(Utc::now()),
    });
    let service = CaseService::with_sources(
        Arc::new(InMemoryCaseRepository::default()),
        Arc::new(LocalDialogue::new(catalog.clone())),
        catalog.clone(),
        &config,
        Box::new(SeededRandom::seeded(seed)),
        clock.clone(),
    );

    let patient = Patient {
        name: "Laura Gómez".to_string(),
        age: 34,
        disorder: DisorderId::from(disorder.as_str()),
        personality: Personality::Reserved,
        rapport_baseline: 50,
    };

    println!("Clinical case simulation demo");
    println!("=============================");
    let case = service.intake(patient, mode)?;
    println!(
        "Case {} opened in {} mode for {} ({} years)",
        case.id,
        mode.label(),
        case.patient.name,
        case.patient.age
    );
    service.activate(&case.id)?;

    println!();
    println!("Interview");
    for question in INTERVIEW {
        let outcome = service.ask(&case.id, question).await?;
        println!("  Therapist: {question}");
        println!("  Patient:   {}", outcome.exchange.reply);
        println!(
            "             quality {} | rapport {} | aspects {:?}",
            outcome.exchange.quality_score,
            outcome.exchange.rapport,
            outcome.exchange.aspects_detected
        );
    }

    let true_disorder = DisorderId::from(disorder.as_str());
    let observed = catalog
        .disorder(&true_disorder)
        .map(|d| d.symptoms.iter().take(3).cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    for symptom in observed {
        service.record_symptom(&case.id, symptom)?;
    }

    println!();
    println!("Hypotheses");
    let hypotheses = service.hypotheses(&case.id)?;
    for hypothesis in hypotheses.iter().take(3) {
        println!(
            "  {:<24} {:>3}%{}",
            hypothesis.disorder_id.as_str(),
            hypothesis.display_percentage(),
            if hypothesis.primary { "  (primary)" } else { "" }
        );
    }

    if let Some(test) = catalog
        .tests()
        .iter()
        .find(|test| test.targets.contains(&true_disorder))
    {
        let result = service.apply_test(&case.id, test.id.clone())?;
        println!();
        println!(
            "Test {}: raw score {} ({})",
            result.test_id, result.raw_score, result.interpretation
        );
    }

    let Some(diagnosis) = hypotheses.first().map(|h| h.disorder_id.clone()) else {
        println!("No hypothesis to act on; cancelling the case.");
        service.cancel(&case.id)?;
        return Ok(());
    };
    service.submit_diagnosis(&case.id, diagnosis.clone())?;
    println!();
    println!("Diagnosis submitted: {diagnosis}");

    let mut tried: Vec<TreatmentId> = Vec::new();
    while let Some(treatment) = pick_treatment(&catalog, &diagnosis, &tried) {
        tried.push(treatment.clone());
        service.submit_treatment(&case.id, treatment.clone())?;
        println!("Treatment proposed: {treatment}");

        let resolution = match service.resolve_treatment(&case.id) {
            Err(CaseServiceError::Case(CaseError::NotReady { remaining_secs })) => {
                println!("  result available in {remaining_secs}s, waiting...");
                clock.advance(config.treatment_wait);
                service.resolve_treatment(&case.id)?
            }
            other => other?,
        };
        println!(
            "  {} | status {} | rapport {}",
            if resolution.outcome.success {
                "improvement"
            } else {
                "no improvement"
            },
            resolution.status,
            resolution.rapport
        );
        if resolution.status != CaseStatus::TreatmentFailed {
            break;
        }
    }

    render_outcome(&case.id, &service)
}

/// First-line options for the diagnosis come first, then merely applicable ones.
fn pick_treatment(
    catalog: &ReferenceCatalog,
    diagnosis: &DisorderId,
    tried: &[TreatmentId],
) -> Option<TreatmentId> {
    let untried = || {
        catalog
            .treatments()
            .iter()
            .filter(|treatment| !tried.contains(&treatment.id))
    };

    untried()
        .find(|t| t.fit_for(diagnosis) == TreatmentFit::FirstLine)
        .or_else(|| untried().find(|t| t.fit_for(diagnosis) == TreatmentFit::Applicable))
        .map(|t| t.id.clone())
}

fn render_outcome(
    case_id: &CaseId,
    service: &CaseService<InMemoryCaseRepository, LocalDialogue>,
) -> Result<(), AppError> {
    let case = service.get(case_id)?;

    println!();
    println!("Outcome: {}", case.status);
    println!("  True disorder:   {}", case.patient.disorder);
    match case.final_score {
        Some(score) => {
            println!("  Diagnosis first try: {}", score.diagnosis_first_try);
            println!("  Treatment first try: {}", score.treatment_first_try);
            println!("  Question quality:    {}", score.question_quality);
            println!("  Life aspects score:  {}", score.life_aspects_score);
            println!("  Final rapport:       {}", score.rapport_final);
            println!(
                "  Total:               {} ({})",
                score.total_score,
                "*".repeat(usize::from(score.stars))
            );
        }
        None => println!("  Case ended without a grade."),
    }
    Ok(())
}
