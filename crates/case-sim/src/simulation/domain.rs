use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for simulated cases.
    CaseId
);
string_id!(
    /// Stable catalog key of a disorder definition.
    DisorderId
);
string_id!(SymptomId);
string_id!(TreatmentId);
string_id!(
    /// Catalog key of a psychometric test.
    TestId
);

/// Temperament of the simulated patient; drives how replies are phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    Cooperative,
    Reserved,
    Anxious,
    Guarded,
    Talkative,
}

/// Simulated patient. `disorder` is the ground truth the trainee tries to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub name: String,
    pub age: u8,
    pub disorder: DisorderId,
    pub personality: Personality,
    pub rapport_baseline: u8,
}

/// Difficulty setting; scales question scores and dialogue timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Training,
    Hard,
    Realistic,
}

impl GameMode {
    pub const fn label(self) -> &'static str {
        match self {
            GameMode::Training => "training",
            GameMode::Hard => "hard",
            GameMode::Realistic => "realistic",
        }
    }
}

/// Position of a case in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    New,
    Active,
    AwaitingTreatment,
    AwaitingResult,
    TreatmentFailed,
    Completed,
    Failed,
    Cancelled,
}

impl CaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CaseStatus::New => "new",
            CaseStatus::Active => "active",
            CaseStatus::AwaitingTreatment => "awaiting_treatment",
            CaseStatus::AwaitingResult => "awaiting_result",
            CaseStatus::TreatmentFailed => "treatment_failed",
            CaseStatus::Completed => "completed",
            CaseStatus::Failed => "failed",
            CaseStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            CaseStatus::Completed | CaseStatus::Failed | CaseStatus::Cancelled
        )
    }

    /// True once the interview has started and the case has not ended.
    pub const fn is_in_progress(self) -> bool {
        !self.is_terminal() && !matches!(self, CaseStatus::New)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The ten areas of the patient's life an interviewer is expected to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeAspect {
    Family,
    Partner,
    Work,
    Social,
    Health,
    Sleep,
    Leisure,
    Finances,
    Childhood,
    Substances,
}

impl LifeAspect {
    pub const ALL: [LifeAspect; 10] = [
        LifeAspect::Family,
        LifeAspect::Partner,
        LifeAspect::Work,
        LifeAspect::Social,
        LifeAspect::Health,
        LifeAspect::Sleep,
        LifeAspect::Leisure,
        LifeAspect::Finances,
        LifeAspect::Childhood,
        LifeAspect::Substances,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            LifeAspect::Family => "family",
            LifeAspect::Partner => "partner",
            LifeAspect::Work => "work",
            LifeAspect::Social => "social",
            LifeAspect::Health => "health",
            LifeAspect::Sleep => "sleep",
            LifeAspect::Leisure => "leisure",
            LifeAspect::Finances => "finances",
            LifeAspect::Childhood => "childhood",
            LifeAspect::Substances => "substances",
        }
    }

    /// Lower-case words that signal the aspect is being explored. A trailing `*`
    /// marks a stem matching any word it starts; multi-word entries must appear
    /// as consecutive words.
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            LifeAspect::Family => &[
                "familia*", "padre", "padres", "madre", "madres", "herman*", "hijo", "hijos",
                "hija", "hijas", "family", "parents",
            ],
            LifeAspect::Partner => &[
                "pareja*", "espos*", "novio", "novia", "novios", "novias", "matrimonio*",
                "partner", "spouse",
            ],
            LifeAspect::Work => &["trabaj*", "empleo*", "jefe*", "oficina*", "estudi*", "work", "job*"],
            LifeAspect::Social => &["amig*", "social*", "salir con", "gente", "friend*"],
            LifeAspect::Health => &["salud", "médic*", "medic*", "enfermedad*", "dolor*", "health"],
            LifeAspect::Sleep => &["dormir", "duerm*", "sueño*", "descans*", "sleep*"],
            LifeAspect::Leisure => &[
                "tiempo libre", "hobby", "hobbies", "pasatiempo*", "diversión", "disfrut*", "leisure",
            ],
            LifeAspect::Finances => &["dinero", "económic*", "deuda*", "finanz*", "money"],
            LifeAspect::Childhood => &[
                "infancia", "niñez", "de niño", "de niña", "de pequeño", "de pequeña", "childhood",
            ],
            LifeAspect::Substances => &[
                "alcohol*", "beber", "bebe", "droga*", "fuma*", "fumar", "sustancia*", "drugs",
            ],
        }
    }

    /// Aspects mentioned by a free-text utterance, matched on whole words.
    pub fn detect(text: &str) -> Vec<LifeAspect> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();

        LifeAspect::ALL
            .into_iter()
            .filter(|aspect| aspect.keywords().iter().any(|kw| mentions(&words, kw)))
            .collect()
    }
}

fn mentions(words: &[&str], keyword: &str) -> bool {
    let (phrase, stem) = match keyword.strip_suffix('*') {
        Some(phrase) => (phrase, true),
        None => (keyword, false),
    };
    let parts: Vec<&str> = phrase.split(' ').collect();
    let last = parts.len() - 1;

    words.windows(parts.len()).any(|window| {
        window.iter().zip(&parts).enumerate().all(|(index, (word, part))| {
            if stem && index == last {
                word.starts_with(part)
            } else {
                word == part
            }
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Patient,
}

/// One line of the interview transcript. Only patient replies carry a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: TestId,
    pub raw_score: u16,
    pub interpretation: String,
}

/// Graded outcome, computed once when a case reaches `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub diagnosis_first_try: bool,
    pub treatment_first_try: bool,
    pub question_quality: u8,
    pub life_aspects_score: u8,
    pub rapport_final: u8,
    pub total_score: u8,
    pub stars: u8,
}

pub const MAX_TREATMENT_ATTEMPTS: u8 = 2;
pub const MAX_TESTS: usize = 2;

/// The central aggregate. Mutated only through `simulation::lifecycle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub patient: Patient,
    pub mode: GameMode,
    pub status: CaseStatus,
    pub selected_symptoms: BTreeSet<SymptomId>,
    pub diagnosis: Option<DisorderId>,
    pub diagnosis_correct: Option<bool>,
    pub treatment: Option<TreatmentId>,
    pub treatment_attempts: u8,
    pub treatment_correct: Option<bool>,
    pub treatment_sent_at: Option<DateTime<Utc>>,
    pub tests_applied: Vec<TestId>,
    pub tests_results: Vec<TestResult>,
    pub rapport: u8,
    pub life_aspects_explored: BTreeMap<LifeAspect, bool>,
    pub sessions: u32,
    pub messages: Vec<Message>,
    pub final_score: Option<FinalScore>,
}

impl Case {
    pub fn new(id: CaseId, patient: Patient, mode: GameMode) -> Self {
        let rapport = patient.rapport_baseline.min(100);
        Self {
            id,
            patient,
            mode,
            status: CaseStatus::New,
            selected_symptoms: BTreeSet::new(),
            diagnosis: None,
            diagnosis_correct: None,
            treatment: None,
            treatment_attempts: 0,
            treatment_correct: None,
            treatment_sent_at: None,
            tests_applied: Vec::new(),
            tests_results: Vec::new(),
            rapport,
            life_aspects_explored: LifeAspect::ALL.into_iter().map(|a| (a, false)).collect(),
            sessions: 0,
            messages: Vec::new(),
            final_score: None,
        }
    }

    pub(crate) fn adjust_rapport(&mut self, delta: i16) {
        self.rapport = (i16::from(self.rapport) + delta).clamp(0, 100) as u8;
    }

    pub fn explored_aspect_count(&self) -> usize {
        self.life_aspects_explored.values().filter(|flag| **flag).count()
    }

    pub fn patient_quality_scores(&self) -> impl Iterator<Item = u8> + '_ {
        self.messages
            .iter()
            .filter(|message| message.sender == Sender::Patient)
            .filter_map(|message| message.quality_score)
    }

    /// Diagnosis correctness, hidden until the case has ended.
    pub fn revealed_diagnosis_correct(&self) -> Option<bool> {
        if self.status.is_terminal() {
            self.diagnosis_correct
        } else {
            None
        }
    }
}
