use serde::{Deserialize, Serialize};

use super::domain::GameMode;
use super::random::RandomSource;

/// Inclusive range of the random base used when no remote score is available.
pub const LOCAL_BASE_MIN: u16 = 40;
pub const LOCAL_BASE_MAX: u16 = 80;

const OPEN_ENDED_BONUS: i16 = 15;
const EMPATHY_BONUS: i16 = 10;
const CLOSED_PENALTY: i16 = -10;
const LEADING_PENALTY: i16 = -15;

const OPEN_STARTERS: &[&str] = &[
    "cómo",
    "qué",
    "por qué",
    "cuál",
    "cuándo",
    "de qué manera",
    "en qué",
    "cuénteme",
    "cuéntame",
    "hábleme",
    "háblame",
    "describa",
    "describe",
    "explíqueme",
    "how",
    "what",
    "why",
    "tell me",
];

const EMPATHY_MARKERS: &[&str] = &[
    "entiendo",
    "comprendo",
    "me imagino",
    "debe ser difícil",
    "debe de ser difícil",
    "lamento",
    "gracias por compartir",
    "gracias por contarme",
    "es normal sentirse",
    "tiene sentido que",
    "i understand",
    "that sounds hard",
    "thank you for sharing",
];

const CLOSED_STARTERS: &[&str] = &[
    "es",
    "está",
    "estás",
    "tiene",
    "tienes",
    "ha",
    "has",
    "hay",
    "puede",
    "puedes",
    "se siente",
    "le",
    "te",
    "duerme",
    "toma",
    "do you",
    "are you",
    "is",
    "have you",
    "did you",
];

const CLOSED_MARKERS: &[&str] = &["sí o no", "si o no", "yes or no"];

const LEADING_MARKERS: &[&str] = &[
    "no cree que",
    "no crees que",
    "no le parece",
    "no te parece",
    "no es cierto",
    "¿no?",
    ", no?",
    "verdad?",
    "supongo que",
    "seguro que",
    "seguramente",
    "don't you think",
    "isn't it",
    "wouldn't you agree",
];

/// Which phrasing patterns a question triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAssessment {
    pub open_ended: bool,
    pub empathic: bool,
    pub closed: bool,
    pub leading: bool,
}

impl QuestionAssessment {
    pub fn bonus(&self) -> i16 {
        let mut bonus = 0;
        if self.open_ended {
            bonus += OPEN_ENDED_BONUS;
        }
        if self.empathic {
            bonus += EMPATHY_BONUS;
        }
        if self.closed {
            bonus += CLOSED_PENALTY;
        }
        if self.leading {
            bonus += LEADING_PENALTY;
        }
        bonus
    }
}

pub fn assess_question(text: &str) -> QuestionAssessment {
    let folded = fold_accents(&text.to_lowercase());
    let opening = folded.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '¿' | '¡' | '"' | '\'' | '-')
    });
    let contains_any = |markers: &[&str]| {
        markers
            .iter()
            .any(|marker| folded.contains(fold_accents(marker).as_str()))
    };

    QuestionAssessment {
        open_ended: opens_with_any(opening, OPEN_STARTERS),
        empathic: contains_any(EMPATHY_MARKERS),
        closed: opens_with_any(opening, CLOSED_STARTERS) || contains_any(CLOSED_MARKERS),
        leading: contains_any(LEADING_MARKERS),
    }
}

/// True when `opening` begins with one of `starters` followed by a word break.
fn opens_with_any(opening: &str, starters: &[&str]) -> bool {
    starters.iter().any(|starter| {
        let starter = fold_accents(starter);
        opening.strip_prefix(starter.as_str()).is_some_and(|rest| {
            rest.chars()
                .next()
                .map_or(true, |next| !next.is_alphanumeric())
        })
    })
}

/// Drops acute, grave, circumflex and diaeresis marks from vowels; `ñ` is kept.
fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

/// Scores a question from a known base, e.g. one supplied by a remote dialogue model.
pub fn score_question_with_base(text: &str, mode: GameMode, base: u8) -> u8 {
    let raw = f64::from(base.min(100)) + f64::from(assess_question(text).bonus());

    let adjusted = match mode {
        GameMode::Training => (raw * 1.2).min(100.0),
        GameMode::Hard => raw,
        GameMode::Realistic => (raw * 0.8).max(10.0),
    };

    adjusted.round().clamp(0.0, 100.0) as u8
}

/// Scores a question with a random base in `[40, 80]`.
pub fn score_question(text: &str, mode: GameMode, random: &mut dyn RandomSource) -> u8 {
    let base = random.between(LOCAL_BASE_MIN, LOCAL_BASE_MAX).min(100) as u8;
    score_question_with_base(text, mode, base)
}
