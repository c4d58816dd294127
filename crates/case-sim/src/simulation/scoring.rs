use super::domain::{Case, FinalScore, LifeAspect};

/// Question quality assumed when the transcript holds no scored reply.
pub const DEFAULT_QUESTION_QUALITY: u8 = 50;

const DIAGNOSIS_FIRST_TRY_POINTS: u32 = 20;
const TREATMENT_FIRST_TRY_POINTS: u32 = 30;
const TREATMENT_EVENTUAL_POINTS: u32 = 15;
// Weights in hundredths.
const QUESTION_WEIGHT: u32 = 25;
const ASPECT_WEIGHT: u32 = 15;
const RAPPORT_WEIGHT: u32 = 10;

/// Grades a finished case. Pure: the same case always yields the same score.
pub fn compute_final_score(case: &Case) -> FinalScore {
    let diagnosis_first_try = case.diagnosis_correct == Some(true);
    let treatment_first_try = case.treatment_attempts == 1 && case.treatment_correct == Some(true);

    let question_quality = mean_question_quality(case);
    let life_aspects_score = life_aspects_score(case);
    let rapport_final = case.rapport.min(100);

    // A diagnosis cannot be revised, so it is either right first time or never.
    let diagnosis_points = if diagnosis_first_try {
        DIAGNOSIS_FIRST_TRY_POINTS
    } else {
        0
    };
    let treatment_points = if treatment_first_try {
        TREATMENT_FIRST_TRY_POINTS
    } else if case.treatment_correct == Some(true) {
        TREATMENT_EVENTUAL_POINTS
    } else {
        0
    };

    let hundredths = (diagnosis_points + treatment_points) * 100
        + QUESTION_WEIGHT * u32::from(question_quality)
        + ASPECT_WEIGHT * u32::from(life_aspects_score)
        + RAPPORT_WEIGHT * u32::from(rapport_final);
    let total_score = ((hundredths + 50) / 100).min(100) as u8;

    FinalScore {
        diagnosis_first_try,
        treatment_first_try,
        question_quality,
        life_aspects_score,
        rapport_final,
        total_score,
        stars: stars_for(total_score),
    }
}

pub fn stars_for(total_score: u8) -> u8 {
    match total_score {
        90.. => 5,
        75..=89 => 4,
        55..=74 => 3,
        35..=54 => 2,
        _ => 1,
    }
}

fn mean_question_quality(case: &Case) -> u8 {
    let (sum, count) = case
        .patient_quality_scores()
        .fold((0u32, 0u32), |(sum, count), score| {
            (sum + u32::from(score), count + 1)
        });

    if count == 0 {
        return DEFAULT_QUESTION_QUALITY;
    }

    ((sum * 2 + count) / (count * 2)).min(100) as u8
}

fn life_aspects_score(case: &Case) -> u8 {
    let explored = case.explored_aspect_count().min(LifeAspect::ALL.len());
    (explored * 100 / LifeAspect::ALL.len()) as u8
}
