//! Read-only reference data consumed by the engine: disorders, treatments,
//! psychometric tests and the patient behavior rules keyed by disorder id.
//!
//! A catalog is validated once on construction. Every later lookup failure means
//! a case references an id the catalog no longer carries, which is a fatal
//! configuration problem rather than a caller mistake.

mod standard;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::simulation::domain::{DisorderId, LifeAspect, SymptomId, TestId, TreatmentId};

/// Disorder definition: matched against selected symptoms to rank hypotheses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disorder {
    pub id: DisorderId,
    pub name: String,
    pub category: String,
    /// Minimum number of symptoms required by the diagnostic criteria.
    pub criteria_count: u8,
    pub symptoms: Vec<SymptomId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentIndication {
    pub disorder: DisorderId,
    #[serde(default)]
    pub first_line: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentDefinition {
    pub id: TreatmentId,
    pub name: String,
    #[serde(default)]
    pub indications: Vec<TreatmentIndication>,
}

/// How a treatment relates to a given disorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentFit {
    FirstLine,
    Applicable,
    Unrelated,
}

impl TreatmentDefinition {
    pub fn fit_for(&self, disorder: &DisorderId) -> TreatmentFit {
        match self
            .indications
            .iter()
            .find(|indication| &indication.disorder == disorder)
        {
            Some(indication) if indication.first_line => TreatmentFit::FirstLine,
            Some(_) => TreatmentFit::Applicable,
            None => TreatmentFit::Unrelated,
        }
    }
}

/// Inclusive raw-score interval with its clinical reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: u16,
    pub max: u16,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: TestId,
    pub name: String,
    /// Disorders for which the test reads elevated.
    #[serde(default)]
    pub targets: Vec<DisorderId>,
    /// Ordered, non-overlapping bands covering the scoring range.
    pub bands: Vec<ScoreBand>,
}

impl TestDefinition {
    pub fn band_for(&self, raw_score: u16) -> Option<&ScoreBand> {
        self.bands
            .iter()
            .find(|band| raw_score >= band.min && raw_score <= band.max)
    }

    pub fn lowest_band(&self) -> Option<&ScoreBand> {
        self.bands.first()
    }

    pub fn highest_band(&self) -> Option<&ScoreBand> {
        self.bands.last()
    }
}

/// Reply material for the local dialogue generator, stored per disorder id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    pub disorder: DisorderId,
    pub general_lines: Vec<String>,
    #[serde(default)]
    pub aspect_lines: BTreeMap<LifeAspect, String>,
}

/// Serialized catalog shape, as loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogData {
    pub disorders: Vec<Disorder>,
    #[serde(default)]
    pub treatments: Vec<TreatmentDefinition>,
    #[serde(default)]
    pub tests: Vec<TestDefinition>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorProfile>,
}

/// Fatal catalog problems. The engine refuses to run until these are fixed.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{kind} entry has an empty id")]
    EmptyId { kind: &'static str },
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("disorder '{0}' declares a criteria count of zero")]
    ZeroCriteria(DisorderId),
    #[error("disorder '{0}' lists no symptoms")]
    NoSymptoms(DisorderId),
    #[error("{owner} references unknown disorder '{disorder}'")]
    DanglingDisorder { owner: String, disorder: DisorderId },
    #[error("test '{0}' has empty, inverted or overlapping score bands")]
    InvalidScoreBands(TestId),
    #[error("catalog has no disorder '{0}'")]
    MissingDisorder(DisorderId),
    #[error("catalog has no treatment '{0}'")]
    MissingTreatment(TreatmentId),
    #[error("unable to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Validated, immutable reference catalog.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    disorders: Vec<Disorder>,
    treatments: Vec<TreatmentDefinition>,
    tests: Vec<TestDefinition>,
    behaviors: Vec<BehaviorProfile>,
    symptoms: BTreeSet<SymptomId>,
}

impl ReferenceCatalog {
    pub fn new(data: CatalogData) -> Result<Self, CatalogError> {
        let CatalogData {
            disorders,
            treatments,
            tests,
            behaviors,
        } = data;

        let mut disorder_ids = BTreeSet::new();
        for disorder in &disorders {
            check_id("disorder", disorder.id.as_str(), &mut disorder_ids)?;
            if disorder.criteria_count == 0 {
                return Err(CatalogError::ZeroCriteria(disorder.id.clone()));
            }
            if disorder.symptoms.is_empty() {
                return Err(CatalogError::NoSymptoms(disorder.id.clone()));
            }
        }

        let known = |owner: String, disorder: &DisorderId| {
            if disorder_ids.contains(disorder.as_str()) {
                Ok(())
            } else {
                Err(CatalogError::DanglingDisorder {
                    owner,
                    disorder: disorder.clone(),
                })
            }
        };

        let mut treatment_ids = BTreeSet::new();
        for treatment in &treatments {
            check_id("treatment", treatment.id.as_str(), &mut treatment_ids)?;
            for indication in &treatment.indications {
                known(format!("treatment '{}'", treatment.id), &indication.disorder)?;
            }
        }

        let mut test_ids = BTreeSet::new();
        for test in &tests {
            check_id("test", test.id.as_str(), &mut test_ids)?;
            if !bands_are_ordered(&test.bands) {
                return Err(CatalogError::InvalidScoreBands(test.id.clone()));
            }
            for target in &test.targets {
                known(format!("test '{}'", test.id), target)?;
            }
        }

        let mut behavior_ids = BTreeSet::new();
        for behavior in &behaviors {
            check_id("behavior", behavior.disorder.as_str(), &mut behavior_ids)?;
            known("behavior profile".to_string(), &behavior.disorder)?;
        }

        let symptoms = disorders
            .iter()
            .flat_map(|disorder| disorder.symptoms.iter().cloned())
            .collect();

        Ok(Self {
            disorders,
            treatments,
            tests,
            behaviors,
            symptoms,
        })
    }

    /// Built-in catalog used by the demo and when no catalog path is configured.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::new(standard::standard_catalog())
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_reader(reader)?;
        Self::new(data)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Disorders in declaration order.
    pub fn disorders(&self) -> &[Disorder] {
        &self.disorders
    }

    pub fn treatments(&self) -> &[TreatmentDefinition] {
        &self.treatments
    }

    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    pub fn disorder(&self, id: &DisorderId) -> Option<&Disorder> {
        self.disorders.iter().find(|disorder| &disorder.id == id)
    }

    pub fn treatment(&self, id: &TreatmentId) -> Option<&TreatmentDefinition> {
        self.treatments.iter().find(|treatment| &treatment.id == id)
    }

    pub fn test(&self, id: &TestId) -> Option<&TestDefinition> {
        self.tests.iter().find(|test| &test.id == id)
    }

    pub fn behavior(&self, disorder: &DisorderId) -> Option<&BehaviorProfile> {
        self.behaviors
            .iter()
            .find(|behavior| &behavior.disorder == disorder)
    }

    pub fn knows_symptom(&self, symptom: &SymptomId) -> bool {
        self.symptoms.contains(symptom)
    }

    pub fn require_disorder(&self, id: &DisorderId) -> Result<&Disorder, CatalogError> {
        self.disorder(id)
            .ok_or_else(|| CatalogError::MissingDisorder(id.clone()))
    }

    pub fn require_treatment(&self, id: &TreatmentId) -> Result<&TreatmentDefinition, CatalogError> {
        self.treatment(id)
            .ok_or_else(|| CatalogError::MissingTreatment(id.clone()))
    }
}

fn check_id(
    kind: &'static str,
    id: &str,
    seen: &mut BTreeSet<String>,
) -> Result<(), CatalogError> {
    if id.trim().is_empty() {
        return Err(CatalogError::EmptyId { kind });
    }
    if !seen.insert(id.to_string()) {
        return Err(CatalogError::DuplicateId {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn bands_are_ordered(bands: &[ScoreBand]) -> bool {
    if bands.is_empty() || bands.iter().any(|band| band.min > band.max) {
        return false;
    }
    bands.windows(2).all(|pair| pair[1].min > pair[0].max)
}
