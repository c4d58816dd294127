//! Patient reply generation.
//!
//! A [`DialogueGenerator`] is an injected collaborator, typically backed by a
//! remote language model. [`generate_with_fallback`] bounds it by the mode's
//! timeout and substitutes [`LocalDialogue`] on timeout or error, so callers
//! always receive the same reply shape.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use super::domain::{Case, CaseId, DisorderId, GameMode, LifeAspect, Message, Personality};
use crate::catalog::ReferenceCatalog;

const UNSCRIPTED_LINE: &str = "No sé muy bien qué decirle, la verdad.";

/// Snapshot of what a generator needs to answer one utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueRequest {
    pub case_id: CaseId,
    pub utterance: String,
    pub mode: GameMode,
    pub disorder: DisorderId,
    pub personality: Personality,
    pub rapport: u8,
    pub history: Vec<Message>,
}

impl DialogueRequest {
    pub fn from_case(case: &Case, utterance: &str) -> Self {
        Self {
            case_id: case.id.clone(),
            utterance: utterance.to_string(),
            mode: case.mode,
            disorder: case.patient.disorder.clone(),
            personality: case.patient.personality,
            rapport: case.rapport,
            history: case.messages.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueReply {
    pub text: String,
    /// Question quality base suggested by the generator, if it grades questions.
    pub base_score: Option<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("dialogue backend unavailable: {0}")]
    Unavailable(String),
    #[error("dialogue backend returned an unusable reply: {0}")]
    InvalidReply(String),
}

pub trait DialogueGenerator: Send + Sync {
    fn generate(
        &self,
        request: DialogueRequest,
    ) -> impl Future<Output = Result<DialogueReply, DialogueError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Generator,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub reply: DialogueReply,
    pub source: ReplySource,
}

/// Deterministic generator backed by the catalog's behavior profiles.
#[derive(Debug, Clone)]
pub struct LocalDialogue {
    catalog: Arc<ReferenceCatalog>,
}

impl LocalDialogue {
    pub fn new(catalog: Arc<ReferenceCatalog>) -> Self {
        Self { catalog }
    }

    /// Same utterance and history length always yield the same line.
    pub fn reply(&self, request: &DialogueRequest) -> DialogueReply {
        let line = self
            .catalog
            .behavior(&request.disorder)
            .and_then(|profile| {
                let mentioned = LifeAspect::detect(&request.utterance);
                mentioned
                    .iter()
                    .find_map(|aspect| profile.aspect_lines.get(aspect))
                    .or_else(|| {
                        if profile.general_lines.is_empty() {
                            return None;
                        }
                        let index = selection_seed(request) % profile.general_lines.len() as u64;
                        profile.general_lines.get(index as usize)
                    })
            })
            .map(String::as_str)
            .unwrap_or(UNSCRIPTED_LINE);

        DialogueReply {
            text: format!("{}{}", personality_prefix(request.personality), line),
            base_score: None,
        }
    }
}

impl DialogueGenerator for LocalDialogue {
    fn generate(
        &self,
        request: DialogueRequest,
    ) -> impl Future<Output = Result<DialogueReply, DialogueError>> + Send {
        std::future::ready(Ok(self.reply(&request)))
    }
}

/// Runs `generator` under `limit`, answering locally when it times out or fails.
pub async fn generate_with_fallback<D>(
    generator: &D,
    fallback: &LocalDialogue,
    request: DialogueRequest,
    limit: Duration,
) -> GeneratedReply
where
    D: DialogueGenerator,
{
    match tokio::time::timeout(limit, generator.generate(request.clone())).await {
        Ok(Ok(reply)) => GeneratedReply {
            reply,
            source: ReplySource::Generator,
        },
        Ok(Err(error)) => {
            warn!(case_id = %request.case_id, %error, "dialogue generator failed, answering locally");
            local(fallback, &request)
        }
        Err(_) => {
            warn!(
                case_id = %request.case_id,
                timeout_secs = limit.as_secs(),
                "dialogue generator timed out, answering locally"
            );
            local(fallback, &request)
        }
    }
}

fn local(fallback: &LocalDialogue, request: &DialogueRequest) -> GeneratedReply {
    GeneratedReply {
        reply: fallback.reply(request),
        source: ReplySource::Fallback,
    }
}

fn selection_seed(request: &DialogueRequest) -> u64 {
    request
        .utterance
        .bytes()
        .fold(request.history.len() as u64, |acc, byte| {
            acc.wrapping_mul(31).wrapping_add(u64::from(byte))
        })
}

fn personality_prefix(personality: Personality) -> &'static str {
    match personality {
        Personality::Cooperative => "",
        Personality::Reserved => "(en voz baja) ",
        Personality::Anxious => "(se frota las manos) ",
        Personality::Guarded => "No sé si debería contarle esto... ",
        Personality::Talkative => "Pues mire, le cuento: ",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::domain::{Patient, Sender};
    use chrono::Utc;

    fn local() -> LocalDialogue {
        LocalDialogue::new(Arc::new(ReferenceCatalog::standard().expect("standard catalog")))
    }

    fn request(utterance: &str, personality: Personality) -> DialogueRequest {
        let case = Case::new(
            CaseId::from("case-dialogue"),
            Patient {
                name: "Lucía".to_string(),
                age: 34,
                disorder: DisorderId::from("depresion_mayor"),
                personality,
                rapport_baseline: 50,
            },
            GameMode::Hard,
        );
        DialogueRequest::from_case(&case, utterance)
    }

    #[test]
    fn aspect_line_wins_when_the_utterance_names_an_aspect() {
        let reply = local().reply(&request("¿Cómo está su familia?", Personality::Cooperative));
        assert!(reply.text.starts_with("Mi familia dice"));
        assert!(reply.base_score.is_none());
    }

    #[test]
    fn general_line_is_stable_for_the_same_input() {
        let dialogue = local();
        let first = dialogue.reply(&request("¿Qué le trae por aquí?", Personality::Cooperative));
        let second = dialogue.reply(&request("¿Qué le trae por aquí?", Personality::Cooperative));
        assert_eq!(first, second);
    }

    #[test]
    fn history_length_shifts_the_general_line() {
        let dialogue = local();
        let mut request = request("¿Qué le trae por aquí?", Personality::Cooperative);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..6 {
            seen.insert(dialogue.reply(&request).text);
            request.history.push(Message {
                sender: Sender::User,
                text: "...".to_string(),
                quality_score: None,
                sent_at: Utc::now(),
            });
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn personality_prefixes_the_line() {
        let reply = local().reply(&request("¿Cómo duerme?", Personality::Guarded));
        assert!(reply.text.starts_with("No sé si debería contarle esto... "));
        assert!(reply.text.contains("cuatro de la mañana"));
    }

    #[test]
    fn unknown_disorder_still_answers() {
        let mut request = request("Hola", Personality::Cooperative);
        request.disorder = DisorderId::from("sin_perfil");
        assert_eq!(local().reply(&request).text, UNSCRIPTED_LINE);
    }

    struct Broken;

    impl DialogueGenerator for Broken {
        async fn generate(&self, _request: DialogueRequest) -> Result<DialogueReply, DialogueError> {
            Err(DialogueError::Unavailable("offline".to_string()))
        }
    }

    struct Stalled;

    impl DialogueGenerator for Stalled {
        async fn generate(&self, _request: DialogueRequest) -> Result<DialogueReply, DialogueError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(DialogueReply {
                text: "too late".to_string(),
                base_score: Some(90),
            })
        }
    }

    #[tokio::test]
    async fn errors_fall_back_to_local_replies() {
        let fallback = local();
        let request = request("¿Cómo está su familia?", Personality::Cooperative);

        let generated =
            generate_with_fallback(&Broken, &fallback, request.clone(), Duration::from_secs(1)).await;

        assert_eq!(generated.source, ReplySource::Fallback);
        assert_eq!(generated.reply, fallback.reply(&request));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_fall_back_to_local_replies() {
        let fallback = local();
        let request = request("¿Cómo está su familia?", Personality::Cooperative);

        let generated =
            generate_with_fallback(&Stalled, &fallback, request, Duration::from_secs(10)).await;

        assert_eq!(generated.source, ReplySource::Fallback);
        assert!(generated.reply.base_score.is_none());
    }
}
