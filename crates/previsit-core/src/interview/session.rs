//! Interview session state machine
//!
//! One session owns the conversation history for one patient and drives
//! every model call through the cache-checked collaborators. History is
//! append-only and is the only source of truth for what has been said;
//! the turn count is derived from its length.

use crate::config::InterviewSettings;
use crate::error::{CoreError, CoreResult};
use crate::interview::patient::PatientProfile;
use crate::interview::prompts;
use crate::llm::sanitize::strip_thinking_blocks;
use crate::llm::{ChatMessage, MessageRole, TextGenerator};
use crate::report::ReportWriter;
use crate::speech::{CachedSpeech, SpeechOutcome};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle state of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no opening question asked yet
    NotStarted,
    /// Interview underway
    InProgress,
    /// Terminal: completion marker seen or turn cap reached
    Complete,
}

/// Result of one interview turn.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// The interviewer's latest line, cleaned for display
    pub message: String,
    /// Synthesized speech for `message`
    pub audio: SpeechOutcome,
    /// Whether the interview has ended
    pub complete: bool,
    /// Snapshot of the conversation history after this turn
    pub history: Vec<ChatMessage>,
}

/// A single patient's interview.
///
/// Not safe for concurrent turns: callers must serialize `start` and
/// `process_response` per session (the manager hands out sessions behind
/// an async mutex for exactly this reason).
pub struct InterviewSession {
    id: Uuid,
    patient: PatientProfile,
    condition: String,
    symptoms: String,
    generator: Arc<dyn TextGenerator>,
    speech: Arc<CachedSpeech>,
    settings: InterviewSettings,
    ehr_summary: Option<String>,
    history: Vec<ChatMessage>,
    state: SessionState,
}

impl InterviewSession {
    /// Create a session for `patient` presenting with `condition`.
    pub fn new(
        patient: PatientProfile,
        condition: impl Into<String>,
        symptoms: impl Into<String>,
        generator: Arc<dyn TextGenerator>,
        speech: Arc<CachedSpeech>,
        settings: InterviewSettings,
    ) -> Self {
        let ehr_summary = patient.ehr_summary.clone();
        Self {
            id: Uuid::new_v4(),
            patient,
            condition: condition.into(),
            symptoms: symptoms.into(),
            generator,
            speech,
            settings,
            ehr_summary,
            history: Vec::new(),
            state: SessionState::NotStarted,
        }
    }

    /// Unique id of this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The patient being interviewed.
    pub fn patient(&self) -> &PatientProfile {
        &self.patient
    }

    /// The condition driving the roleplayed symptoms.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the interview has ended.
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    /// Number of history entries so far.
    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// The append-only conversation history.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Ask the opening question and transition to `InProgress`.
    pub async fn start(&mut self) -> CoreResult<TurnOutput> {
        if self.state != SessionState::NotStarted {
            return Err(CoreError::session(format!(
                "interview for {} already started",
                self.patient.name
            )));
        }

        info!(session = %self.id, patient = %self.patient.name, "starting interview");
        let ehr_summary = self.ensure_ehr_summary().await?;
        let dialog = vec![
            ChatMessage::system(prompts::interviewer_instructions(&self.patient, &ehr_summary)),
            ChatMessage::user(prompts::START_TRIGGER),
        ];

        let raw = self.generator.complete(&dialog, &self.settings.params).await?;
        let reply = strip_thinking_blocks(&raw);
        self.history.push(ChatMessage::assistant(reply.clone()));
        self.state = SessionState::InProgress;

        let message = prompts::remove_completion_marker(&reply);
        let audio = self.speak(&message).await;

        Ok(TurnOutput {
            message,
            audio,
            complete: false,
            history: self.history.clone(),
        })
    }

    /// Run one exchange: simulate the patient's answer to `user_message`,
    /// then obtain the interviewer's follow-up.
    ///
    /// Once the session is complete this is a no-op that repeats the
    /// terminal state, so a looping caller can never trigger runaway
    /// generation.
    pub async fn process_response(&mut self, user_message: &str) -> CoreResult<TurnOutput> {
        match self.state {
            SessionState::NotStarted => {
                return Err(CoreError::session(format!(
                    "interview for {} has not started",
                    self.patient.name
                )));
            }
            SessionState::Complete => {
                debug!(session = %self.id, "process_response after completion is a no-op");
                return Ok(self.terminal_output());
            }
            SessionState::InProgress => {}
        }

        let ehr_summary = self.ensure_ehr_summary().await?;

        // Simulated patient reply, keyed on the question plus the full
        // persona context (which embeds the running Q&A history).
        let persona = prompts::patient_instructions(
            &self.patient,
            &self.symptoms,
            &ehr_summary,
            &self.previous_answers(),
        );
        let question = vec![
            ChatMessage::system(persona),
            ChatMessage::user(format!("Question: {user_message}")),
        ];
        let raw_answer = self.generator.complete(&question, &self.settings.params).await?;
        let patient_reply = strip_thinking_blocks(&raw_answer);
        self.history.push(ChatMessage::user(patient_reply));

        // Interviewer follow-up over the whole dialog so far.
        let mut dialog = vec![
            ChatMessage::system(prompts::interviewer_instructions(&self.patient, &ehr_summary)),
            ChatMessage::user(prompts::START_TRIGGER),
        ];
        dialog.extend(self.history.iter().cloned());
        let raw_followup = self.generator.complete(&dialog, &self.settings.params).await?;
        let followup = strip_thinking_blocks(&raw_followup);
        self.history.push(ChatMessage::assistant(followup.clone()));

        let marker_seen = followup.contains(prompts::COMPLETION_MARKER);
        let cap_reached = self.history.len() >= self.settings.turn_limit;
        if marker_seen || cap_reached {
            info!(
                session = %self.id,
                turns = self.history.len(),
                marker_seen,
                cap_reached,
                "interview complete"
            );
            self.state = SessionState::Complete;
        }

        let message = prompts::remove_completion_marker(&followup);
        let audio = self.speak(&message).await;

        Ok(TurnOutput {
            message,
            audio,
            complete: self.state == SessionState::Complete,
            history: self.history.clone(),
        })
    }

    /// Summarize the full history plus patient attributes into a
    /// structured report. Callable in any state; does not mutate history.
    pub async fn generate_report(&self) -> CoreResult<String> {
        let ehr_summary = self
            .ehr_summary
            .clone()
            .or_else(|| self.patient.ehr_summary.clone())
            .unwrap_or_default();
        let writer = ReportWriter::new(self.generator.clone(), self.settings.params.clone());
        writer.update(&ehr_summary, &self.transcript(), None).await
    }

    /// Speaker-labeled transcript of the conversation. Pure projection of
    /// the history; no side effects.
    pub fn transcript(&self) -> String {
        self.history
            .iter()
            .map(|message| match message.role {
                MessageRole::Assistant => format!("Interviewer: {}", message.content),
                MessageRole::User => format!("Patient: {}", message.content),
                MessageRole::System => format!("System: {}", message.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ------------------------------------------------------------------ //
    // Internal helpers
    // ------------------------------------------------------------------ //

    async fn ensure_ehr_summary(&mut self) -> CoreResult<String> {
        if let Some(summary) = &self.ehr_summary {
            return Ok(summary.clone());
        }

        let record = serde_json::to_string(&self.patient)?;
        let messages = vec![
            ChatMessage::system(prompts::ehr_summary_instructions(&self.patient.name)),
            ChatMessage::user(record),
        ];
        let raw = self.generator.complete(&messages, &self.settings.params).await?;
        let summary = strip_thinking_blocks(&raw);
        self.ehr_summary = Some(summary.clone());
        Ok(summary)
    }

    /// Q&A pairs answered so far, threaded into the patient persona so the
    /// roleplay stays consistent across turns.
    fn previous_answers(&self) -> String {
        let mut out = String::new();
        let mut pending_question: Option<&str> = None;
        for message in &self.history {
            match message.role {
                MessageRole::Assistant => pending_question = Some(&message.content),
                MessageRole::User => {
                    if let Some(question) = pending_question.take() {
                        out.push_str(&format!(
                            "Q: {}\nA: {}\n",
                            prompts::remove_completion_marker(question),
                            message.content
                        ));
                    }
                }
                MessageRole::System => {}
            }
        }
        out
    }

    async fn speak(&self, text: &str) -> SpeechOutcome {
        self.speech
            .synthesize(
                &prompts::interviewer_tts_style(text),
                &self.settings.interviewer_voice,
            )
            .await
    }

    fn terminal_output(&self) -> TurnOutput {
        let message = self
            .history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| prompts::remove_completion_marker(&m.content))
            .unwrap_or_default();
        TurnOutput {
            message,
            audio: SpeechOutcome::Disabled,
            complete: true,
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PersistentCache;
    use crate::llm::GenerationParams;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Generator that answers patient questions with canned text and ends
    /// the interview after a configured number of interviewer turns.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        end_after_questions: Option<usize>,
        questions_asked: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn endless() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                end_after_questions: None,
                questions_asked: AtomicUsize::new(0),
            })
        }

        fn ending_after(questions: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                end_after_questions: Some(questions),
                questions_asked: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> CoreResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let system = messages.first().map(|m| m.content.as_str()).unwrap_or_default();
            if system.contains("Act as the Patient") || system.contains("act as this patient") {
                return Ok(format!("It started a few days ago. (answer {call})"));
            }
            let asked = self.questions_asked.fetch_add(1, Ordering::SeqCst) + 1;
            if self.end_after_questions.is_some_and(|limit| asked >= limit) {
                return Ok(format!(
                    "Thank you for answering my questions. {}.",
                    prompts::COMPLETION_MARKER
                ));
            }
            Ok(format!("Can you tell me more? (question {asked})"))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> CoreResult<String> {
            Err(CoreError::upstream("model endpoint returned 503"))
        }
    }

    fn test_patient() -> PatientProfile {
        PatientProfile {
            name: "Maria Alvarez".to_string(),
            age: 47,
            gender: "female".to_string(),
            voice: "Kore".to_string(),
            existing_condition: "hypertension".to_string(),
            ehr_summary: Some("47-year-old female with controlled hypertension.".to_string()),
        }
    }

    async fn test_session(
        generator: Arc<dyn TextGenerator>,
        turn_limit: usize,
    ) -> (tempfile::TempDir, InterviewSession) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = Arc::new(PersistentCache::open(dir.path(), "en").await.expect("cache"));
        let speech = Arc::new(CachedSpeech::read_only(cache));
        let settings = InterviewSettings {
            turn_limit,
            ..Default::default()
        };
        let session = InterviewSession::new(
            test_patient(),
            "pneumonia",
            "You have a productive cough.",
            generator,
            speech,
            settings,
        );
        (dir, session)
    }

    #[tokio::test]
    async fn start_transitions_and_appends_one_assistant_entry() {
        let (_dir, mut session) = test_session(ScriptedGenerator::endless(), 41).await;
        assert_eq!(session.state(), SessionState::NotStarted);

        let opening = session.start().await.unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert!(!opening.complete);
        assert_eq!(session.turn_count(), 1);
        assert_eq!(session.history()[0].role, MessageRole::Assistant);

        // Starting twice is a caller bug, not a silent restart.
        assert!(session.start().await.is_err());
    }

    #[tokio::test]
    async fn process_response_before_start_is_an_error() {
        let (_dir, mut session) = test_session(ScriptedGenerator::endless(), 41).await;
        assert!(session.process_response("hello").await.is_err());
    }

    #[tokio::test]
    async fn completion_marker_ends_the_interview_immediately() {
        let (_dir, mut session) = test_session(ScriptedGenerator::ending_after(2), 41).await;
        let opening = session.start().await.unwrap();

        let turn = session.process_response(&opening.message).await.unwrap();
        assert!(turn.complete);
        assert!(session.is_complete());
        // The sentinel never leaks into the displayed message.
        assert!(!turn.message.contains(prompts::COMPLETION_MARKER));
        // But history keeps the raw reply for the record.
        assert!(
            session
                .history()
                .last()
                .unwrap()
                .content
                .contains(prompts::COMPLETION_MARKER)
        );
    }

    #[tokio::test]
    async fn turn_cap_terminates_without_a_marker() {
        // Cap of 7 entries: opening plus three exchanges.
        let (_dir, mut session) = test_session(ScriptedGenerator::endless(), 7).await;
        let mut last = session.start().await.unwrap();

        let mut exchanges = 0;
        while !last.complete {
            last = session.process_response(&last.message).await.unwrap();
            exchanges += 1;
            assert!(exchanges <= 10, "interview failed to terminate");
        }

        assert_eq!(session.turn_count(), 7);
        assert_eq!(exchanges, 3);

        // Further calls are no-ops: history must not grow.
        let after = session.process_response("anything").await.unwrap();
        assert!(after.complete);
        assert_eq!(session.turn_count(), 7);
        assert_eq!(after.history.len(), 7);
    }

    #[tokio::test]
    async fn text_generation_failure_surfaces_to_the_caller() {
        let (_dir, mut session) = test_session(Arc::new(FailingGenerator), 41).await;
        match session.start().await {
            Err(CoreError::Upstream(_)) => {}
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transcript_labels_both_speakers() {
        let (_dir, mut session) = test_session(ScriptedGenerator::endless(), 41).await;
        let opening = session.start().await.unwrap();
        session.process_response(&opening.message).await.unwrap();

        let transcript = session.transcript();
        assert!(transcript.contains("Interviewer: "));
        assert!(transcript.contains("Patient: "));
        assert_eq!(transcript.lines().count(), 3);
    }
}
