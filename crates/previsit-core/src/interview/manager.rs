//! Process-wide session storage
//!
//! One session per patient id, created on interview start and never
//! automatically evicted; lifecycle management beyond that is the
//! caller's concern. Sessions are handed out behind an async mutex to
//! enforce the single-writer-per-session discipline the state machine
//! requires.

use crate::interview::session::InterviewSession;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handle to a session.
pub type SharedSession = Arc<Mutex<InterviewSession>>;

/// Concurrent map of active sessions keyed by patient id.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<String, SharedSession>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its patient's name, replacing any previous
    /// session for the same patient.
    pub fn insert(&self, session: InterviewSession) -> SharedSession {
        let patient_id = session.patient().name.clone();
        let shared: SharedSession = Arc::new(Mutex::new(session));
        debug!(patient = %patient_id, "registered interview session");
        self.sessions.insert(patient_id, shared.clone());
        shared
    }

    /// Fetch the session for a patient, if one exists.
    pub fn get(&self, patient_id: &str) -> Option<SharedSession> {
        self.sessions.get(patient_id).map(|entry| entry.value().clone())
    }

    /// Drop the session for a patient. Returns whether one existed.
    pub fn remove(&self, patient_id: &str) -> bool {
        self.sessions.remove(patient_id).is_some()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
