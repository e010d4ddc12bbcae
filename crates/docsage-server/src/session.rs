//! Per-session document/analysis state.
//!
//! Each browser session owns exactly one document at a time: uploading a new
//! one replaces the extracted text and clears any previous analysis.
//! Sessions left idle past the configured timeout are swept.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use docsage_extract::Format;

/// Everything one user has uploaded and asked for.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Instant,
    pub document: Option<SessionDocument>,
    pub instruction: Option<String>,
    pub analysis_result: Option<String>,
}

/// The document currently loaded into a session.
#[derive(Debug, Clone)]
pub struct SessionDocument {
    /// Distinguishes this upload from any later one in the same session.
    pub id: String,
    pub file_name: String,
    pub format: Format,
    pub size_bytes: usize,
    pub extracted_text: String,
    pub textless_pages: Vec<u32>,
}

/// Public view of a session (no document text).
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    pub format: Option<Format>,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: Option<usize>,
    #[serde(rename = "hasText")]
    pub has_text: bool,
    #[serde(rename = "wordCount")]
    pub word_count: usize,
    pub instruction: Option<String>,
    #[serde(rename = "hasAnalysis")]
    pub has_analysis: bool,
}

/// A downloadable analysis file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub body: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            last_used: Instant::now(),
            document: None,
            instruction: None,
            analysis_result: None,
        }
    }

    /// Load a freshly extracted document, discarding the previous one and
    /// any analysis made from it.
    pub fn load_document(&mut self, document: SessionDocument) {
        self.document = Some(document);
        self.instruction = None;
        self.analysis_result = None;
    }

    /// Store an analysis of the document `document_id`. Returns `false`, and
    /// stores nothing, if that document is no longer the loaded one.
    pub fn record_analysis(
        &mut self,
        document_id: &str,
        instruction: &str,
        result: String,
    ) -> bool {
        match &self.document {
            Some(document) if document.id == document_id => {
                self.instruction = Some(instruction.to_string());
                self.analysis_result = Some(result);
                true
            }
            _ => false,
        }
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.extracted_text.as_str())
    }

    /// The export file for the current analysis, if there is one.
    pub fn export_artifact(&self) -> Option<ExportArtifact> {
        let document = self.document.as_ref()?;
        let result = self.analysis_result.as_deref()?;
        let instruction = self.instruction.as_deref().unwrap_or("");
        Some(ExportArtifact {
            file_name: export_file_name(&document.file_name),
            body: render_export(&document.file_name, instruction, result),
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            created_at: self.created_at.to_rfc3339(),
            file_name: self.document.as_ref().map(|d| d.file_name.clone()),
            format: self.document.as_ref().map(|d| d.format),
            size_bytes: self.document.as_ref().map(|d| d.size_bytes),
            has_text: self.document.is_some(),
            word_count: self
                .extracted_text()
                .map(|t| t.split_whitespace().count())
                .unwrap_or(0),
            instruction: self.instruction.clone(),
            has_analysis: self.analysis_result.is_some(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// `report.final.pdf` → `report.final_analysis.txt`.
pub fn export_file_name(original: &str) -> String {
    let base = match original.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => original,
    };
    format!("{}_analysis.txt", base)
}

/// Header naming the document, the instruction used, then the result.
pub fn render_export(file_name: &str, instruction: &str, result: &str) -> String {
    format!(
        "Analysis of: {}\n\nAnalysis Prompt: {}\n\nResults:\n{}",
        file_name, instruction, result
    )
}

/// First `max_chars` characters, with `...` when more text follows.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// All live sessions, keyed by id. Sessions never share state.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions,
        }
    }

    /// Create an empty session and return its id, or `None` when the store
    /// is full even after dropping idle sessions.
    pub fn create(&self) -> Option<String> {
        let mut sessions = self.sessions.write();
        let idle_timeout = self.idle_timeout;
        let now = Instant::now();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_used) <= idle_timeout);
        if sessions.len() >= self.max_sessions {
            return None;
        }

        let session = Session::new();
        let id = session.id.clone();
        sessions.insert(id.clone(), session);
        Some(id)
    }

    /// Snapshot of a session. Counts as use.
    pub fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id)?;
        session.last_used = Instant::now();
        Some(session.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Apply `f` to a session under the write lock. Returns `None` if the
    /// session no longer exists.
    pub fn update<T>(&self, id: &str, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.sessions.write().get_mut(id).map(|session| {
            session.last_used = Instant::now();
            f(session)
        })
    }

    /// Drop sessions idle for longer than the timeout as of `now`.
    /// Returns how many were dropped.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_used) <= self.idle_timeout);
        before - sessions.len()
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
