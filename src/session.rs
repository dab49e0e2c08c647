//! Per-document session state
//!
//! A [`DocumentSession`] bundles everything the interpretation pipeline needs
//! to know about one open document. The [`SessionManager`] keeps the ordered
//! list of open sessions (tabs) and which one is active.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::markup::{Dialect, DialectOverride};

/// Label used for documents without a file name.
pub const UNTITLED: &str = "Untitled";

// ─────────────────────────────────────────────────────────────────────────────
// Session Id
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier of an open document.
///
/// Ids are never reused within a process, so a stale id can be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What [`SessionManager::open`] did with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The path was already open and that session is now active
    Existing(SessionId),
    /// A new session was added after the others
    Created(SessionId),
    /// The active blank session was replaced in place by a new one
    Replaced { id: SessionId, previous: SessionId },
}

impl OpenOutcome {
    /// The session now showing the file.
    pub fn id(&self) -> SessionId {
        match *self {
            OpenOutcome::Existing(id) | OpenOutcome::Created(id) => id,
            OpenOutcome::Replaced { id, .. } => id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document Session
// ─────────────────────────────────────────────────────────────────────────────

/// State of one open document.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    id: SessionId,
    /// Current source text
    text: String,
    /// Text as last loaded or saved (for detecting modifications)
    saved_text: String,
    path: Option<PathBuf>,
    /// Forces a dialect regardless of the file extension
    dialect_override: Option<Dialect>,
    is_plain_text: bool,
    is_live_preview: bool,
    is_preview_visible: bool,
    /// Bumped on every text mutation
    revision: u64,
}

impl DocumentSession {
    /// Create a new, empty, unsaved document.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            text: String::new(),
            saved_text: String::new(),
            path: None,
            dialect_override: None,
            is_plain_text: false,
            is_live_preview: false,
            is_preview_visible: false,
            revision: 0,
        }
    }

    /// Create a session for text loaded from `path`.
    pub fn with_file(id: SessionId, path: PathBuf, text: String) -> Self {
        Self {
            path: Some(path),
            saved_text: text.clone(),
            text,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Revision counter of the text; changes whenever the text changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Check if the text differs from the last loaded or saved text.
    pub fn is_modified(&self) -> bool {
        self.text != self.saved_text
    }

    /// An untitled, empty, never-edited document that opening a file may
    /// replace.
    pub fn is_blank(&self) -> bool {
        self.path.is_none() && self.text.is_empty() && self.saved_text.is_empty()
    }

    /// Replace the whole text.
    ///
    /// Returns `true` if the text actually changed.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.text {
            return false;
        }
        self.text = text;
        self.bump_revision();
        true
    }

    /// Insert `fragment` at byte offset `at`.
    ///
    /// Returns `false` (and leaves the text untouched) if `at` is out of
    /// range or not on a character boundary.
    pub fn insert(&mut self, at: usize, fragment: &str) -> bool {
        if !self.text.is_char_boundary(at) {
            warn!("Ignoring insert at invalid offset {} in {}", at, self.id);
            return false;
        }
        if fragment.is_empty() {
            return false;
        }
        self.text.insert_str(at, fragment);
        self.bump_revision();
        true
    }

    /// Append `fragment` to the end of the text.
    pub fn append(&mut self, fragment: &str) -> bool {
        self.insert(self.text.len(), fragment)
    }

    /// Mark the current text as saved.
    pub fn mark_saved(&mut self) {
        self.saved_text = self.text.clone();
    }

    /// Set the file path (e.g. after "Save As").
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    pub fn is_plain_text(&self) -> bool {
        self.is_plain_text
    }

    pub fn set_plain_text(&mut self, plain_text: bool) {
        self.is_plain_text = plain_text;
    }

    pub fn dialect_override(&self) -> Option<Dialect> {
        self.dialect_override
    }

    pub fn set_dialect_override(&mut self, dialect: Option<Dialect>) {
        self.dialect_override = dialect;
    }

    /// The override the registry should apply; plain text beats a dialect.
    pub fn effective_override(&self) -> Option<DialectOverride> {
        if self.is_plain_text {
            Some(DialectOverride::PlainText)
        } else {
            self.dialect_override.map(DialectOverride::Dialect)
        }
    }

    pub fn is_live_preview(&self) -> bool {
        self.is_live_preview
    }

    pub fn set_live_preview(&mut self, live: bool) {
        self.is_live_preview = live;
    }

    pub fn is_preview_visible(&self) -> bool {
        self.is_preview_visible
    }

    pub fn set_preview_visible(&mut self, visible: bool) {
        self.is_preview_visible = visible;
    }

    /// File name, or `Untitled` for unsaved documents.
    pub fn file_name(&self) -> &str {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or(UNTITLED)
    }

    /// File name without its extension, if the document has a path.
    pub fn file_stem(&self) -> Option<&str> {
        self.path
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|n| n.to_str())
            .filter(|s| !s.is_empty())
    }

    /// Tab label: the file name, with `*` appended when modified.
    pub fn display_name(&self) -> String {
        if self.is_modified() {
            format!("{}*", self.file_name())
        } else {
            self.file_name().to_string()
        }
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered list of open sessions with one active session.
///
/// There is always at least one session; closing the last one opens a fresh
/// untitled document.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Vec<DocumentSession>,
    active_index: usize,
    next_id: u64,
}

impl SessionManager {
    /// Create a manager holding a single empty document.
    pub fn new() -> Self {
        let mut manager = Self {
            sessions: Vec::new(),
            active_index: 0,
            next_id: 1,
        };
        manager.new_session();
        manager
    }

    fn allocate_id(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[DocumentSession] {
        &self.sessions
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|s| s.id).collect()
    }

    pub fn get(&self, id: SessionId) -> Option<&DocumentSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut DocumentSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.get(id).is_some()
    }

    pub fn active(&self) -> Option<&DocumentSession> {
        self.sessions.get(self.active_index)
    }

    pub fn active_mut(&mut self) -> Option<&mut DocumentSession> {
        self.sessions.get_mut(self.active_index)
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active().map(|s| s.id)
    }

    /// Make `id` the active session.
    ///
    /// Returns `false` if there is no such session.
    pub fn set_active(&mut self, id: SessionId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.active_index = index;
                debug!("Switched to session {}", id);
                true
            }
            None => {
                warn!("Unknown session {}", id);
                false
            }
        }
    }

    /// Create a new empty session and make it active.
    pub fn new_session(&mut self) -> SessionId {
        let id = self.allocate_id();
        self.sessions.push(DocumentSession::new(id));
        self.active_index = self.sessions.len() - 1;
        debug!("Created session {}", id);
        id
    }

    /// Open `text` loaded from `path` as the active session.
    ///
    /// If the path is already open that session is activated instead and
    /// `text` is discarded. A blank active session is replaced in its tab
    /// slot; otherwise the new session is appended. The replacement gets a
    /// fresh id so state keyed by the old one can be dropped.
    pub fn open(&mut self, path: PathBuf, text: String) -> OpenOutcome {
        if let Some(id) = self.find_by_path(&path) {
            self.set_active(id);
            return OpenOutcome::Existing(id);
        }

        let id = self.allocate_id();
        debug!("Opened {} as session {}", path.display(), id);
        let session = DocumentSession::with_file(id, path, text);

        match self.sessions.get_mut(self.active_index) {
            Some(active) if active.is_blank() => {
                let previous = std::mem::replace(active, session).id;
                debug!("Session {} replaced blank session {}", id, previous);
                OpenOutcome::Replaced { id, previous }
            }
            _ => {
                self.sessions.push(session);
                self.active_index = self.sessions.len() - 1;
                OpenOutcome::Created(id)
            }
        }
    }

    pub fn find_by_path(&self, path: &Path) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|s| s.path() == Some(path))
            .map(|s| s.id)
    }

    /// Close a session, returning it.
    ///
    /// Whether unsaved changes may be discarded is the caller's decision.
    pub fn close(&mut self, id: SessionId) -> Option<DocumentSession> {
        let index = self.position(id)?;
        let closed = self.sessions.remove(index);

        if self.sessions.is_empty() {
            self.new_session();
        } else if self.active_index >= self.sessions.len() {
            self.active_index = self.sessions.len() - 1;
        } else if index < self.active_index {
            self.active_index -= 1;
        }

        debug!("Closed session {}", id);
        Some(closed)
    }

    /// Check if any session has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.sessions.iter().any(|s| s.is_modified())
    }

    fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_untitled_and_clean() {
        let session = DocumentSession::new(SessionId(1));
        assert_eq!(session.display_name(), "Untitled");
        assert!(!session.is_modified());
        assert!(session.file_stem().is_none());
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn test_modification_tracking() {
        let mut session =
            DocumentSession::with_file(SessionId(1), PathBuf::from("/docs/notes.md"), "abc".into());
        assert_eq!(session.display_name(), "notes.md");

        assert!(session.set_text("abcd"));
        assert!(session.is_modified());
        assert_eq!(session.display_name(), "notes.md*");

        session.mark_saved();
        assert!(!session.is_modified());

        // Editing back to the saved text is not a modification
        session.set_text("abc");
        assert!(session.is_modified());
        session.set_text("abcd");
        assert!(!session.is_modified());
    }

    #[test]
    fn test_revision_bumps_only_on_change() {
        let mut session = DocumentSession::new(SessionId(1));
        assert!(session.set_text("hello"));
        assert_eq!(session.revision(), 1);
        assert!(!session.set_text("hello"));
        assert_eq!(session.revision(), 1);
        assert!(session.append(" world"));
        assert_eq!(session.revision(), 2);
        assert_eq!(session.text(), "hello world");
    }

    #[test]
    fn test_insert_rejects_invalid_offsets() {
        let mut session = DocumentSession::new(SessionId(1));
        session.set_text("på");
        // Inside the two-byte 'å'
        assert!(!session.insert(2, "x"));
        assert!(!session.insert(10, "x"));
        assert!(session.insert(1, "x"));
        assert_eq!(session.text(), "pxå");
    }

    #[test]
    fn test_effective_override() {
        let mut session = DocumentSession::new(SessionId(1));
        assert_eq!(session.effective_override(), None);

        session.set_dialect_override(Some(Dialect::ReStructuredText));
        assert_eq!(
            session.effective_override(),
            Some(DialectOverride::Dialect(Dialect::ReStructuredText))
        );

        session.set_plain_text(true);
        assert_eq!(session.effective_override(), Some(DialectOverride::PlainText));
    }

    #[test]
    fn test_file_stem() {
        let session = DocumentSession::with_file(
            SessionId(1),
            PathBuf::from("/docs/report.final.rst"),
            String::new(),
        );
        assert_eq!(session.file_stem(), Some("report.final"));
    }

    #[test]
    fn test_manager_starts_with_one_session() {
        let manager = SessionManager::new();
        assert_eq!(manager.len(), 1);
        assert!(manager.active().is_some());
    }

    #[test]
    fn test_manager_open_existing_path_activates_it() {
        let mut manager = SessionManager::new();
        manager.active_mut().unwrap().set_text("draft");
        let first = match manager.open(PathBuf::from("/a.md"), "a".into()) {
            OpenOutcome::Created(id) => id,
            other => panic!("expected a new session, got {:?}", other),
        };
        manager.new_session();

        let again = manager.open(PathBuf::from("/a.md"), "ignored".into());
        assert_eq!(again, OpenOutcome::Existing(first));
        assert_eq!(manager.active_id(), Some(first));
        assert_eq!(manager.get(first).unwrap().text(), "a");
    }

    #[test]
    fn test_manager_open_replaces_blank_active_session() {
        let mut manager = SessionManager::new();
        let blank = manager.active_id().unwrap();
        let kept = manager.new_session();
        manager.active_mut().unwrap().set_text("keep me");
        let second_blank = manager.new_session();

        let outcome = manager.open(PathBuf::from("/b.md"), "b".into());
        let id = outcome.id();
        assert_eq!(
            outcome,
            OpenOutcome::Replaced {
                id,
                previous: second_blank
            }
        );
        assert_eq!(manager.ids(), vec![blank, kept, id]);
        assert_eq!(manager.active_id(), Some(id));
        assert!(!manager.contains(second_blank));
        assert_eq!(manager.get(id).unwrap().path(), Some(Path::new("/b.md")));
    }

    #[test]
    fn test_is_blank() {
        let mut session = DocumentSession::new(SessionId(1));
        assert!(session.is_blank());
        session.set_text("x");
        assert!(!session.is_blank());
        session.set_text("");
        assert!(session.is_blank());

        let file = DocumentSession::with_file(SessionId(2), PathBuf::from("/e.md"), String::new());
        assert!(!file.is_blank());
    }

    #[test]
    fn test_manager_close_adjusts_active() {
        let mut manager = SessionManager::new();
        let initial = manager.active_id().unwrap();
        let second = manager.new_session();
        let third = manager.new_session();

        manager.set_active(second);
        manager.close(initial);
        assert_eq!(manager.active_id(), Some(second));

        manager.set_active(third);
        manager.close(third);
        assert_eq!(manager.active_id(), Some(second));
    }

    #[test]
    fn test_manager_close_last_opens_fresh_session() {
        let mut manager = SessionManager::new();
        let only = manager.active_id().unwrap();
        let closed = manager.close(only).unwrap();
        assert_eq!(closed.id(), only);
        assert_eq!(manager.len(), 1);
        let fresh = manager.active_id().unwrap();
        assert_ne!(fresh, only);
        assert!(manager.close(only).is_none());
    }

    #[test]
    fn test_manager_unknown_session() {
        let mut manager = SessionManager::new();
        assert!(!manager.set_active(SessionId(999)));
        assert!(manager.get_mut(SessionId(999)).is_none());
    }

    #[test]
    fn test_has_unsaved_changes() {
        let mut manager = SessionManager::new();
        assert!(!manager.has_unsaved_changes());
        manager.active_mut().unwrap().set_text("draft");
        assert!(manager.has_unsaved_changes());
    }
}
