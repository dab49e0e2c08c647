//! Editor state for retext-core
//!
//! `EditorState` ties the session list to the interpreter, the preview
//! scheduler, the highlighter and the spell checker. Every operation the
//! surrounding application performs on a document goes through here, so the
//! pieces never drift apart: closing a session forgets it everywhere, an edit
//! re-highlights and (in live mode) arms a refresh, and so on. Document text
//! is read and written through the [`DocumentStore`] the state owns.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{DefaultMarkup, Settings};
use crate::error::{Error, Result};
use crate::export::{export_html, suggested_extension, with_default_extension};
use crate::files::DocumentStore;
use crate::highlight::{BlockHighlight, DocumentHighlighter, SpellChecker};
use crate::interpreter::DocumentInterpreter;
use crate::markup::{ConverterSet, Dialect, RenderResult, Resolution};
use crate::preview::PreviewScheduler;
use crate::session::{DocumentSession, OpenOutcome, SessionId, SessionManager};
use crate::sink::PresentationSink;

/// All editor-side state for a set of open documents.
pub struct EditorState<S: PresentationSink> {
    settings: Settings,
    settings_dirty: bool,
    sessions: SessionManager,
    interpreter: DocumentInterpreter,
    scheduler: PreviewScheduler,
    highlighter: DocumentHighlighter,
    spell: SpellChecker,
    store: Box<dyn DocumentStore>,
    sink: S,
}

impl<S: PresentationSink> EditorState<S> {
    /// Create the state with one empty document.
    ///
    /// Spell checking is switched on when the settings ask for it; a missing
    /// dictionary only logs a warning.
    pub fn new(
        settings: Settings,
        converters: ConverterSet,
        store: Box<dyn DocumentStore>,
        sink: S,
    ) -> Self {
        let mut spell = SpellChecker::new(&settings.dictionary_dirs);
        if settings.spell_check {
            if let Err(e) = spell.enable(settings.spell_locale.as_deref()) {
                warn!("Spell checking unavailable: {}", e);
            }
        }

        let mut state = Self {
            interpreter: DocumentInterpreter::new(converters, settings.default_markup),
            scheduler: PreviewScheduler::new(settings.preview_delay()),
            highlighter: DocumentHighlighter::new(),
            sessions: SessionManager::new(),
            settings_dirty: false,
            settings,
            spell,
            store,
            sink,
        };
        for id in state.sessions.ids() {
            state.init_session(id);
        }
        state
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether settings changed since the last `mark_settings_saved`.
    pub fn settings_dirty(&self) -> bool {
        self.settings_dirty
    }

    pub fn mark_settings_saved(&mut self) {
        self.settings_dirty = false;
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn session(&self, id: SessionId) -> Option<&DocumentSession> {
        self.sessions.get(id)
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.sessions.active_id()
    }

    pub fn set_active(&mut self, id: SessionId) -> bool {
        self.sessions.set_active(id)
    }

    pub fn spell_checker(&self) -> &SpellChecker {
        &self.spell
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Current highlights of a session, one entry per block.
    pub fn highlights(&self, id: SessionId) -> Option<&[BlockHighlight]> {
        self.highlighter.highlights(id)
    }

    /// How a session would be interpreted right now.
    pub fn resolution(&self, id: SessionId) -> Option<Resolution> {
        self.sessions.get(id).map(|s| self.interpreter.resolve(s))
    }

    pub fn dialect(&self, id: SessionId) -> Option<Dialect> {
        self.sessions.get(id).map(|s| self.interpreter.dialect(s))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a new empty document and make it active.
    pub fn new_session(&mut self) -> SessionId {
        let id = self.sessions.new_session();
        self.init_session(id);
        id
    }

    /// Open a file, or switch to it if it is already open.
    ///
    /// An untouched untitled active document is replaced by the file instead
    /// of being kept as an extra tab.
    pub fn open_file(&mut self, path: &Path) -> Result<SessionId> {
        if let Some(id) = self.sessions.find_by_path(path) {
            self.sessions.set_active(id);
            info!("File already open, switching to session {}", id);
            return Ok(id);
        }

        let text = self.store.load(path)?;
        let id = match self.sessions.open(path.to_path_buf(), text) {
            OpenOutcome::Replaced { id, previous } => {
                self.forget(previous);
                id
            }
            outcome => outcome.id(),
        };
        self.init_session(id);

        self.settings.add_recent_file(path.to_path_buf());
        self.settings_dirty = true;
        info!("Opened file: {}", path.display());
        Ok(id)
    }

    /// Close a session and forget it everywhere.
    ///
    /// Whether unsaved changes may be discarded is the caller's decision.
    /// Closing the last session leaves a fresh untitled one behind.
    ///
    /// With auto-save on, a modified session that has a path is written
    /// first; a failed write is logged and does not stop the close.
    pub fn close_session(&mut self, id: SessionId) -> Option<DocumentSession> {
        self.auto_save(id);
        let was_last = self.sessions.len() == 1;
        let closed = self.sessions.close(id)?;
        self.forget(id);

        if was_last {
            if let Some(fresh) = self.sessions.active_id() {
                self.init_session(fresh);
            }
        }
        Some(closed)
    }

    fn forget(&mut self, id: SessionId) {
        self.interpreter.forget(id);
        self.scheduler.forget(id);
        self.highlighter.forget(id);
    }

    fn init_session(&mut self, id: SessionId) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.set_live_preview(self.settings.live_preview);
        }
        self.rehighlight(id);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace a session's text.
    ///
    /// Re-highlights changed blocks and, in live mode, arms a debounced
    /// preview refresh. Returns `false` if the text did not change.
    pub fn edit(&mut self, id: SessionId, text: impl Into<String>, now: Instant) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            warn!("Edit for unknown session {}", id);
            return false;
        };
        if !session.set_text(text) {
            return false;
        }
        self.after_edit(id, now);
        true
    }

    /// Insert a fragment at a byte offset. Returns `false` if the offset is
    /// not a character boundary inside the text.
    pub fn insert(&mut self, id: SessionId, at: usize, fragment: &str, now: Instant) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        if !session.insert(at, fragment) {
            return false;
        }
        self.after_edit(id, now);
        true
    }

    fn after_edit(&mut self, id: SessionId, now: Instant) {
        self.rehighlight(id);
        if let Some(session) = self.sessions.get(id) {
            self.scheduler.notify_edit(session, now);
        }
        self.auto_save(id);
    }

    /// Switch plain-text mode. The structural highlight pass follows it.
    pub fn set_plain_text(&mut self, id: SessionId, plain_text: bool) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        session.set_plain_text(plain_text);
        self.rehighlight(id);
        self.refresh_if_visible(id);
        true
    }

    /// Force a dialect regardless of the file name, or clear the override.
    pub fn set_dialect_override(&mut self, id: SessionId, dialect: Option<Dialect>) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        session.set_dialect_override(dialect);
        self.rehighlight(id);
        self.refresh_if_visible(id);
        true
    }

    /// Switch debounced live preview for a session.
    ///
    /// Turning it on renders once right away.
    pub fn set_live_preview(&mut self, id: SessionId, live: bool) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        session.set_live_preview(live);
        if live {
            self.refresh(id);
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Preview
    // ─────────────────────────────────────────────────────────────────────────

    /// Show or hide the preview. Showing it renders immediately.
    ///
    /// Returns the new visibility.
    pub fn toggle_preview(&mut self, id: SessionId) -> Option<bool> {
        let session = self.sessions.get_mut(id)?;
        let visible = !session.is_preview_visible();
        session.set_preview_visible(visible);
        if visible {
            self.refresh(id);
        }
        Some(visible)
    }

    /// Interpret and push a session right away.
    pub fn refresh(&mut self, id: SessionId) -> Option<RenderResult> {
        let session = self.sessions.get(id)?;
        Some(
            self.scheduler
                .refresh_now(session, &mut self.interpreter, &mut self.sink),
        )
    }

    fn refresh_if_visible(&mut self, id: SessionId) {
        let visible = self
            .sessions
            .get(id)
            .is_some_and(|s| s.is_preview_visible() || s.is_live_preview());
        if visible {
            self.refresh(id);
        }
    }

    /// Fire every debounced refresh due at `now`. Returns the renders pushed.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.scheduler
            .fire_due(now, &self.sessions, &mut self.interpreter, &mut self.sink)
    }

    /// When the owner's event loop should call `tick` next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn set_preview_delay(&mut self, delay: Duration) {
        self.settings.preview_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.settings.sanitize();
        self.scheduler.set_delay(self.settings.preview_delay());
        self.settings_dirty = true;
    }

    pub fn set_default_markup(&mut self, default_markup: DefaultMarkup) {
        self.settings.default_markup = default_markup;
        self.interpreter.set_default_markup(default_markup);
        self.settings_dirty = true;
        info!("New documents default to {}", default_markup.label());
    }

    /// Switch saving modified documents after each edit and on close.
    pub fn set_auto_save(&mut self, auto_save: bool) {
        self.settings.auto_save = auto_save;
        self.settings_dirty = true;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Naming
    // ─────────────────────────────────────────────────────────────────────────

    /// Document title: interpreter title, then file stem, then `Untitled`.
    pub fn title(&mut self, id: SessionId) -> Option<String> {
        let session = self.sessions.get(id)?;
        Some(self.interpreter.title(session))
    }

    /// Tab label, with a `*` suffix for unsaved changes.
    pub fn display_name(&self, id: SessionId) -> Option<String> {
        self.sessions
            .get(id)
            .map(|s| self.interpreter.display_name(s))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Save a session to its file path.
    ///
    /// Returns an error if the session has no path (use `save_as` instead).
    pub fn save(&mut self, id: SessionId) -> Result<PathBuf> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::Application(format!("No session {}", id)))?;
        let path = session.path().map(Path::to_path_buf).ok_or_else(|| {
            Error::Application("No file path set. Use 'Save As' instead.".to_string())
        })?;

        self.store.save(&path, session.text())?;
        session.mark_saved();
        Ok(path)
    }

    /// Save every modified session that has a file path.
    ///
    /// Untitled sessions are skipped. A failed write does not stop the
    /// others; the first error is returned after all were attempted.
    /// Returns how many sessions were written.
    pub fn save_all(&mut self) -> Result<usize> {
        let pending: Vec<SessionId> = self
            .sessions
            .sessions()
            .iter()
            .filter(|s| s.is_modified() && s.path().is_some())
            .map(DocumentSession::id)
            .collect();

        let mut saved = 0;
        let mut first_error = None;
        for id in pending {
            match self.save(id) {
                Ok(_) => saved += 1,
                Err(e) => {
                    warn!("Failed to save session {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        info!("Saved {} documents", saved);
        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }

    fn auto_save(&mut self, id: SessionId) {
        if !self.settings.auto_save {
            return;
        }
        let due = self
            .sessions
            .get(id)
            .is_some_and(|s| s.is_modified() && s.path().is_some());
        if due {
            if let Err(e) = self.save(id) {
                warn!("Auto-save of session {} failed: {}", id, e);
            }
        }
    }

    /// Save a session to a new path.
    ///
    /// A path without an extension gets the one suggested for the session's
    /// current interpretation. Returns the path actually written.
    pub fn save_as(&mut self, id: SessionId, path: &Path) -> Result<PathBuf> {
        let resolution = self
            .resolution(id)
            .ok_or_else(|| Error::Application(format!("No session {}", id)))?;
        let extension = suggested_extension(resolution, &self.settings);
        let path = with_default_extension(path, &extension);

        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::Application(format!("No session {}", id)))?;
        self.store.save(&path, session.text())?;
        session.set_path(path.clone());
        session.mark_saved();

        self.settings.add_recent_file(path.clone());
        self.settings_dirty = true;
        info!("Saved file as: {}", path.display());

        // The new extension may pick another dialect
        self.rehighlight(id);
        self.refresh_if_visible(id);
        Ok(path)
    }

    /// The session as a standalone HTML document.
    pub fn export_html(&mut self, id: SessionId) -> Option<String> {
        let session = self.sessions.get(id)?;
        let resolution = self.interpreter.resolve(session);
        let render = self.interpreter.interpret(session);
        let title = self.interpreter.title(session);
        Some(export_html(resolution, session.text(), &render, &title))
    }

    /// Write the HTML export of a session to `path`.
    pub fn export_html_to(&mut self, id: SessionId, path: &Path) -> Result<()> {
        let html = self
            .export_html(id)
            .ok_or_else(|| Error::Application(format!("No session {}", id)))?;
        self.store.save(path, &html)?;
        info!("Exported session {} to {}", id, path.display());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Spell Check
    // ─────────────────────────────────────────────────────────────────────────

    /// Turn spell checking on for `locale` (system locale when `None`).
    ///
    /// Returns `false` and logs a warning if no dictionary could be loaded.
    pub fn enable_spell_check(&mut self, locale: Option<&str>) -> bool {
        if let Err(e) = self.spell.enable(locale) {
            warn!("Could not enable spell checking: {}", e);
            return false;
        }
        self.settings.spell_check = true;
        self.settings.spell_locale = self.spell.locale().map(str::to_string);
        self.settings_dirty = true;
        self.rehighlight_all();
        true
    }

    pub fn disable_spell_check(&mut self) {
        self.spell.disable();
        self.settings.spell_check = false;
        self.settings_dirty = true;
        self.rehighlight_all();
    }

    /// Change the dictionary locale.
    ///
    /// While spell checking is off only the setting changes.
    pub fn set_spell_locale(&mut self, locale: &str) -> bool {
        if let Err(e) = self.spell.set_locale(locale) {
            warn!("Could not switch dictionary to {}: {}", locale, e);
            return false;
        }
        self.settings.spell_locale = Some(locale.to_string());
        self.settings_dirty = true;
        self.rehighlight_all();
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Highlighting
    // ─────────────────────────────────────────────────────────────────────────

    fn rehighlight(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        // Only documents interpreted as markup get tag and entity colouring
        let structural = self.interpreter.resolve(session).is_markup();
        self.highlighter
            .update(session, structural, &self.spell, &mut self.sink);
    }

    fn rehighlight_all(&mut self) {
        let ids = self.sessions.ids();
        debug!("Re-highlighting {} sessions", ids.len());
        for id in ids {
            self.rehighlight(id);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
