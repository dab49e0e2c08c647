//! Document interpreter
//!
//! Turns a session's source text into a [`RenderResult`] using the dialect
//! chosen by the [`DialectRegistry`] and the converter from the
//! [`ConverterSet`]. Missing converters, converter errors and converter panics
//! all end in the same degraded result and never reach the caller as errors.
//!
//! The last valid result per session is cached together with the source it
//! was produced from and the resolution, so asking for a title right after a
//! refresh does not convert the document a second time. The source snapshot
//! is compared on lookup; session ids and revisions alone do not identify a
//! text, since callers may build sessions with any id.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use crate::config::DefaultMarkup;
use crate::error::{Error, Result};
use crate::markup::{ConverterSet, Dialect, DialectRegistry, RenderResult, Resolution};
use crate::session::{DocumentSession, SessionId, UNTITLED};

/// A converted result and the state it was produced from.
#[derive(Debug, Clone)]
struct CachedRender {
    revision: u64,
    source: String,
    resolution: Resolution,
    result: RenderResult,
}

/// Produces render results and titles for document sessions.
pub struct DocumentInterpreter {
    registry: DialectRegistry,
    converters: ConverterSet,
    cache: HashMap<SessionId, CachedRender>,
}

impl DocumentInterpreter {
    pub fn new(converters: ConverterSet, default_markup: DefaultMarkup) -> Self {
        Self {
            registry: DialectRegistry::new(converters.availability(), default_markup),
            converters,
            cache: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &DialectRegistry {
        &self.registry
    }

    /// Change which dialect new, unsaved documents are interpreted as.
    pub fn set_default_markup(&mut self, default_markup: DefaultMarkup) {
        self.registry.set_default_markup(default_markup);
    }

    /// How `session` would be interpreted right now.
    pub fn resolve(&self, session: &DocumentSession) -> Resolution {
        self.registry
            .resolve(session.path(), session.effective_override())
    }

    /// The dialect value reported for `session`.
    pub fn dialect(&self, session: &DocumentSession) -> Dialect {
        self.resolve(session).dialect()
    }

    /// Interpret the session's current text.
    pub fn interpret(&mut self, session: &DocumentSession) -> RenderResult {
        let resolution = self.resolve(session);

        if let Some(cached) = self.cache.get(&session.id()) {
            if cached.revision == session.revision()
                && cached.resolution == resolution
                && cached.source == session.text()
            {
                return cached.result.clone();
            }
        }

        let result = match resolution {
            Resolution::PlainText | Resolution::Unrecognized => {
                RenderResult::plain_text(session.text())
            }
            Resolution::Missing(dialect) => {
                debug!(
                    "No {} converter for session {}",
                    dialect.display_name(),
                    session.id()
                );
                return RenderResult::degraded();
            }
            Resolution::Convert(dialect) => match self.convert(dialect, session.text()) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Rendering session {} failed: {}", session.id(), e);
                    return RenderResult::degraded();
                }
            },
        };

        self.cache.insert(
            session.id(),
            CachedRender {
                revision: session.revision(),
                source: session.text().to_string(),
                resolution,
                result: result.clone(),
            },
        );
        result
    }

    /// Title for save and export naming.
    ///
    /// Tries the interpreter title first, then the file name without its
    /// extension, then `Untitled`.
    pub fn title(&mut self, session: &DocumentSession) -> String {
        let interpreted = if session.is_plain_text() {
            None
        } else {
            self.interpret(session).title
        };

        interpreted
            .or_else(|| session.file_stem().map(str::to_string))
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    /// Tab label for `session`.
    pub fn display_name(&self, session: &DocumentSession) -> String {
        session.display_name()
    }

    /// The cached result for a session, if still present.
    pub fn cached(&self, id: SessionId) -> Option<&RenderResult> {
        self.cache.get(&id).map(|c| &c.result)
    }

    /// Drop cached state for a closed session.
    pub fn forget(&mut self, id: SessionId) {
        self.cache.remove(&id);
    }

    /// Run a converter, turning a panic into a conversion error.
    fn convert(&self, dialect: Dialect, text: &str) -> Result<RenderResult> {
        let converter = self
            .converters
            .get(dialect)
            .ok_or(Error::ConverterUnavailable(dialect))?;

        match panic::catch_unwind(AssertUnwindSafe(|| converter.convert(text))) {
            Ok(result) => result,
            Err(payload) => Err(Error::conversion(
                dialect,
                format!("converter panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
