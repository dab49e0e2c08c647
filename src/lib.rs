//! retext-core - document interpretation for a markup editor
//!
//! Decides how a document's text is interpreted (Markdown, reStructuredText,
//! HTML or plain text), converts it for preview, debounces live preview
//! refreshes and produces per-line highlight spans for markup structure and
//! spelling. Display and file dialogs belong to the embedding application,
//! which receives results through [`sink::PresentationSink`] and persists
//! documents through [`files::DocumentStore`].

pub mod config;
pub mod error;
pub mod export;
pub mod files;
pub mod highlight;
pub mod interpreter;
pub mod markup;
pub mod preview;
pub mod session;
pub mod sink;
pub mod state;

pub use error::{Error, Result};
pub use interpreter::DocumentInterpreter;
pub use markup::{ConverterSet, Dialect, RenderResult, Resolution};
pub use session::{DocumentSession, OpenOutcome, SessionId, SessionManager};
pub use sink::{PresentationSink, RecordingSink};
pub use state::EditorState;
