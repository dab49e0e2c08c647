//! retext - Main Entry Point
//!
//! Headless front end for retext-core: renders, exports and inspects
//! documents from the command line.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, warn};

use retext_core::config::load_config;
use retext_core::export::{file_filter, suggested_extension};
use retext_core::files::FsStore;
use retext_core::{ConverterSet, EditorState, Error, RecordingSink, Resolution, Result, SessionId};

use cli::{Cli, Command, DocumentArgs};

/// Application name constant.
const APP_NAME: &str = "retext";

type State = EditorState<RecordingSink>;

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    debug!("Starting {}", APP_NAME);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_config();
    let converters = ConverterSet::detect(&settings);
    let mut state = EditorState::new(
        settings,
        converters,
        Box::new(FsStore::new()),
        RecordingSink::new(),
    );
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Render(document) => {
            let id = open_document(&mut state, &document)?;
            let result = state.refresh(id).ok_or_else(|| missing(id))?;
            if result.is_degraded() {
                warn!("{} was not converted", document.file.display());
            }
            writeln!(out, "{}", result.body)?;
        }
        Command::Export { document, output } => {
            let id = open_document(&mut state, &document)?;
            match output {
                Some(path) => state.export_html_to(id, &path)?,
                None => {
                    let html = state.export_html(id).ok_or_else(|| missing(id))?;
                    out.write_all(html.as_bytes())?;
                }
            }
        }
        Command::Title(document) => {
            let id = open_document(&mut state, &document)?;
            let title = state.title(id).ok_or_else(|| missing(id))?;
            writeln!(out, "{}", title)?;
        }
        Command::Highlight {
            document,
            spell,
            locale,
        } => {
            if spell && !state.enable_spell_check(locale.as_deref()) {
                warn!("Continuing without spell checking");
            }
            let id = open_document(&mut state, &document)?;
            let blocks = state.highlights(id).ok_or_else(|| missing(id))?;
            for (line, block) in blocks.iter().enumerate() {
                for span in block.spans() {
                    let style = span.style();
                    let colour = style.foreground.or(style.underline).map(|c| c.to_hex());
                    writeln!(
                        out,
                        "{}:{}+{} {} {}",
                        line + 1,
                        span.start,
                        span.len,
                        span.class.name(),
                        colour.unwrap_or_default()
                    )?;
                }
            }
        }
        Command::Dialect(document) => {
            let id = open_document(&mut state, &document)?;
            let resolution = state.resolution(id).ok_or_else(|| missing(id))?;
            writeln!(out, "interpretation: {}", describe(resolution))?;
            writeln!(
                out,
                "save as: .{}  {}",
                suggested_extension(resolution, state.settings()),
                file_filter(resolution)
            )?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Open the requested file and apply the interpretation flags.
fn open_document(state: &mut State, document: &DocumentArgs) -> Result<SessionId> {
    let id = state.open_file(&document.file)?;
    if document.plain_text {
        state.set_plain_text(id, true);
    }
    if let Some(dialect) = document.dialect {
        state.set_dialect_override(id, Some(dialect.into()));
    }
    Ok(id)
}

fn describe(resolution: Resolution) -> String {
    match resolution {
        Resolution::PlainText => String::from("plain text"),
        Resolution::Convert(dialect) => dialect.display_name().to_string(),
        Resolution::Missing(dialect) => {
            format!("{} (converter not available)", dialect.display_name())
        }
        Resolution::Unrecognized => String::from("unrecognized, shown as plain text"),
    }
}

fn missing(id: SessionId) -> Error {
    Error::Application(format!("Session {} disappeared", id))
}
