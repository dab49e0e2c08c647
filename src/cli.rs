//! CLI argument definitions for the retext binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use retext_core::Dialect;

#[derive(Parser)]
#[command(
    name = "retext",
    version,
    about = "Render, export and inspect Markdown, reStructuredText and HTML documents",
    long_about = "Headless front end for the retext document core.\n\n\
                  The dialect is picked from the file extension unless --dialect\n\
                  or --plain-text says otherwise. Settings are read from the same\n\
                  config.json the editor uses."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the preview HTML body of a document.
    Render(DocumentArgs),

    /// Export a document as a standalone HTML page.
    Export {
        #[command(flatten)]
        document: DocumentArgs,

        /// Write to this file instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Print the document title.
    Title(DocumentArgs),

    /// Print highlight spans, one per line as `line:start+len class #colour`.
    Highlight {
        #[command(flatten)]
        document: DocumentArgs,

        /// Also underline misspelled words.
        #[arg(long)]
        spell: bool,

        /// Dictionary locale (defaults to the system locale).
        #[arg(long, value_name = "LOCALE", requires = "spell")]
        locale: Option<String>,
    },

    /// Show how a document would be interpreted and saved.
    Dialect(DocumentArgs),
}

#[derive(Args)]
pub struct DocumentArgs {
    /// Document to open.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Treat the document as plain text.
    #[arg(long, conflicts_with = "dialect")]
    pub plain_text: bool,

    /// Interpret as this dialect regardless of the extension.
    #[arg(long, value_enum)]
    pub dialect: Option<DialectArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DialectArg {
    Markdown,
    Rst,
    Html,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Markdown => Dialect::Markdown,
            DialectArg::Rst => Dialect::ReStructuredText,
            DialectArg::Html => Dialect::Html,
        }
    }
}
