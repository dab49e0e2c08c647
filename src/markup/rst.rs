//! reStructuredText converter that shells out to docutils.
//!
//! The source is piped to an `rst2html` style front end on stdin. The page it
//! prints is parsed with html5ever; the document container's children become
//! the body and the structural document title (`<h1 class="title">`) is
//! lifted out of it. A run that outlives its timeout is killed.

use std::env;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope};
use html5ever::Attribute;
use log::{debug, info, warn};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use which::which;

use super::converter::{Converter, RenderResult};
use super::dialect::Dialect;
use crate::error::{Error, Result};

/// Environment variable overriding the docutils command
const RST_COMMAND_ENV: &str = "RETEXT_RST2HTML";

const CANDIDATES: &[&str] = &["rst2html", "rst2html.py", "rst2html5", "rst2html5.py"];

const DOCUTILS_ARGS: &[&str] = &[
    "--no-generator",
    "--no-datestamp",
    "--no-source-link",
    "--input-encoding=utf-8",
    "--output-encoding=utf-8",
];

/// Default limit for a single docutils run.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// reStructuredText adapter backed by an installed docutils.
#[derive(Debug, Clone)]
pub struct RstConverter {
    command: PathBuf,
    timeout: Duration,
}

impl RstConverter {
    /// Use `command` without probing it.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Limit how long one conversion may run before the process is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Find a working docutils front end.
    ///
    /// An explicitly configured command wins over the environment variable,
    /// which wins over a search of `PATH`. Returns `None` if nothing runs.
    pub fn detect(configured: Option<&Path>) -> Option<Self> {
        let command = resolve_command(configured)?;
        let converter = Self::with_command(command);
        match converter.execute(&["--version"], "") {
            Ok(output) if output.status.success() => {
                info!(
                    "Using docutils at {}: {}",
                    converter.command.display(),
                    String::from_utf8_lossy(&output.stdout).trim()
                );
                Some(converter)
            }
            Ok(output) => {
                debug!(
                    "{} --version exited with {}",
                    converter.command.display(),
                    output.status
                );
                None
            }
            Err(e) => {
                debug!("Failed to launch {}: {}", converter.command.display(), e);
                None
            }
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn run(&self, text: &str) -> Result<String> {
        let output = self.execute(DOCUTILS_ARGS, text)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::conversion(
                Dialect::ReStructuredText,
                format!(
                    "{} exited with {}: {}",
                    self.command.display(),
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::conversion(Dialect::ReStructuredText, e.to_string()))
    }

    /// Run the command with `input` on stdin, bounded by the timeout.
    fn execute(&self, args: &[&str], input: &str) -> Result<Output> {
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::conversion(
                    Dialect::ReStructuredText,
                    format!("failed to launch {}: {}", self.command.display(), e),
                )
            })?;

        // Pipes are serviced from their own threads so neither side can block
        // the other on a full buffer.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_owned();
            thread::spawn(move || match stdin.write_all(input.as_bytes()) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            })
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        // Reader threads are left behind on timeout: a grandchild may still
        // hold the pipes open.
        let status = self.wait_with_deadline(&mut child)?;

        join(writer)?;
        Ok(Output {
            status,
            stdout: join(stdout)?.unwrap_or_default(),
            stderr: join(stderr)?.unwrap_or_default(),
        })
    }

    fn wait_with_deadline(&self, child: &mut Child) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    warn!(
                        "{} did not finish within {:?}, killing it",
                        self.command.display(),
                        self.timeout
                    );
                    kill(child);
                    return Err(Error::conversion(
                        Dialect::ReStructuredText,
                        format!(
                            "{} timed out after {:?}",
                            self.command.display(),
                            self.timeout
                        ),
                    ));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill(child);
                    return Err(Error::conversion(Dialect::ReStructuredText, e.to_string()));
                }
            }
        }
    }
}

impl Converter for RstConverter {
    fn dialect(&self) -> Dialect {
        Dialect::ReStructuredText
    }

    fn is_available(&self) -> bool {
        true
    }

    fn convert(&self, text: &str) -> Result<RenderResult> {
        let page = self.run(text)?;
        let (title, body) = extract_document(&page).ok_or_else(|| {
            Error::conversion(Dialect::ReStructuredText, "output has no document body")
        })?;
        Ok(RenderResult::converted(body, title))
    }
}

fn resolve_command(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if !path.as_os_str().is_empty() {
            return Some(path.to_path_buf());
        }
    }

    if let Some(path) = env::var_os(RST_COMMAND_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    CANDIDATES.iter().find_map(|candidate| which(candidate).ok())
}

// ─────────────────────────────────────────────────────────────────────────────
// Process Plumbing
// ─────────────────────────────────────────────────────────────────────────────

struct Output {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join<T>(handle: Option<JoinHandle<io::Result<T>>>) -> Result<Option<T>> {
    let Some(handle) = handle else {
        return Ok(None);
    };
    match handle.join() {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) => Err(Error::conversion(Dialect::ReStructuredText, e.to_string())),
        Err(_) => Err(Error::conversion(
            Dialect::ReStructuredText,
            "pipe thread panicked",
        )),
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!("Failed to kill docutils process: {}", e);
    }
    // Reap it so no zombie is left behind
    let _ = child.wait();
}

// ─────────────────────────────────────────────────────────────────────────────
// Output Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Cut the document body and title out of a full docutils HTML page.
///
/// The container is `<div class="document">` (HTML4 writer) or `<main>`
/// (HTML5 writer). Returns `None` if the page has neither.
fn extract_document(page: &str) -> Option<(Option<String>, String)> {
    let dom = parse_document(RcDom::default(), Default::default()).one(page);
    let container = find_container(&dom.document)?;

    let title_node = container
        .children
        .borrow()
        .iter()
        .find(|child| is_element(child, "h1", Some("title")))
        .cloned();
    let title = title_node.as_ref().map(|node| {
        let mut text = String::new();
        collect_text(node, &mut text);
        text.trim().to_string()
    });

    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    let mut output = Vec::new();
    for child in container.children.borrow().iter() {
        if matches!(&title_node, Some(node) if Rc::ptr_eq(node, child)) {
            continue;
        }
        let serializable = SerializableHandle::from(child.clone());
        if let Err(e) = serialize(&mut output, &serializable, opts.clone()) {
            debug!("Failed to serialize docutils output: {}", e);
            return None;
        }
    }

    let body = String::from_utf8(output).ok()?;
    Some((title, body.trim().to_string()))
}

fn find_container(node: &Handle) -> Option<Handle> {
    if is_element(node, "main", None) || is_element(node, "div", Some("document")) {
        return Some(node.clone());
    }
    node.children.borrow().iter().find_map(find_container)
}

fn is_element(node: &Handle, tag: &str, class: Option<&str>) -> bool {
    match &node.data {
        NodeData::Element { name, attrs, .. } => {
            &*name.local == tag && class.map_or(true, |class| has_class(&attrs.borrow(), class))
        }
        _ => false,
    }
}

fn has_class(attrs: &[Attribute], class: &str) -> bool {
    attrs.iter().any(|attr| {
        &*attr.name.local == "class" && attr.value.split_whitespace().any(|c| c == class)
    })
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HTML4_PAGE: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
<head>
<title>Hello &amp; Welcome</title>
</head>
<body>
<div class="document" id="hello-welcome">
<h1 class="title">Hello &amp; <em>Welcome</em></h1>

<div class="section" id="intro">
<h1>Intro</h1>
<p>Some text.</p>
</div>
</div>
</body>
</html>
"#;

    const HTML5_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8" />
<title>&lt;string&gt;</title>
</head>
<body>
<main>
<p>Just a paragraph.</p>
</main>
</body>
</html>
"#;

    #[test]
    fn test_extract_html4_document_with_title() {
        let (title, body) = extract_document(HTML4_PAGE).unwrap();
        assert_eq!(title.as_deref(), Some("Hello & Welcome"));
        assert!(body.starts_with("<div class=\"section\" id=\"intro\">"));
        assert!(body.ends_with("</div>"));
        assert!(body.contains("<p>Some text.</p>"));
        assert!(!body.contains("class=\"title\""));
    }

    #[test]
    fn test_extract_html5_document_without_title() {
        let (title, body) = extract_document(HTML5_PAGE).unwrap();
        assert!(title.is_none());
        assert_eq!(body, "<p>Just a paragraph.</p>");
    }

    #[test]
    fn test_extract_rejects_unexpected_output() {
        assert!(extract_document("<html><body><p>x</p></body></html>").is_none());
        assert!(extract_document("").is_none());
    }

    #[test]
    fn test_title_decodes_named_and_numeric_entities() {
        let page = r#"<html><body><div class="document">
<h1 class="title">Caf&eacute;&#160;Menu &lt;v2&gt;</h1>
<p>x</p>
</div></body></html>"#;
        let (title, body) = extract_document(page).unwrap();
        assert_eq!(title.as_deref(), Some("Café\u{a0}Menu <v2>"));
        assert_eq!(body, "<p>x</p>");
    }

    #[test]
    fn test_nested_title_class_is_not_the_document_title() {
        let page = r#"<main><section><h1 class="title">Inner</h1></section></main>"#;
        let (title, body) = extract_document(page).unwrap();
        assert!(title.is_none());
        assert!(body.contains("Inner"));
    }

    #[test]
    fn test_configured_command_wins() {
        let path = PathBuf::from("/opt/docutils/bin/rst2html");
        assert_eq!(resolve_command(Some(&path)), Some(path));
    }

    #[test]
    fn test_detect_missing_command() {
        let missing = PathBuf::from("/nonexistent/retext/rst2html");
        assert!(RstConverter::detect(Some(&missing)).is_none());
    }

    #[test]
    fn test_convert_with_missing_command_fails() {
        let converter = RstConverter::with_command("/nonexistent/retext/rst2html");
        assert!(matches!(
            converter.convert("Title\n=====\n"),
            Err(Error::Conversion {
                dialect: Dialect::ReStructuredText,
                ..
            })
        ));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::config::DefaultMarkup;
        use crate::interpreter::DocumentInterpreter;
        use crate::markup::{ConverterSet, UnavailableConverter};
        use crate::session::{DocumentSession, SessionId};
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_converts_through_the_command() {
            let dir = TempDir::new().unwrap();
            let body = format!("cat >/dev/null\ncat <<'PAGE'\n{}PAGE", HTML4_PAGE);
            let converter = RstConverter::with_command(script(&dir, "rst2html", &body));

            let result = converter.convert("Hello\n=====\n").unwrap();
            assert_eq!(result.title.as_deref(), Some("Hello & Welcome"));
            assert!(result.body.contains("<p>Some text.</p>"));
        }

        #[test]
        fn test_failing_command_reports_stderr() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "rst2html", "cat >/dev/null\necho 'bad markup' >&2\nexit 3");
            let converter = RstConverter::with_command(path);

            match converter.convert("x") {
                Err(Error::Conversion { dialect, message }) => {
                    assert_eq!(dialect, Dialect::ReStructuredText);
                    assert!(message.contains("bad markup"));
                }
                other => panic!("expected a conversion error, got {:?}", other),
            }
        }

        #[test]
        fn test_hung_command_is_killed_after_timeout() {
            let dir = TempDir::new().unwrap();
            let converter = RstConverter::with_command(script(&dir, "rst2html", "exec sleep 30"))
                .with_timeout(Duration::from_millis(200));

            let started = Instant::now();
            let result = converter.convert("x");
            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(matches!(
                result,
                Err(Error::Conversion { ref message, .. }) if message.contains("timed out")
            ));
        }

        #[test]
        fn test_hung_command_degrades_the_preview() {
            let dir = TempDir::new().unwrap();
            let converter = RstConverter::with_command(script(&dir, "rst2html", "sleep 30"))
                .with_timeout(Duration::from_millis(200));
            let set = ConverterSet::from_converters(
                Box::new(UnavailableConverter::new(Dialect::Markdown)),
                Box::new(converter),
            );
            let mut interpreter = DocumentInterpreter::new(set, DefaultMarkup::Markdown);
            let doc = DocumentSession::with_file(
                SessionId(1),
                PathBuf::from("/docs/a.rst"),
                "Title\n=====\n".to_string(),
            );

            let started = Instant::now();
            let result = interpreter.interpret(&doc);
            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(result.is_degraded());
        }

        #[test]
        fn test_detect_accepts_working_command() {
            let dir = TempDir::new().unwrap();
            let path = script(&dir, "rst2html", "echo 'rst2html (Docutils 0.20)'");
            let converter = RstConverter::detect(Some(&path)).unwrap();
            assert_eq!(converter.command(), path.as_path());
        }
    }
}
