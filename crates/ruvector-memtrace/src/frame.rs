use crate::error::MemtraceError;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of instrumentation point that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEvent {
    /// Entry into an instrumented scope (`trace_scope!`)
    Call,
    /// A plain checkpoint (`checkpoint!`)
    Line,
    /// Exit from an instrumented scope, fired when the guard drops
    Return,
}

impl TraceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceEvent::Call => "call",
            TraceEvent::Line => "line",
            TraceEvent::Return => "return",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceEvent {
    type Err = MemtraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(TraceEvent::Call),
            "line" => Ok(TraceEvent::Line),
            "return" => Ok(TraceEvent::Return),
            other => Err(MemtraceError::InvalidEvent(other.to_string())),
        }
    }
}

/// Static source location of an instrumentation point, filled in by the
/// tracing macros from `file!()`, `line!()` and `module_path!()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub file: &'static str,
    pub line: u32,
    pub module: &'static str,
}

/// A traced execution point.
///
/// Equality and hashing cover all five fields; two frames that agree on all
/// of them are the same location when the trace is aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub filename: String,
    pub module: String,
    pub line_number: u32,
    pub event: TraceEvent,
    pub line_text: String,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line_number)
    }
}

/// Per-file cache of source lines used to fill [`Frame::line_text`].
///
/// Each file is read at most once per session. Files that cannot be read are
/// remembered as missing and yield empty text.
#[derive(Debug, Default)]
pub struct LineCache {
    source_root: Option<PathBuf>,
    files: HashMap<String, Option<Vec<String>>>,
}

impl LineCache {
    pub fn new(source_root: Option<PathBuf>) -> Self {
        Self {
            source_root,
            files: HashMap::new(),
        }
    }

    /// Text of 1-based `line` in `file` with trailing whitespace removed.
    pub fn line(&mut self, file: &str, line: u32) -> String {
        if line == 0 {
            return String::new();
        }
        let root = self.source_root.as_deref();
        let lines = self
            .files
            .entry(file.to_string())
            .or_insert_with(|| read_lines(&resolve_source(root, Path::new(file))));
        lines
            .as_ref()
            .and_then(|l| l.get(line as usize - 1))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }

    pub fn cached_files(&self) -> usize {
        self.files.len()
    }
}

/// Resolve a path from `file!()` to something readable.
///
/// `file!()` paths are relative to the workspace root, which need not be
/// `source_root`. Relative paths are tried under `source_root` with leading
/// components dropped one at a time, then as given.
fn resolve_source(root: Option<&Path>, file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }
    if let Some(root) = root {
        let mut suffix = file;
        loop {
            let candidate = root.join(suffix);
            if candidate.is_file() {
                return candidate;
            }
            let mut components = suffix.components();
            if components.next().is_none() || components.as_path().as_os_str().is_empty() {
                break;
            }
            suffix = components.as_path();
        }
    }
    file.to_path_buf()
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text.lines().map(str::to_string).collect()),
        Err(err) => {
            tracing::debug!(
                path = %path.display(),
                %err,
                "source file not readable, line text left empty"
            );
            None
        }
    }
}
