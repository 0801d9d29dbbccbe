use docgraph_core::{Diagnostic, DiagnosticSink, Severity};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, warn};

/// Lines shown before and after the reported line in a snippet.
const SNIPPET_CONTEXT: u32 = 2;

/// Queue of diagnostics collected during a run.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    queue: Mutex<Vec<Diagnostic>>,
}

/// Diagnostics drained from a [`DiagnosticLog`], split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    /// Invalid input code.
    pub warnings: Vec<Diagnostic>,
    /// Internal traversal failures.
    pub errors: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len() + self.errors.len()
    }
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drain the queue and emit it as a labelled report.
    pub fn flush(&self) -> DiagnosticReport {
        let drained = std::mem::take(&mut *self.queue.lock());
        let (warnings, errors): (Vec<_>, Vec<_>) = drained
            .into_iter()
            .partition(|d| d.severity == Severity::Warning);
        let report = DiagnosticReport { warnings, errors };

        if !report.warnings.is_empty() {
            warn!("[warning] {} source unit(s) could not be processed:", report.warnings.len());
            for d in &report.warnings {
                warn!("{}:{}:{} {}", d.origin, d.line, d.column, d.message);
                if let Some(snippet) = &d.snippet {
                    warn!("\n{}", snippet);
                }
            }
        }
        if !report.errors.is_empty() {
            error!("[error] {} internal failure(s) while generating docs:", report.errors.len());
            for d in &report.errors {
                error!("{}:{} {}", d.origin, d.line, d.message);
                if let Some(snippet) = &d.snippet {
                    error!("\n{}", snippet);
                }
            }
        }
        report
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&self, diagnostic: Diagnostic) {
        self.queue.lock().push(diagnostic);
    }
}

/// Numbered source excerpt around the 1-based `line`, with the line itself marked.
pub fn code_snippet(source: &str, line: u32) -> Option<String> {
    if line == 0 {
        return None;
    }
    let first = line.saturating_sub(SNIPPET_CONTEXT).max(1);
    let last = line + SNIPPET_CONTEXT;
    let width = last.to_string().len();
    let lines: Vec<String> = source
        .lines()
        .enumerate()
        .map(|(i, text)| (i as u32 + 1, text))
        .filter(|(n, _)| (first..=last).contains(n))
        .map(|(n, text)| {
            let marker = if n == line { ">" } else { " " };
            format!("{} {:>width$}| {}", marker, n, text, width = width)
        })
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
