use docgraph_core::{
    CommentTag, Diagnostic, DiagnosticSink, InsertHook, PendingDoc, Severity, StoreMode,
};
use std::sync::Arc;
use tracing::debug;

/// Checks `@param` tags of callables against the parameters found in code.
///
/// Runs during full generation only; regeneration would report the same
/// problems again.
pub struct ParamLintHook {
    sink: Arc<dyn DiagnosticSink>,
}

impl ParamLintHook {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }
}

impl InsertHook for ParamLintHook {
    fn applies_to(&self, mode: StoreMode) -> bool {
        mode == StoreMode::Generate
    }

    fn inspect(&self, pending: &PendingDoc<'_>) {
        let doc = pending.doc();
        if !doc.kind.is_callable() || pending.tags().is_empty() {
            return;
        }

        let documented: Vec<&str> = pending.tags().iter().filter_map(param_tag_name).collect();
        let actual: Vec<&str> = doc.params().iter().map(|p| p.name.as_str()).collect();
        if documented.is_empty() || documented == actual {
            return;
        }

        debug!(longname = %doc.longname, "Parameter tags disagree with signature");
        let (line, column) = match pending.node() {
            Some(node) => (node.line, node.column),
            None => (doc.line_number.unwrap_or(0), 0),
        };
        self.sink.report(Diagnostic {
            severity: Severity::Warning,
            origin: doc.file_path.clone(),
            line,
            column,
            message: format!(
                "{}: documented params [{}] do not match [{}]",
                doc.longname,
                documented.join(", "),
                actual.join(", ")
            ),
            snippet: None,
        });
    }
}

/// Name of a `@param {type} name - text` tag. Optional names in brackets
/// (`[name=default]`) are unwrapped; dotted property names are skipped.
fn param_tag_name(tag: &CommentTag) -> Option<&str> {
    if tag.tag.trim_start_matches('@') != "param" {
        return None;
    }
    let mut rest = tag.value.trim_start();
    if rest.starts_with('{') {
        let end = rest.find('}')?;
        rest = rest[end + 1..].trim_start();
    }
    let word = rest.split_whitespace().next()?;
    let word = word
        .strip_prefix('[')
        .map(|w| w.trim_end_matches(']').split('=').next().unwrap_or(w))
        .unwrap_or(word);
    if word.is_empty() || word.contains('.') {
        None
    } else {
        Some(word)
    }
}
