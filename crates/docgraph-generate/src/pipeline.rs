use crate::diagnostics::code_snippet;
use crate::filter::{relative_path, PathFilter};
use docgraph_core::{
    Diagnostic, DiagnosticSink, DocFactory, DocGraphConfig, DocGraphError, FactoryContext,
    OnError, ParseError, PathResolver, PreorderWalker, Result, Severity, SourceParser,
    SyntaxTree, TraversalError, TreeWalker, MEMORY_FILE_PATH,
};
use docgraph_store::DocStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Records were produced. `failed_nodes` counts node failures logged under
    /// the `Log` policy.
    Generated { inserted: usize, failed_nodes: usize },
    /// The path was excluded by the include/exclude patterns.
    Skipped,
    /// Parsing failed and a diagnostic was queued.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub inserted: usize,
}

impl GenerationSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Generated { inserted, .. } => {
                self.generated += 1;
                self.inserted += inserted;
            }
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub on_error: OnError,
    pub filter: PathFilter,
    /// Present when test files are documented.
    pub test_filter: Option<PathFilter>,
}

impl PipelineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            on_error: OnError::Log,
            filter: PathFilter::allow_all(),
            test_filter: None,
        }
    }

    /// Build from loaded configuration, compiling the glob patterns.
    pub fn from_config(config: &DocGraphConfig) -> Result<Self> {
        let generate = &config.generate;
        let test_filter = match &config.test {
            Some(test) => Some(PathFilter::new(&test.includes, &test.excludes)?),
            None => None,
        };
        Ok(Self {
            root: generate.root.clone(),
            on_error: generate.on_error,
            filter: PathFilter::new(&generate.includes, &generate.excludes)?,
            test_filter,
        })
    }
}

/// Parses one unit of input, walks its tree through a doc factory and admits
/// the produced records into a target store.
#[derive(Clone)]
pub struct GenerationPipeline {
    parser: Arc<dyn SourceParser>,
    factory: Arc<dyn DocFactory>,
    test_factory: Option<Arc<dyn DocFactory>>,
    walker: Arc<dyn TreeWalker>,
    resolver: Arc<dyn PathResolver>,
    sink: Arc<dyn DiagnosticSink>,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(
        parser: Arc<dyn SourceParser>,
        factory: Arc<dyn DocFactory>,
        resolver: Arc<dyn PathResolver>,
        sink: Arc<dyn DiagnosticSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            parser,
            factory,
            test_factory: None,
            walker: Arc::new(PreorderWalker),
            resolver,
            sink,
            config,
        }
    }

    pub fn with_test_factory(mut self, factory: Arc<dyn DocFactory>) -> Self {
        self.test_factory = Some(factory);
        self
    }

    pub fn with_walker(mut self, walker: Arc<dyn TreeWalker>) -> Self {
        self.walker = walker;
        self
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.config.on_error = on_error;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<dyn PathResolver> {
        &self.resolver
    }

    /// Path of `path` relative to the project root, as records store it.
    pub fn relative_to_root(&self, path: impl AsRef<Path>) -> String {
        self.locate(path.as_ref()).1
    }

    /// Document one source file. Relative paths are taken from the project root.
    pub fn generate_file(&self, path: impl AsRef<Path>, store: &mut DocStore) -> Result<Outcome> {
        let (disk_path, relative) = self.locate(path.as_ref());
        if !self.config.filter.is_included(&relative) {
            debug!(file = %relative, "Skipping excluded file");
            return Ok(Outcome::Skipped);
        }
        // a missing file is an IO error, not a parse failure
        std::fs::metadata(&disk_path)?;
        self.run(Input::File(&disk_path), &relative, self.factory.as_ref(), store)
    }

    /// Document one test file with the test patterns and test doc factory.
    pub fn generate_test_file(
        &self,
        path: impl AsRef<Path>,
        store: &mut DocStore,
    ) -> Result<Outcome> {
        let (Some(filter), Some(factory)) = (&self.config.test_filter, &self.test_factory) else {
            return Err(DocGraphError::invalid_argument(
                "test generation needs test patterns and a test doc factory",
            ));
        };
        let (disk_path, relative) = self.locate(path.as_ref());
        if !filter.is_included(&relative) {
            debug!(file = %relative, "Skipping excluded test file");
            return Ok(Outcome::Skipped);
        }
        std::fs::metadata(&disk_path)?;
        self.run(Input::File(&disk_path), &relative, factory.as_ref(), store)
    }

    /// Document in-memory code. Without a label the records are tagged `<memory>`.
    pub fn generate_code(
        &self,
        code: &str,
        label: Option<&str>,
        store: &mut DocStore,
    ) -> Result<Outcome> {
        let origin = label.unwrap_or(MEMORY_FILE_PATH);
        self.run(Input::Code(code), origin, self.factory.as_ref(), store)
    }

    /// Run [`generate_file`](Self::generate_file) over every path.
    pub fn generate_all<I, P>(&self, paths: I, store: &mut DocStore) -> Result<GenerationSummary>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut summary = GenerationSummary::default();
        for path in paths {
            summary.record(self.generate_file(path, store)?);
        }
        info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            inserted = summary.inserted,
            "Generation complete"
        );
        Ok(summary)
    }

    fn locate(&self, path: &Path) -> (PathBuf, String) {
        let disk_path = if path.is_relative() {
            self.config.root.join(path)
        } else {
            path.to_path_buf()
        };
        let relative = relative_path(&self.config.root, &disk_path);
        (disk_path, relative)
    }

    fn run(
        &self,
        input: Input<'_>,
        origin: &str,
        factory: &dyn DocFactory,
        store: &mut DocStore,
    ) -> Result<Outcome> {
        debug!(file = origin, "Parsing");
        let parsed = match input {
            Input::Code(code) => self.parser.parse(code),
            Input::File(path) => self.parser.parse_file(path),
        };
        let tree = match parsed {
            Ok(tree) => tree,
            Err(err) => return self.parse_failed(origin, &input, err),
        };

        let ctx = FactoryContext {
            file_path: self.config.root.join(origin).to_string_lossy().into_owned(),
            relative_path: origin.to_string(),
            identity: self.resolver.module_identity(origin),
            resolver: Arc::clone(&self.resolver),
        };
        let mut handler = factory.create(&tree, &ctx);

        debug!(file = origin, nodes = tree.len(), "Walking syntax tree");
        let on_error = self.config.on_error;
        let mut failed_nodes = 0;
        let walked = self.walker.traverse(&tree, &mut |node, parent| {
            match handler.push(node, parent) {
                Ok(()) => Ok(()),
                Err(err) if on_error == OnError::Log => {
                    failed_nodes += 1;
                    let snippet = input.snippet(Some(&tree), err.line.unwrap_or(0));
                    self.sink.report(traversal_diagnostic(origin, snippet, &err));
                    Ok(())
                }
                Err(err) => Err(err),
            }
        });
        if let Err(err) = walked {
            return Err(DocGraphError::Traversal {
                file: origin.to_string(),
                source: err,
            });
        }

        let mut inserted = 0;
        for pending in handler.finish() {
            if store.insert_static_doc(pending, None).is_some() {
                inserted += 1;
            }
        }
        debug!(file = origin, inserted, failed_nodes, "Admitted records");
        Ok(Outcome::Generated {
            inserted,
            failed_nodes,
        })
    }

    fn parse_failed(&self, origin: &str, input: &Input<'_>, err: ParseError) -> Result<Outcome> {
        match self.config.on_error {
            OnError::Throw => Err(DocGraphError::Parse {
                file: origin.to_string(),
                source: err,
            }),
            OnError::Log => {
                self.sink.report(Diagnostic {
                    severity: Severity::Warning,
                    origin: origin.to_string(),
                    line: err.line,
                    column: err.column,
                    snippet: input.snippet(None, err.line),
                    message: err.message,
                });
                Ok(Outcome::Failed)
            }
        }
    }
}

/// What a generation call parses.
#[derive(Clone, Copy)]
enum Input<'a> {
    Code(&'a str),
    File(&'a Path),
}

impl Input<'_> {
    /// Source excerpt around `line`. Prefers the text the tree kept, and
    /// rereads the file only when the parser kept none.
    fn snippet(&self, tree: Option<&SyntaxTree>, line: u32) -> Option<String> {
        if let Some(source) = tree.and_then(SyntaxTree::source) {
            return code_snippet(source, line);
        }
        match self {
            Input::Code(code) => code_snippet(code, line),
            Input::File(path) => std::fs::read_to_string(path)
                .ok()
                .and_then(|source| code_snippet(&source, line)),
        }
    }
}

fn traversal_diagnostic(
    origin: &str,
    snippet: Option<String>,
    err: &TraversalError,
) -> Diagnostic {
    Diagnostic {
        severity: Severity::Error,
        origin: origin.to_string(),
        line: err.line.unwrap_or(0),
        column: 0,
        message: err.to_string(),
        snippet,
    }
}
