//! Toy language used by the integration tests.
//!
//! One statement per line:
//!
//! ```text
//! import ./base
//! class Leaf extends Base
//!   method run(a, b)
//! @param a
//! function sum(a, b)
//! test adds numbers
//! boom
//! ```
//!
//! `!!` anywhere is a syntax error. `boom` parses but its doc handler fails.

#![allow(dead_code)]

use docgraph_core::{
    AstNodeId, CommentTag, DocFactory, DocHandler, DocKind, DocObject, FactoryContext, OnError,
    Param, ParseError, PendingDoc, SourceParser, SyntaxNode, SyntaxTree, SyntaxTreeBuilder,
    TraversalError,
};
use docgraph_generate::{
    DiagnosticLog, GenerationPipeline, PackagePathResolver, PathFilter, PipelineConfig,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct ToyParser;

impl SourceParser for ToyParser {
    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError> {
        let mut b = SyntaxTreeBuilder::new("Program").with_source(source);
        let root = b.root_id();
        let mut class: Option<AstNodeId> = None;
        let mut comment: Vec<String> = Vec::new();

        for (i, raw) in source.lines().enumerate() {
            let line = i as u32 + 1;
            if let Some(col) = raw.find("!!") {
                return Err(ParseError::new(line, col as u32 + 1, "unexpected token `!!`"));
            }
            let indented = raw.starts_with("  ");
            let text = raw.trim();
            let (word, rest) = text.split_once(' ').unwrap_or((text, ""));

            let node = match word {
                "" => continue,
                "@param" => {
                    comment.push(text.to_string());
                    continue;
                }
                "import" => {
                    let id = b.push(root, "Import", None, line);
                    b.set_attr(id, "from", rest.trim());
                    id
                }
                "class" => {
                    let (name, base) = match rest.split_once(" extends ") {
                        Some((n, s)) => (n.trim(), Some(s.trim())),
                        None => (rest.trim(), None),
                    };
                    let id = b.push(root, "Class", Some(name), line);
                    if let Some(base) = base {
                        b.set_attr(id, "extends", base);
                    }
                    class = Some(id);
                    id
                }
                "method" if indented => {
                    let parent = class.ok_or_else(|| {
                        ParseError::new(line, 1, "method outside of a class")
                    })?;
                    callable(&mut b, parent, "Method", rest, line)
                }
                "function" => {
                    class = None;
                    callable(&mut b, root, "Function", rest, line)
                }
                "test" => b.push(root, "Test", Some(rest.trim()), line),
                "boom" => b.push(root, "Boom", None, line),
                other => {
                    return Err(ParseError::new(
                        line,
                        1,
                        format!("unknown statement `{}`", other),
                    ))
                }
            };
            if !comment.is_empty() {
                b.set_comment(node, comment.join("\n"));
                comment.clear();
            }
        }
        Ok(b.build())
    }
}

fn callable(
    b: &mut SyntaxTreeBuilder,
    parent: AstNodeId,
    kind: &str,
    rest: &str,
    line: u32,
) -> AstNodeId {
    let (name, params) = match rest.split_once('(') {
        Some((n, p)) => (n.trim(), p.trim_end_matches(')')),
        None => (rest.trim(), ""),
    };
    let id = b.push(parent, kind, Some(name), line);
    b.set_attr(id, "params", params.replace(' ', ""));
    id
}

fn name_of(node: &SyntaxNode) -> &str {
    node.name.as_deref().unwrap_or("")
}

fn tags_of(node: &SyntaxNode) -> Vec<CommentTag> {
    node.leading_comment
        .as_deref()
        .unwrap_or("")
        .lines()
        .filter_map(|l| l.split_once(' '))
        .map(|(tag, value)| CommentTag {
            tag: tag.to_string(),
            value: value.to_string(),
        })
        .collect()
}

/// Documents files, classes, methods and functions.
pub struct ToyDocFactory;

impl DocFactory for ToyDocFactory {
    fn create<'t>(
        &self,
        _tree: &'t SyntaxTree,
        ctx: &FactoryContext,
    ) -> Box<dyn DocHandler<'t> + 't> {
        Box::new(ToyHandler {
            ctx: ctx.clone(),
            imports: Vec::new(),
            classes: HashMap::new(),
            docs: Vec::new(),
        })
    }
}

struct ToyHandler<'t> {
    ctx: FactoryContext,
    imports: Vec<String>,
    classes: HashMap<AstNodeId, String>,
    docs: Vec<PendingDoc<'t>>,
}

impl<'t> ToyHandler<'t> {
    fn file(&self) -> &str {
        &self.ctx.relative_path
    }
}

impl<'t> DocHandler<'t> for ToyHandler<'t> {
    fn push(
        &mut self,
        node: &'t SyntaxNode,
        parent: Option<&'t SyntaxNode>,
    ) -> Result<(), TraversalError> {
        let doc = match node.kind.as_str() {
            "Import" => {
                let specifier = node.attr("from").unwrap_or("");
                if let Some(path) = self.ctx.resolver.resolve_import(self.file(), specifier) {
                    self.imports.push(path);
                }
                return Ok(());
            }
            "Class" => {
                let longname = format!("{}~{}", self.file(), name_of(node));
                self.classes.insert(node.id, longname.clone());
                let mut b = DocObject::builder(DocKind::ModuleClass, name_of(node), longname);
                if let Some(base) = node.attr("extends") {
                    b = b.extends(base);
                }
                b
            }
            "Method" => {
                let owner = parent
                    .and_then(|p| self.classes.get(&p.id))
                    .cloned()
                    .ok_or_else(|| TraversalError::at(node, "method without owner class"))?;
                with_params(
                    DocObject::builder(
                        DocKind::ClassMethod,
                        name_of(node),
                        format!("{}#{}", owner, name_of(node)),
                    )
                    .memberof(owner),
                    node,
                )
            }
            "Function" => with_params(
                DocObject::builder(
                    DocKind::ModuleFunction,
                    name_of(node),
                    format!("{}~{}", self.file(), name_of(node)),
                ),
                node,
            ),
            "Boom" => return Err(TraversalError::at(node, "cannot document this node")),
            _ => return Ok(()),
        };

        let doc = doc
            .file_path(self.file())
            .line_number(node.line)
            .undocument(!node.has_doc_comment())
            .build()
            .map_err(|e| TraversalError::at(node, e.to_string()))?;
        self.docs.push(
            PendingDoc::new(doc)
                .with_node(node)
                .with_tags(tags_of(node)),
        );
        Ok(())
    }

    fn finish(self: Box<Self>) -> Vec<PendingDoc<'t>> {
        let mut file = DocObject::builder(DocKind::ModuleFile, self.file(), self.file())
            .file_path(self.file());
        for import in &self.imports {
            file = file.import(import.as_str());
        }
        let mut docs = Vec::with_capacity(self.docs.len() + 1);
        if let Ok(file) = file.build() {
            docs.push(PendingDoc::new(file));
        }
        docs.extend(self.docs);
        docs
    }
}

fn with_params(
    mut b: docgraph_core::DocBuilder,
    node: &SyntaxNode,
) -> docgraph_core::DocBuilder {
    for p in node.attr("params").unwrap_or("").split(',') {
        if !p.is_empty() {
            b = b.param(Param::new(p, None));
        }
    }
    b
}

/// Documents `test` statements of test files.
pub struct ToyTestFactory;

impl DocFactory for ToyTestFactory {
    fn create<'t>(
        &self,
        _tree: &'t SyntaxTree,
        ctx: &FactoryContext,
    ) -> Box<dyn DocHandler<'t> + 't> {
        Box::new(ToyTestHandler {
            file: ctx.relative_path.clone(),
            docs: Vec::new(),
        })
    }
}

struct ToyTestHandler<'t> {
    file: String,
    docs: Vec<PendingDoc<'t>>,
}

impl<'t> DocHandler<'t> for ToyTestHandler<'t> {
    fn push(
        &mut self,
        node: &'t SyntaxNode,
        _parent: Option<&'t SyntaxNode>,
    ) -> Result<(), TraversalError> {
        if node.kind != "Test" {
            return Ok(());
        }
        let longname = format!("{}~test{}", self.file, self.docs.len());
        let doc = DocObject::builder(DocKind::Test, name_of(node), longname)
            .memberof(self.file.as_str())
            .file_path(self.file.as_str())
            .line_number(node.line)
            .build()
            .map_err(|e| TraversalError::at(node, e.to_string()))?;
        self.docs.push(PendingDoc::new(doc).with_node(node));
        Ok(())
    }

    fn finish(self: Box<Self>) -> Vec<PendingDoc<'t>> {
        let mut docs = Vec::with_capacity(self.docs.len() + 1);
        if let Ok(file) = DocObject::builder(DocKind::TestFile, &self.file, &self.file)
            .file_path(self.file.as_str())
            .build()
        {
            docs.push(PendingDoc::new(file));
        }
        docs.extend(self.docs);
        docs
    }
}

/// Project on disk plus a pipeline over it.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub log: Arc<DiagnosticLog>,
    pub pipeline: GenerationPipeline,
}

impl Fixture {
    pub fn new(on_error: OnError) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = PipelineConfig::new(dir.path());
        config.on_error = on_error;
        config.filter = PathFilter::new(["src/**/*.js"], ["src/vendor/**"]).expect("globs");
        Self::with_config(dir, config)
    }

    pub fn with_config(dir: tempfile::TempDir, config: PipelineConfig) -> Self {
        let log = Arc::new(DiagnosticLog::new());
        let resolver = Arc::new(PackagePathResolver::new(dir.path(), Some("toy".to_string())));
        let pipeline = GenerationPipeline::new(
            Arc::new(ToyParser),
            Arc::new(ToyDocFactory),
            resolver,
            log.clone(),
            config,
        );
        Self { dir, log, pipeline }
    }

    pub fn write(&self, relative: &str, source: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(path, source).expect("write source");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
