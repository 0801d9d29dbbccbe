use crate::ast::{SyntaxNode, SyntaxTree};
use crate::doc::PendingDoc;
use crate::error::{ParseError, TraversalError};
use crate::{ModuleIdentity, StoreMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub trait SourceParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError>;

    fn parse_file(&self, path: &Path) -> Result<SyntaxTree, ParseError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ParseError::new(0, 0, format!("cannot read {}: {}", path.display(), e))
        })?;
        self.parse(&source)
    }
}

/// Callback receiving each node together with its parent.
pub type NodeVisitor<'v, 't> =
    dyn FnMut(&'t SyntaxNode, Option<&'t SyntaxNode>) -> Result<(), TraversalError> + 'v;

pub trait TreeWalker: Send + Sync {
    /// Visit every node of `tree`. The first visitor error stops the walk.
    fn traverse<'t>(
        &self,
        tree: &'t SyntaxTree,
        visitor: &mut NodeVisitor<'_, 't>,
    ) -> Result<(), TraversalError>;
}

/// Depth-first, parent before children, children in source order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreorderWalker;

impl TreeWalker for PreorderWalker {
    fn traverse<'t>(
        &self,
        tree: &'t SyntaxTree,
        visitor: &mut NodeVisitor<'_, 't>,
    ) -> Result<(), TraversalError> {
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            visitor(node, tree.parent_of(node))?;
            let children: Vec<_> = tree.children_of(node).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(())
    }
}

/// What a doc factory knows about the unit it is documenting.
#[derive(Clone)]
pub struct FactoryContext {
    pub file_path: String,
    pub relative_path: String,
    pub identity: ModuleIdentity,
    pub resolver: Arc<dyn PathResolver>,
}

impl fmt::Debug for FactoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryContext")
            .field("file_path", &self.file_path)
            .field("relative_path", &self.relative_path)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

pub trait DocFactory: Send + Sync {
    fn create<'t>(
        &self,
        tree: &'t SyntaxTree,
        ctx: &FactoryContext,
    ) -> Box<dyn DocHandler<'t> + 't>;
}

/// Per-unit state of a doc factory, bound to one syntax tree.
pub trait DocHandler<'t> {
    fn push(
        &mut self,
        node: &'t SyntaxNode,
        parent: Option<&'t SyntaxNode>,
    ) -> Result<(), TraversalError>;

    fn finish(self: Box<Self>) -> Vec<PendingDoc<'t>>;
}

pub trait PathResolver: Send + Sync {
    fn module_identity(&self, file_path: &str) -> ModuleIdentity;

    /// Resolve an import specifier written in `from_file` to a file path.
    fn resolve_import(&self, from_file: &str, specifier: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Invalid input code.
    Warning,
    /// Internal traversal failure.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// File the problem was found in, or `<memory>` for in-memory code.
    pub origin: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    /// Source lines around the reported position.
    pub snippet: Option<String>,
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Inspects generated records before they are admitted into a store.
pub trait InsertHook: Send + Sync {
    fn applies_to(&self, mode: StoreMode) -> bool;

    fn inspect(&self, pending: &PendingDoc<'_>);
}
