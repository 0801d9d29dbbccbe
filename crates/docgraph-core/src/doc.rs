use crate::ast::{AstNodeId, SyntaxNode};
use crate::{Access, DocGraphError, DocId, DocKind, Param, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Detail carried only by class records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDetail {
    pub interface: bool,
    /// Direct supertypes as written in source.
    pub extends: Vec<String>,
    /// Resolved ancestor longnames, nearest first.
    pub extends_chains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableDetail {
    pub params: Vec<Param>,
}

/// Detail carried only by file records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetail {
    /// Files whose records must be regenerated when this file changes.
    pub dependent_file_paths: BTreeSet<String>,
    /// Resolved paths of modules this file imports.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "lowercase")]
pub enum DocDetail {
    #[default]
    Plain,
    Class(ClassDetail),
    Callable(CallableDetail),
    File(FileDetail),
}

impl DocDetail {
    fn for_kind(kind: DocKind) -> Self {
        if kind.is_class() {
            DocDetail::Class(ClassDetail::default())
        } else if kind.is_callable() {
            DocDetail::Callable(CallableDetail::default())
        } else if kind.is_file() {
            DocDetail::File(FileDetail::default())
        } else {
            DocDetail::Plain
        }
    }

    fn fits(&self, kind: DocKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&Self::for_kind(kind))
    }
}

/// One documentation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocObject {
    pub id: DocId,
    pub kind: DocKind,
    pub name: String,
    pub longname: String,
    pub memberof: String,
    pub access: Access,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub builtin_virtual: bool,
    pub file_path: String,
    pub line_number: Option<u32>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub undocument: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ast_node: Option<AstNodeId>,
    #[serde(flatten)]
    detail: DocDetail,
}

impl DocObject {
    /// Starts a record of the given kind. The id stays zero until a store admits it.
    pub fn builder(
        kind: DocKind,
        name: impl Into<String>,
        longname: impl Into<String>,
    ) -> DocBuilder {
        DocBuilder::new(kind, name.into(), longname.into())
    }

    pub fn detail(&self) -> &DocDetail {
        &self.detail
    }

    pub fn is_interface(&self) -> bool {
        matches!(&self.detail, DocDetail::Class(c) if c.interface)
    }

    pub fn extends(&self) -> &[String] {
        match &self.detail {
            DocDetail::Class(c) => &c.extends,
            _ => &[],
        }
    }

    pub fn extends_chains(&self) -> &[String] {
        match &self.detail {
            DocDetail::Class(c) => &c.extends_chains,
            _ => &[],
        }
    }

    pub fn params(&self) -> &[Param] {
        match &self.detail {
            DocDetail::Callable(c) => &c.params,
            _ => &[],
        }
    }

    pub fn dependent_file_paths(&self) -> Option<&BTreeSet<String>> {
        match &self.detail {
            DocDetail::File(f) => Some(&f.dependent_file_paths),
            _ => None,
        }
    }

    pub fn imports(&self) -> &[String] {
        match &self.detail {
            DocDetail::File(f) => &f.imports,
            _ => &[],
        }
    }

    pub fn set_extends_chains(&mut self, chain: Vec<String>) -> Result<()> {
        match &mut self.detail {
            DocDetail::Class(c) => {
                c.extends_chains = chain;
                Ok(())
            }
            _ => Err(self.detail_mismatch("extends chains")),
        }
    }

    /// Registers a dependent file. Returns whether it was newly added.
    pub fn add_dependent_file(&mut self, path: impl Into<String>) -> Result<bool> {
        match &mut self.detail {
            DocDetail::File(f) => Ok(f.dependent_file_paths.insert(path.into())),
            _ => Err(self.detail_mismatch("dependent file paths")),
        }
    }

    pub fn clear_dependent_files(&mut self) {
        if let DocDetail::File(f) = &mut self.detail {
            f.dependent_file_paths.clear();
        }
    }

    /// Checks the invariants the builder establishes: both names are set and
    /// the detail matches the kind.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.longname.is_empty() {
            return Err(DocGraphError::invalid_argument(format!(
                "{} record requires a name and a longname",
                self.kind
            )));
        }
        if !self.detail.fits(self.kind) {
            return Err(DocGraphError::invalid_argument(format!(
                "{} record `{}` carries detail of another kind",
                self.kind, self.longname
            )));
        }
        Ok(())
    }

    fn detail_mismatch(&self, what: &str) -> DocGraphError {
        DocGraphError::invalid_argument(format!(
            "{} record `{}` cannot carry {}",
            self.kind, self.longname, what
        ))
    }
}

/// Validating builder for [`DocObject`].
#[derive(Debug, Clone)]
pub struct DocBuilder {
    doc: DocObject,
    error: Option<String>,
}

impl DocBuilder {
    fn new(kind: DocKind, name: String, longname: String) -> Self {
        Self {
            doc: DocObject {
                id: DocId::default(),
                kind,
                name,
                longname,
                memberof: String::new(),
                access: Access::Public,
                is_static: false,
                builtin_virtual: false,
                file_path: String::new(),
                line_number: None,
                content: None,
                description: None,
                undocument: false,
                ast_node: None,
                detail: DocDetail::for_kind(kind),
            },
            error: None,
        }
    }

    pub fn memberof(mut self, memberof: impl Into<String>) -> Self {
        self.doc.memberof = memberof.into();
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.doc.access = access;
        self
    }

    pub fn is_static(mut self, is_static: bool) -> Self {
        self.doc.is_static = is_static;
        self
    }

    pub fn builtin_virtual(mut self, builtin: bool) -> Self {
        self.doc.builtin_virtual = builtin;
        self
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.doc.file_path = path.into();
        self
    }

    pub fn line_number(mut self, line: u32) -> Self {
        self.doc.line_number = Some(line);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.doc.content = Some(content.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.doc.description = Some(description.into());
        self
    }

    pub fn undocument(mut self, undocument: bool) -> Self {
        self.doc.undocument = undocument;
        self
    }

    pub fn ast_node(mut self, node: AstNodeId) -> Self {
        self.doc.ast_node = Some(node);
        self
    }

    pub fn interface(mut self, interface: bool) -> Self {
        match &mut self.doc.detail {
            DocDetail::Class(c) => c.interface = interface,
            _ => self.reject("interface flag"),
        }
        self
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        match &mut self.doc.detail {
            DocDetail::Class(c) => c.extends.push(supertype.into()),
            _ => self.reject("extends"),
        }
        self
    }

    pub fn extends_chains(mut self, chain: Vec<String>) -> Self {
        match &mut self.doc.detail {
            DocDetail::Class(c) => c.extends_chains = chain,
            _ => self.reject("extends chains"),
        }
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        match &mut self.doc.detail {
            DocDetail::Callable(c) => c.params.push(param),
            _ => self.reject("params"),
        }
        self
    }

    pub fn dependent_file(mut self, path: impl Into<String>) -> Self {
        match &mut self.doc.detail {
            DocDetail::File(f) => {
                f.dependent_file_paths.insert(path.into());
            }
            _ => self.reject("dependent file paths"),
        }
        self
    }

    pub fn import(mut self, path: impl Into<String>) -> Self {
        match &mut self.doc.detail {
            DocDetail::File(f) => f.imports.push(path.into()),
            _ => self.reject("imports"),
        }
        self
    }

    fn reject(&mut self, what: &str) {
        if self.error.is_none() {
            self.error = Some(format!(
                "{} record `{}` cannot carry {}",
                self.doc.kind, self.doc.longname, what
            ));
        }
    }

    pub fn build(self) -> Result<DocObject> {
        if let Some(err) = self.error {
            return Err(DocGraphError::InvalidArgument(err));
        }
        self.doc.validate()?;
        Ok(self.doc)
    }
}

/// Raw tag collected from a doc comment while a record is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTag {
    pub tag: String,
    pub value: String,
}

/// A freshly generated record waiting for admission into a store.
///
/// The AST node is a loan: it can be inspected by insert hooks and is gone
/// once the record is admitted.
#[derive(Debug)]
pub struct PendingDoc<'t> {
    doc: DocObject,
    node: Option<&'t SyntaxNode>,
    tags: Vec<CommentTag>,
}

impl<'t> PendingDoc<'t> {
    pub fn new(doc: DocObject) -> Self {
        Self {
            doc,
            node: None,
            tags: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: &'t SyntaxNode) -> Self {
        self.doc.ast_node = Some(node.id);
        self.node = Some(node);
        self
    }

    pub fn with_tags(mut self, tags: Vec<CommentTag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn doc(&self) -> &DocObject {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut DocObject {
        &mut self.doc
    }

    pub fn node(&self) -> Option<&'t SyntaxNode> {
        self.node
    }

    pub fn tags(&self) -> &[CommentTag] {
        &self.tags
    }

    /// Drops the node loan and comment buffers, keeping only the record.
    pub fn release(self) -> DocObject {
        self.doc
    }
}
