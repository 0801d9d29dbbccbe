//! Language-neutral syntax tree handed from parsers to doc factories.
//!
//! Nodes live in an arena owned by [`SyntaxTree`] and refer to each other by
//! [`AstNodeId`]. Doc objects only ever keep the id, never the node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AstNodeId(pub u32);

impl fmt::Display for AstNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub id: AstNodeId,
    pub kind: String,
    pub name: Option<String>,
    pub line: u32,
    pub column: u32,
    pub parent: Option<AstNodeId>,
    pub children: Vec<AstNodeId>,
    pub attrs: BTreeMap<String, String>,
    pub leading_comment: Option<String>,
}

impl SyntaxNode {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn has_doc_comment(&self) -> bool {
        self.leading_comment
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    source: Option<String>,
}

impl SyntaxTree {
    pub fn root(&self) -> &SyntaxNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: AstNodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn parent_of(&self, node: &SyntaxNode) -> Option<&SyntaxNode> {
        node.parent.and_then(|p| self.node(p))
    }

    pub fn children_of<'t>(&'t self, node: &SyntaxNode) -> impl Iterator<Item = &'t SyntaxNode> + 't {
        let ids = node.children.clone();
        ids.into_iter().filter_map(move |id| self.node(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists.
        false
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Source text of one 1-based line, if the tree kept its source.
    pub fn source_line(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        self.source.as_deref()?.lines().nth(idx)
    }
}

/// Incremental builder used by parsers (and test fixtures).
#[derive(Debug)]
pub struct SyntaxTreeBuilder {
    nodes: Vec<SyntaxNode>,
    source: Option<String>,
}

impl SyntaxTreeBuilder {
    /// Starts a tree whose root node has the given kind.
    pub fn new(root_kind: impl Into<String>) -> Self {
        let root = SyntaxNode {
            id: AstNodeId(0),
            kind: root_kind.into(),
            name: None,
            line: 1,
            column: 0,
            parent: None,
            children: Vec::new(),
            attrs: BTreeMap::new(),
            leading_comment: None,
        };
        Self {
            nodes: vec![root],
            source: None,
        }
    }

    pub fn root_id(&self) -> AstNodeId {
        AstNodeId(0)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Appends a child under `parent` and returns its id.
    ///
    /// Panics if `parent` was not produced by this builder.
    pub fn push(
        &mut self,
        parent: AstNodeId,
        kind: impl Into<String>,
        name: Option<&str>,
        line: u32,
    ) -> AstNodeId {
        let id = AstNodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            id,
            kind: kind.into(),
            name: name.map(str::to_string),
            line,
            column: 0,
            parent: Some(parent),
            children: Vec::new(),
            attrs: BTreeMap::new(),
            leading_comment: None,
        });
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    pub fn set_attr(&mut self, node: AstNodeId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.attrs.insert(key.into(), value.into());
        }
    }

    pub fn set_comment(&mut self, node: AstNodeId, comment: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.leading_comment = Some(comment.into());
        }
    }

    pub fn set_column(&mut self, node: AstNodeId, column: u32) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.column = column;
        }
    }

    pub fn build(self) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            source: self.source,
        }
    }
}
