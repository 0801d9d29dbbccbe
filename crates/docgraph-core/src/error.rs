use crate::ast::AstNodeId;
use crate::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Malformed source reported by a parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({line}:{column})")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// A doc-factory handler failed on a specific node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalError {
    pub node: Option<AstNodeId>,
    pub node_kind: Option<String>,
    pub line: Option<u32>,
    pub message: String,
}

impl TraversalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            node: None,
            node_kind: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(node: &crate::ast::SyntaxNode, message: impl Into<String>) -> Self {
        Self {
            node: Some(node.id),
            node_kind: Some(node.kind.clone()),
            line: Some(node.line),
            message: message.into(),
        }
    }
}

impl fmt::Display for TraversalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.node_kind, self.line) {
            (Some(kind), Some(line)) => write!(f, "{} (node {} at line {})", self.message, kind, line),
            (Some(kind), None) => write!(f, "{} (node {})", self.message, kind),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TraversalError {}

#[derive(Error, Debug)]
pub enum DocGraphError {
    #[error("Parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },

    #[error("Traversal error in {file}: {source}")]
    Traversal {
        file: String,
        #[source]
        source: TraversalError,
    },

    #[error("Identity conflict: store {store} cannot be merged into itself")]
    IdentityConflict { store: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocGraphError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Parse and traversal failures are the only ones an error policy may downgrade.
    pub fn is_policy_governed(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Traversal { .. })
    }
}

pub type Result<T> = std::result::Result<T, DocGraphError>;
