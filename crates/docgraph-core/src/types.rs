use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Path recorded for in-memory code that was generated without a label.
pub const MEMORY_FILE_PATH: &str = "<memory>";

/// Store-assigned record identity. Strictly increasing within one store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DocId(pub u64);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocKind {
    ModuleClass,
    ModuleFunction,
    ModuleVariable,
    ModuleAssignment,
    ModuleFile,
    VirtualExternal,
    VirtualTypedef,
    ClassMember,
    ClassMethod,
    ClassProperty,
    TestFile,
    Test,
}

impl DocKind {
    pub const ALL: [DocKind; 12] = [
        DocKind::ModuleClass,
        DocKind::ModuleFunction,
        DocKind::ModuleVariable,
        DocKind::ModuleAssignment,
        DocKind::ModuleFile,
        DocKind::VirtualExternal,
        DocKind::VirtualTypedef,
        DocKind::ClassMember,
        DocKind::ClassMethod,
        DocKind::ClassProperty,
        DocKind::TestFile,
        DocKind::Test,
    ];

    /// Kinds counted by source coverage.
    pub const COVERABLE: [DocKind; 7] = [
        DocKind::ModuleClass,
        DocKind::ModuleFunction,
        DocKind::ModuleVariable,
        DocKind::ModuleAssignment,
        DocKind::ClassMember,
        DocKind::ClassMethod,
        DocKind::ClassProperty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::ModuleClass => "ModuleClass",
            DocKind::ModuleFunction => "ModuleFunction",
            DocKind::ModuleVariable => "ModuleVariable",
            DocKind::ModuleAssignment => "ModuleAssignment",
            DocKind::ModuleFile => "ModuleFile",
            DocKind::VirtualExternal => "VirtualExternal",
            DocKind::VirtualTypedef => "VirtualTypedef",
            DocKind::ClassMember => "ClassMember",
            DocKind::ClassMethod => "ClassMethod",
            DocKind::ClassProperty => "ClassProperty",
            DocKind::TestFile => "TestFile",
            DocKind::Test => "Test",
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, DocKind::ModuleClass)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, DocKind::ModuleFunction | DocKind::ClassMethod)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, DocKind::ModuleFile | DocKind::TestFile)
    }

    pub fn is_coverable(&self) -> bool {
        Self::COVERABLE.contains(self)
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocKind::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown doc kind: {}", s))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        };
        f.write_str(s)
    }
}

impl FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Access::Public),
            "protected" => Ok(Access::Protected),
            "private" => Ok(Access::Private),
            other => Err(format!("unknown access modifier: {}", other)),
        }
    }
}

/// Parameter descriptor of a function or method record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Option<&str>) -> Self {
        Self {
            name: name.into(),
            ty: ty.map(str::to_string),
        }
    }
}

/// Whether a store belongs to a full generation pass or an incremental one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    Generate,
    Regenerate,
}

/// Policy for parse and traversal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Queue a diagnostic and continue with the next unit.
    Log,
    /// Abort the current call and return the error.
    Throw,
}

impl FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(OnError::Log),
            "throw" => Ok(OnError::Throw),
            other => Err(format!("unknown error policy: {}", other)),
        }
    }
}

/// Canonical module identity of a source file, as computed by a path resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub file_path: String,
    pub relative_path: String,
    pub import_path: String,
}
