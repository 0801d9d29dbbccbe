//! Conjunctive record filters.
//!
//! A [`Query`] is a list of conditions that must all hold. Conditions on
//! indexed fields (`kind`, `file_path`, `longname`, `memberof`) are used to
//! narrow the candidate set before the remaining conditions are checked.

use docgraph_core::{Access, DocGraphError, DocKind, DocObject, Result};
use regex::Regex;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Kind,
    Name,
    Longname,
    Memberof,
    FilePath,
    Access,
    Static,
    BuiltinVirtual,
    Undocument,
    Interface,
}

impl Field {
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            Field::Kind | Field::Longname | Field::Memberof | Field::FilePath
        )
    }

    /// String form of the field on `doc`, the value every condition compares against.
    pub fn value<'d>(&self, doc: &'d DocObject) -> Cow<'d, str> {
        match self {
            Field::Kind => Cow::Borrowed(doc.kind.as_str()),
            Field::Name => Cow::Borrowed(&doc.name),
            Field::Longname => Cow::Borrowed(&doc.longname),
            Field::Memberof => Cow::Borrowed(&doc.memberof),
            Field::FilePath => Cow::Borrowed(&doc.file_path),
            Field::Access => Cow::Owned(doc.access.to_string()),
            Field::Static => bool_str(doc.is_static),
            Field::BuiltinVirtual => bool_str(doc.builtin_virtual),
            Field::Undocument => bool_str(doc.undocument),
            Field::Interface => bool_str(doc.is_interface()),
        }
    }
}

fn bool_str(v: bool) -> Cow<'static, str> {
    Cow::Borrowed(if v { "true" } else { "false" })
}

#[derive(Debug, Clone)]
pub enum Cond {
    Eq(Field, String),
    In(Field, Vec<String>),
    EndsWith(Field, String),
    /// Wildcard match where `*` stands for any run of characters.
    Like(Field, Regex),
}

impl Cond {
    pub fn field(&self) -> Field {
        match self {
            Cond::Eq(f, _) | Cond::In(f, _) | Cond::EndsWith(f, _) | Cond::Like(f, _) => *f,
        }
    }

    pub fn matches(&self, doc: &DocObject) -> bool {
        let value = self.field().value(doc);
        match self {
            Cond::Eq(_, expected) => value == expected.as_str(),
            Cond::In(_, set) => set.iter().any(|s| value == s.as_str()),
            Cond::EndsWith(_, suffix) => value.ends_with(suffix.as_str()),
            Cond::Like(_, re) => re.is_match(&value),
        }
    }
}

/// Compile a `*` wildcard pattern. Everything else matches literally.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body))
        .map_err(|e| DocGraphError::invalid_argument(format!("bad pattern {:?}: {}", pattern, e)))
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    conds: Vec<Cond>,
    sort: Option<Field>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cond(mut self, cond: Cond) -> Self {
        self.conds.push(cond);
        self
    }

    pub fn eq(self, field: Field, value: impl Into<String>) -> Self {
        self.cond(Cond::Eq(field, value.into()))
    }

    pub fn any_of<I, S>(self, field: Field, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cond(Cond::In(field, values.into_iter().map(Into::into).collect()))
    }

    pub fn ends_with(self, field: Field, suffix: impl Into<String>) -> Self {
        self.cond(Cond::EndsWith(field, suffix.into()))
    }

    pub fn like(self, field: Field, pattern: &str) -> Result<Self> {
        Ok(self.cond(Cond::Like(field, wildcard_regex(pattern)?)))
    }

    pub fn kind(self, kind: DocKind) -> Self {
        self.eq(Field::Kind, kind.as_str())
    }

    pub fn kinds(self, kinds: &[DocKind]) -> Self {
        self.any_of(Field::Kind, kinds.iter().map(|k| k.as_str()))
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.eq(Field::Name, name)
    }

    pub fn longname(self, longname: impl Into<String>) -> Self {
        self.eq(Field::Longname, longname)
    }

    pub fn memberof(self, memberof: impl Into<String>) -> Self {
        self.eq(Field::Memberof, memberof)
    }

    pub fn file_path(self, path: impl Into<String>) -> Self {
        self.eq(Field::FilePath, path)
    }

    pub fn access(self, access: Access) -> Self {
        self.eq(Field::Access, access.to_string())
    }

    pub fn is_static(self, is_static: bool) -> Self {
        self.eq(Field::Static, bool_str(is_static))
    }

    pub fn builtin_virtual(self, builtin: bool) -> Self {
        self.eq(Field::BuiltinVirtual, bool_str(builtin))
    }

    /// Sort results by `field` instead of `name`.
    pub fn sort_by(mut self, field: Field) -> Self {
        self.sort = Some(field);
        self
    }

    pub fn conds(&self) -> &[Cond] {
        &self.conds
    }

    pub fn sort_field(&self) -> Field {
        self.sort.unwrap_or(Field::Name)
    }

    pub fn matches(&self, doc: &DocObject) -> bool {
        self.conds.iter().all(|c| c.matches(doc))
    }
}
