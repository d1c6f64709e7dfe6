#![forbid(unsafe_code)]

mod expr;
mod fmt;
mod stmt;
mod types;

use std::hash::{Hash, Hasher};

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

pub use expr::{ArithOp, CaseClause, Chain, ChainLink, ChainOp, Expr, ExprKind, Lit, Op};
pub use stmt::{Declaration, Definition, GdCmd, Program, Stmt, TypeDefnCtor};
pub use types::{Endpoint, Interval, TBase, Type};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

/// Byte range of a node in the source it was parsed from.
///
/// Locations are metadata: any two `Loc`s compare equal and hash alike, so
/// derived equality on trees is structural.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Loc {
    pub offset: usize,
    pub len: usize,
}

impl Loc {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn between(start: usize, end: usize) -> Self {
        Self::new(start, end.saturating_sub(start))
    }

    /// Location of nodes synthesized by the checker rather than parsed.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.offset == 0 && self.len == 0
    }

    pub fn merge(self, other: Loc) -> Loc {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        let start = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Loc::between(start, end)
    }

    /// One past the last byte, clamped at `usize::MAX`.
    pub fn end(self) -> usize {
        self.offset.saturating_add(self.len)
    }

    pub fn span(self) -> Span {
        span(self.offset, self.len)
    }
}

impl PartialEq for Loc {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Loc {}

impl Hash for Loc {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

impl From<Loc> for Span {
    fn from(loc: Loc) -> Self {
        loc.span()
    }
}

/// An identifier. Equality is by text only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub text: String,
    pub loc: Loc,
}

impl Name {
    pub fn new(text: impl Into<String>, loc: Loc) -> Self {
        Self {
            text: text.into(),
            loc,
        }
    }

    pub fn synthetic(text: impl Into<String>) -> Self {
        Self::new(text, Loc::none())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
