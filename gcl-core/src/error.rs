#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use gcl_ast::{Span, Type};
use miette::Diagnostic;
use thiserror::Error;

use crate::kind::Kind;

#[derive(Debug, Clone, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum TypeError {
    #[error("`{name}` is not in scope")]
    #[diagnostic(code(gcl::elab::not_in_scope))]
    NotInScope {
        name: String,
        #[label]
        span: Span,
    },

    #[error("cannot unify `{expected}` with `{found}`")]
    #[diagnostic(code(gcl::elab::unify_failed))]
    UnifyFailed {
        expected: Type,
        found: Type,
        #[label]
        span: Span,
    },

    #[error("cannot unify kind `{expected}` with `{found}`")]
    #[diagnostic(code(gcl::elab::kind_unify_failed))]
    KindUnifyFailed {
        expected: Kind,
        found: Kind,
        #[label]
        span: Span,
    },

    #[error("recursive type: `{var}` occurs in `{ty}`")]
    #[diagnostic(code(gcl::elab::recursive_type))]
    RecursiveType {
        var: String,
        ty: Type,
        #[label]
        span: Span,
    },

    #[error("cannot assign to `{name}`: it is not a variable")]
    #[diagnostic(code(gcl::elab::assign_to_const))]
    AssignToConst {
        name: String,
        #[label]
        span: Span,
    },

    #[error("undefined type `{name}`")]
    #[diagnostic(code(gcl::elab::undefined_type))]
    UndefinedType {
        name: String,
        #[label]
        span: Span,
    },

    #[error("duplicated identifiers: {}", .names.join(", "))]
    #[diagnostic(code(gcl::elab::duplicated_identifiers))]
    DuplicatedIdentifiers {
        names: Vec<String>,
        #[label]
        span: Span,
    },

    #[error("assignment has more names than expressions: {}", .names.join(", "))]
    #[diagnostic(code(gcl::elab::redundant_names))]
    RedundantNames {
        names: Vec<String>,
        #[label]
        span: Span,
    },

    #[error("assignment has more expressions than names: {}", .exprs.join(", "))]
    #[diagnostic(code(gcl::elab::redundant_exprs))]
    RedundantExprs {
        exprs: Vec<String>,
        #[label]
        span: Span,
    },

    #[error("missing type arguments: {}", .names.join(", "))]
    #[diagnostic(code(gcl::elab::missing_arguments))]
    MissingArguments {
        names: Vec<String>,
        #[label]
        span: Span,
    },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::NotInScope { span, .. }
            | TypeError::UnifyFailed { span, .. }
            | TypeError::KindUnifyFailed { span, .. }
            | TypeError::RecursiveType { span, .. }
            | TypeError::AssignToConst { span, .. }
            | TypeError::UndefinedType { span, .. }
            | TypeError::DuplicatedIdentifiers { span, .. }
            | TypeError::RedundantNames { span, .. }
            | TypeError::RedundantExprs { span, .. }
            | TypeError::MissingArguments { span, .. } => *span,
        }
    }
}

/// Failure of one elaboration run.
///
/// `Unsupported` marks surface syntax the checker does not handle yet; it is
/// never a defect in the user's program.
#[derive(Debug, Clone, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum ElabError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error("unsupported construct: {construct}")]
    #[diagnostic(code(gcl::unsupported))]
    Unsupported {
        construct: &'static str,
        #[label]
        span: Span,
    },
}

impl ElabError {
    pub fn span(&self) -> Span {
        match self {
            ElabError::Type(e) => e.span(),
            ElabError::Unsupported { span, .. } => *span,
        }
    }

    pub fn as_type_error(&self) -> Option<&TypeError> {
        match self {
            ElabError::Type(e) => Some(e),
            ElabError::Unsupported { .. } => None,
        }
    }
}
