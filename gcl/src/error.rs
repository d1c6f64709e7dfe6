#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::path::PathBuf;

use gcl_ast::Span;
use gcl_core::ElabError;
use gcl_verify::StructError;
use miette::Diagnostic;
use thiserror::Error;

/// Every way a session can fail. Exactly one is reported per run.
#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum Error {
    /// Reported by the front-end that produced the syntax tree.
    #[error("parse error: {message}")]
    #[diagnostic(code(gcl::parse))]
    Parse {
        message: String,
        #[label]
        span: Span,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Elab(#[from] ElabError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Struct(#[from] StructError),

    #[error("cannot read {}: {message}", path.display())]
    #[diagnostic(code(gcl::io))]
    CannotReadFile { path: PathBuf, message: String },

    #[error("configuration error: {message}")]
    #[diagnostic(code(gcl::config))]
    Config { message: String },

    #[error("{0}")]
    #[diagnostic(code(gcl::other))]
    Others(String),
}

impl Error {
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse { span, .. } => Some(*span),
            Error::Elab(e) => Some(e.span()),
            Error::Struct(e) => Some(e.span()),
            Error::CannotReadFile { .. } | Error::Config { .. } | Error::Others(_) => None,
        }
    }
}
