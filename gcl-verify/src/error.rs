#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use gcl_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

/// Defects found while structuring a program into obligations.
#[derive(Debug, Clone, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum StructError {
    #[error("assignment through a nested array is not implemented")]
    #[diagnostic(
        code(gcl::structure::multi_dim_array_assign),
        help("assign the inner array to a variable and update that instead")
    )]
    MultiDimArrayAsgnNotImp {
        #[label("array expression is not a variable")]
        span: Span,
    },

    #[error("loop is not preceded by an assertion")]
    #[diagnostic(
        code(gcl::structure::missing_assertion),
        help("put an invariant assertion with a bound right before `do`")
    )]
    MissingAssertion {
        #[label]
        span: Span,
    },
}

impl StructError {
    pub fn span(&self) -> Span {
        match self {
            StructError::MultiDimArrayAsgnNotImp { span }
            | StructError::MissingAssertion { span } => *span,
        }
    }
}
