#![forbid(unsafe_code)]

mod builtin;
mod collect;
mod elab;
mod env;
mod error;
pub mod expr_subst;
mod fresh;
pub mod kind;
mod subst;
mod typed;
mod unify;

pub use builtin::{arith_op_type, chain_op_type, lit_type};
pub use collect::elaborate_program;
pub use elab::Elaborator;
pub use env::{TypeEnv, TypeInfo};
pub use error::{ElabError, TypeError};
pub use fresh::{fresh_in_scope, FreshSupply};
pub use kind::{Kind, KindContext};
pub use subst::{free_metas, free_rigid_vars, FreeVars, Subst, Substitutable};
pub use typed::{
    Binder, TypedChain, TypedChainLink, TypedDeclaration, TypedDefinition, TypedExpr,
    TypedExprKind, TypedGdCmd, TypedProgram, TypedStmt,
};
pub use unify::unify;
