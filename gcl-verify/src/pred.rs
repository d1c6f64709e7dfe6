#![forbid(unsafe_code)]

use gcl_ast::Loc;
use gcl_core::{TypeEnv, TypedExpr};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A predicate as it appears in an obligation, remembering where it came
/// from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pred {
    /// Computed by the generator: a weakest precondition or a loop
    /// hypothesis.
    Constant(TypedExpr),
    /// Written by the user.
    Assertion(TypedExpr, Loc),
    LoopInvariant {
        inv: TypedExpr,
        bound: Option<TypedExpr>,
        loc: Loc,
    },
}

impl Pred {
    pub fn expr(&self) -> &TypedExpr {
        match self {
            Pred::Constant(e) | Pred::Assertion(e, _) => e,
            Pred::LoopInvariant { inv, .. } => inv,
        }
    }

    pub fn bound(&self) -> Option<&TypedExpr> {
        match self {
            Pred::LoopInvariant { bound, .. } => bound.as_ref(),
            _ => None,
        }
    }

    pub fn loc(&self) -> Loc {
        match self {
            Pred::Constant(e) => e.loc,
            Pred::Assertion(_, loc) | Pred::LoopInvariant { loc, .. } => *loc,
        }
    }
}

/// Why an obligation exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Reaching an assertion or the program postcondition.
    Assertion(Loc),
    /// A loop body re-establishes the invariant.
    Preservation(Loc),
    /// The invariant and negated guards establish what follows the loop.
    LoopExit(Loc),
    /// The bound is non-negative while some guard holds.
    LoopTermination(Loc),
    /// A loop body strictly decreases the bound.
    BoundDecrease(Loc),
}

impl Origin {
    pub fn loc(&self) -> Loc {
        match self {
            Origin::Assertion(loc)
            | Origin::Preservation(loc)
            | Origin::LoopExit(loc)
            | Origin::LoopTermination(loc)
            | Origin::BoundDecrease(loc) => *loc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofObligation {
    pub pre: Pred,
    pub post: Pred,
    /// Hex prefix of the SHA-256 of the printed pair.
    pub id: String,
    pub label: Option<String>,
    pub origin: Origin,
}

/// A `[! !]` hole: whatever fills it must take `pre` to `post` under `env`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecHole {
    pub id: usize,
    pub pre: Pred,
    pub post: Pred,
    pub env: TypeEnv,
    pub loc: Loc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructWarning {
    /// A loop has no bound, so only partial correctness is checked.
    MissingBound(Loc),
    /// The loop body contains a loop, so the bound decrease is not checked.
    UncheckedBoundDecrease(Loc),
}

/// Hex SHA-256 of `"{pre}\n{post}"`.
pub fn obligation_digest(pre: &TypedExpr, post: &TypedExpr) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{pre}\n{post}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Content id of an obligation: the first `len` hex digits of its digest.
pub fn obligation_id(pre: &TypedExpr, post: &TypedExpr, len: usize) -> String {
    let mut id = obligation_digest(pre, post);
    id.truncate(len);
    id
}
