#![forbid(unsafe_code)]

use gcl_ast::Loc;
use gcl_core::{TypeEnv, TypedGdCmd, TypedStmt};

use crate::pred::Pred;

/// A statement list cut at its assertions and holes.
#[derive(Debug)]
pub(crate) enum Segment<'a> {
    /// A maximal run of statements handled by weakest preconditions.
    Block(&'a [TypedStmt]),
    Assertion(Pred),
    /// An assertion immediately followed by a loop; the assertion is the
    /// loop invariant.
    Loop {
        inv: Pred,
        cmds: &'a [TypedGdCmd],
        loc: Loc,
    },
    Spec {
        env: &'a TypeEnv,
        loc: Loc,
    },
}

impl Segment<'_> {
    /// The predicate this segment opens with, if it is an assertion.
    pub(crate) fn leading_pred(&self) -> Option<&Pred> {
        match self {
            Segment::Assertion(p) | Segment::Loop { inv: p, .. } => Some(p),
            Segment::Block(_) | Segment::Spec { .. } => None,
        }
    }
}

fn as_pred(stmt: &TypedStmt) -> Option<Pred> {
    match stmt {
        TypedStmt::Assert(e, loc) => Some(Pred::Assertion(e.clone(), *loc)),
        TypedStmt::LoopInvariant { inv, bound, loc } => Some(Pred::LoopInvariant {
            inv: inv.clone(),
            bound: bound.clone(),
            loc: *loc,
        }),
        _ => None,
    }
}

pub(crate) fn segments(stmts: &[TypedStmt]) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut run_start = 0;
    let mut i = 0;
    while i < stmts.len() {
        let stmt = &stmts[i];
        let cut = if let Some(pred) = as_pred(stmt) {
            match stmts.get(i + 1) {
                Some(TypedStmt::Do(cmds, loc)) => Some((
                    Segment::Loop {
                        inv: pred,
                        cmds,
                        loc: *loc,
                    },
                    2,
                )),
                _ => Some((Segment::Assertion(pred), 1)),
            }
        } else if let TypedStmt::Spec { env, loc, .. } = stmt {
            Some((Segment::Spec { env, loc: *loc }, 1))
        } else {
            None
        };

        match cut {
            Some((segment, width)) => {
                if run_start < i {
                    out.push(Segment::Block(&stmts[run_start..i]));
                }
                out.push(segment);
                i += width;
                run_start = i;
            }
            None => i += 1,
        }
    }
    if run_start < stmts.len() {
        out.push(Segment::Block(&stmts[run_start..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcl_ast::Name;
    use gcl_core::TypedExpr;

    fn skip() -> TypedStmt {
        TypedStmt::Skip(Loc::none())
    }

    fn assert_true() -> TypedStmt {
        TypedStmt::Assert(TypedExpr::bool(true), Loc::none())
    }

    fn hole() -> TypedStmt {
        TypedStmt::Spec {
            text: String::new(),
            env: TypeEnv::new(),
            loc: Loc::none(),
        }
    }

    fn shape(segs: &[Segment<'_>]) -> String {
        segs.iter()
            .map(|s| match s {
                Segment::Block(stmts) => format!("B{}", stmts.len()),
                Segment::Assertion(_) => "A".to_string(),
                Segment::Loop { .. } => "L".to_string(),
                Segment::Spec { .. } => "S".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn runs_between_assertions_become_blocks() {
        let stmts = vec![assert_true(), skip(), skip(), assert_true(), skip()];
        assert_eq!(shape(&segments(&stmts)), "A B2 A B1");
    }

    #[test]
    fn assertion_before_do_becomes_a_loop() {
        let body = vec![TypedStmt::Assign {
            names: vec![Name::synthetic("x")],
            exprs: vec![TypedExpr::num(0)],
            loc: Loc::none(),
        }];
        let stmts = vec![
            skip(),
            TypedStmt::LoopInvariant {
                inv: TypedExpr::bool(true),
                bound: None,
                loc: Loc::none(),
            },
            TypedStmt::Do(
                vec![TypedGdCmd {
                    guard: TypedExpr::bool(false),
                    body,
                    loc: Loc::none(),
                }],
                Loc::none(),
            ),
            assert_true(),
        ];
        assert_eq!(shape(&segments(&stmts)), "B1 L A");
    }

    #[test]
    fn bare_do_stays_in_its_block() {
        let stmts = vec![skip(), TypedStmt::Do(vec![], Loc::none())];
        assert_eq!(shape(&segments(&stmts)), "B2");
    }

    #[test]
    fn holes_split_runs() {
        let stmts = vec![skip(), hole(), skip(), hole()];
        assert_eq!(shape(&segments(&stmts)), "B1 S B1 S");
        assert!(segments(&[]).is_empty());
    }
}
