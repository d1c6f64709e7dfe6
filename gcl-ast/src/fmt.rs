#![forbid(unsafe_code)]

//! Canonical printer. Its output is what obligation ids are hashed from, so
//! it must stay deterministic and independent of source locations.

use std::fmt;

use crate::{ArithOp, ChainOp, Endpoint, Expr, ExprKind, Lit, Op, TBase, Type};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Top,
    Operand,
    Arg,
}

impl fmt::Display for ChainOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainOp::Eq => "=",
            ChainOp::Neq => "≠",
            ChainOp::Lt => "<",
            ChainOp::Lte => "≤",
            ChainOp::Gt => ">",
            ChainOp::Gte => "≥",
            ChainOp::EqProp => "≡",
        })
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Implies => "⇒",
            ArithOp::Conj => "∧",
            ArithOp::Disj => "∨",
            ArithOp::Neg => "¬",
            ArithOp::NegNum => "-",
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Max => "↑",
            ArithOp::Min => "↓",
            ArithOp::Exp => "^",
            ArithOp::Hash => "#",
            ArithOp::PointsTo => "↦",
            ArithOp::SConj => "∗",
            ArithOp::SImp => "-∗",
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Chain(op) => op.fmt(f),
            Op::Arith(op) => op.fmt(f),
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Num(n) => write!(f, "{n}"),
            Lit::Bool(true) => f.write_str("True"),
            Lit::Bool(false) => f.write_str("False"),
            Lit::Chr(c) => write!(f, "'{c}'"),
            Lit::Emp => f.write_str("emp"),
        }
    }
}

impl fmt::Display for TBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TBase::Int => "Int",
            TBase::Bool => "Bool",
            TBase::Char => "Char",
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        fmt_type(&mut out, self, Ctx::Top);
        f.write_str(&out)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        fmt_expr(&mut out, self, Ctx::Top);
        f.write_str(&out)
    }
}

fn fmt_type(out: &mut String, ty: &Type, ctx: Ctx) {
    if let Some((dom, cod)) = ty.as_func() {
        if ctx != Ctx::Top {
            out.push('(');
        }
        fmt_type(out, dom, Ctx::Operand);
        out.push_str(" → ");
        fmt_type(out, cod, Ctx::Top);
        if ctx != Ctx::Top {
            out.push(')');
        }
        return;
    }
    match ty {
        Type::Base(b, _) => out.push_str(&b.to_string()),
        Type::Array(interval, elem, _) => {
            if ctx == Ctx::Arg {
                out.push('(');
            }
            out.push_str("array ");
            match &interval.lo {
                Endpoint::Including(e) => {
                    out.push('[');
                    fmt_expr(out, e, Ctx::Top);
                }
                Endpoint::Excluding(e) => {
                    out.push('(');
                    fmt_expr(out, e, Ctx::Top);
                }
            }
            out.push_str(" .. ");
            match &interval.hi {
                Endpoint::Including(e) => {
                    fmt_expr(out, e, Ctx::Top);
                    out.push(']');
                }
                Endpoint::Excluding(e) => {
                    fmt_expr(out, e, Ctx::Top);
                    out.push(')');
                }
            }
            out.push_str(" of ");
            fmt_type(out, elem, Ctx::Top);
            if ctx == Ctx::Arg {
                out.push(')');
            }
        }
        Type::Tuple(n, _) => {
            out.push('(');
            for _ in 1..*n {
                out.push(',');
            }
            out.push(')');
        }
        Type::Arrow(_) => out.push_str("(→)"),
        Type::App(head, arg, _) => {
            if ctx == Ctx::Arg {
                out.push('(');
            }
            fmt_type(out, head, Ctx::Operand);
            out.push(' ');
            fmt_type(out, arg, Ctx::Arg);
            if ctx == Ctx::Arg {
                out.push(')');
            }
        }
        Type::Data(n) | Type::Var(n) | Type::Meta(n) => out.push_str(&n.text),
    }
}

/// Splits `op l r` / `op e` applications of builtin operators.
fn as_operator(expr: &Expr) -> Option<(ArithOp, Vec<&Expr>)> {
    let ExprKind::App(f, arg) = &expr.kind else {
        return None;
    };
    match &f.kind {
        ExprKind::Op(Op::Arith(op)) if op.is_unary() => Some((*op, vec![arg.as_ref()])),
        ExprKind::App(g, l) => match &g.kind {
            ExprKind::Op(Op::Arith(op)) if !op.is_unary() => {
                Some((*op, vec![l.as_ref(), arg.as_ref()]))
            }
            _ => None,
        },
        _ => None,
    }
}

fn quant_symbol(op: &Expr) -> Option<&'static str> {
    match &op.kind {
        ExprKind::Op(Op::Arith(ArithOp::Conj)) => Some("∀"),
        ExprKind::Op(Op::Arith(ArithOp::Disj)) => Some("∃"),
        ExprKind::Op(Op::Arith(ArithOp::Hash)) => Some("#"),
        ExprKind::Op(Op::Arith(ArithOp::Add)) => Some("Σ"),
        ExprKind::Op(Op::Arith(ArithOp::Mul)) => Some("Π"),
        _ => None,
    }
}

fn fmt_expr(out: &mut String, expr: &Expr, ctx: Ctx) {
    if let Some((op, operands)) = as_operator(expr) {
        if ctx != Ctx::Top {
            out.push('(');
        }
        if let [e] = operands.as_slice() {
            out.push_str(&op.to_string());
            fmt_expr(out, e, Ctx::Arg);
        } else if let [l, r] = operands.as_slice() {
            fmt_expr(out, l, Ctx::Operand);
            out.push(' ');
            out.push_str(&op.to_string());
            out.push(' ');
            fmt_expr(out, r, Ctx::Operand);
        }
        if ctx != Ctx::Top {
            out.push(')');
        }
        return;
    }

    match &expr.kind {
        ExprKind::Lit(lit) => out.push_str(&lit.to_string()),
        ExprKind::Var(n) | ExprKind::Const(n) => out.push_str(&n.text),
        ExprKind::Op(op) => {
            out.push('(');
            out.push_str(&op.to_string());
            out.push(')');
        }
        ExprKind::Chain(chain) => {
            if ctx != Ctx::Top {
                out.push('(');
            }
            fmt_expr(out, &chain.head, Ctx::Operand);
            for link in &chain.links {
                out.push(' ');
                out.push_str(&link.op.to_string());
                out.push(' ');
                fmt_expr(out, &link.rhs, Ctx::Operand);
            }
            if ctx != Ctx::Top {
                out.push(')');
            }
        }
        ExprKind::App(f, arg) => {
            if ctx == Ctx::Arg {
                out.push('(');
            }
            fmt_expr(out, f, Ctx::Operand);
            out.push(' ');
            fmt_expr(out, arg, Ctx::Arg);
            if ctx == Ctx::Arg {
                out.push(')');
            }
        }
        ExprKind::Lam(x, body) => {
            if ctx != Ctx::Top {
                out.push('(');
            }
            out.push_str("λ");
            out.push_str(&x.text);
            out.push_str(" → ");
            fmt_expr(out, body, Ctx::Top);
            if ctx != Ctx::Top {
                out.push(')');
            }
        }
        ExprKind::Quant {
            op,
            binders,
            range,
            body,
        } => {
            out.push('⟨');
            match quant_symbol(op) {
                Some(sym) => out.push_str(sym),
                None => fmt_expr(out, op, Ctx::Arg),
            }
            out.push(' ');
            let names = binders
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&names);
            out.push_str(" : ");
            fmt_expr(out, range, Ctx::Top);
            out.push_str(" : ");
            fmt_expr(out, body, Ctx::Top);
            out.push('⟩');
        }
        ExprKind::ArrIdx(array, index) => {
            fmt_expr(out, array, Ctx::Arg);
            out.push('[');
            fmt_expr(out, index, Ctx::Top);
            out.push(']');
        }
        ExprKind::ArrUpd {
            array,
            index,
            value,
        } => {
            out.push('(');
            fmt_expr(out, array, Ctx::Top);
            out.push_str(" : ");
            fmt_expr(out, index, Ctx::Top);
            out.push_str(" ↦ ");
            fmt_expr(out, value, Ctx::Top);
            out.push(')');
        }
        ExprKind::Tuple(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_expr(out, item, Ctx::Top);
            }
            out.push(')');
        }
        ExprKind::Case(scrutinee, clauses) => {
            if ctx != Ctx::Top {
                out.push('(');
            }
            out.push_str("case ");
            fmt_expr(out, scrutinee, Ctx::Top);
            out.push_str(" of");
            for clause in clauses {
                out.push_str(" | ");
                fmt_expr(out, &clause.pattern, Ctx::Top);
                out.push_str(" → ");
                fmt_expr(out, &clause.body, Ctx::Top);
            }
            if ctx != Ctx::Top {
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_operators_print_infix_with_parenthesized_operands() {
        let e = Expr::binary(
            ArithOp::Conj,
            Expr::chain(Expr::var("i"), ChainOp::Lt, Expr::var("n")),
            Expr::binary(ArithOp::Add, Expr::var("x"), Expr::num(1)),
        );
        assert_eq!(e.to_string(), "(i < n) ∧ (x + 1)");
    }

    #[test]
    fn quantifiers_use_their_symbol() {
        let e = Expr::quant(
            Expr::op(ArithOp::Conj),
            &["i"],
            Expr::chain(Expr::num(0), ChainOp::Lte, Expr::var("i")),
            Expr::index(Expr::var("a"), Expr::var("i")),
        );
        assert_eq!(e.to_string(), "⟨∀ i : 0 ≤ i : a[i]⟩");
    }

    #[test]
    fn function_types_associate_right() {
        let t = Type::func(Type::func(Type::int(), Type::int()), Type::bool());
        assert_eq!(t.to_string(), "(Int → Int) → Bool");
        let list = Type::app(Type::data("List"), Type::app(Type::data("List"), Type::var("a")));
        assert_eq!(list.to_string(), "List (List a)");
    }
}
