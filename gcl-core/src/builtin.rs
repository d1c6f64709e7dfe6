#![forbid(unsafe_code)]

use gcl_ast::{ArithOp, ChainOp, Lit, Type};

use crate::fresh::FreshSupply;

pub fn lit_type(lit: &Lit) -> Type {
    match lit {
        Lit::Num(_) => Type::int(),
        Lit::Bool(_) => Type::bool(),
        Lit::Chr(_) => Type::char(),
        Lit::Emp => Type::bool(),
    }
}

pub fn arith_op_type(op: ArithOp) -> Type {
    use ArithOp::*;
    match op {
        Implies | Conj | Disj | SConj | SImp => {
            Type::funcs([Type::bool(), Type::bool()], Type::bool())
        }
        Neg => Type::func(Type::bool(), Type::bool()),
        NegNum => Type::func(Type::int(), Type::int()),
        Add | Sub | Mul | Div | Mod | Max | Min | Exp => {
            Type::funcs([Type::int(), Type::int()], Type::int())
        }
        Hash => Type::func(Type::bool(), Type::int()),
        PointsTo => Type::funcs([Type::int(), Type::int()], Type::bool()),
    }
}

/// Equality is polymorphic, so each use gets its own metavariable.
pub fn chain_op_type(op: ChainOp, fresh: &mut FreshSupply) -> Type {
    match op {
        ChainOp::Eq | ChainOp::Neq => {
            let a = fresh.fresh_meta();
            Type::funcs([a.clone(), a], Type::bool())
        }
        ChainOp::Lt | ChainOp::Lte | ChainOp::Gt | ChainOp::Gte => {
            Type::funcs([Type::int(), Type::int()], Type::bool())
        }
        ChainOp::EqProp => Type::funcs([Type::bool(), Type::bool()], Type::bool()),
    }
}
