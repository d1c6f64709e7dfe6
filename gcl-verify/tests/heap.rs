use gcl_ast::{ArithOp, ChainOp, Loc, Name, Type};
use gcl_core::{TypedExpr, TypedStmt};
use gcl_verify::{Verifier, VerifyOptions};

fn int_var(n: &str) -> TypedExpr {
    TypedExpr::var(Name::synthetic(n), Type::int())
}

fn alloc(var: &str, exprs: Vec<TypedExpr>) -> TypedStmt {
    TypedStmt::Alloc {
        var: Name::synthetic(var),
        exprs,
        loc: Loc::none(),
    }
}

fn wp(stmt: TypedStmt, post: &TypedExpr) -> String {
    let options = VerifyOptions::default();
    let mut v = Verifier::new(&options);
    v.wp(&[stmt], post).expect("wp").to_string()
}

#[test]
fn allocation_quantifies_a_fresh_cell_per_value() {
    let post = TypedExpr::points_to(int_var("p"), int_var("v"));
    let stmt = alloc("p", vec![TypedExpr::num(1), TypedExpr::num(2)]);
    assert_eq!(
        wp(stmt, &post),
        "⟨∀ v0 : True : ((v0 ↦ 1) ∗ ((v0 + 1) ↦ 2)) ⇒ (v0 ↦ v)⟩"
    );
}

#[test]
fn allocation_without_values_owns_nothing() {
    let post = TypedExpr::points_to(int_var("p"), int_var("v"));
    assert_eq!(wp(alloc("p", vec![]), &post), "⟨∀ v0 : True : emp ⇒ (v0 ↦ v)⟩");
}

#[test]
fn allocated_cell_avoids_names_of_the_values() {
    let post = TypedExpr::bool(true);
    let stmt = alloc("p", vec![int_var("v"), int_var("v0")]);
    assert_eq!(
        wp(stmt, &post),
        "⟨∀ v1 : True : ((v1 ↦ v) ∗ ((v1 + 1) ↦ v0)) ⇒ True⟩"
    );
}

#[test]
fn lookup_reads_an_existing_cell() {
    let post = TypedExpr::chain(int_var("x"), ChainOp::Gt, int_var("v"));
    let stmt = TypedStmt::HLookup {
        var: Name::synthetic("x"),
        expr: int_var("p"),
        loc: Loc::none(),
    };
    assert_eq!(
        wp(stmt, &post),
        "⟨∃ v0 : True : (p ↦ v0) ∧ ((p ↦ v0) -∗ (v0 > v))⟩"
    );
}

#[test]
fn mutation_needs_ownership_of_the_cell() {
    let post = TypedExpr::chain(int_var("v"), ChainOp::Eq, TypedExpr::num(0));
    let stmt = TypedStmt::HMutate {
        cell: int_var("p"),
        value: TypedExpr::binary(ArithOp::Add, int_var("x"), TypedExpr::num(1)),
        loc: Loc::none(),
    };
    assert_eq!(
        wp(stmt, &post),
        "⟨∃ v0 : True : p ↦ v0⟩ ∗ ((p ↦ (x + 1)) -∗ (v = 0))"
    );
}

#[test]
fn disposal_gives_up_the_cell() {
    let post = TypedExpr::chain(int_var("v"), ChainOp::Eq, TypedExpr::num(0));
    assert_eq!(
        wp(TypedStmt::Dispose(int_var("p"), Loc::none()), &post),
        "⟨∃ v0 : True : p ↦ v0⟩ ∗ (v = 0)"
    );
}
