#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use gcl_ast::{Name, Type};

/// Session-wide supply of unique names.
///
/// Generated names start with `?`, which the surface syntax cannot produce, so
/// they never collide with user identifiers. The counter is monotonic and is
/// never rewound.
#[derive(Debug, Default, Clone)]
pub struct FreshSupply {
    next: usize,
}

impl FreshSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, hint: &str) -> Name {
        let n = self.next;
        self.next += 1;
        Name::synthetic(format!("?{hint}{n}"))
    }

    pub fn fresh_meta(&mut self) -> Type {
        Type::Meta(self.fresh("t"))
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> usize {
        self.next
    }
}

/// Picks the first of `prefix`, `prefix0`, `prefix1`, … not visible in any of
/// `scopes`.
pub fn fresh_in_scope(prefix: &str, scopes: &[BTreeSet<String>]) -> Name {
    let taken = |candidate: &str| scopes.iter().any(|scope| scope.contains(candidate));
    if !taken(prefix) {
        return Name::synthetic(prefix);
    }
    let mut i = 0usize;
    loop {
        let candidate = format!("{prefix}{i}");
        if !taken(&candidate) {
            return Name::synthetic(candidate);
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_are_never_reused() {
        let mut supply = FreshSupply::new();
        let a = supply.fresh("t");
        let b = supply.fresh("t");
        assert_ne!(a, b);
        assert_eq!(supply.issued(), 2);
    }

    #[test]
    fn scoped_names_skip_visible_candidates() {
        let outer: BTreeSet<String> = ["x".to_string(), "x0".to_string()].into();
        let inner: BTreeSet<String> = ["x1".to_string()].into();
        assert_eq!(fresh_in_scope("x", &[outer.clone(), inner]).text, "x2");
        assert_eq!(fresh_in_scope("y", &[outer]).text, "y");
    }
}
