//! The three-valued logic the evaluator computes in (§4.5). Kept as its own
//! tiny module — grounded on the same instinct as `isl-ast`'s `BinaryOp`:
//! the combinators are a closed, exhaustively-tested table, not logic that
//! should be re-derived inline at every call site.

use serde::{Deserialize, Serialize};

/// `True | False | Unknown`. `Unknown` is reserved for *information*
/// failures (an entity store that cannot answer); a concrete rule violation
/// always resolves to `False`. Never collapse `Unknown` into `False` — see
/// SPEC_FULL §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    True,
    False,
    Unknown,
}

impl TriState {
    pub fn from_bool(b: bool) -> Self {
        if b { TriState::True } else { TriState::False }
    }

    pub fn is_true(self) -> bool {
        matches!(self, TriState::True)
    }

    pub fn is_false(self) -> bool {
        matches!(self, TriState::False)
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, TriState::Unknown)
    }

    /// `False` dominates; else `Unknown` if either side is `Unknown`; else `True`.
    pub fn and(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (TriState::True, TriState::True) => TriState::True,
        }
    }

    /// `True` dominates; else `Unknown` if either side is `Unknown`; else `False`.
    pub fn or(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (TriState::False, TriState::False) => TriState::False,
        }
    }

    /// `Unknown` stays `Unknown`; otherwise boolean negation.
    pub fn not(self) -> TriState {
        match self {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }

    /// `False -> *` is vacuously `True`; `Unknown -> *` is `Unknown`;
    /// otherwise the ordinary material-implication table.
    pub fn implies(self, then: TriState) -> TriState {
        match self {
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
            TriState::True => then,
        }
    }

    /// Boolean equality after tri-state normalisation: `Unknown` on either
    /// side makes the comparison itself `Unknown`, otherwise `True` iff both
    /// sides agree.
    pub fn iff(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::Unknown, _) | (_, TriState::Unknown) => TriState::Unknown,
            (a, b) => TriState::from_bool(a == b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TriState::*;

    #[test]
    fn and_truth_table() {
        assert_eq!(True.and(True), True);
        assert_eq!(True.and(False), False);
        assert_eq!(False.and(True), False);
        assert_eq!(False.and(Unknown), False);
        assert_eq!(Unknown.and(False), False);
        assert_eq!(True.and(Unknown), Unknown);
        assert_eq!(Unknown.and(Unknown), Unknown);
    }

    #[test]
    fn or_truth_table() {
        assert_eq!(True.or(False), True);
        assert_eq!(False.or(True), True);
        assert_eq!(True.or(Unknown), True);
        assert_eq!(Unknown.or(True), True);
        assert_eq!(False.or(False), False);
        assert_eq!(False.or(Unknown), Unknown);
        assert_eq!(Unknown.or(Unknown), Unknown);
    }

    #[test]
    fn not_truth_table() {
        assert_eq!(True.not(), False);
        assert_eq!(False.not(), True);
        assert_eq!(Unknown.not(), Unknown);
    }

    #[test]
    fn implies_truth_table() {
        assert_eq!(False.implies(True), True);
        assert_eq!(False.implies(False), True);
        assert_eq!(False.implies(Unknown), True);
        assert_eq!(True.implies(True), True);
        assert_eq!(True.implies(False), False);
        assert_eq!(True.implies(Unknown), Unknown);
        assert_eq!(Unknown.implies(True), Unknown);
        assert_eq!(Unknown.implies(False), Unknown);
    }

    #[test]
    fn iff_truth_table() {
        assert_eq!(True.iff(True), True);
        assert_eq!(False.iff(False), True);
        assert_eq!(True.iff(False), False);
        assert_eq!(True.iff(Unknown), Unknown);
        assert_eq!(Unknown.iff(Unknown), Unknown);
    }

    #[test]
    fn vacuous_truth_holds_for_unknown_consequent() {
        assert_eq!(False.implies(Unknown), True);
    }
}

#[cfg(test)]
mod proptests {
    use super::TriState;
    use proptest::prelude::*;

    fn any_tristate() -> impl Strategy<Value = TriState> {
        prop_oneof![Just(TriState::True), Just(TriState::False), Just(TriState::Unknown)]
    }

    proptest! {
        /// `and`/`or` are commutative over every tri-state combination.
        #[test]
        fn and_or_are_commutative(a in any_tristate(), b in any_tristate()) {
            prop_assert_eq!(a.and(b), b.and(a));
            prop_assert_eq!(a.or(b), b.or(a));
        }

        /// `and`/`or` are associative over every tri-state combination.
        #[test]
        fn and_or_are_associative(a in any_tristate(), b in any_tristate(), c in any_tristate()) {
            prop_assert_eq!(a.and(b).and(c), a.and(b.and(c)));
            prop_assert_eq!(a.or(b).or(c), a.or(b.or(c)));
        }

        /// Double negation is the identity.
        #[test]
        fn not_is_its_own_inverse(a in any_tristate()) {
            prop_assert_eq!(a.not().not(), a);
        }

        /// De Morgan's laws hold under tri-state negation.
        #[test]
        fn de_morgans_laws_hold(a in any_tristate(), b in any_tristate()) {
            prop_assert_eq!(a.and(b).not(), a.not().or(b.not()));
            prop_assert_eq!(a.or(b).not(), a.not().and(b.not()));
        }
    }
}
