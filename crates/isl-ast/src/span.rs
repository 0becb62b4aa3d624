use isl_position::Span;

/// Wraps a [`Span`] so that every AST node can derive `PartialEq` while still
/// satisfying the "structural equality ignores spans" invariant: two
/// `NodeSpan`s always compare equal, regardless of the `Span` they carry.
///
/// This replaces writing a hand-rolled, field-by-field equality function for
/// every node family (the tree is wide, not deep, so that would be a lot of
/// repetition) with one newtype that makes `#[derive(PartialEq)]` do the
/// right thing everywhere it is used.
#[derive(Debug, Clone)]
pub struct NodeSpan(pub Span);

impl PartialEq for NodeSpan {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for NodeSpan {}

impl std::ops::Deref for NodeSpan {
    type Target = Span;
    fn deref(&self) -> &Span {
        &self.0
    }
}

impl From<Span> for NodeSpan {
    fn from(span: Span) -> Self {
        Self(span)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `NodeSpan` equality ignores the wrapped `Span` entirely, for any
        /// pair of byte ranges.
        #[test]
        fn node_span_equality_ignores_byte_range(
            a_start in 0usize..1000, a_len in 0usize..1000,
            b_start in 0usize..1000, b_len in 0usize..1000,
        ) {
            let a = NodeSpan(Span::new(None, a_start, a_start + a_len, 1, 1, 1, 1));
            let b = NodeSpan(Span::new(None, b_start, b_start + b_len, 1, 1, 1, 1));
            prop_assert_eq!(a, b);
        }
    }
}
