use crate::adapter::ResourceAdapter;
use crate::conditions::fields;

/// Ordering field. Anything unrecognized degrades to name ordering; a
/// malformed order-by is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Name,
    CreateTime,
}

impl OrderBy {
    pub fn parse(s: &str) -> Self {
        if s == fields::CREATE_TIME {
            Self::CreateTime
        } else {
            Self::Name
        }
    }
}

/// Two-key ordering relation. Creation-time ordering is strictly-before;
/// name ordering is non-strict (`<=`), so equal names compare "less" in both
/// directions. Accepted quirk: the searcher's sort adapter folds mutual-less
/// into a tie rather than changing the relation itself.
pub fn less<A: ResourceAdapter>(adapter: &A, a: &A::Obj, b: &A::Obj, order_by: &str) -> bool {
    match OrderBy::parse(order_by) {
        OrderBy::CreateTime => adapter.creation_ts(a) < adapter.creation_ts(b),
        OrderBy::Name => adapter.name(a) <= adapter.name(b),
    }
}
