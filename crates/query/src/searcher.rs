use std::cmp::Ordering;
use std::time::Instant;

use sift_core::{ObjectStore, StoreError};
use tracing::debug;

use crate::adapter::ResourceAdapter;
use crate::conditions::Conditions;
use crate::order::less;
use crate::predicate::{fuzzy_matches, matches, DefaultFuzzyMode};

/// Stateless query engine over one adapter and one store, assembled by the
/// caller. A record must pass both the exact and the fuzzy predicate; results
/// are ordered by the two-key comparator.
pub struct Searcher<A, S> {
    adapter: A,
    store: S,
    default_fuzzy: DefaultFuzzyMode,
}

impl<A, S> Searcher<A, S>
where
    A: ResourceAdapter,
    S: ObjectStore<A::Obj>,
{
    pub fn new(adapter: A, store: S) -> Self {
        Self {
            adapter,
            store,
            default_fuzzy: DefaultFuzzyMode::default(),
        }
    }

    /// Overrides how non-reserved fuzzy keys address the label map.
    pub fn with_default_fuzzy(mut self, mode: DefaultFuzzyMode) -> Self {
        self.default_fuzzy = mode;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Single-record lookup; store failures and misses propagate as-is.
    pub fn get(&self, scope: &str, name: &str) -> Result<A::Obj, StoreError> {
        self.store.get(scope, name)
    }

    pub fn search(
        &self,
        scope: &str,
        conditions: &Conditions,
        order_by: &str,
        reverse: bool,
    ) -> Result<Vec<A::Obj>, StoreError> {
        let t0 = Instant::now();
        let items = self.store.list(scope)?;
        let total = items.len();
        metrics::histogram!("query_candidates", total as f64);

        let mut result: Vec<A::Obj> = if conditions.is_empty() {
            items
        } else {
            items
                .into_iter()
                .filter(|o| {
                    matches(&self.adapter, &conditions.matches, o)
                        && fuzzy_matches(&self.adapter, &conditions.fuzzy, o, self.default_fuzzy)
                })
                .collect()
        };

        result.sort_by(|a, b| {
            // Reverse swaps the compared operands, not the finished order.
            let (x, y) = if reverse { (b, a) } else { (a, b) };
            let fwd = less(&self.adapter, x, y, order_by);
            let bwd = less(&self.adapter, y, x, order_by);
            match (fwd, bwd) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                // Mutual-less happens on name ties; fold into a tie so the
                // stable sort sees a total order.
                _ => Ordering::Equal,
            }
        });

        debug!(
            kind = %self.adapter.kind(),
            scope = %scope,
            total,
            kept = result.len(),
            order_by = %order_by,
            reverse,
            "query evaluated"
        );
        metrics::histogram!("query_eval_ms", t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(result)
    }
}
