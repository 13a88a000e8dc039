//! Sift query engine: linear-scan filter and sort over cached records.
//!
//! One engine serves many resource kinds through a narrow per-kind
//! [`ResourceAdapter`]. The store collaborator supplies the candidate set;
//! every call re-lists, re-filters and re-sorts with no state kept between
//! calls.

#![forbid(unsafe_code)]

mod adapter;
mod conditions;
mod order;
mod predicate;
mod searcher;

pub use adapter::{MetaAdapter, ResourceAdapter};
pub use conditions::{fields, Conditions, ReservedKey};
pub use order::{less, OrderBy};
pub use predicate::{fuzzy_matches, fuzzy_search, matches, DefaultFuzzyMode};
pub use searcher::Searcher;
pub use sift_core::{ObjectStore, StoreError};
