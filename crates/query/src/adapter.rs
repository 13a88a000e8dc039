use sift_core::{MetaObj, CREATOR_ANNOTATION, DISPLAY_NAME_ANNOTATION};

/// Per-kind plug-in: field extraction plus the kind-specific predicates the
/// reserved condition keys dispatch to. The engine is constructed with one
/// adapter instance; there is no ambient kind registry.
pub trait ResourceAdapter: Send + Sync {
    type Obj: Clone + Send + Sync;

    /// Kind tag, used for logging only.
    fn kind(&self) -> &str;

    fn name<'a>(&self, obj: &'a Self::Obj) -> &'a str;
    fn labels<'a>(&self, obj: &'a Self::Obj) -> &'a [(String, String)];
    fn annotations<'a>(&self, obj: &'a Self::Obj) -> &'a [(String, String)];
    fn creation_ts(&self, obj: &Self::Obj) -> i64;

    /// Display name consulted by fuzzy name matching alongside the real name.
    fn display_name<'a>(&self, obj: &'a Self::Obj) -> &'a str {
        pair_value(self.annotations(obj), DISPLAY_NAME_ANNOTATION).unwrap_or("")
    }

    /// Whether the object was created through a user-facing surface. The
    /// stock rule is a non-empty creator annotation.
    fn is_user_facing(&self, obj: &Self::Obj) -> bool {
        pair_value(self.annotations(obj), CREATOR_ANNOTATION).is_some_and(|v| !v.is_empty())
    }
}

pub(crate) fn pair_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Stock adapter over [`MetaObj`] records. Kinds that need different
/// user-facing or display-name rules implement [`ResourceAdapter`] directly.
#[derive(Debug, Clone)]
pub struct MetaAdapter {
    kind: String,
}

impl MetaAdapter {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

impl ResourceAdapter for MetaAdapter {
    type Obj = MetaObj;

    fn kind(&self) -> &str {
        &self.kind
    }

    fn name<'a>(&self, obj: &'a MetaObj) -> &'a str {
        &obj.name
    }

    fn labels<'a>(&self, obj: &'a MetaObj) -> &'a [(String, String)] {
        &obj.labels
    }

    fn annotations<'a>(&self, obj: &'a MetaObj) -> &'a [(String, String)] {
        &obj.annotations
    }

    fn creation_ts(&self, obj: &MetaObj) -> i64 {
        obj.creation_ts
    }
}
