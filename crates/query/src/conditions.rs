use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Condition-map keys with evaluator semantics of their own. Everything else
/// falls back to a literal label lookup.
pub mod fields {
    pub const NAME: &str = "name";
    pub const KEYWORD: &str = "keyword";
    pub const LABEL: &str = "label";
    pub const ANNOTATION: &str = "annotation";
    pub const USER_FACING: &str = "userfacing";
    /// Order-by only; never a filter key.
    pub const CREATE_TIME: &str = "createTime";
}

/// Reserved filter keys, made explicit so per-adapter dispatch stays a closed
/// set instead of scattered string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedKey {
    Name,
    Keyword,
    Label,
    Annotation,
    UserFacing,
}

impl ReservedKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            fields::NAME => Some(Self::Name),
            fields::KEYWORD => Some(Self::Keyword),
            fields::LABEL => Some(Self::Label),
            fields::ANNOTATION => Some(Self::Annotation),
            fields::USER_FACING => Some(Self::UserFacing),
            _ => None,
        }
    }
}

/// Per-query filter sets. Empty maps select everything. Unknown keys are not
/// an error; they degrade to label lookups at evaluation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    pub matches: BTreeMap<String, String>,
    pub fuzzy: BTreeMap<String, String>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.matches.insert(key.into(), value.into());
        self
    }

    pub fn with_fuzzy(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fuzzy.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.fuzzy.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_parse() {
        assert_eq!(ReservedKey::parse("name"), Some(ReservedKey::Name));
        assert_eq!(ReservedKey::parse("keyword"), Some(ReservedKey::Keyword));
        assert_eq!(ReservedKey::parse("userfacing"), Some(ReservedKey::UserFacing));
        assert_eq!(ReservedKey::parse("app"), None);
        // createTime orders results; it is not a filter key
        assert_eq!(ReservedKey::parse("createTime"), None);
    }

    #[test]
    fn empty_conditions() {
        assert!(Conditions::new().is_empty());
        assert!(!Conditions::new().with_match("name", "a").is_empty());
        assert!(!Conditions::new().with_fuzzy("label", "a").is_empty());
    }
}
