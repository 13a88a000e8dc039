use std::collections::BTreeMap;

use crate::adapter::{pair_value, ResourceAdapter};
use crate::conditions::ReservedKey;

/// How a non-reserved fuzzy key addresses the label map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultFuzzyMode {
    /// Condition key narrows by label-key substring, value by label-value
    /// substring.
    #[default]
    KeyQualified,
    /// Condition key is ignored; the value must appear in some label value.
    ValueOnly,
}

/// Substring containment over a key/value pair list. An empty `target_key`
/// matches against any entry's value; otherwise an entry must contain both
/// targets (key substring and value substring).
pub fn fuzzy_search(pairs: &[(String, String)], target_key: &str, target_value: &str) -> bool {
    if target_key.is_empty() {
        pairs.iter().any(|(_, v)| v.contains(target_value))
    } else {
        pairs
            .iter()
            .any(|(k, v)| k.contains(target_key) && v.contains(target_value))
    }
}

/// Exact-match predicate: AND over the match map, vacuously true when empty.
pub fn matches<A: ResourceAdapter>(
    adapter: &A,
    conditions: &BTreeMap<String, String>,
    obj: &A::Obj,
) -> bool {
    for (key, value) in conditions {
        let ok = match ReservedKey::parse(key) {
            Some(ReservedKey::Name) => value.split('|').any(|n| n == adapter.name(obj)),
            Some(ReservedKey::Keyword) => {
                adapter.name(obj).contains(value.as_str())
                    || fuzzy_search(adapter.labels(obj), "", value)
                    || fuzzy_search(adapter.annotations(obj), "", value)
            }
            Some(ReservedKey::UserFacing) => {
                // Only the literal "true" filters; any other value is a no-op.
                value != "true" || adapter.is_user_facing(obj)
            }
            // Label/Annotation carry no exact-match semantics; like unknown
            // keys they mean a literal label equality (absence fails).
            _ => pair_value(adapter.labels(obj), key) == Some(value.as_str()),
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Fuzzy predicate: AND over the fuzzy map, vacuously true when empty.
pub fn fuzzy_matches<A: ResourceAdapter>(
    adapter: &A,
    conditions: &BTreeMap<String, String>,
    obj: &A::Obj,
    mode: DefaultFuzzyMode,
) -> bool {
    for (key, value) in conditions {
        let ok = match ReservedKey::parse(key) {
            Some(ReservedKey::Name) => {
                adapter.name(obj).contains(value.as_str())
                    || adapter.display_name(obj).contains(value.as_str())
            }
            Some(ReservedKey::Label) => fuzzy_search(adapter.labels(obj), "", value),
            Some(ReservedKey::Annotation) => {
                // Compatibility quirk: the annotation probe runs, then the
                // branch rejects the record regardless of its outcome.
                // Kept deliberately; see DESIGN.md.
                let _ = fuzzy_search(adapter.annotations(obj), "", value);
                false
            }
            // Keyword/UserFacing have no fuzzy semantics; like unknown keys
            // they fall back to the default label search.
            Some(ReservedKey::Keyword) | Some(ReservedKey::UserFacing) | None => match mode {
                DefaultFuzzyMode::KeyQualified => fuzzy_search(adapter.labels(obj), key, value),
                DefaultFuzzyMode::ValueOnly => fuzzy_search(adapter.labels(obj), "", value),
            },
        };
        if !ok {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MetaAdapter;
    use sift_core::{MetaObj, CREATOR_ANNOTATION, DISPLAY_NAME_ANNOTATION};

    fn obj(name: &str, labels: &[(&str, &str)], annos: &[(&str, &str)]) -> MetaObj {
        MetaObj {
            uid: [0u8; 16],
            namespace: Some("default".into()),
            name: name.to_string(),
            creation_ts: 0,
            labels: labels.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            annotations: annos.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        }
    }

    fn conds(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn fuzzy_search_empty_key_scans_values() {
        let pairs = vec![("app".to_string(), "frontend".to_string())];
        assert!(fuzzy_search(&pairs, "", "front"));
        assert!(!fuzzy_search(&pairs, "", "backend"));
    }

    #[test]
    fn fuzzy_search_key_qualified() {
        let pairs = vec![
            ("app.kubernetes.io/name".to_string(), "frontend".to_string()),
            ("tier".to_string(), "web".to_string()),
        ];
        assert!(fuzzy_search(&pairs, "app", "front"));
        // key matches but no value entry under it contains "web"
        assert!(!fuzzy_search(&pairs, "app", "web"));
        assert!(!fuzzy_search(&pairs, "missing", "front"));
    }

    #[test]
    fn match_name_is_pipe_membership() {
        let ad = MetaAdapter::new("object");
        let o = obj("b", &[], &[]);
        assert!(matches(&ad, &conds(&[("name", "a|b")]), &o));
        assert!(!matches(&ad, &conds(&[("name", "a|c")]), &o));
        // no substring semantics for exact name matching
        assert!(!matches(&ad, &conds(&[("name", "ab")]), &o));
    }

    #[test]
    fn match_keyword_checks_name_labels_annotations() {
        let ad = MetaAdapter::new("object");
        assert!(matches(&ad, &conds(&[("keyword", "foo")]), &obj("foobar", &[], &[])));
        assert!(matches(&ad, &conds(&[("keyword", "foo")]), &obj("x", &[("a", "foo1")], &[])));
        assert!(matches(&ad, &conds(&[("keyword", "foo")]), &obj("x", &[], &[("a", "xfoo")])));
        assert!(!matches(&ad, &conds(&[("keyword", "foo")]), &obj("x", &[("a", "b")], &[])));
    }

    #[test]
    fn match_user_facing_asymmetry() {
        let ad = MetaAdapter::new("object");
        let facing = obj("a", &[], &[(CREATOR_ANNOTATION, "admin")]);
        let plain = obj("b", &[], &[]);
        assert!(matches(&ad, &conds(&[("userfacing", "true")]), &facing));
        assert!(!matches(&ad, &conds(&[("userfacing", "true")]), &plain));
        // any value other than "true" applies no filter at all
        assert!(matches(&ad, &conds(&[("userfacing", "false")]), &plain));
        assert!(matches(&ad, &conds(&[("userfacing", "yes")]), &plain));
    }

    #[test]
    fn match_default_is_literal_label_equality() {
        let ad = MetaAdapter::new("object");
        let o = obj("a", &[("app", "web")], &[]);
        assert!(matches(&ad, &conds(&[("app", "web")]), &o));
        assert!(!matches(&ad, &conds(&[("app", "we")]), &o));
        assert!(!matches(&ad, &conds(&[("tier", "web")]), &o));
    }

    #[test]
    fn match_is_and_across_keys() {
        let ad = MetaAdapter::new("object");
        let o = obj("a", &[("app", "web")], &[]);
        assert!(matches(&ad, &conds(&[("name", "a"), ("app", "web")]), &o));
        assert!(!matches(&ad, &conds(&[("name", "a"), ("app", "api")]), &o));
    }

    #[test]
    fn fuzzy_name_consults_display_name() {
        let ad = MetaAdapter::new("object");
        let o = obj("cm-1138", &[], &[(DISPLAY_NAME_ANNOTATION, "billing cache")]);
        let mode = DefaultFuzzyMode::default();
        assert!(fuzzy_matches(&ad, &conds(&[("name", "1138")]), &o, mode));
        assert!(fuzzy_matches(&ad, &conds(&[("name", "billing")]), &o, mode));
        assert!(!fuzzy_matches(&ad, &conds(&[("name", "audit")]), &o, mode));
    }

    #[test]
    fn fuzzy_label_scans_any_value() {
        let ad = MetaAdapter::new("object");
        let o = obj("a", &[("x", "alpha"), ("y", "beta")], &[]);
        let mode = DefaultFuzzyMode::default();
        assert!(fuzzy_matches(&ad, &conds(&[("label", "bet")]), &o, mode));
        assert!(!fuzzy_matches(&ad, &conds(&[("label", "gamma")]), &o, mode));
    }

    #[test]
    fn fuzzy_annotation_always_rejects() {
        // Known quirk: the annotation branch rejects every record even when
        // the probe would have matched.
        let ad = MetaAdapter::new("object");
        let o = obj("a", &[], &[("note", "exact")]);
        let mode = DefaultFuzzyMode::default();
        assert!(!fuzzy_matches(&ad, &conds(&[("annotation", "exact")]), &o, mode));
        assert!(!fuzzy_matches(&ad, &conds(&[("annotation", "zzz")]), &o, mode));
    }

    #[test]
    fn fuzzy_default_key_both_modes() {
        let ad = MetaAdapter::new("object");
        let o = obj("a", &[("app.kubernetes.io/name", "frontend")], &[]);
        assert!(fuzzy_matches(
            &ad,
            &conds(&[("app", "front")]),
            &o,
            DefaultFuzzyMode::KeyQualified
        ));
        assert!(!fuzzy_matches(
            &ad,
            &conds(&[("tier", "front")]),
            &o,
            DefaultFuzzyMode::KeyQualified
        ));
        // ValueOnly ignores the key entirely
        assert!(fuzzy_matches(
            &ad,
            &conds(&[("tier", "front")]),
            &o,
            DefaultFuzzyMode::ValueOnly
        ));
    }
}
