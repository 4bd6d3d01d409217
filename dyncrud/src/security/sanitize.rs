//! Submission sanitizing
//!
//! Runs before validation: drops keys that do not correspond to a known
//! field, trims surrounding whitespace and strips control characters that
//! have no business in form input.

use std::collections::HashSet;

use crate::crud::FormData;

/// Filter a raw submission down to allowed fields with cleaned values
#[must_use]
pub fn sanitize_input(data: &FormData, allowed: &HashSet<&str>) -> FormData {
    data.iter()
        .filter(|(name, _)| allowed.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), clean_value(value)))
        .collect()
}

/// Strip control characters (keeping newlines and tabs), then trim
#[must_use]
pub fn clean_value(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        pairs.iter().map(|(k, v)| ((*k).into(), (*v).into())).collect()
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let allowed: HashSet<&str> = ["name"].into();
        let out = sanitize_input(&data(&[("name", "Ada"), ("role", "admin")]), &allowed);
        assert_eq!(out.len(), 1);
        assert!(out.contains_key("name"));
    }

    #[test]
    fn test_values_trimmed_and_stripped() {
        let allowed: HashSet<&str> = ["name", "bio"].into();
        let out = sanitize_input(
            &data(&[("name", "  Ada\u{0} "), ("bio", "line1\nline2\ttab")]),
            &allowed,
        );
        assert_eq!(out["name"], "Ada");
        assert_eq!(out["bio"], "line1\nline2\ttab");
    }

    proptest! {
        #[test]
        fn prop_clean_value_is_idempotent(value in ".{0,64}") {
            let once = clean_value(&value);
            prop_assert_eq!(clean_value(&once), once);
        }

        #[test]
        fn prop_clean_value_has_no_bare_control_chars(value in ".{0,64}") {
            let cleaned = clean_value(&value);
            prop_assert!(cleaned
                .chars()
                .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t')));
        }
    }
}
