//! Process instance identifier generation.

use uuid::Uuid;

/// Generates a fresh instance identifier of the form `<prefix>_<uuid-v4>`.
#[must_use]
pub fn new_instance_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use regex::Regex;

    use super::*;

    #[test]
    fn id_has_prefix_and_hyphenated_uuid() {
        let id = new_instance_id("order");
        let re = Regex::new(r"^order_[0-9a-f-]{36}$").unwrap();
        assert!(re.is_match(&id), "unexpected id: {id}");
    }

    #[test]
    fn ids_do_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| new_instance_id("p")).collect();
        assert_eq!(ids.len(), 1000);
    }

    proptest! {
        #[test]
        fn prefix_is_preserved(prefix in "[a-zA-Z][a-zA-Z0-9_-]{0,24}") {
            let id = new_instance_id(&prefix);
            let suffix = id.strip_prefix(&format!("{prefix}_")).unwrap();
            prop_assert!(Uuid::parse_str(suffix).is_ok());
            prop_assert_eq!(suffix.len(), 36);
        }
    }
}
