use std::collections::HashSet;

pub const WILDCARD: &str = "*";

/// Enable/disable sets taken from a customer document.
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    enable: HashSet<String>,
    disable: HashSet<String>,
}

impl ServiceFilter {
    pub fn new<E, D>(enable: E, disable: D) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        return Self {
            enable: enable.into_iter().map(Into::into).collect(),
            disable: disable.into_iter().map(Into::into).collect(),
        };
    }

    pub fn is_wanted(&self, name: &str) -> bool {
        return is_wanted(name, &self.enable, &self.disable);
    }
}

/// Disable beats enable, then the wildcard, then literal membership.
pub fn is_wanted(name: &str, enable: &HashSet<String>, disable: &HashSet<String>) -> bool {
    if disable.contains(name) {
        return false;
    }

    if enable.contains(WILDCARD) {
        return true;
    }

    return enable.contains(name);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::is_wanted;
    use super::ServiceFilter;

    #[test]
    fn wildcard_enables_everything() {
        let filter = ServiceFilter::new(["*"], Vec::<String>::new());
        assert_eq!(true, filter.is_wanted("auth-service"));
        assert_eq!(true, filter.is_wanted("videos-service"));
    }

    #[test]
    fn literal_enable_only() {
        let filter = ServiceFilter::new(["auth-service"], Vec::<String>::new());
        assert_eq!(true, filter.is_wanted("auth-service"));
        assert_eq!(false, filter.is_wanted("videos-service"));
    }

    #[test]
    fn disable_beats_wildcard() {
        let filter = ServiceFilter::new(["*", "videos-service"], ["videos-service"]);
        assert_eq!(false, filter.is_wanted("videos-service"));
        assert_eq!(true, filter.is_wanted("auth-service"));
    }

    #[test]
    fn empty_sets_reject() {
        let filter = ServiceFilter::default();
        assert_eq!(false, filter.is_wanted("auth-service"));
    }

    proptest! {
        #[test]
        fn disabled_name_is_never_wanted(
            name in "[a-z-]{1,16}",
            enable in prop::collection::hash_set("[a-z*-]{1,16}", 0..8),
            mut disable in prop::collection::hash_set("[a-z-]{1,16}", 0..8),
            wildcard in any::<bool>(),
        ) {
            let mut enable: HashSet<String> = enable;
            if wildcard {
                enable.insert("*".to_string());
            }
            enable.insert(name.clone());
            disable.insert(name.clone());

            prop_assert!(!is_wanted(&name, &enable, &disable));
        }
    }
}
