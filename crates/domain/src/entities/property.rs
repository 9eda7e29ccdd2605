//! Scoped, possibly multi-valued properties

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{PlayerName, PropertyName};

/// One stored value of a property.
///
/// A property name may map to several records for the same owner; together
/// they form the ordered value list written by the last replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// `None` for global (unowned) properties.
    pub owner: Option<PlayerName>,
    pub name: PropertyName,
    pub value: String,
}

/// Owner and name filters for property reads. An empty set matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyFilter {
    pub owners: BTreeSet<PlayerName>,
    pub names: BTreeSet<PropertyName>,
}

impl PropertyFilter {
    pub fn new(owners: BTreeSet<PlayerName>, names: BTreeSet<PropertyName>) -> Self {
        Self { owners, names }
    }

    pub fn any() -> Self {
        Self::default()
    }

    /// A non-empty owner filter never matches global records.
    pub fn matches(&self, owner: Option<&PlayerName>, name: &PropertyName) -> bool {
        let owner_ok = self.owners.is_empty() || owner.is_some_and(|o| self.owners.contains(o));
        let name_ok = self.names.is_empty() || self.names.contains(name);
        owner_ok && name_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> PlayerName {
        PlayerName::new(name).expect("valid player")
    }

    fn prop(name: &str) -> PropertyName {
        PropertyName::new(name).expect("valid property")
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = PropertyFilter::any();
        assert!(filter.matches(None, &prop("score")));
        assert!(filter.matches(Some(&player("alice")), &prop("level")));
    }

    #[test]
    fn filters_apply_on_both_dimensions() {
        let filter = PropertyFilter::new(
            [player("alice"), player("bob")].into_iter().collect(),
            [prop("score")].into_iter().collect(),
        );
        assert!(filter.matches(Some(&player("alice")), &prop("score")));
        assert!(filter.matches(Some(&player("bob")), &prop("score")));
        assert!(!filter.matches(Some(&player("carol")), &prop("score")));
        assert!(!filter.matches(Some(&player("alice")), &prop("level")));
        assert!(!filter.matches(None, &prop("score")));
    }
}
