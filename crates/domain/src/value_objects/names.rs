//! Validated name newtypes
//!
//! Land, realm and topic names are slugs: ASCII letters, digits, `-` and `_`.
//! Player names follow the usual account rules (letters, digits and `@.+-_`),
//! which keeps them free of the commas used to separate filter lists.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length for slug and property names
const MAX_NAME_LENGTH: usize = 255;

/// Maximum length for player names
const MAX_PLAYER_NAME_LENGTH: usize = 150;

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn is_player_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn validate_slug(kind: &str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::validation(format!("{kind} cannot be empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "{kind} cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    if let Some(bad) = value.chars().find(|c| !is_slug_char(*c)) {
        return Err(DomainError::validation(format!(
            "{kind} may only contain letters, digits, '-' and '_' (found {bad:?})"
        )));
    }
    Ok(())
}

macro_rules! define_name {
    ($(#[$meta:meta])* $name:ident, $validate:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                let validate: fn(&str) -> Result<(), DomainError> = $validate;
                validate(&value)?;
                Ok(Self(value))
            }

            /// Returns the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> String {
                name.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_name!(
    /// Unique slug naming a land.
    LandName,
    |v| validate_slug("Land name", v)
);

define_name!(
    /// Slug naming a realm, unique within its land.
    RealmName,
    |v| validate_slug("Realm name", v)
);

define_name!(
    /// Partition key for messages within a realm.
    Topic,
    |v| validate_slug("Topic", v)
);

define_name!(
    /// Identity of a player account.
    PlayerName,
    |v| {
        if v.is_empty() {
            return Err(DomainError::validation("Player name cannot be empty"));
        }
        if v.chars().count() > MAX_PLAYER_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Player name cannot exceed {MAX_PLAYER_NAME_LENGTH} characters"
            )));
        }
        if !v.chars().all(is_player_char) {
            return Err(DomainError::validation(
                "Player name may only contain letters, digits and @.+-_",
            ));
        }
        Ok(())
    }
);

define_name!(
    /// Name of a property within a land or realm.
    PropertyName,
    |v| {
        if v.trim().is_empty() {
            return Err(DomainError::validation("Property name cannot be empty"));
        }
        if v.len() > MAX_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Property name cannot exceed {MAX_NAME_LENGTH} characters"
            )));
        }
        if v.contains(',') {
            return Err(DomainError::validation("Property name cannot contain ','"));
        }
        Ok(())
    }
);
