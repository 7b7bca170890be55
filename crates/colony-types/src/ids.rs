//! Type-safe identifier wrappers around host-assigned strings.
//!
//! The host names zones (e.g. `"W7N3"`) and hands back opaque ids for
//! construction sites and structures. Each gets its own newtype so a site id
//! can never be passed where a zone id is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from anything string-like.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Identifier of a zone (one colony's 50x50 operating area).
    ZoneId
}

define_id! {
    /// Correlation id the construction executor returns for a placed site.
    SiteId
}

define_id! {
    /// Identifier of a standing structure as reported by the world query.
    StructureId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_inner_string() {
        let zone = ZoneId::new("W7N3");
        assert_eq!(zone.to_string(), "W7N3");
        assert_eq!(zone.as_str(), "W7N3");
    }

    #[test]
    fn ids_serialize_transparently() {
        let site = SiteId::from("site-17");
        let json = serde_json::to_string(&site).ok();
        assert_eq!(json.as_deref(), Some("\"site-17\""));
    }
}
