//! Cache key derivation.
//!
//! Keys are `<namespace>:<identifying attribute>`. The namespace never
//! contains `:`, so the attribute is recovered by splitting on the first one.

use crate::models::EntityType;

const CREDENTIAL_NAMESPACE: &str = "credentials";
const CONSUMER_NAMESPACE: &str = "consumers";

fn namespace(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Credential => CREDENTIAL_NAMESPACE,
        EntityType::Consumer => CONSUMER_NAMESPACE,
    }
}

/// Derives the cache key for an entity's identifying attribute.
///
/// For credentials the attribute is the public `key`, not the internal id.
#[must_use]
pub fn derive_key(entity_type: EntityType, identifying_attribute: &str) -> String {
    format!("{}:{}", namespace(entity_type), identifying_attribute)
}

/// Shorthand for `derive_key(EntityType::Credential, key)`.
#[must_use]
pub fn credential_key(key: &str) -> String {
    derive_key(EntityType::Credential, key)
}

/// Inverse of [`derive_key`].
pub fn parse_key(cache_key: &str) -> Option<(EntityType, &str)> {
    let (ns, attribute) = cache_key.split_once(':')?;
    let entity_type = match ns {
        CREDENTIAL_NAMESPACE => EntityType::Credential,
        CONSUMER_NAMESPACE => EntityType::Consumer,
        _ => return None,
    };
    Some((entity_type, attribute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_credential_key() {
        assert_eq!(credential_key("key123"), "credentials:key123");
        assert_eq!(derive_key(EntityType::Consumer, "bob"), "consumers:bob");
    }

    #[test]
    fn test_attribute_with_separator() {
        let key = credential_key("a:b");
        assert_eq!(parse_key(&key), Some((EntityType::Credential, "a:b")));
    }

    #[test]
    fn test_parse_unknown_namespace() {
        assert_eq!(parse_key("routes:abc"), None);
        assert_eq!(parse_key("no-separator"), None);
    }

    proptest! {
        #[test]
        fn prop_derive_is_deterministic(attr in ".{0,64}") {
            prop_assert_eq!(credential_key(&attr), credential_key(&attr));
        }

        #[test]
        fn prop_distinct_attributes_never_collide(a in ".{0,32}", b in ".{0,32}") {
            prop_assume!(a != b);
            prop_assert_ne!(credential_key(&a), credential_key(&b));
        }

        #[test]
        fn prop_parse_inverts_derive(attr in ".{0,64}") {
            let key = credential_key(&attr);
            prop_assert_eq!(parse_key(&key), Some((EntityType::Credential, attr.as_str())));
        }
    }
}
