use serde::Serialize;

use crate::errors::CacheError;

pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash an input descriptor into a cache key.
///
/// The descriptor goes through `serde_json::Value` first so map keys are
/// emitted in sorted order and equal descriptors always hash equally.
pub fn content_hash<T: Serialize + ?Sized>(descriptor: &T) -> Result<String, CacheError> {
    let value = serde_json::to_value(descriptor)?;
    let bytes = serde_json::to_vec(&value)?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equal_maps_hash_equally_regardless_of_insertion_order() {
        let mut first = HashMap::new();
        first.insert("tree", "button Add to Cart");
        first.insert("ref", "0-12");
        let mut second = HashMap::new();
        second.insert("ref", "0-12");
        second.insert("tree", "button Add to Cart");

        assert_eq!(content_hash(&first).unwrap(), content_hash(&second).unwrap());
    }

    #[test]
    fn hash_is_hex() {
        let key = hash_bytes(b"payload");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
