use std::sync::Arc;

use crate::persona::ChatMode;
use crate::store::{KvStore, StoreError};

/// Content-addressed memoization of upstream responses. Entries are written
/// once per key and replaced wholesale only after TTL expiry.
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    ttl_seconds: u64,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KvStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store.get(key).await
    }

    pub async fn store(&self, key: &str, content: &str) -> Result<(), StoreError> {
        if self.ttl_seconds == 0 {
            return Ok(());
        }
        self.store.set_ex(key, content, self.ttl_seconds).await
    }
}

/// Digest key over the sanitized triple. Every field and history item is
/// length-prefixed before hashing, so inputs containing separator bytes
/// cannot produce the same key as a differently-split triple.
pub fn cache_key(sanitized_message: &str, history: &[String], mode: ChatMode) -> String {
    use sha2::Digest as _;

    let mut hasher = sha2::Sha256::new();
    hasher.update(b"concierge-chat-v1");
    write_field(&mut hasher, sanitized_message.as_bytes());
    hasher.update((history.len() as u64).to_be_bytes());
    for item in history {
        write_field(&mut hasher, item.as_bytes());
    }
    write_field(&mut hasher, mode.as_str().as_bytes());
    format!("cache:{}", hex_lower(&hasher.finalize()))
}

fn write_field(hasher: &mut sha2::Sha256, bytes: &[u8]) {
    use sha2::Digest as _;
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn identical_triples_hash_identically() {
        let a = cache_key("plan a trip", &history(&["hi", "hello"]), ChatMode::Thinking);
        let b = cache_key("plan a trip", &history(&["hi", "hello"]), ChatMode::Thinking);
        assert_eq!(a, b);
        assert!(a.starts_with("cache:"));
    }

    #[test]
    fn mode_is_part_of_the_key() {
        let a = cache_key("plan a trip", &[], ChatMode::Standard);
        let b = cache_key("plan a trip", &[], ChatMode::Fast);
        assert_ne!(a, b);
    }

    #[test]
    fn history_split_points_do_not_collide() {
        // "b\nc" as one turn vs "b" and "c" as two.
        let joined = cache_key("a", &history(&["b\nc"]), ChatMode::Standard);
        let split = cache_key("a", &history(&["b", "c"]), ChatMode::Standard);
        assert_ne!(joined, split);
    }

    #[test]
    fn message_and_history_boundaries_do_not_collide() {
        let a = cache_key("ab", &[], ChatMode::Standard);
        let b = cache_key("a", &history(&["b"]), ChatMode::Standard);
        assert_ne!(a, b);
    }
}
