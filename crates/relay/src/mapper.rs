//! Source message → target message identity store.
//!
//! Each `(source channel, source message)` key owns its own async mutex.
//! Handlers hold a [`MappingGuard`] across their network calls, so create,
//! edit and delete for one message are applied one at a time while other
//! keys proceed independently.

use std::sync::Arc;

use {
    dashmap::DashMap,
    tokio::sync::{Mutex, OwnedMutexGuard},
};

/// Identity of a source message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub channel_id: String,
    pub message_id: String,
}

impl MessageKey {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

type Slot = Arc<Mutex<Option<String>>>;

/// Process-lifetime table of mirrored messages.
#[derive(Debug, Default)]
pub struct MessageMapper {
    slots: DashMap<MessageKey, Slot>,
}

impl MessageMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one key.
    pub async fn lock(&self, key: MessageKey) -> MappingGuard<'_> {
        let slot = Arc::clone(self.slots.entry(key.clone()).or_default().value());
        let guard = slot.lock_owned().await;
        MappingGuard {
            mapper: self,
            key,
            guard,
        }
    }

    /// Target message id for a key, waiting for any in-flight handler on it.
    pub async fn get(&self, key: &MessageKey) -> Option<String> {
        let slot = self.slots.get(key).map(|slot| Arc::clone(slot.value()))?;
        let target = slot.lock().await.clone();
        drop(slot);
        if target.is_none() {
            // A guard that emptied the slot while we waited could not prune it.
            self.prune_idle(key);
        }
        target
    }

    /// Number of keys currently tracked (mirrored or locked).
    pub fn tracked(&self) -> usize {
        self.slots.len()
    }

    fn prune(&self, key: &MessageKey) {
        // One reference is the map's, one is the releasing guard's.
        self.slots
            .remove_if(key, |_, slot| Arc::strong_count(slot) <= 2);
    }

    /// Drop an empty slot nobody else references.
    fn prune_idle(&self, key: &MessageKey) {
        self.slots.remove_if(key, |_, slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|entry| entry.is_none())
        });
    }
}

/// Exclusive handle on one [`MessageKey`].
pub struct MappingGuard<'a> {
    mapper: &'a MessageMapper,
    key: MessageKey,
    guard: OwnedMutexGuard<Option<String>>,
}

impl MappingGuard<'_> {
    pub fn key(&self) -> &MessageKey {
        &self.key
    }

    pub fn get(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    /// Record the target message id. Returns the id it replaced, if any.
    pub fn put(&mut self, target_message_id: impl Into<String>) -> Option<String> {
        self.guard.replace(target_message_id.into())
    }

    pub fn remove(&mut self) -> Option<String> {
        self.guard.take()
    }
}

impl Drop for MappingGuard<'_> {
    fn drop(&mut self) {
        if self.guard.is_none() {
            self.mapper.prune(&self.key);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::time::Duration};

    fn key(n: &str) -> MessageKey {
        MessageKey::new("chan", n)
    }

    #[tokio::test]
    async fn put_get_remove() {
        let mapper = MessageMapper::new();
        assert!(mapper.get(&key("1")).await.is_none());

        {
            let mut guard = mapper.lock(key("1")).await;
            assert!(guard.get().is_none());
            assert!(guard.put("T1").is_none());
        }
        assert_eq!(mapper.get(&key("1")).await.as_deref(), Some("T1"));

        {
            let mut guard = mapper.lock(key("1")).await;
            assert_eq!(guard.remove().as_deref(), Some("T1"));
        }
        assert!(mapper.get(&key("1")).await.is_none());
        assert_eq!(mapper.tracked(), 0);
    }

    #[tokio::test]
    async fn same_channel_different_message_are_distinct() {
        let mapper = MessageMapper::new();
        mapper.lock(key("1")).await.put("T1");
        mapper.lock(key("2")).await.put("T2");
        assert_eq!(mapper.get(&key("1")).await.as_deref(), Some("T1"));
        assert_eq!(mapper.get(&key("2")).await.as_deref(), Some("T2"));
        assert!(mapper.get(&MessageKey::new("other", "1")).await.is_none());
    }

    #[tokio::test]
    async fn unused_lock_leaves_nothing_behind() {
        let mapper = MessageMapper::new();
        drop(mapper.lock(key("1")).await);
        assert_eq!(mapper.tracked(), 0);
    }

    #[tokio::test]
    async fn same_key_is_serialized() {
        let mapper = Arc::new(MessageMapper::new());
        let mut first = mapper.lock(key("1")).await;

        let waiter = {
            let mapper = Arc::clone(&mapper);
            tokio::spawn(async move {
                let guard = mapper.lock(key("1")).await;
                guard.get().map(str::to_string)
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        first.put("T1");
        drop(first);

        assert_eq!(waiter.await.unwrap().as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn reader_waiting_on_a_delete_leaves_nothing_behind() {
        let mapper = Arc::new(MessageMapper::new());
        mapper.lock(key("1")).await.put("T1");

        let mut deleting = mapper.lock(key("1")).await;
        let reader = {
            let mapper = Arc::clone(&mapper);
            tokio::spawn(async move { mapper.get(&key("1")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        deleting.remove();
        drop(deleting);

        assert!(reader.await.unwrap().is_none());
        assert_eq!(mapper.tracked(), 0);
    }

    #[tokio::test]
    async fn reading_a_mirrored_key_keeps_it() {
        let mapper = MessageMapper::new();
        mapper.lock(key("1")).await.put("T1");
        assert_eq!(mapper.get(&key("1")).await.as_deref(), Some("T1"));
        assert_eq!(mapper.tracked(), 1);
    }

    #[tokio::test]
    async fn other_keys_do_not_block() {
        let mapper = MessageMapper::new();
        let _held = mapper.lock(key("1")).await;
        let other = tokio::time::timeout(Duration::from_millis(100), mapper.lock(key("2"))).await;
        assert!(other.is_ok());
    }
}
