use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ChannelId;

type LockMap = Arc<Mutex<HashMap<ChannelId, Arc<AsyncMutex<()>>>>>;

/// Per-channel async mutexes.
///
/// Registry writes take the channel's lock around their read-modify-write
/// cycle; broadcasts take it for the whole delivery loop. The two use
/// separate `ChannelLocks` instances so a running broadcast never blocks
/// registration.
///
/// An entry lives only while a guard holds it or a task waits on it.
#[derive(Default)]
pub struct ChannelLocks {
    inner: LockMap,
}

/// Held channel lock. Dropping it releases the lock and forgets the channel
/// once nobody else is queued on it.
pub struct ChannelGuard {
    channel: ChannelId,
    map: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ChannelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_channel(&self, channel: &ChannelId) -> ChannelGuard {
        // The map mutex is never held across an await.
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(channel.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        ChannelGuard {
            channel: channel.clone(),
            map: self.inner.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        self.guard.take();
        // Waiters clone the Arc under the map lock, so a count of one means
        // only the map still refers to this mutex.
        if map
            .get(&self.channel)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.channel);
        }
    }
}
