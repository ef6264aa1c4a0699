//! Per-channel writer exclusion with bounded wait.
//!
//! # Invariants
//! - Writers of the same channel never overlap; writers of different
//!   channels never wait on each other.
//! - Acquisition waits at most the configured timeout.
//! - Entries are removed once no writer holds or waits on them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Raised when a channel section could not be entered in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTimeout {
    pub channel_id: String,
    pub waited: Duration,
}

/// Partitioned mutual exclusion keyed by channel id.
#[derive(Debug, Default)]
pub struct ChannelLocks {
    sections: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChannelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` inside the exclusive section of `channel_id`.
    ///
    /// # Errors
    /// - Returns `LockTimeout` without running `work` when the section stays
    ///   held by another writer for longer than `timeout`.
    pub fn with_channel<T>(
        &self,
        channel_id: &str,
        timeout: Duration,
        work: impl FnOnce() -> T,
    ) -> Result<T, LockTimeout> {
        let lease = SectionLease {
            locks: self,
            channel_id,
            section: self.section(channel_id),
        };
        let _guard = lease.section.try_lock_for(timeout).ok_or_else(|| LockTimeout {
            channel_id: channel_id.to_string(),
            waited: timeout,
        })?;
        Ok(work())
    }

    /// Number of channels currently tracked.
    pub fn tracked_channels(&self) -> usize {
        self.sections.lock().len()
    }

    fn section(&self, channel_id: &str) -> Arc<Mutex<()>> {
        let mut sections = self.sections.lock();
        Arc::clone(
            sections
                .entry(channel_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn release(&self, channel_id: &str, section: &Arc<Mutex<()>>) {
        let mut sections = self.sections.lock();
        // Map entry plus our handle: nobody else holds or waits.
        if Arc::strong_count(section) == 2 {
            sections.remove(channel_id);
        }
    }
}

/// Drops the channel's map entry on every exit path, unwinding included.
/// Declared before the section guard so it is dropped after the unlock.
struct SectionLease<'a> {
    locks: &'a ChannelLocks,
    channel_id: &'a str,
    section: Arc<Mutex<()>>,
}

impl Drop for SectionLease<'_> {
    fn drop(&mut self) {
        self.locks.release(self.channel_id, &self.section);
    }
}
