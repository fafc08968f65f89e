// ============================
// crates/backend-lib/src/auth/lockout.rs
// ============================
//! Brute-force lockout for login identifiers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of failed attempts before lockout
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;

/// Default lockout duration (30 minutes)
pub const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(30 * 60);

/// Entry in the lockout map
#[derive(Debug, Clone)]
struct LockoutEntry {
    /// Number of failed attempts since the last successful login
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the current lock was set, if the threshold was ever crossed
    locked_at: Option<Instant>,
}

impl LockoutEntry {
    fn is_locked_at(&self, now: Instant, lockout_duration: Duration) -> bool {
        match self.locked_at {
            Some(locked_at) => now.saturating_duration_since(locked_at) <= lockout_duration,
            None => false,
        }
    }
}

/// Failed-attempt tracker keyed by login identifier.
///
/// One coarse reader/writer lock guards the whole map: every login attempt
/// takes the read side, only failures and successes take the write side.
/// Entries are never evicted implicitly; see [`LockoutTracker::purge_stale`].
#[derive(Debug)]
pub struct LockoutTracker {
    entries: RwLock<HashMap<String, LockoutEntry>>,
    /// Maximum number of failed attempts before lockout
    max_failed_attempts: u32,
    /// Duration of lockout period
    lockout_duration: Duration,
}

impl Default for LockoutTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILED_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl LockoutTracker {
    /// Create a new lockout tracker
    pub fn new(max_failed_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_failed_attempts,
            lockout_duration,
        }
    }

    /// Check whether an identifier is currently locked out
    pub fn is_locked(&self, identifier: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(identifier)
            .is_some_and(|entry| entry.is_locked_at(now, self.lockout_duration))
    }

    /// Record a failed login attempt.
    ///
    /// Returns `true` when this failure set a new lock. A lock that is still
    /// in force is never re-armed, so it lasts exactly the lockout duration
    /// from the failure that triggered it. Once it has lapsed the count is
    /// kept, so the next failure locks again.
    pub fn record_failure(&self, identifier: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let entry = entries
            .entry(identifier.to_owned())
            .or_insert_with(|| LockoutEntry {
                failed_attempts: 0,
                last_failure: now,
                locked_at: None,
            });

        entry.failed_attempts = entry.failed_attempts.saturating_add(1);
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_failed_attempts
            && !entry.is_locked_at(now, self.lockout_duration)
        {
            entry.locked_at = Some(now);
            tracing::warn!(
                identifier,
                attempts = entry.failed_attempts,
                "identifier locked out after repeated failures"
            );
            return true;
        }

        false
    }

    /// Forget all failures for an identifier (successful login)
    pub fn clear(&self, identifier: &str) {
        self.entries.write().remove(identifier);
    }

    /// Number of failures recorded since the last successful login
    pub fn failed_attempts(&self, identifier: &str) -> u32 {
        self.entries
            .read()
            .get(identifier)
            .map_or(0, |entry| entry.failed_attempts)
    }

    /// Remove entries that are not locked and whose last failure is older
    /// than the lockout duration. Returns the number of entries removed.
    pub fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();

        entries.retain(|_, entry| {
            entry.is_locked_at(now, self.lockout_duration)
                || now.saturating_duration_since(entry.last_failure) <= self.lockout_duration
        });

        before - entries.len()
    }

    /// Number of tracked identifiers
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }
}
