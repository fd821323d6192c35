//! Injected sources of non-determinism.
//!
//! Translators never call a global id generator or read the wall clock
//! directly; they receive an [`IdGenerator`] and a [`Clock`] so that event
//! sequences are reproducible under test.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces bare unique identifiers. Callers add the `resp_`/`msg_`/`fc_` prefix.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}

static RANDOM_ID_FALLBACK_SEQ: AtomicU64 = AtomicU64::new(0);

/// 128-bit random hex ids, falling back to `<ts_ms><seq>` when the OS RNG is unavailable.
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> String {
        let mut bytes = [0u8; 16];
        if getrandom::fill(&mut bytes).is_err() {
            let ts_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|duration| duration.as_millis())
                .unwrap_or(0);
            let seq = RANDOM_ID_FALLBACK_SEQ.fetch_add(1, Ordering::Relaxed);
            return format!("{ts_ms:x}{seq:08x}");
        }
        hex_encode(&bytes)
    }
}

/// Deterministic ids `"<prefix><n>"` starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.prefix)
    }
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0));
        now.as_secs()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.0
    }
}

/// The capability bundle handed to translators.
#[derive(Clone)]
pub struct Capabilities {
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl Capabilities {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(RandomIds), Arc::new(SystemClock))
    }

    /// Sequential ids and a fixed clock, for tests and replay tooling.
    pub fn deterministic(now_epoch_seconds: u64) -> Self {
        Self::new(
            Arc::new(SequentialIds::new("")),
            Arc::new(FixedClock(now_epoch_seconds)),
        )
    }

    pub(crate) fn prefixed_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.ids.next_id())
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("ids", &"<dyn IdGenerator>")
            .field("clock", &"<dyn Clock>")
            .finish()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
