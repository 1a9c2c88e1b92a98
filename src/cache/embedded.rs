//! Embedded cache store backed by sled.
//!
//! # Responsibilities
//! - Persist envelopes in a local ordered key-value directory
//! - Stamp each entry with its expiry and hide expired entries on read
//! - Sweep expired entries in the background
//!
//! # Design Decisions
//! - Value layout is `[expiry unix millis: u64 BE][envelope bytes]`
//! - Reads never delete; only the sweeper removes entries
//! - Reads and writes both run on the blocking pool
//! - The sweeper uses compare-and-swap so a fresh write is never lost

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::Response;
use bytes::Bytes;
use tokio::sync::broadcast;

use crate::cache::{envelope, CacheError, CacheRequest, CacheStore};

/// Size of the expiry stamp in front of every value.
const EXPIRY_LEN: usize = 8;

/// Cache store backed by a sled database directory.
#[derive(Clone)]
pub struct EmbeddedStore {
    db: sled::Db,
    prefix: String,
    ttl: Duration,
}

impl EmbeddedStore {
    /// Open (or create) the database rooted at `path`.
    pub fn open(path: &Path, prefix: &str, ttl: Duration) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            prefix: prefix.to_string(),
            ttl,
        })
    }

    /// Remove every expired entry under this store's prefix.
    pub fn sweep_expired(&self) -> Result<usize, CacheError> {
        let now = now_millis();
        let mut removed = 0;
        for item in self.db.scan_prefix(format!("{}:", self.prefix)) {
            let (key, value) = item?;
            if !is_expired(&value, now) {
                continue;
            }
            // Only delete if nobody rewrote the entry since we read it.
            if self
                .db
                .compare_and_swap(&key, Some(&value), None as Option<&[u8]>)?
                .is_ok()
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `every` until shutdown.
    pub async fn run_sweeper(self, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?every, "Cache sweeper starting");
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let store = self.clone();
                    match tokio::task::spawn_blocking(move || store.sweep_expired()).await {
                        Ok(Ok(0)) => {}
                        Ok(Ok(removed)) => tracing::debug!(removed, "Expired cache entries removed"),
                        Ok(Err(e)) => tracing::warn!(error = %e, "Cache sweep failed"),
                        Err(e) => tracing::warn!(error = %e, "Cache sweep task failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Force buffered writes to disk.
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

impl CacheStore for EmbeddedStore {
    async fn get(&self, request: &CacheRequest) -> Result<Option<Response<Bytes>>, CacheError> {
        let key = request.key(&self.prefix);
        let db = self.db.clone();
        let lookup = key.clone();
        let value = match tokio::task::spawn_blocking(move || db.get(lookup.as_bytes())).await?? {
            Some(value) => value,
            None => return Ok(None),
        };

        let Some(raw) = live_envelope(&value, now_millis()) else {
            tracing::trace!(key = %key, "Cache entry expired or unreadable");
            return Ok(None);
        };

        match envelope::decode(Bytes::copy_from_slice(raw), &request.method) {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Unable to read cached response");
                Ok(None)
            }
        }
    }

    async fn set(&self, request: &CacheRequest, response: &Response<Bytes>) -> Result<(), CacheError> {
        let key = request.key(&self.prefix);
        let encoded = envelope::encode(response);
        let expiry = now_millis().saturating_add(duration_millis(self.ttl));

        let mut value = Vec::with_capacity(EXPIRY_LEN + encoded.len());
        value.extend_from_slice(&expiry.to_be_bytes());
        value.extend_from_slice(&encoded);

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.insert(key.as_bytes(), value)).await??;
        Ok(())
    }
}

/// The envelope part of `value`, or `None` if it is expired or too short.
fn live_envelope(value: &[u8], now: u64) -> Option<&[u8]> {
    let expiry = read_expiry(value)?;
    if now >= expiry {
        return None;
    }
    Some(&value[EXPIRY_LEN..])
}

fn is_expired(value: &[u8], now: u64) -> bool {
    read_expiry(value).map_or(false, |expiry| now >= expiry)
}

fn read_expiry(value: &[u8]) -> Option<u64> {
    let stamp: [u8; EXPIRY_LEN] = value.get(..EXPIRY_LEN)?.try_into().ok()?;
    Some(u64::from_be_bytes(stamp))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or_default()
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
