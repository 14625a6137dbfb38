//! Fixed-size pool of pre-initialized synthesis clients
//!
//! Entries are built once at startup and never resized. Two selection
//! policies are supported:
//! - `Shared`: uniform-random choice with no exclusivity. Two in-flight jobs
//!   may hold the same entry at once, so entries must tolerate concurrent use.
//! - `Exclusive`: a semaphore-guarded free list. An entry is leased to one
//!   job at a time and returned when the lease is dropped.

use rand::Rng;
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPolicy {
    Shared,
    Exclusive,
}

impl PoolPolicy {
    pub fn parse(policy: &str) -> Option<Self> {
        match policy {
            "shared" | "random" => Some(PoolPolicy::Shared),
            "exclusive" => Some(PoolPolicy::Exclusive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PoolPolicy::Shared => "shared",
            PoolPolicy::Exclusive => "exclusive",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("client pool size must be at least 1")]
    Empty,

    #[error("failed to construct pool entry {index}: {reason}")]
    Construct { index: usize, reason: String },
}

pub struct ClientPool<T: ?Sized> {
    policy: PoolPolicy,
    entries: Vec<Arc<T>>,
    permits: Arc<Semaphore>,
    free: Arc<Mutex<VecDeque<usize>>>,
}

impl<T: ?Sized> fmt::Debug for ClientPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool")
            .field("policy", &self.policy)
            .field("size", &self.entries.len())
            .finish()
    }
}

impl<T: ?Sized + Send + Sync> ClientPool<T> {
    /// Builds all `size` entries up front. The first constructor failure
    /// aborts the whole pool; there is no partially-initialized pool.
    pub fn initialize<F, E>(size: usize, policy: PoolPolicy, mut factory: F) -> Result<Self, PoolError>
    where
        F: FnMut(usize) -> Result<Arc<T>, E>,
        E: fmt::Display,
    {
        if size == 0 {
            return Err(PoolError::Empty);
        }
        let mut entries = Vec::with_capacity(size);
        for index in 0..size {
            let entry = factory(index).map_err(|e| PoolError::Construct {
                index,
                reason: e.to_string(),
            })?;
            entries.push(entry);
        }
        log::info!(
            "Initialized synthesis client pool: size={}, policy={}",
            size,
            policy.as_str()
        );
        Ok(Self {
            policy,
            entries,
            permits: Arc::new(Semaphore::new(size)),
            free: Arc::new(Mutex::new((0..size).collect())),
        })
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn policy(&self) -> PoolPolicy {
        self.policy
    }

    pub async fn acquire(&self) -> PooledClient<T> {
        match self.policy {
            PoolPolicy::Shared => self.acquire_random(),
            PoolPolicy::Exclusive => self.acquire_exclusive().await,
        }
    }

    fn acquire_random(&self) -> PooledClient<T> {
        let index = rand::rng().random_range(0..self.entries.len());
        PooledClient {
            index,
            client: self.entries[index].clone(),
            lease: None,
        }
    }

    async fn acquire_exclusive(&self) -> PooledClient<T> {
        // the semaphore is never closed, so acquire only fails after close()
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return self.acquire_random(),
        };
        let index = self
            .free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match index {
            Some(index) => PooledClient {
                index,
                client: self.entries[index].clone(),
                lease: Some(Lease {
                    free: self.free.clone(),
                    _permit: permit,
                }),
            },
            None => {
                log::error!("Client pool free list empty while holding a permit");
                drop(permit);
                self.acquire_random()
            }
        }
    }

    /// Number of entries currently leased out. Always 0 under `Shared`.
    pub fn leased(&self) -> usize {
        match self.policy {
            PoolPolicy::Shared => 0,
            PoolPolicy::Exclusive => self.entries.len() - self.permits.available_permits(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "size": self.size(),
            "policy": self.policy.as_str(),
            "leased": self.leased(),
        })
    }
}

struct Lease {
    free: Arc<Mutex<VecDeque<usize>>>,
    _permit: OwnedSemaphorePermit,
}

/// A client handed out by [`ClientPool::acquire`]. Dropping it releases the
/// entry; under `Shared` that is a no-op.
pub struct PooledClient<T: ?Sized> {
    index: usize,
    client: Arc<T>,
    lease: Option<Lease>,
}

impl<T: ?Sized> PooledClient<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_exclusive(&self) -> bool {
        self.lease.is_some()
    }
}

impl<T: ?Sized> Deref for PooledClient<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.client
    }
}

impl<T: ?Sized> Drop for PooledClient<T> {
    fn drop(&mut self) {
        // return the index before the permit is released with the lease
        if let Some(lease) = &self.lease {
            lease
                .free
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push_back(self.index);
        }
    }
}
