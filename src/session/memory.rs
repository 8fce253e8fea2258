//! In-process session store.
//!
//! Every operation runs inside one critical section, which gives
//! `consume_token` the same all-or-nothing behavior as the conditional delete
//! used by the Postgres backend. Backs the test suite.

use crate::session::{
    CredentialId, ScoreRecord, SessionToken,
    store::{ConsumedToken, SessionStore, StoreFuture, StoreSession},
};
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Failure modes that hit a single store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `insert_token` succeeds but reports zero inserted rows.
    TokenInsertNoRows,
    /// `insert_score` succeeds but reports zero inserted rows.
    ScoreInsertNoRows,
    /// `insert_score` returns an error.
    ScoreInsertFails,
}

#[derive(Debug, Default)]
struct MemoryState {
    credentials: HashMap<String, CredentialId>,
    tokens: HashMap<String, SessionToken>,
    scores: Vec<ScoreRecord>,
    faults: HashSet<Fault>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    open_sessions: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    // Simulated latency and outages, applied before touching state.
    async fn before_call(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::Relaxed) {
            bail!("memory store is unavailable");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    shared: Arc<Shared>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a credential; stands in for out-of-band administration.
    ///
    /// # Errors
    /// Returns an error if the key or the id is already registered.
    pub fn register_credential(&self, key: &str, id: CredentialId) -> Result<()> {
        let mut state = self.shared.lock()?;
        if state.credentials.contains_key(key) {
            bail!("credential key already registered");
        }
        if state.credentials.values().any(|existing| *existing == id) {
            bail!("credential id {id} already registered");
        }
        state.credentials.insert(key.to_string(), id);
        Ok(())
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Make one operation misbehave until [`Self::clear_faults`].
    ///
    /// # Errors
    /// Returns an error if the state lock is poisoned.
    pub fn inject(&self, fault: Fault) -> Result<()> {
        self.shared.lock()?.faults.insert(fault);
        Ok(())
    }

    /// # Errors
    /// Returns an error if the state lock is poisoned.
    pub fn clear_faults(&self) -> Result<()> {
        self.shared.lock()?.faults.clear();
        Ok(())
    }

    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.shared.latency_ms.store(millis, Ordering::Relaxed);
    }

    /// Number of store sessions currently held by request flows.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.shared.open_sessions.load(Ordering::SeqCst)
    }

    /// # Errors
    /// Returns an error if the state lock is poisoned.
    pub fn tokens(&self) -> Result<Vec<SessionToken>> {
        Ok(self.shared.lock()?.tokens.values().cloned().collect())
    }

    /// # Errors
    /// Returns an error if the state lock is poisoned.
    pub fn scores(&self) -> Result<Vec<ScoreRecord>> {
        Ok(self.shared.lock()?.scores.clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn open(&self) -> StoreFuture<'_, Box<dyn StoreSession>> {
        Box::pin(async move {
            self.shared.before_call().await?;
            self.shared.open_sessions.fetch_add(1, Ordering::SeqCst);
            let session: Box<dyn StoreSession> = Box::new(MemorySession {
                shared: Arc::clone(&self.shared),
            });
            Ok(session)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.shared.before_call().await })
    }

    fn reap_expired(&self, now: DateTime<Utc>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            self.shared.before_call().await?;
            let mut state = self.shared.lock()?;
            let before = state.tokens.len();
            state
                .tokens
                .retain(|_, token| token.expires_at.is_none_or(|expires_at| expires_at > now));
            Ok(u64::try_from(before - state.tokens.len())?)
        })
    }
}

struct MemorySession {
    shared: Arc<Shared>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.shared.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StoreSession for MemorySession {
    fn find_credential<'a>(&'a mut self, key: &'a str) -> StoreFuture<'a, Option<CredentialId>> {
        Box::pin(async move {
            self.shared.before_call().await?;
            let state = self.shared.lock()?;
            Ok(state.credentials.get(key).copied())
        })
    }

    fn insert_token<'a>(&'a mut self, token: &'a SessionToken) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            self.shared.before_call().await?;
            let mut state = self.shared.lock()?;
            if state.tokens.contains_key(&token.value) {
                bail!("duplicate session token");
            }
            if state.faults.contains(&Fault::TokenInsertNoRows) {
                return Ok(0);
            }
            state.tokens.insert(token.value.clone(), token.clone());
            Ok(1)
        })
    }

    fn consume_token<'a>(
        &'a mut self,
        token: &'a str,
        credential_id: CredentialId,
    ) -> StoreFuture<'a, Option<ConsumedToken>> {
        Box::pin(async move {
            self.shared.before_call().await?;
            let mut state = self.shared.lock()?;
            let owned = state
                .tokens
                .get(token)
                .is_some_and(|stored| stored.credential_id == credential_id);
            if !owned {
                return Ok(None);
            }
            Ok(state.tokens.remove(token).map(|stored| ConsumedToken {
                credential_id: stored.credential_id,
                issued_at: stored.issued_at,
                expires_at: stored.expires_at,
            }))
        })
    }

    fn insert_score<'a>(&'a mut self, record: &'a ScoreRecord) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            self.shared.before_call().await?;
            let mut state = self.shared.lock()?;
            if state.faults.contains(&Fault::ScoreInsertFails) {
                bail!("score insert rejected");
            }
            if state.faults.contains(&Fault::ScoreInsertNoRows) {
                return Ok(0);
            }
            state.scores.push(record.clone());
            Ok(1)
        })
    }
}
