//! DX cluster aggregator
//!
//! Accumulates successive cluster snapshots into one retained set:
//! upsert by `(dx, freq, spotter)`, evict anything not seen within the
//! retention window, keep the newest `capacity` spots.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use spotdeck_common::{
    CallsignGeography, ClusterView, ConnectionStatus, FilterConfig, Spot, SpotKey, apply_filter,
};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::parser::ClusterSpot;
use super::source::ClusterSource;
use crate::error::PipelineError;
use crate::utils::{Clock, system_clock};

/// Counters from one merge, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
    pub evicted: usize,
    pub truncated: usize,
}

/// Retained spots, newest `last_seen` first
#[derive(Debug, Clone)]
pub struct SpotStore {
    spots: Vec<Spot>,
    retention: chrono::Duration,
    capacity: usize,
}

impl SpotStore {
    pub fn new(retention_minutes: u64, capacity: usize) -> Self {
        Self {
            spots: Vec::new(),
            retention: minutes(retention_minutes),
            capacity,
        }
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn retention_minutes(&self) -> i64 {
        self.retention.num_minutes()
    }

    /// Upsert a snapshot, then evict and cap.
    pub fn merge(&mut self, incoming: Vec<ClusterSpot>, now: DateTime<Utc>) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut index: HashMap<SpotKey, usize> = self
            .spots
            .iter()
            .enumerate()
            .map(|(i, spot)| (spot.key(), i))
            .collect();

        for raw in incoming {
            let spot = Spot {
                dx_call: raw.dx_call,
                spotter_call: raw.spotter_call,
                freq_khz: raw.freq_khz,
                comment: raw.comment,
                timestamp: raw.timestamp,
                last_seen: now,
            };
            match index.get(&spot.key()) {
                Some(&i) => {
                    self.spots[i] = spot;
                    stats.updated += 1;
                }
                None => {
                    index.insert(spot.key(), self.spots.len());
                    self.spots.push(spot);
                    stats.inserted += 1;
                }
            }
        }

        stats.evicted = self.evict_expired(now);
        self.spots.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        if self.spots.len() > self.capacity {
            stats.truncated = self.spots.len() - self.capacity;
            self.spots.truncate(self.capacity);
        }
        stats
    }

    /// Drop every spot with `now - last_seen >= retention`. Returns how many went.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.spots.len();
        let retention = self.retention;
        self.spots.retain(|s| now - s.last_seen < retention);
        before - self.spots.len()
    }

    /// Spots still inside the window at `now`, without mutating the store.
    pub fn live(&self, now: DateTime<Utc>) -> Vec<Spot> {
        self.spots
            .iter()
            .filter(|s| now - s.last_seen < self.retention)
            .cloned()
            .collect()
    }

    /// Change the window and evict against it straight away.
    pub fn set_retention(&mut self, retention_minutes: u64, now: DateTime<Utc>) -> usize {
        self.retention = minutes(retention_minutes);
        self.evict_expired(now)
    }
}

/// Windows too large for `TimeDelta` saturate to the maximum.
fn minutes(m: u64) -> chrono::TimeDelta {
    i64::try_from(m)
        .ok()
        .and_then(chrono::TimeDelta::try_minutes)
        .unwrap_or(chrono::TimeDelta::MAX)
}

/// What a single poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Merged(MergeStats),
    Failed(String),
    /// Another poll was in flight or the aggregator is closed
    Skipped,
}

struct ClusterState {
    store: SpotStore,
    filter: FilterConfig,
    loading: bool,
    error: Option<String>,
    status: ConnectionStatus,
    last_update: Option<DateTime<Utc>>,
}

/// Polling aggregator. Share it behind an `Arc`; every method takes `&self`.
pub struct ClusterAggregator {
    source: Arc<dyn ClusterSource>,
    geography: Arc<dyn CallsignGeography>,
    state: RwLock<ClusterState>,
    /// Held for the whole fetch-merge-evict cycle
    poll_guard: Mutex<()>,
    fetch_timeout: Duration,
    closed: AtomicBool,
    clock: Clock,
}

impl ClusterAggregator {
    pub fn new(
        source: Arc<dyn ClusterSource>,
        geography: Arc<dyn CallsignGeography>,
        retention_minutes: u64,
        capacity: usize,
        filter: FilterConfig,
    ) -> Self {
        Self {
            source,
            geography,
            state: RwLock::new(ClusterState {
                store: SpotStore::new(retention_minutes, capacity),
                filter,
                loading: true,
                error: None,
                status: ConnectionStatus::Connecting,
                last_update: None,
            }),
            poll_guard: Mutex::new(()),
            fetch_timeout: Duration::from_secs(30),
            closed: AtomicBool::new(false),
            clock: system_clock,
        }
    }

    /// Upper bound on one fetch, on top of whatever the source enforces.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one fetch-merge-evict cycle. Never overlaps with another one.
    pub async fn poll(&self) -> PollOutcome {
        let Ok(_guard) = self.poll_guard.try_lock() else {
            tracing::debug!("DX cluster poll already in flight, skipping");
            return PollOutcome::Skipped;
        };
        if self.is_closed() {
            return PollOutcome::Skipped;
        }

        let fetched = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Transport(format!(
                "cluster fetch timed out after {}s",
                self.fetch_timeout.as_secs()
            ))),
        };

        let mut state = self.state.write().await;
        if self.is_closed() {
            return PollOutcome::Skipped;
        }
        state.loading = false;

        match fetched {
            Ok(spots) => {
                let received = spots.len();
                let now = (self.clock)();
                let stats = state.store.merge(spots, now);
                state.error = None;
                state.status = ConnectionStatus::Connected;
                state.last_update = Some(now);
                tracing::info!(
                    "DX cluster poll: {} received, {} new, {} updated, {} expired, {} over cap, {} held",
                    received,
                    stats.inserted,
                    stats.updated,
                    stats.evicted,
                    stats.truncated,
                    state.store.len()
                );
                PollOutcome::Merged(stats)
            }
            Err(e) => {
                tracing::warn!("DX cluster poll failed, keeping {} spots: {}", state.store.len(), e);
                state.error = Some(e.to_string());
                state.status = ConnectionStatus::Offline;
                PollOutcome::Failed(e.to_string())
            }
        }
    }

    /// Manual refresh: poll now instead of waiting for the next tick.
    pub async fn refresh(&self) -> PollOutcome {
        self.poll().await
    }

    /// A shorter window can make held spots stale at once, so evict now.
    pub async fn set_retention(&self, retention_minutes: u64) {
        let now = (self.clock)();
        let mut state = self.state.write().await;
        let evicted = state.store.set_retention(retention_minutes, now);
        tracing::info!(
            "DX cluster retention set to {} min ({} spots evicted)",
            retention_minutes,
            evicted
        );
    }

    pub async fn set_filter(&self, filter: FilterConfig) {
        self.state.write().await.filter = filter;
    }

    /// Owned, filtered copy of the current state. Spots that aged out while
    /// polls were failing are left out even though the store still holds them.
    pub async fn snapshot(&self) -> ClusterView {
        let now = (self.clock)();
        let state = self.state.read().await;
        let live = state.store.live(now);
        let spots = apply_filter(&live, &state.filter, self.geography.as_ref());
        ClusterView {
            total: live.len(),
            shown: spots.len(),
            spots,
            loading: state.loading,
            error: state.error.clone(),
            status: state.status,
            active_source: Some(self.source.name().to_string()),
            last_update: state.last_update,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting polls; held data stays readable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Poll every `interval`, starting right away when `poll_now` is set.
    /// Ticks missed while a poll runs long are skipped rather than bunched up.
    pub fn spawn_polling(self: Arc<Self>, interval: Duration, poll_now: bool) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = if poll_now {
                tokio::time::Instant::now()
            } else {
                tokio::time::Instant::now() + interval
            };
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if self.is_closed() {
                    break;
                }
                self.poll().await;
            }
            tracing::debug!("DX cluster polling stopped");
        })
    }

    #[cfg(test)]
    pub(crate) async fn merge_at(&self, spots: Vec<ClusterSpot>, now: DateTime<Utc>) -> MergeStats {
        self.state.write().await.store.merge(spots, now)
    }
}
