//! Dispatch Service: async host for the dispatch center
//!
//! Serializes all access to one [`DispatchCenter`] behind a mutex, drives
//! the encounter cycle on a fixed interval, and runs cancelable grace timers
//! for responders whose sessions drop.

use crate::dispatch_center::DispatchCenter;
use dispatch_types::{DispatchConfig, ResponderId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Shared handle to the dispatch center
pub type SharedCenter = Arc<Mutex<DispatchCenter>>;

/// Async host for a [`DispatchCenter`]
pub struct DispatchService {
    center: SharedCenter,
    encounter_interval: Duration,
    departure_grace: Duration,
    departures: Arc<Mutex<HashMap<ResponderId, JoinHandle<()>>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl DispatchService {
    pub fn new(center: DispatchCenter, config: &DispatchConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            center: Arc::new(Mutex::new(center)),
            // A zero period would make the ticker panic
            encounter_interval: Duration::from_millis(config.encounter_interval_millis.max(1)),
            departure_grace: Duration::from_millis(config.departure_grace_millis),
            departures: Arc::new(Mutex::new(HashMap::new())),
            shutdown_tx,
        }
    }

    pub fn center(&self) -> SharedCenter {
        Arc::clone(&self.center)
    }

    /// Start the encounter cycle. It runs until [`shutdown`](Self::shutdown).
    pub fn spawn_encounter_loop(&self) -> JoinHandle<()> {
        let center = Arc::clone(&self.center);
        let period = self.encounter_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_ms = period.as_millis() as u64, "Encounter loop started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = center.lock().await.tick();
                        debug!(outcome = ?outcome, "Encounter cycle");
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Encounter loop stopped");
        })
    }

    /// Stop the encounter loop and cancel every pending departure
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let mut departures = self.departures.lock().await;
        for (_, handle) in departures.drain() {
            handle.abort();
        }
    }

    /// A responder's session dropped. Unless they reconnect within the grace
    /// period they are taken off duty.
    pub async fn responder_disconnected(&self, responder: ResponderId) {
        let center = Arc::clone(&self.center);
        let departures = Arc::clone(&self.departures);
        let grace = self.departure_grace;
        let departing = responder.clone();

        let mut pending = self.departures.lock().await;
        if let Some(previous) = pending.remove(&responder) {
            previous.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            // Claim the entry under the center lock; a reconnect that got
            // there first has already removed it
            let mut center = center.lock().await;
            if departures.lock().await.remove(&departing).is_none() {
                return;
            }

            match center.go_off_duty(&departing) {
                Ok(()) => info!(responder = %departing, "Responder left duty after disconnect"),
                Err(e) => debug!(responder = %departing, error = %e, "No unit to leave"),
            }
        });

        debug!(
            responder = %responder,
            grace_ms = grace.as_millis() as u64,
            "Departure scheduled"
        );
        pending.insert(responder, handle);
    }

    /// A responder's session started. Cancels any pending departure and
    /// records the session; returns true if a departure was cancelled.
    pub async fn responder_connected(&self, responder: ResponderId) -> bool {
        let cancelled = match self.departures.lock().await.remove(&responder) {
            Some(handle) => {
                handle.abort();
                debug!(responder = %responder, "Departure cancelled");
                true
            }
            None => false,
        };

        self.center.lock().await.session_started(responder);
        cancelled
    }

    /// Responders with a departure timer running
    pub async fn pending_departures(&self) -> usize {
        self.departures.lock().await.len()
    }
}
