//! # Fleet Poller
//!
//! Viewer-side loop: re-reads the whole fleet on a fixed timer and keeps the
//! latest successful result as a [`Snapshot`].
//!
//! Fetches are not de-duplicated. When a fetch outlives the interval the next
//! one starts anyway, and whichever response resolves last is kept, even if
//! it was requested first. A failed fetch leaves the previous snapshot in
//! place.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{Bus, fleet};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::Backend;
use crate::error::Result;
use crate::markers::{self, Marker, ViewContext};

const MIN_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub buses: Vec<Bus>,
    /// When the snapshot was fetched. `None` until the first success.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    #[must_use]
    pub fn bus(&self, bus_id: &str) -> Option<&Bus> {
        self.buses.iter().find(|bus| bus.id == bus_id)
    }
}

pub struct Poller<P> {
    provider: Arc<P>,
    snapshot: watch::Sender<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl<P: Backend> Poller<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Self { provider, snapshot, task: None }
    }

    /// Fetch immediately, then every `interval` until stopped.
    ///
    /// Restarting replaces the running timer.
    pub fn start(&mut self, interval: Duration) {
        self.stop();
        info!(interval_ms = interval.as_millis(), "fleet polling started");

        let task = poll(Arc::clone(&self.provider), self.snapshot.clone(), interval);
        self.task = Some(tokio::spawn(task));
    }

    /// Cancel the timer along with any fetch still in flight.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("fleet polling stopped");
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Run a single fetch cycle now.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The previous snapshot is kept either way.
    pub async fn refresh(&self) -> Result<()> {
        refresh(self.provider.as_ref(), &self.snapshot).await
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshot replacements as they happen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    /// Markers for the current snapshot, narrowed to `focus` when given.
    #[must_use]
    pub fn markers(&self, focus: Option<&str>, context: ViewContext) -> Vec<Marker> {
        let snapshot = self.snapshot.borrow();
        match focus {
            Some(bus_id) => snapshot
                .bus(bus_id)
                .map(|bus| markers::project(&snapshot.buses, Some(bus), context))
                .unwrap_or_default(),
            None => markers::project(&snapshot.buses, None, context),
        }
    }
}

impl<P> Drop for Poller<P> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll<P: Backend>(provider: Arc<P>, snapshot: watch::Sender<Snapshot>, period: Duration) {
    // first tick completes immediately
    let mut ticker = time::interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // dropped with this task, aborting anything still in flight
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let provider = Arc::clone(&provider);
                let snapshot = snapshot.clone();
                in_flight.spawn(async move {
                    // failures are logged by `refresh`; the timer retries
                    let _ = refresh(provider.as_ref(), &snapshot).await;
                });
            }
            Some(_) = in_flight.join_next() => {}
        }
    }
}

async fn refresh<P: Backend>(provider: &P, snapshot: &watch::Sender<Snapshot>) -> Result<()> {
    match fleet::buses(provider).await {
        Ok(buses) => {
            debug!(monotonic_counter.fleet_polls = 1, buses = buses.len());
            snapshot.send_replace(Snapshot { buses, fetched_at: Some(Utc::now()) });
            Ok(())
        }
        Err(e) => {
            warn!(
                monotonic_counter.fleet_poll_failures = 1,
                error = %e,
                "failed to fetch buses; keeping previous snapshot"
            );
            Err(e.into())
        }
    }
}
