//! # Location Publisher
//!
//! Driver-side loop: owns one geolocation subscription and forwards every fix
//! to the backend while a bus is bound.
//!
//! Delivery is at-most-once. Fixes are queued to a single sender task that
//! writes them one at a time, in the order they were read; a failed write is
//! logged and never retried because the next fix supersedes it.

use std::fmt;
use std::sync::Arc;

use common::LocationUpdate;
use common::fleet;
use futures::StreamExt;
use realtime::{Fix, FixStream, WatchOptions};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::{Backend, Provider};

/// Tracking status shown on the driver console.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Requesting,
    Broadcasting,
    GpsOnly,
    Error(String),
    Stopped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Requesting => f.write_str("Requesting Location Access..."),
            Self::Broadcasting => f.write_str("Broadcasting Location to Users"),
            Self::GpsOnly => f.write_str("GPS Active (Not Broadcasting - Select Bus to Share)"),
            Self::Error(reason) => write!(f, "Error: {reason}"),
            Self::Stopped => f.write_str("Stopped"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublisherState {
    pub status: Status,
    /// Most recent fix. Kept after stopping so the last position stays visible.
    pub fix: Option<Fix>,
    pub binding: Option<String>,
    pub tracking: bool,
}

pub struct Publisher<P> {
    provider: Arc<P>,
    options: WatchOptions,
    state: watch::Sender<PublisherState>,
    task: Option<JoinHandle<()>>,
    sender: Option<JoinHandle<()>>,
}

impl<P: Provider> Publisher<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, options: WatchOptions) -> Self {
        let (state, _) = watch::channel(PublisherState::default());
        Self { provider, options, state, task: None, sender: None }
    }

    /// Bind the publisher to a bus. An empty id clears the binding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackingActive`] while tracking; stop first.
    pub fn bind(&mut self, bus_id: &str) -> Result<()> {
        if self.is_tracking() {
            return Err(Error::TrackingActive);
        }

        let bus_id = bus_id.trim();
        let binding = (!bus_id.is_empty()).then(|| bus_id.to_string());
        debug!(binding = ?binding, "binding publisher");
        self.state.send_modify(|state| state.binding = binding);
        Ok(())
    }

    /// Clear the binding, returning to GPS-only tracking on the next start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackingActive`] while tracking; stop first.
    pub fn unbind(&mut self) -> Result<()> {
        self.bind("")
    }

    /// Open the geolocation subscription and begin publishing.
    ///
    /// Does nothing when already tracking, so there is never more than one
    /// live subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeolocationUnavailable`] when the subsystem cannot be
    /// opened. The status is left as [`Status::Error`]; there is no retry.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_tracking() {
            debug!("publisher already tracking");
            return Ok(());
        }

        self.state.send_modify(|state| state.status = Status::Requesting);

        let fixes = match self.provider.watch(self.options).await {
            Ok(fixes) => fixes,
            Err(e) => {
                warn!(error = %e, "geolocation unavailable");
                self.state.send_modify(|state| {
                    state.status = Status::Error("Unable to access location".to_string());
                });
                return Err(Error::GeolocationUnavailable(format!("{e:#}")));
            }
        };

        let binding = self.state.borrow().binding.clone();
        info!(binding = ?binding, "tracking started");

        self.state.send_modify(|state| state.tracking = true);
        let outbox = binding.map(|bus_id| {
            let (updates, queue) = mpsc::unbounded_channel();
            self.sender = Some(tokio::spawn(send_updates(queue, Arc::clone(&self.provider))));
            Outbox { bus_id, updates }
        });
        self.task = Some(tokio::spawn(track(fixes, outbox, self.state.clone())));
        Ok(())
    }

    /// Cancel the subscription. A no-op when not tracking.
    ///
    /// Returns once the subscription has been released. Queued writes that
    /// have not gone out yet are discarded.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let sender = self.sender.take();
        if let Some(sender) = &sender {
            sender.abort();
        }
        task.abort();

        for handle in [Some(task), sender].into_iter().flatten() {
            if let Err(e) = handle.await
                && e.is_panic()
            {
                warn!(error = %e, "tracking task panicked");
            }
        }

        self.state.send_modify(|state| {
            state.tracking = false;
            state.status = Status::Stopped;
        });
        info!("tracking stopped");
    }

    #[must_use]
    pub fn state(&self) -> PublisherState {
        self.state.borrow().clone()
    }

    /// Watch state changes as they happen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PublisherState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.state.borrow().status.clone()
    }

    #[must_use]
    pub fn fix(&self) -> Option<Fix> {
        self.state.borrow().fix
    }

    #[must_use]
    pub fn binding(&self) -> Option<String> {
        self.state.borrow().binding.clone()
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.state.borrow().tracking
    }
}

impl<P> Drop for Publisher<P> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            sender.abort();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// Queue of writes for the bound bus. Absent when tracking GPS-only.
struct Outbox {
    bus_id: String,
    updates: mpsc::UnboundedSender<LocationUpdate>,
}

async fn track(
    mut fixes: FixStream, outbox: Option<Outbox>, state: watch::Sender<PublisherState>,
) {
    while let Some(next) = fixes.next().await {
        match next {
            Ok(fix) => {
                state.send_modify(|state| {
                    state.fix = Some(fix);
                    state.status =
                        if outbox.is_some() { Status::Broadcasting } else { Status::GpsOnly };
                });
                if let Some(outbox) = &outbox {
                    let update = LocationUpdate {
                        bus_id: outbox.bus_id.clone(),
                        latitude: fix.latitude,
                        longitude: fix.longitude,
                    };
                    if outbox.updates.send(update).is_err() {
                        debug!("location sender gone");
                    }
                }
            }
            // the subscription stays open; a later fix may recover
            Err(e) => {
                warn!(monotonic_counter.geolocation_errors = 1, error = %e, "acquiring position");
                state.send_modify(|state| state.status = Status::Error(e.to_string()));
            }
        }
    }

    info!("geolocation subscription ended");
    state.send_modify(|state| {
        state.tracking = false;
        state.status = Status::Stopped;
    });
}

// Writes queued updates one at a time. Ends once the tracking task drops its
// end of the queue and the backlog is drained.
async fn send_updates<P: Backend>(
    mut queue: mpsc::UnboundedReceiver<LocationUpdate>, provider: Arc<P>,
) {
    while let Some(update) = queue.recv().await {
        match fleet::update_location(&update, provider.as_ref()).await {
            Ok(()) => debug!(monotonic_counter.locations_sent = 1, bus_id = %update.bus_id),
            Err(e) => warn!(
                monotonic_counter.location_submit_failures = 1,
                bus_id = %update.bus_id,
                error = %e,
                "failed to update location"
            ),
        }
    }
}
