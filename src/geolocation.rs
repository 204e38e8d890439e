//! # Geolocation feed
//!
//! Channel-backed [`Geolocation`] for hosts that receive positions from an
//! external source such as a GPS daemon or a replay file. The host pushes
//! readings into the feed and every open subscription receives them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{StreamExt, stream};
use realtime::{Fix, FixStream, GeoError, Geolocation, WatchOptions};
use tokio::time;
use tracing::debug;

type Sender = UnboundedSender<Result<Fix, GeoError>>;

/// Shared handle to a position source. Clones feed the same subscribers.
#[derive(Clone, Default)]
pub struct GeoFeed {
    inner: Arc<Mutex<FeedState>>,
}

#[derive(Default)]
struct FeedState {
    attached: bool,
    last: Option<Fix>,
    subscribers: Vec<Sender>,
}

impl GeoFeed {
    /// A feed with no source attached. Subscribing fails until
    /// [`GeoFeed::attach`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed with a source already attached.
    #[must_use]
    pub fn attached() -> Self {
        let feed = Self::new();
        feed.attach();
        feed
    }

    pub fn attach(&self) {
        self.state().attached = true;
    }

    /// Detach the source, ending every open subscription.
    pub fn detach(&self) {
        let mut state = self.state();
        state.attached = false;
        for subscriber in state.subscribers.drain(..) {
            subscriber.close_channel();
        }
    }

    /// Deliver a reading to every open subscription.
    ///
    /// Returns the number of subscriptions reached.
    pub fn push(&self, fix: Fix) -> usize {
        let mut state = self.state();
        state.last = Some(fix);
        broadcast(&mut state.subscribers, &Ok(fix))
    }

    /// Report an acquisition failure to every open subscription.
    pub fn fail(&self, error: &GeoError) -> usize {
        broadcast(&mut self.state().subscribers, &Err(error.clone()))
    }

    /// Open subscriptions.
    #[must_use]
    pub fn subscribers(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|subscriber| !subscriber.is_closed());
        state.subscribers.len()
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Geolocation for GeoFeed {
    async fn watch(&self, options: WatchOptions) -> Result<FixStream> {
        let (sender, receiver) = mpsc::unbounded();

        {
            let mut state = self.state();
            if !state.attached {
                bail!("geolocation is not supported");
            }
            // a recent enough reading is replayed straight away
            if let Some(fix) = state.last.filter(|fix| is_fresh(fix, options.maximum_age)) {
                let _ = sender.unbounded_send(Ok(fix));
            }
            state.subscribers.push(sender);
        }

        debug!(
            high_accuracy = options.high_accuracy,
            timeout_ms = options.timeout.as_millis(),
            "geolocation subscription opened"
        );
        Ok(with_timeout(receiver, options.timeout))
    }
}

fn broadcast(subscribers: &mut Vec<Sender>, item: &Result<Fix, GeoError>) -> usize {
    subscribers.retain(|subscriber| subscriber.unbounded_send(item.clone()).is_ok());
    subscribers.len()
}

fn is_fresh(fix: &Fix, maximum_age: Duration) -> bool {
    if maximum_age.is_zero() {
        return false;
    }
    Utc::now().signed_duration_since(fix.timestamp).to_std().is_ok_and(|age| age <= maximum_age)
}

// Each wait for a reading is bounded by `timeout`; expiry is reported and the
// subscription keeps waiting.
fn with_timeout(
    receiver: UnboundedReceiver<Result<Fix, GeoError>>, timeout: Duration,
) -> FixStream {
    if timeout.is_zero() {
        return receiver.boxed();
    }

    stream::unfold(receiver, move |mut receiver| async move {
        match time::timeout(timeout, receiver.next()).await {
            Ok(Some(item)) => Some((item, receiver)),
            Ok(None) => None,
            Err(_) => Some((Err(GeoError::Timeout), receiver)),
        }
    })
    .boxed()
}
