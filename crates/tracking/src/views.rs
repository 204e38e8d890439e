//! # Views
//!
//! Dashboard state for the three roles. [`FleetView`] backs the admin and
//! rider maps; [`DriverConsole`] backs the driver's tracking screen.

use std::sync::Arc;
use std::time::Duration;

use common::{Bus, Coordinate, NewBus, User, auth, fleet};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use crate::markers::{Marker, ViewContext};
use crate::poller::{Poller, Snapshot};
use crate::publisher::{Publisher, PublisherState, Status};
use crate::viewport::Viewport;
use crate::{Backend, Provider};

/// Live fleet map for admins and riders.
pub struct FleetView<P> {
    provider: Arc<P>,
    context: ViewContext,
    poller: Poller<P>,
    updates: watch::Receiver<Snapshot>,
    viewport: Viewport,
    focus: Option<String>,
    auto_center: bool,
    poll_interval: Duration,
}

impl<P: Backend> FleetView<P> {
    /// Admin map: selecting a bus narrows the map to it.
    #[must_use]
    pub fn admin(provider: Arc<P>, config: &TrackingConfig) -> Self {
        Self::new(ViewContext::Admin, provider, config)
    }

    /// Rider map: centres itself on the first located bus it sees.
    #[must_use]
    pub fn rider(provider: Arc<P>, config: &TrackingConfig) -> Self {
        Self::new(ViewContext::Rider, provider, config)
    }

    fn new(context: ViewContext, provider: Arc<P>, config: &TrackingConfig) -> Self {
        let poller = Poller::new(Arc::clone(&provider));
        let updates = poller.subscribe();

        Self {
            provider,
            context,
            poller,
            updates,
            viewport: Viewport::new(config.map),
            focus: None,
            auto_center: context == ViewContext::Rider,
            poll_interval: config.poll_interval,
        }
    }

    pub fn start(&mut self) {
        self.poller.start(self.poll_interval);
    }

    pub fn stop(&mut self) {
        self.poller.stop();
    }

    /// Fetch now and apply the result.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the map keeps showing the previous snapshot.
    pub async fn refresh(&mut self) -> Result<()> {
        let result = self.poller.refresh().await;
        self.sync();
        result
    }

    /// Wait for the poller to publish a new snapshot, then apply it.
    ///
    /// Returns `false` if the poller has gone away.
    pub async fn updated(&mut self) -> bool {
        if self.updates.changed().await.is_err() {
            return false;
        }
        self.sync();
        true
    }

    /// Apply the latest snapshot to the viewport.
    pub fn sync(&mut self) {
        let target = {
            let snapshot = self.updates.borrow_and_update();
            match &self.focus {
                Some(bus_id) => snapshot.bus(bus_id).and_then(Bus::coordinate),
                None if self.auto_center => snapshot.buses.iter().find_map(Bus::coordinate),
                None => None,
            }
        };

        let Some(target) = target else {
            return;
        };
        if self.focus.is_none() {
            self.auto_center = false;
        }
        self.viewport.follow(target);
    }

    /// Narrow the map to one bus and centre on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown bus and [`Error::NoPosition`]
    /// for a bus that is not sharing its location.
    pub fn select(&mut self, bus_id: &str) -> Result<()> {
        let (id, position) = self.located(bus_id)?;
        self.focus = Some(id);
        self.viewport.follow(position);
        Ok(())
    }

    /// Centre on a bus without narrowing the map.
    ///
    /// # Errors
    ///
    /// Same as [`FleetView::select`].
    pub fn locate(&mut self, bus_id: &str) -> Result<()> {
        let (_, position) = self.located(bus_id)?;
        self.viewport.follow(position);
        Ok(())
    }

    /// Show every bus again and return to the default centre.
    pub fn clear_selection(&mut self) {
        self.focus = None;
        self.viewport.reset();
    }

    fn located(&self, bus_id: &str) -> Result<(String, Coordinate)> {
        let snapshot = self.poller.snapshot();
        let bus = snapshot.bus(bus_id).ok_or_else(|| Error::NotFound(format!("bus {bus_id}")))?;
        let position = bus.coordinate().ok_or_else(|| Error::NoPosition(bus.bus_no.clone()))?;
        Ok((bus.id.clone(), position))
    }

    #[must_use]
    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        self.poller.markers(self.focus.as_deref(), self.context)
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.poller.snapshot()
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub const fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    #[must_use]
    pub const fn poller(&self) -> &Poller<P> {
        &self.poller
    }

    /// Registered accounts. Admin map only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] on a rider map or when the backend
    /// refuses the session.
    pub async fn users(&self) -> Result<Vec<User>> {
        self.admin_only()?;
        Ok(auth::users(self.provider.as_ref()).await?)
    }

    /// Save an edited account. Admin map only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] on a rider map and [`Error::NotFound`]
    /// for an unknown account.
    pub async fn update_user(&self, user: &User) -> Result<()> {
        self.admin_only()?;
        Ok(auth::update_user(user, self.provider.as_ref()).await?)
    }

    /// Remove an account. Admin map only.
    ///
    /// # Errors
    ///
    /// Same as [`FleetView::update_user`].
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.admin_only()?;
        Ok(auth::delete_user(user_id, self.provider.as_ref()).await?)
    }

    /// Register a bus and re-read the fleet so it shows up straight away.
    /// Admin map only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] on a rider map, or the backend error when
    /// the bus is rejected. A failed re-read is logged, not returned.
    pub async fn add_bus(&mut self, bus: &NewBus) -> Result<()> {
        self.admin_only()?;
        fleet::create_bus(bus, self.provider.as_ref()).await?;
        info!(bus_no = %bus.bus_no, "bus added");

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "failed to refresh after adding bus");
        }
        Ok(())
    }

    fn admin_only(&self) -> Result<()> {
        if self.context == ViewContext::Admin {
            return Ok(());
        }
        Err(Error::Forbidden("admin only".to_string()))
    }
}

/// Driver's tracking screen.
pub struct DriverConsole<P> {
    provider: Arc<P>,
    publisher: Publisher<P>,
    buses: Vec<Bus>,
    viewport: Viewport,
}

impl<P: Provider> DriverConsole<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: &TrackingConfig) -> Self {
        let publisher = Publisher::new(Arc::clone(&provider), config.watch);
        Self { provider, publisher, buses: Vec::new(), viewport: Viewport::new(config.map) }
    }

    /// Fetch the buses the driver can choose from.
    ///
    /// A failure is logged and leaves the list unchanged.
    pub async fn load_buses(&mut self) -> &[Bus] {
        match fleet::buses(self.provider.as_ref()).await {
            Ok(buses) => self.buses = buses,
            Err(e) => warn!(error = %e, "failed to fetch buses"),
        }
        &self.buses
    }

    #[must_use]
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    /// Selector entry for a bus.
    #[must_use]
    pub fn bus_label(bus: &Bus) -> String {
        format!("🚍 {} - {}", bus.bus_no, bus.route)
    }

    /// Choose the bus being driven. An empty id goes off-line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackingActive`] while tracking and
    /// [`Error::NotFound`] for a bus not in the list.
    pub fn select_bus(&mut self, bus_id: &str) -> Result<()> {
        if self.publisher.is_tracking() {
            return Err(Error::TrackingActive);
        }
        let bus_id = bus_id.trim();
        if !bus_id.is_empty() && !self.buses.iter().any(|bus| bus.id == bus_id) {
            return Err(Error::NotFound(format!("bus {bus_id}")));
        }
        self.publisher.bind(bus_id)
    }

    /// Stop sharing under any bus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackingActive`] while tracking.
    pub fn go_offline(&mut self) -> Result<()> {
        self.publisher.unbind()
    }

    /// Start tracking if stopped, stop if tracking. Without a bus selected
    /// tracking runs GPS-only and nothing is shared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeolocationUnavailable`] when starting fails.
    pub async fn toggle(&mut self) -> Result<()> {
        if self.publisher.is_tracking() {
            self.publisher.stop().await;
            return Ok(());
        }
        self.publisher.start().await
    }

    /// Centre the map on the latest fix.
    pub fn sync(&mut self) {
        if let Some(fix) = self.publisher.fix() {
            self.viewport.follow(Coordinate::new(fix.latitude, fix.longitude));
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.publisher.status()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PublisherState> {
        self.publisher.subscribe()
    }

    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        self.publisher
            .fix()
            .map(|fix| Marker::own_position(Coordinate::new(fix.latitude, fix.longitude)))
            .into_iter()
            .collect()
    }

    /// Link to the current position on Google Maps.
    #[must_use]
    pub fn map_link(&self) -> Option<String> {
        let fix = self.publisher.fix()?;
        Some(format!("https://www.google.com/maps?q={},{}", fix.latitude, fix.longitude))
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub const fn publisher(&self) -> &Publisher<P> {
        &self.publisher
    }
}
