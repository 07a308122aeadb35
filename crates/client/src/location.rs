//! Position updates from the location provider.

use pogo_core::Geoposition;
use tokio::sync::watch;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two positions, ignoring altitude.
pub fn distance_meters(a: Geoposition, b: Geoposition) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Latest-value channel of player positions.
///
/// The location provider publishes; the session subscribes. Subscribers only
/// ever see the most recent position.
#[derive(Debug, Clone)]
pub struct LocationFeed {
    sender: watch::Sender<Geoposition>,
}

impl LocationFeed {
    /// Feed starting at `initial`.
    pub fn new(initial: Geoposition) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Publish a new position.
    pub fn publish(&self, position: Geoposition) {
        self.sender.send_replace(position);
    }

    /// Most recent position.
    pub fn current(&self) -> Geoposition {
        *self.sender.borrow()
    }

    /// Receiver notified of every later position.
    pub fn subscribe(&self) -> watch::Receiver<Geoposition> {
        self.sender.subscribe()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
