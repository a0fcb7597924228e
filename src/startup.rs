use std::sync::Arc;
use std::time::Duration;

use crate::deadline::DeadlineMonitor;
use crate::hub::Hub;
use crate::identity::IdentityResolver;
use crate::store::RoomStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub hub: Arc<Hub>,
    pub identity: Arc<IdentityResolver>,
}

impl AppState {
    /// Wires the shared state and starts the deadline sweep in the
    /// background.
    pub fn new(
        store: Arc<dyn RoomStore>,
        identity: IdentityResolver,
        event_buffer: usize,
        sweep_interval: Duration,
    ) -> Self {
        let hub = Arc::new(Hub::new(event_buffer));

        DeadlineMonitor::new(store.clone(), hub.clone()).spawn(sweep_interval);

        AppState {
            store,
            hub,
            identity: Arc::new(identity),
        }
    }
}
