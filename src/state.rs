use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::services::events::BookingEvent;
use crate::services::store::BookingStore;

pub struct AppState {
    pub store: Arc<BookingStore>,
    pub config: AppConfig,
    pub events_tx: broadcast::Sender<BookingEvent>,
}

impl AppState {
    pub fn new(store: Arc<BookingStore>, config: AppConfig) -> Self {
        let events_tx = store.events();
        Self {
            store,
            config,
            events_tx,
        }
    }
}
