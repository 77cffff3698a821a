//! Core event bus
//!
//! Lifecycle and progress events are broadcast to every subscriber. A slow
//! subscriber lags and skips events; it never blocks ingestion.

use crate::error::Notification;
use serde::{Deserialize, Serialize};
use tessera_model::{DatasetFingerprint, LayerConfig};
use tokio::sync::broadcast;

/// Something observable happened inside the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// Archive extraction advanced to `percent`
    ExtractionProgress { source: String, percent: u8 },

    /// A tile archive became the active dataset
    DatasetLoaded {
        fingerprint: String,
        layer: LayerConfig,
        tiles: usize,
        colormap_entries: usize,
    },

    /// Segmentation cells were attached to the active dataset
    CellsLoaded { cells: usize, proteins: usize, genes: usize },

    /// A filter pass finished
    CellsFiltered {
        visible: usize,
        outliers: usize,
    },

    /// The dataset was dropped
    DatasetReset,

    /// User-facing message
    Notification(Notification),
}

impl CoreEvent {
    pub(crate) fn dataset_loaded(
        fingerprint: &DatasetFingerprint,
        layer: LayerConfig,
        tiles: usize,
        colormap_entries: usize,
    ) -> Self {
        Self::DatasetLoaded {
            fingerprint: fingerprint.to_string(),
            layer,
            tiles,
            colormap_entries,
        }
    }
}

/// Sending half of the bus
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; no subscribers is fine
    pub(crate) fn emit(&self, event: CoreEvent) {
        let _ = self.sender.send(event);
    }

    pub(crate) fn notify(&self, notification: Notification) {
        match notification.level {
            crate::error::NotificationLevel::Error => {
                tracing::error!(message = %notification.message, "notification");
            }
            crate::error::NotificationLevel::Warning => {
                tracing::warn!(message = %notification.message, "notification");
            }
            crate::error::NotificationLevel::Info => {
                tracing::info!(message = %notification.message, "notification");
            }
        }
        self.emit(CoreEvent::Notification(notification));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(CoreEvent::DatasetReset);
        bus.notify(Notification::warning("careful"));

        assert_eq!(rx.recv().await.unwrap(), CoreEvent::DatasetReset);
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Notification(Notification::warning("careful"))
        );
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        EventBus::new(1).emit(CoreEvent::DatasetReset);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(CoreEvent::ExtractionProgress {
            source: "a.tar".into(),
            percent: 40,
        })
        .unwrap();
        assert_eq!(json["type"], "extraction_progress");
        assert_eq!(json["percent"], 40);
    }
}
