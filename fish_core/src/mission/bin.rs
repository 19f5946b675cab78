//! Collection bin bookkeeping.

use serde_json::json;

use crate::config::BinConfig;
use crate::telemetry::{AlertKind, FishEvent, Notifier};

pub struct BinManager {
    capacity: u32,
    alert_threshold: f64,
    current_load: u32,
    notifier: Notifier,
}

impl BinManager {
    pub fn new(config: &BinConfig, notifier: Notifier) -> Self {
        Self {
            capacity: config.capacity.max(1),
            alert_threshold: config.alert_threshold,
            current_load: 0,
            notifier,
        }
    }

    /// Counts one collected item.
    pub fn add_item(&mut self) {
        self.current_load = self.current_load.saturating_add(1);
        self.publish_load();
    }

    pub fn usage_ratio(&self) -> f64 {
        f64::from(self.current_load) / f64::from(self.capacity)
    }

    /// True once usage reaches the alert threshold. Raises a bin-full alert
    /// every time it answers yes.
    pub fn needs_unload(&self) -> bool {
        let usage = self.usage_ratio();
        let full = usage >= self.alert_threshold;
        if full {
            self.notifier.raise_alert(
                AlertKind::BinFull,
                "bin is full",
                json!({ "usage_ratio": usage, "load": self.current_load, "capacity": self.capacity }),
            );
        }
        full
    }

    pub fn reset(&mut self) {
        self.current_load = 0;
        self.publish_load();
    }

    pub fn load(&self) -> u32 {
        self.current_load
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Overrides the load, for resuming a mission with a partly full bin.
    pub fn set_load(&mut self, load: u32) {
        self.current_load = load;
        self.publish_load();
    }

    fn publish_load(&self) {
        self.notifier.bus().publish(FishEvent::BinLoadChanged {
            load: self.current_load,
            capacity: self.capacity,
        });
    }
}
