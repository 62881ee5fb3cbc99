use std::sync::Arc;

use tracing::{info, warn};

use crate::audio::AlertPlayer;

/// Tracks the warning indicator and drives the alert sound
///
/// Playback failures are logged and never change session state.
pub struct WarningCoordinator {
    player: Arc<dyn AlertPlayer>,
    active: bool,
}

impl WarningCoordinator {
    pub fn new(player: Arc<dyn AlertPlayer>) -> Self {
        Self {
            player,
            active: false,
        }
    }

    /// Raise the warning; a second activation does not restart the sound
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        warn!("Noise above sensitivity, session paused");

        if let Err(e) = self.player.play() {
            warn!("Failed to play alert: {:#}", e);
        }
    }

    /// Clear the warning and silence the alert
    pub fn deactivate(&mut self) {
        if self.active {
            info!("Noise warning cleared");
        }
        self.active = false;

        if let Err(e) = self.player.stop() {
            warn!("Failed to stop alert: {:#}", e);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
