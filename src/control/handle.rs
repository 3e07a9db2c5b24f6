//! Registered-device wrapper used by the balancer.

use tracing::warn;

use crate::devices::types::Adjustable;

/// A registered appliance as seen by the control loop.
///
/// Wraps the boxed capability object with the per-device
/// `cycles_since_transition` counter and a set of neutral-value accessors:
/// every capability call that fails is logged at `warn` and replaced by a
/// neutral value (`false`, `0.0`, no-op), so a single misbehaving device
/// never aborts a balancing tick.
pub struct DeviceHandle {
    id: String,
    device: Box<dyn Adjustable>,
    cycles_since_transition: u32,
    transitioned_this_tick: bool,
}

impl DeviceHandle {
    /// Wraps a live device connection under the given registry id.
    pub fn new(id: impl Into<String>, device: Box<dyn Adjustable>) -> Self {
        Self {
            id: id.into(),
            device,
            cycles_since_transition: 0,
            transitioned_this_tick: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ticks elapsed since the device last changed suspension state.
    pub fn cycles_since_transition(&self) -> u32 {
        self.cycles_since_transition
    }

    /// Advances the per-tick cycle counter.
    ///
    /// A device that transitioned during the current tick is skipped once:
    /// the reset lands first and counting starts on the next tick.
    pub fn advance_cycle(&mut self) {
        if self.transitioned_this_tick {
            self.transitioned_this_tick = false;
        } else {
            self.cycles_since_transition = self.cycles_since_transition.saturating_add(1);
        }
    }

    // --- neutral-value accessors ---------------------------------------

    /// Whether the device is suspended; failure reads as active.
    pub fn is_suspended(&self) -> bool {
        match self.device.is_suspended() {
            Ok(suspended) => suspended,
            Err(err) => {
                warn!(device = %self.id, error = %err, "suspension query failed");
                false
            }
        }
    }

    /// Current mode, or `None` when suspended or unavailable.
    pub fn current_mode(&self) -> Option<u32> {
        match self.device.current_mode() {
            Ok(mode) => Some(mode),
            Err(err) => {
                warn!(device = %self.id, error = %err, "mode query failed");
                None
            }
        }
    }

    /// Highest mode, or `None` when unavailable.
    pub fn max_mode(&self) -> Option<u32> {
        match self.device.max_mode() {
            Ok(mode) => Some(mode),
            Err(err) => {
                warn!(device = %self.id, error = %err, "max mode query failed");
                None
            }
        }
    }

    /// Consumption of the given mode in watts; failure reads as zero.
    pub fn mode_consumption_w(&self, mode: u32) -> f32 {
        match self.device.mode_consumption_w(mode) {
            Ok(watts) => watts,
            Err(err) => {
                warn!(device = %self.id, mode, error = %err, "consumption query failed");
                0.0
            }
        }
    }

    /// Consumption at the current mode; suspended or failing devices read
    /// as drawing nothing.
    pub fn current_consumption_w(&self) -> f32 {
        match self.current_mode() {
            Some(mode) => self.mode_consumption_w(mode),
            None => 0.0,
        }
    }

    /// Emergency level of a suspended device; failure reads as zero.
    pub fn emergency(&self) -> f32 {
        match self.device.emergency() {
            Ok(level) => level,
            Err(err) => {
                warn!(device = %self.id, error = %err, "emergency query failed");
                0.0
            }
        }
    }

    // --- neutral-value mutators ----------------------------------------

    /// Steps one mode up. Returns whether the device accepted.
    pub fn try_up_mode(&mut self) -> bool {
        match self.device.up_mode() {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.id, error = %err, "up-mode rejected");
                false
            }
        }
    }

    /// Steps one mode down. Returns whether the device accepted.
    pub fn try_down_mode(&mut self) -> bool {
        match self.device.down_mode() {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.id, error = %err, "down-mode rejected");
                false
            }
        }
    }

    /// Jumps to the given mode. Returns whether the device accepted.
    pub fn try_set_mode(&mut self, mode: u32) -> bool {
        match self.device.set_mode(mode) {
            Ok(()) => true,
            Err(err) => {
                warn!(device = %self.id, mode, error = %err, "set-mode rejected");
                false
            }
        }
    }

    /// Suspends the device, resetting its transition counter on success.
    pub fn try_suspend(&mut self) -> bool {
        match self.device.suspend() {
            Ok(()) => {
                self.cycles_since_transition = 0;
                self.transitioned_this_tick = true;
                true
            }
            Err(err) => {
                warn!(device = %self.id, error = %err, "suspend rejected");
                false
            }
        }
    }

    /// Resumes the device, resetting its transition counter on success.
    pub fn try_resume(&mut self) -> bool {
        match self.device.resume() {
            Ok(()) => {
                self.cycles_since_transition = 0;
                self.transitioned_this_tick = true;
                true
            }
            Err(err) => {
                warn!(device = %self.id, error = %err, "resume rejected");
                false
            }
        }
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("cycles_since_transition", &self.cycles_since_transition)
            .finish_non_exhaustive()
    }
}
