//! Shared device contracts: the adjustable-appliance capability set,
//! electrical signals with units, and device-side errors.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised by device capability calls.
///
/// The balancer treats every variant the same way: the call is logged and
/// replaced by a neutral value. Callers outside the balancer (registration,
/// configuration validation) may inspect the variant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    /// Mode operations are unavailable while the device is suspended.
    #[error("device is suspended; mode operations are unavailable")]
    Suspended,
    /// Emergency level is only defined while the device is suspended.
    #[error("device is active; emergency level is unavailable")]
    NotSuspended,
    /// Requested mode index is outside `1..=max_mode`.
    #[error("mode {requested} out of range 1..={max}")]
    ModeOutOfRange { requested: u32, max: u32 },
    /// The underlying device connection is gone.
    #[error("device connection lost")]
    Disconnected,
    /// The device rejected the operation for an internal reason.
    #[error("operation rejected: {0}")]
    Rejected(&'static str),
}

/// Unit tag carried by every electrical signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Watt,
    Ampere,
    Volt,
}

/// Raised when converting a signal whose unit cannot express the requested
/// quantity (e.g. volts where power is expected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported unit {unit:?} for this conversion")]
pub struct UnsupportedUnit {
    pub unit: Unit,
}

/// A measured electrical value tagged with its unit.
///
/// Meters and generators may report power directly in watts or as a
/// current in amperes; the consumer converts using the line tension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub value: f32,
    pub unit: Unit,
}

impl Signal {
    pub fn watts(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Watt,
        }
    }

    pub fn amperes(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Ampere,
        }
    }

    pub fn volts(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Volt,
        }
    }

    /// Converts the signal to watts.
    ///
    /// Watt signals convert as identity; ampere signals are multiplied by
    /// `tension_v`. Any other unit is a precondition violation.
    pub fn to_watts(self, tension_v: f32) -> Result<f32, UnsupportedUnit> {
        match self.unit {
            Unit::Watt => Ok(self.value),
            Unit::Ampere => Ok(self.value * tension_v),
            unit => Err(UnsupportedUnit { unit }),
        }
    }

    /// Returns the value in volts, rejecting non-voltage signals.
    pub fn as_volts(self) -> Result<f32, UnsupportedUnit> {
        match self.unit {
            Unit::Volt => Ok(self.value),
            unit => Err(UnsupportedUnit { unit }),
        }
    }
}

/// Capability set required from every registered adjustable device.
///
/// Modes are indexed `1..=max_mode`, ordered by increasing consumption.
/// While suspended, all mode operations fail with [`DeviceError::Suspended`];
/// while active, [`Adjustable::emergency`] fails with
/// [`DeviceError::NotSuspended`].
pub trait Adjustable: Send {
    /// Highest mode index supported by the device (>= 1).
    fn max_mode(&self) -> Result<u32, DeviceError>;

    /// Current mode index. Undefined while suspended.
    fn current_mode(&self) -> Result<u32, DeviceError>;

    /// Jumps directly to the given mode.
    fn set_mode(&mut self, mode: u32) -> Result<(), DeviceError>;

    /// Steps one mode up (towards higher consumption).
    fn up_mode(&mut self) -> Result<(), DeviceError>;

    /// Steps one mode down (towards lower consumption).
    fn down_mode(&mut self) -> Result<(), DeviceError>;

    /// Power drawn in the given mode, in watts.
    fn mode_consumption_w(&self, mode: u32) -> Result<f32, DeviceError>;

    /// Whether the device is currently suspended.
    fn is_suspended(&self) -> Result<bool, DeviceError>;

    /// Cuts the device's power draw to (approximately) zero.
    fn suspend(&mut self) -> Result<(), DeviceError>;

    /// Leaves the suspended state. The mode after resume is device-defined
    /// until the caller issues `set_mode`.
    fn resume(&mut self) -> Result<(), DeviceError>;

    /// How urgently the device needs to resume, in `[0, 1]`.
    /// Only defined while suspended.
    fn emergency(&self) -> Result<f32, DeviceError>;
}

/// Per-mode consumption table shared by the simulated appliances.
///
/// # Examples
///
/// ```
/// use hem_sim::devices::types::ModeTable;
///
/// let table = ModeTable::new(vec![10.0, 20.0, 30.0]);
/// assert_eq!(table.max_mode(), 3);
/// assert_eq!(table.consumption_w(2).unwrap(), 20.0);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ModeTable {
    modes_w: Vec<f32>,
}

impl ModeTable {
    /// Creates a mode table from per-mode wattages, mode 1 first.
    ///
    /// # Panics
    ///
    /// Panics if the table is empty or contains a negative wattage.
    pub fn new(modes_w: Vec<f32>) -> Self {
        assert!(!modes_w.is_empty(), "mode table must not be empty");
        assert!(
            modes_w.iter().all(|w| *w >= 0.0),
            "mode wattages must be non-negative"
        );
        Self { modes_w }
    }

    pub fn max_mode(&self) -> u32 {
        self.modes_w.len() as u32
    }

    /// Consumption of the given 1-based mode index.
    pub fn consumption_w(&self, mode: u32) -> Result<f32, DeviceError> {
        if mode == 0 || mode > self.max_mode() {
            return Err(DeviceError::ModeOutOfRange {
                requested: mode,
                max: self.max_mode(),
            });
        }
        Ok(self.modes_w[(mode - 1) as usize])
    }

    /// Validates the raw table as parsed from configuration.
    pub fn is_valid(&self) -> bool {
        !self.modes_w.is_empty() && self.modes_w.iter().all(|w| *w >= 0.0 && w.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watt_signal_converts_as_identity() {
        let s = Signal::watts(120.0);
        assert_eq!(s.to_watts(230.0), Ok(120.0));
    }

    #[test]
    fn ampere_signal_scales_by_tension() {
        let s = Signal::amperes(2.0);
        assert_eq!(s.to_watts(230.0), Ok(460.0));
    }

    #[test]
    fn volt_signal_rejected_for_power() {
        let s = Signal::volts(230.0);
        assert_eq!(s.to_watts(230.0), Err(UnsupportedUnit { unit: Unit::Volt }));
    }

    #[test]
    fn as_volts_rejects_power_signals() {
        assert!(Signal::watts(10.0).as_volts().is_err());
        assert_eq!(Signal::volts(230.0).as_volts(), Ok(230.0));
    }

    #[test]
    fn mode_table_bounds() {
        let table = ModeTable::new(vec![10.0, 20.0]);
        assert_eq!(table.consumption_w(1).unwrap(), 10.0);
        assert_eq!(table.consumption_w(2).unwrap(), 20.0);
        assert_eq!(
            table.consumption_w(0),
            Err(DeviceError::ModeOutOfRange {
                requested: 0,
                max: 2
            })
        );
        assert_eq!(
            table.consumption_w(3),
            Err(DeviceError::ModeOutOfRange {
                requested: 3,
                max: 2
            })
        );
    }

    #[test]
    #[should_panic]
    fn empty_mode_table_panics() {
        ModeTable::new(Vec::new());
    }

    #[test]
    #[should_panic]
    fn negative_wattage_panics() {
        ModeTable::new(vec![10.0, -1.0]);
    }
}
