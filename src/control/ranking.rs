//! Pure ranking and eligibility functions over device handles.
//!
//! Determinism matters here: both rankings use a stable sort so that
//! devices with equal keys keep their registry order, and the balancer's
//! head/tail iteration directions stay reproducible.

use crate::control::handle::DeviceHandle;

/// Direction of a single mode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

/// Splits handles into `(active, suspended)` partitions, preserving order.
pub fn split_by_suspension<'a>(
    handles: impl IntoIterator<Item = &'a mut DeviceHandle>,
) -> (Vec<&'a mut DeviceHandle>, Vec<&'a mut DeviceHandle>) {
    let mut active = Vec::new();
    let mut suspended = Vec::new();
    for handle in handles {
        if handle.is_suspended() {
            suspended.push(handle);
        } else {
            active.push(handle);
        }
    }
    (active, suspended)
}

/// Sorts active handles by current consumption, largest first.
///
/// Consumption queries that fail count as zero. The sort is stable, so
/// equal consumers keep their incoming relative order.
pub fn rank_by_consumption_desc(handles: &mut [&mut DeviceHandle]) {
    let keys: Vec<f32> = handles.iter().map(|h| h.current_consumption_w()).collect();
    sort_by_cached_key(handles, &keys, true);
}

/// Sorts suspended handles by emergency level, least urgent first.
///
/// The balancer walks the result from the tail for most-urgent-first
/// semantics. Emergency queries that fail count as zero.
pub fn rank_by_emergency_asc(handles: &mut [&mut DeviceHandle]) {
    let keys: Vec<f32> = handles.iter().map(|h| h.emergency()).collect();
    sort_by_cached_key(handles, &keys, false);
}

/// Stable sort of `handles` by pre-queried keys, avoiding repeated device
/// calls from inside the comparator.
fn sort_by_cached_key(handles: &mut [&mut DeviceHandle], keys: &[f32], descending: bool) {
    let mut order: Vec<usize> = (0..handles.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = keys[a].total_cmp(&keys[b]);
        if descending { cmp.reverse() } else { cmp }
    });
    apply_permutation(handles, order);
}

/// Reorders `items` in place so that `items[i]` becomes the element that
/// was at `order[i]`.
fn apply_permutation<T>(items: &mut [T], mut order: Vec<usize>) {
    for i in 0..order.len() {
        let mut src = order[i];
        // Earlier swaps may have displaced the source; follow the chain.
        while src < i {
            src = order[src];
        }
        items.swap(i, src);
        order[i] = src;
    }
}

/// True iff the device is active and below its top mode.
pub fn can_be_increased(handle: &DeviceHandle) -> bool {
    if handle.is_suspended() {
        return false;
    }
    match (handle.current_mode(), handle.max_mode()) {
        (Some(current), Some(max)) => current < max,
        _ => false,
    }
}

/// True iff the device is active and above mode 1.
pub fn can_be_decreased(handle: &DeviceHandle) -> bool {
    if handle.is_suspended() {
        return false;
    }
    matches!(handle.current_mode(), Some(current) if current > 1)
}

/// Absolute consumption difference between the current mode and its
/// neighbor one step in `direction`. Failures read as zero.
pub fn consumption_delta(handle: &DeviceHandle, direction: StepDirection) -> f32 {
    let Some(current) = handle.current_mode() else {
        return 0.0;
    };
    let neighbor = match direction {
        StepDirection::Up => current + 1,
        StepDirection::Down => {
            if current <= 1 {
                return 0.0;
            }
            current - 1
        }
    };
    let current_w = handle.mode_consumption_w(current);
    let neighbor_w = handle.mode_consumption_w(neighbor);
    (neighbor_w - current_w).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::types::{Adjustable, DeviceError};

    /// Minimal scripted device for ranking tests.
    struct Scripted {
        modes_w: Vec<f32>,
        mode: u32,
        suspended: bool,
        emergency: f32,
    }

    impl Scripted {
        fn active(modes_w: Vec<f32>, mode: u32) -> Self {
            Self {
                modes_w,
                mode,
                suspended: false,
                emergency: 0.0,
            }
        }

        fn suspended(emergency: f32) -> Self {
            Self {
                modes_w: vec![10.0],
                mode: 1,
                suspended: true,
                emergency,
            }
        }
    }

    impl Adjustable for Scripted {
        fn max_mode(&self) -> Result<u32, DeviceError> {
            Ok(self.modes_w.len() as u32)
        }
        fn current_mode(&self) -> Result<u32, DeviceError> {
            if self.suspended {
                Err(DeviceError::Suspended)
            } else {
                Ok(self.mode)
            }
        }
        fn set_mode(&mut self, mode: u32) -> Result<(), DeviceError> {
            self.mode = mode;
            Ok(())
        }
        fn up_mode(&mut self) -> Result<(), DeviceError> {
            self.mode += 1;
            Ok(())
        }
        fn down_mode(&mut self) -> Result<(), DeviceError> {
            self.mode -= 1;
            Ok(())
        }
        fn mode_consumption_w(&self, mode: u32) -> Result<f32, DeviceError> {
            self.modes_w
                .get(mode.wrapping_sub(1) as usize)
                .copied()
                .ok_or(DeviceError::ModeOutOfRange {
                    requested: mode,
                    max: self.modes_w.len() as u32,
                })
        }
        fn is_suspended(&self) -> Result<bool, DeviceError> {
            Ok(self.suspended)
        }
        fn suspend(&mut self) -> Result<(), DeviceError> {
            self.suspended = true;
            Ok(())
        }
        fn resume(&mut self) -> Result<(), DeviceError> {
            self.suspended = false;
            Ok(())
        }
        fn emergency(&self) -> Result<f32, DeviceError> {
            if self.suspended {
                Ok(self.emergency)
            } else {
                Err(DeviceError::NotSuspended)
            }
        }
    }

    fn handle(id: &str, device: Scripted) -> DeviceHandle {
        DeviceHandle::new(id, Box::new(device))
    }

    #[test]
    fn consumption_ranking_is_descending_and_stable() {
        let mut a = handle("a", Scripted::active(vec![50.0], 1));
        let mut b = handle("b", Scripted::active(vec![200.0], 1));
        let mut c = handle("c", Scripted::active(vec![50.0], 1));
        let mut d = handle("d", Scripted::active(vec![120.0], 1));

        let mut ranked = vec![&mut a, &mut b, &mut c, &mut d];
        rank_by_consumption_desc(&mut ranked);

        let ids: Vec<&str> = ranked.iter().map(|h| h.id()).collect();
        // a and c tie at 50 W and must keep their relative order.
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn emergency_ranking_is_ascending() {
        let mut a = handle("a", Scripted::suspended(0.9));
        let mut b = handle("b", Scripted::suspended(0.1));
        let mut c = handle("c", Scripted::suspended(0.5));

        let mut ranked = vec![&mut a, &mut b, &mut c];
        rank_by_emergency_asc(&mut ranked);

        let ids: Vec<&str> = ranked.iter().map(|h| h.id()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn split_preserves_order() {
        let mut handles = vec![
            handle("a", Scripted::active(vec![10.0], 1)),
            handle("b", Scripted::suspended(0.2)),
            handle("c", Scripted::active(vec![20.0], 1)),
        ];
        let (active, suspended) = split_by_suspension(handles.iter_mut());
        assert_eq!(
            active.iter().map(|h| h.id()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(
            suspended.iter().map(|h| h.id()).collect::<Vec<_>>(),
            vec!["b"]
        );
    }

    #[test]
    fn increase_decrease_eligibility() {
        let top = handle("top", Scripted::active(vec![10.0, 20.0], 2));
        assert!(!can_be_increased(&top));
        assert!(can_be_decreased(&top));

        let floor = handle("floor", Scripted::active(vec![10.0, 20.0], 1));
        assert!(can_be_increased(&floor));
        assert!(!can_be_decreased(&floor));

        let off = handle("off", Scripted::suspended(0.5));
        assert!(!can_be_increased(&off));
        assert!(!can_be_decreased(&off));
    }

    #[test]
    fn delta_between_adjacent_modes() {
        let h = handle("h", Scripted::active(vec![10.0, 25.0, 45.0], 2));
        assert_eq!(consumption_delta(&h, StepDirection::Up), 20.0);
        assert_eq!(consumption_delta(&h, StepDirection::Down), 15.0);
    }

    #[test]
    fn delta_at_floor_is_zero() {
        let h = handle("h", Scripted::active(vec![10.0, 25.0], 1));
        assert_eq!(consumption_delta(&h, StepDirection::Down), 0.0);
    }
}
