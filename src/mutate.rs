//! Changes applied to the light list before it is written back
//!
//! Every mutator takes the whole list and returns the whole list. A target of
//! `None` addresses every light. Lights the target does not address are
//! returned untouched.

use crate::locate::Target;
use crate::types::{clamp_brightness, Brightness, LightDevice, PowerState};

/// A requested change to one or more lights
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Power(PowerState),
    Brightness(Brightness),
    AdjustBrightness(Brightness),
    Rename(String),
}

/// Result of applying a change to the light list
#[derive(Debug, Clone)]
pub struct Mutation {
    /// The full list, reordered if the change was a rename
    pub devices: Vec<LightDevice>,
    /// The change as applied, with absolute brightness already clamped
    pub change: Change,
    /// Snapshots of the lights the change touched, in list order
    pub changed: Vec<LightDevice>,
}

impl Mutation {
    /// Brightness of the last light touched
    pub fn brightness(&self) -> Option<Brightness> {
        self.changed.last().map(|device| device.brightness)
    }
}

/// Apply a change to every light the target addresses
pub fn apply(devices: Vec<LightDevice>, target: Option<&Target>, change: &Change) -> Mutation {
    match change {
        Change::Power(state) => set_power(devices, target, *state),
        Change::Brightness(value) => set_brightness(devices, target, *value),
        Change::AdjustBrightness(delta) => adjust_brightness(devices, target, *delta),
        Change::Rename(name) => rename(devices, target, name),
    }
}

/// Switch lights on or off
pub fn set_power(mut devices: Vec<LightDevice>, target: Option<&Target>, state: PowerState) -> Mutation {
    let changed = update_matching(&mut devices, target, |device| {
        device.power_on = state.is_on();
    });

    Mutation {
        devices,
        change: Change::Power(state),
        changed,
    }
}

/// Set an absolute brightness, clamped before it is assigned
pub fn set_brightness(mut devices: Vec<LightDevice>, target: Option<&Target>, value: Brightness) -> Mutation {
    let value = clamp_brightness(value);
    let changed = update_matching(&mut devices, target, |device| {
        device.brightness = value;
    });

    Mutation {
        devices,
        change: Change::Brightness(value),
        changed,
    }
}

/// Move brightness by a delta, clamped after the delta is added
pub fn adjust_brightness(mut devices: Vec<LightDevice>, target: Option<&Target>, delta: Brightness) -> Mutation {
    let changed = update_matching(&mut devices, target, |device| {
        device.brightness = clamp_brightness(device.brightness.saturating_add(delta));
    });

    Mutation {
        devices,
        change: Change::AdjustBrightness(delta),
        changed,
    }
}

/// Rename lights, then re-sort the whole list by name ignoring case
///
/// The sort is stable, so lights whose names compare equal keep their order.
pub fn rename(mut devices: Vec<LightDevice>, target: Option<&Target>, new_name: &str) -> Mutation {
    let changed = update_matching(&mut devices, target, |device| {
        device.name = new_name.to_string();
    });

    devices.sort_by_cached_key(|device| device.name.to_lowercase());

    Mutation {
        devices,
        change: Change::Rename(new_name.to_string()),
        changed,
    }
}

fn update_matching<F>(devices: &mut [LightDevice], target: Option<&Target>, mut update: F) -> Vec<LightDevice>
where
    F: FnMut(&mut LightDevice),
{
    let mut changed = Vec::new();
    for (index, device) in devices.iter_mut().enumerate() {
        if target.map_or(true, |target| target.matches(device)) {
            update(device);
            tracing::debug!("desired lightDevices[{}]: {:?}", index, device);
            changed.push(device.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn light(id: &str, name: &str, power_on: bool, brightness: Brightness) -> LightDevice {
        LightDevice::new(format!("/a/light/{}", id), name, power_on, brightness)
    }

    fn by_id(id: &str) -> Target {
        Target::EndpointId(id.to_string())
    }

    #[rstest]
    #[case(90, 30, 100)]
    #[case(5, -20, 0)]
    #[case(40, 25, 65)]
    #[case(100, -100, 0)]
    #[case(0, Brightness::MAX, 100)]
    fn adjust_clamps_after_adding(#[case] current: Brightness, #[case] delta: Brightness, #[case] expected: Brightness) {
        let mutation = adjust_brightness(vec![light("1", "Desk", true, current)], Some(&by_id("1")), delta);
        assert_eq!(mutation.devices[0].brightness, expected);
        assert_eq!(mutation.brightness(), Some(expected));
    }

    #[rstest]
    #[case(150, 100)]
    #[case(-5, 0)]
    #[case(0, 0)]
    #[case(42, 42)]
    fn set_clamps_the_input(#[case] value: Brightness, #[case] expected: Brightness) {
        let mutation = set_brightness(vec![light("1", "Desk", true, 50)], Some(&by_id("1")), value);
        assert_eq!(mutation.devices[0].brightness, expected);
        assert_eq!(mutation.change, Change::Brightness(expected));
    }

    #[test]
    fn out_of_range_current_value_is_clamped_by_adjust() {
        let mutation = adjust_brightness(vec![light("1", "Desk", true, 250)], Some(&by_id("1")), -20);
        assert_eq!(mutation.devices[0].brightness, 100);
    }

    #[test]
    fn targeted_power_touches_only_the_match() {
        let devices = vec![light("1", "A", false, 10), light("2", "B", false, 20)];
        let mutation = set_power(devices, Some(&by_id("2")), PowerState::On);
        assert!(!mutation.devices[0].power_on);
        assert!(mutation.devices[1].power_on);
        assert_eq!(mutation.changed.len(), 1);
    }

    #[test]
    fn broadcast_power_sets_every_light_and_nothing_else() {
        let devices = vec![light("1", "A", false, 10), light("2", "B", true, 20), light("3", "C", false, 30)];
        let before = devices.clone();
        let mutation = set_power(devices, None, PowerState::On);

        assert_eq!(mutation.changed.len(), 3);
        for (after, before) in mutation.devices.iter().zip(&before) {
            assert!(after.power_on);
            assert_eq!(after.name, before.name);
            assert_eq!(after.uri, before.uri);
            assert_eq!(after.brightness, before.brightness);
        }
    }

    #[test]
    fn rename_resorts_case_insensitively() {
        let devices = vec![light("1", "zed", true, 10), light("2", "bob", true, 20)];
        let mutation = rename(devices, Some(&Target::Name("BOB".to_string())), "Alice");
        let names: Vec<_> = mutation.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Alice", "zed"]);
        assert_eq!(mutation.changed[0].endpoint_id(), "2");
    }

    #[test]
    fn rename_sort_is_stable_for_equal_names() {
        let devices = vec![
            light("1", "Porch", true, 10),
            light("2", "attic", true, 20),
            light("3", "PORCH", true, 30),
            light("4", "porch", true, 40),
        ];
        let mutation = rename(devices, Some(&by_id("2")), "Basement");
        let ids: Vec<_> = mutation.devices.iter().map(|d| d.endpoint_id()).collect();
        assert_eq!(ids, ["2", "1", "3", "4"]);
    }

    #[test]
    fn unmatched_target_changes_nothing() {
        let devices = vec![light("1", "A", false, 10)];
        let mutation = apply(devices.clone(), Some(&by_id("9")), &Change::Power(PowerState::On));
        assert_eq!(mutation.devices, devices);
        assert!(mutation.changed.is_empty());
        assert_eq!(mutation.brightness(), None);
    }

    #[test]
    fn apply_dispatches_each_change() {
        let target = by_id("1");
        let devices = vec![light("1", "A", false, 10)];

        let mutation = apply(devices.clone(), Some(&target), &Change::AdjustBrightness(15));
        assert_eq!(mutation.devices[0].brightness, 25);

        let mutation = apply(devices.clone(), Some(&target), &Change::Brightness(60));
        assert_eq!(mutation.devices[0].brightness, 60);

        let mutation = apply(devices, Some(&target), &Change::Rename("Lamp".to_string()));
        assert_eq!(mutation.devices[0].name, "Lamp");
    }
}
