//! Press detection between two successive button masks.

use controller_traits::ButtonMask;

/// Names of the buttons that went from released in `previous` to held in
/// `current`, in ascending bit order. Releases are not reported and bits
/// without a table entry are skipped.
pub fn detect_presses(previous: ButtonMask, current: ButtonMask) -> Vec<&'static str> {
    let changed = previous ^ current;
    let pressed = changed & current;
    pressed.iter_names().map(|(name, _)| name).collect()
}

pub fn press_line(name: &str) -> String {
    format!("*** Button pressed: {} ***", name)
}
