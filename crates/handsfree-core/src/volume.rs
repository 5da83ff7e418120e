//! Profile-scale to device-scale volume conversion

/// Convert `hf_level` on `0..=hf_max` to `0..=device_max`.
///
/// Rounds down, then bumps by one when the remainder is at least `device_max`.
/// `hf_max` must be non-zero.
///
/// ```rust
/// use handsfree_core::volume::map_volume;
///
/// assert_eq!(map_volume(8, 15, 16), 8);
/// assert_eq!(map_volume(15, 15, 10), 10);
/// ```
pub fn map_volume(hf_level: u8, hf_max: u8, device_max: u8) -> u8 {
    debug_assert!(hf_max > 0);
    let scaled = u32::from(hf_level) * u32::from(device_max);
    let hf_max = u32::from(hf_max.max(1));
    let mut level = scaled / hf_max;
    if scaled % hf_max >= u32::from(device_max) {
        level += 1;
    }
    level.min(u32::from(u8::MAX)) as u8
}
