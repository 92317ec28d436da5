//! 16-bit fixed-point helpers for CV math.
//!
//! CVs are unsigned 16-bit values; modulation offsets are signed. All
//! arithmetic saturates instead of wrapping so a deep pitch bend or an
//! over-driven envelope can never fold a voltage around.

/// 16x16 -> 16 multiply keeping the high half. Treats `b` as a 0..1 gain.
#[inline]
pub fn scale_u16(a: u16, b: u16) -> u16 {
    ((u32::from(a) * u32::from(b)) >> 16) as u16
}

/// Saturating unsigned add.
#[inline]
pub fn sat_add_u16(a: u16, b: u16) -> u16 {
    a.saturating_add(b)
}

/// Add a signed 32-bit offset to a CV, clamping to the 16-bit range.
#[inline]
pub fn sat_add_u16_s32(a: u16, b: i32) -> u16 {
    (i32::from(a) + b).clamp(0, i32::from(u16::MAX)) as u16
}

/// Linear interpolation between adjacent table entries, `x` in 0..=255.
/// Requires `b >= a`; the curve tables are built non-decreasing.
#[inline]
pub fn lerp_u16(a: u16, b: u16, x: u8) -> u16 {
    a.wrapping_add(u16::from(x).wrapping_mul((b.wrapping_sub(a)) >> 8))
}

/// Look up a 256-entry curve at a 24-bit phase position.
///
/// The table index comes from phase bits 16..23; bits 8..15 interpolate
/// between the indexed entry and its neighbour.
#[inline]
pub fn compute_shape(phase: u32, table: &[u16; 256]) -> u16 {
    let x = (phase >> 8) as u8;
    let ai = ((phase >> 16) & 0xff) as usize;
    let bi = if ai < 255 { ai + 1 } else { ai };
    lerp_u16(table[ai], table[bi], x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_a_gain() {
        assert_eq!(scale_u16(0x8000, u16::MAX), 0x7fff);
        assert_eq!(scale_u16(u16::MAX, 0), 0);
        assert_eq!(scale_u16(0, u16::MAX), 0);
    }

    #[test]
    fn sat_add_clamps_both_ends() {
        assert_eq!(sat_add_u16(0xf000, 0x2000), u16::MAX);
        assert_eq!(sat_add_u16_s32(100, -200), 0);
        assert_eq!(sat_add_u16_s32(0xfff0, 0x100), u16::MAX);
        assert_eq!(sat_add_u16_s32(1000, 234), 1234);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp_u16(0, 25600, 0), 0);
        // x = 255 lands one step short of b, as in the original table walker
        assert!(lerp_u16(0, 25600, 255) <= 25600);
        assert!(lerp_u16(1000, 2000, 128) > 1000);
    }

    #[test]
    fn shape_walks_the_table() {
        let mut table = [0u16; 256];
        for (i, e) in table.iter_mut().enumerate() {
            *e = (i as u16) << 8;
        }
        let lo = compute_shape(0, &table);
        let mid = compute_shape(0x80_0000, &table);
        let hi = compute_shape(0xff_ff00, &table);
        assert!(lo < mid && mid < hi);
    }
}
