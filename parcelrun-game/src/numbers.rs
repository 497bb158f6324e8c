//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f32 and clamp it to the u32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f32_to_u32(value: f32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    let clamped = f64::from(value).clamp(0.0, max).round();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Floor a f32 into an i64 lattice coordinate, returning 0 for non-finite values.
#[must_use]
pub fn floor_f32_to_i64(value: f32) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    cast::<f32, i64>(value.floor()).unwrap_or(0)
}

/// Map the top 24 bits of a hash onto `[0, 1)`.
#[must_use]
pub fn unit_from_hash(hash: u64) -> f32 {
    let mantissa = cast::<u64, f32>(hash >> 40).unwrap_or(0.0);
    mantissa / 16_777_216.0
}

/// Convert a collection length to u32, saturating.
#[must_use]
pub fn len_to_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
#[must_use]
pub fn lerp_clamped(from: f32, to: f32, t: f32) -> f32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    (to - from).mul_add(t, from)
}

/// Replace non-finite samples with a fallback.
#[must_use]
pub const fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f32_to_u32(22.5), 23);
        assert_eq!(round_f32_to_u32(-4.0), 0);
        assert_eq!(round_f32_to_u32(f32::NAN), 0);
    }

    #[test]
    fn floor_handles_negative_and_non_finite() {
        assert_eq!(floor_f32_to_i64(-0.5), -1);
        assert_eq!(floor_f32_to_i64(3.99), 3);
        assert_eq!(floor_f32_to_i64(f32::INFINITY), 0);
    }

    #[test]
    fn unit_hash_stays_below_one() {
        assert!(unit_from_hash(u64::MAX) < 1.0);
        assert!(unit_from_hash(0).abs() < f32::EPSILON);
    }

    #[test]
    fn lerp_clamps_parameter() {
        assert!((lerp_clamped(0.2, 0.4, 0.8) - 0.36).abs() < 1e-6);
        assert!((lerp_clamped(5.0, 40.0, 2.0) - 40.0).abs() < f32::EPSILON);
        assert!((lerp_clamped(5.0, 40.0, f32::NAN) - 5.0).abs() < f32::EPSILON);
    }
}
