//! One-dimensional value noise shared by the CPU and the tearing shader.
//!
//! The GLSL prelude in [`crate::shaders`] is generated from the constants
//! below, so both sides evaluate the same function.

/// Multiplier applied to `sin(n)` before taking the fractional part.
pub const HASH_MULTIPLIER: f32 = 43758.5453;
/// Scale from elapsed milliseconds to noise-space offset.
pub const NOISE_SPEED: f32 = 0.001;
/// Horizontal displacement amplitude in model units.
pub const NOISE_STRENGTH: f32 = 0.04;

fn fract(x: f32) -> f32 {
    let f = x - x.floor();
    // x - floor(x) can round up to exactly 1.0 for tiny negative inputs.
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

/// Pseudo-random value in `[0, 1)` derived from `n`.
pub fn hash(n: f32) -> f32 {
    fract(n.sin() * HASH_MULTIPLIER)
}

/// Smoothly interpolated noise; equals [`hash`] at integers.
pub fn smooth_noise_1d(x: f32) -> f32 {
    let i = x.floor();
    let f = fract(x);
    let u = f * f * (3.0 - 2.0 * f);
    let a = hash(i);
    let b = hash(i + 1.0);
    a + (b - a) * u
}

/// Horizontal offset the tearing shader applies to a vertex.
pub fn displacement(position_y: f32, col_index: f32, time_ms: f32) -> f32 {
    smooth_noise_1d(position_y + time_ms * NOISE_SPEED + col_index) * NOISE_STRENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_stays_in_unit_interval() {
        for step in -2000..2000 {
            let value = hash(step as f32 * 0.37);
            assert!((0.0..1.0).contains(&value), "hash out of range: {value}");
        }
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(12.5), hash(12.5));
        assert_eq!(hash(0.0), 0.0);
    }

    #[test]
    fn noise_matches_hash_at_integers() {
        for n in -20..20 {
            let x = n as f32;
            assert_eq!(smooth_noise_1d(x), hash(x));
        }
    }

    #[test]
    fn noise_is_continuous_across_integers() {
        for n in -5..5 {
            let x = n as f32;
            let left = smooth_noise_1d(x - 1e-4);
            let right = smooth_noise_1d(x + 1e-4);
            assert!((left - right).abs() < 1e-2, "jump at {x}: {left} vs {right}");
        }
    }

    #[test]
    fn displacement_is_bounded_by_strength() {
        for t in (0..10_000).step_by(97) {
            let dx = displacement(0.3, 4.0, t as f32);
            assert!((0.0..NOISE_STRENGTH).contains(&dx));
        }
    }

    #[test]
    fn displacement_advances_with_time() {
        let early = displacement(0.5, 2.0, 0.0);
        let later = displacement(0.5, 2.0, 1000.0);
        assert_eq!(later, smooth_noise_1d(0.5 + 1.0 + 2.0) * NOISE_STRENGTH);
        assert_eq!(early, smooth_noise_1d(2.5) * NOISE_STRENGTH);
    }
}
