// Power metering of played audio

/// Floor of the meter, reported for digital silence
pub const MIN_POWER_DB: f32 = -160.0;

/// RMS power of `samples` scaled by `gain`, in dBFS
pub fn power_db(samples: &[f32], gain: f32) -> f32 {
    if samples.is_empty() {
        return MIN_POWER_DB;
    }
    let sum: f64 = samples.iter().map(|s| f64::from(*s) * f64::from(*s)).sum();
    let rms = (sum / samples.len() as f64).sqrt() * f64::from(gain.max(0.0));
    if rms <= 0.0 {
        return MIN_POWER_DB;
    }
    ((20.0 * rms.log10()) as f32).max(MIN_POWER_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_hits_floor() {
        assert_eq!(power_db(&[0.0; 256], 1.0), MIN_POWER_DB);
        assert_eq!(power_db(&[], 1.0), MIN_POWER_DB);
    }

    #[test]
    fn test_full_scale_square_is_zero_db() {
        let square: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(power_db(&square, 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_gain_scales_level() {
        let square = [0.5f32, -0.5, 0.5, -0.5];
        let unity = power_db(&square, 1.0);
        let half = power_db(&square, 0.5);
        assert!((unity - half - 6.0206).abs() < 1e-3);
        assert_eq!(power_db(&square, 0.0), MIN_POWER_DB);
    }
}
