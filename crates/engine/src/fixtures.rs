// WAV fixtures for engine tests

use std::path::{Path, PathBuf};

/// Write a sine tone at 440 Hz with peak `amplitude` (0.0..=1.0)
pub fn write_sine_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    seconds: f32,
    amplitude: f32,
) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    let frames = (sample_rate as f32 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * amplitude;
        let value = (sample * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
    path
}
