//! Fit decoded audio to the output device's channel count and sample rate
//!
//! The device decides the format; the file has to follow. Both conversions
//! run once, before playback, so the audio callback only ever copies.

use super::DecodedAudio;

/// Produce interleaved samples for a device with `channels` at `sample_rate`
pub fn adapt(audio: &DecodedAudio, channels: u16, sample_rate: u32) -> Vec<f32> {
    let remixed = remix(&audio.samples, audio.channels as usize, channels as usize);
    if audio.sample_rate == sample_rate {
        return remixed;
    }

    tracing::debug!(
        from = audio.sample_rate,
        to = sample_rate,
        "resampling for output device"
    );
    resample_linear(&remixed, channels as usize, audio.sample_rate, sample_rate)
}

/// Change channel count
///
/// Mono is copied to every output channel, anything to mono is averaged,
/// otherwise channels map by position and missing ones are silent.
pub fn remix(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);

    for frame in samples.chunks_exact(from) {
        if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|ch| frame.get(ch).copied().unwrap_or(0.0)));
        }
    }

    out
}

/// Linear-interpolation resampler for interleaved audio
pub fn resample_linear(samples: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || channels == 0 || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }

    let out_frames = (in_frames as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = in_frames - 1;

    let mut out = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        let pos = i as f64 * step;
        let i0 = (pos as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let frac = (pos - i0 as f64) as f32;

        for ch in 0..channels {
            let a = samples[i0 * channels + ch];
            let b = samples[i1 * channels + ch];
            out.push(a + (b - a) * frac);
        }
    }

    out
}
