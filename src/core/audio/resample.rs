//! Rational polyphase resampling and PCM16 normalization.
//!
//! The capture rate (typically 48 kHz) rarely matches the recognition
//! engine's required rate (typically 16 kHz). Conversion uses an exact
//! rational ratio derived from the GCD of the two rates rather than a
//! floating-point approximation, so a long session with many chunks never
//! accumulates pitch or timing drift.
//!
//! The pipeline is the classic polyphase arrangement: upsample by `up`
//! (zero-stuffing), apply a windowed-sinc low-pass filter, then decimate by
//! `down`. Only the filter taps that land on non-zero upsampled positions
//! are evaluated.

use std::f64::consts::PI;

/// Scale factor for converting PCM 16-bit samples to normalized float.
const PCM_TO_FLOAT_SCALE: f32 = 1.0 / 32768.0;

/// Filter half-length per unit ratio. The full filter spans
/// `2 * FILTER_HALF_WIDTH * max(up, down) + 1` taps.
const FILTER_HALF_WIDTH: usize = 10;

/// Compute the reduced-fraction resample ratio between two sample rates.
///
/// Returns `(up, down)` in lowest terms: converting `source_rate` audio to
/// `target_rate` means upsampling by `up` and downsampling by `down`.
pub fn resample_ratio(source_rate: u32, target_rate: u32) -> (u32, u32) {
    let g = gcd(source_rate, target_rate);
    (target_rate / g, source_rate / g)
}

/// Greatest common divisor (Euclid).
fn gcd(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Decode little-endian PCM16 bytes into normalized f32 samples in [-1, 1].
///
/// A trailing odd byte (half a sample) is ignored; frames are validated at
/// the envelope boundary so this only ever happens on malformed input.
pub fn pcm16_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 * PCM_TO_FLOAT_SCALE)
        .collect()
}

/// Encode normalized f32 samples back into little-endian PCM16 bytes.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let clamped = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
        out.extend_from_slice(&clamped.to_le_bytes());
    }
    out
}

/// Resample `samples` from `source_rate` to `target_rate` using an exact
/// rational polyphase filter.
///
/// The output length is `ceil(len * up / down)`. The filter is centered, so
/// the output is delay-compensated; edge regions (roughly one filter length
/// at each end) carry the usual transient error.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let (up, down) = resample_ratio(source_rate, target_rate);
    let up = up as usize;
    let down = down as usize;

    let taps = design_lowpass(up, down);
    let half_len = (taps.len() - 1) / 2;

    let out_len = (samples.len() * up).div_ceil(down);
    let mut out = Vec::with_capacity(out_len);

    for m in 0..out_len {
        // Center of the filter in the upsampled stream.
        let t = (m * down) as i64;
        let mut acc = 0.0f64;

        // Only upsampled positions j with j % up == 0 are non-zero, which
        // pins k to a single residue class modulo up.
        let first_k = ((t + half_len as i64) % up as i64 + up as i64) as usize % up;
        let mut k = first_k;
        while k < taps.len() {
            let j = t + half_len as i64 - k as i64;
            if j >= 0 {
                let n = (j as usize) / up;
                if n < samples.len() {
                    acc += taps[k] * samples[n] as f64;
                }
            }
            k += up;
        }
        out.push(acc as f32);
    }

    out
}

/// Design the windowed-sinc low-pass filter for a polyphase `up`/`down`
/// stage: cutoff at `pi / max(up, down)` in the upsampled domain, Hamming
/// window, DC gain `up` to compensate the zero-stuffing energy loss.
fn design_lowpass(up: usize, down: usize) -> Vec<f64> {
    let max_ratio = up.max(down);
    let half_len = FILTER_HALF_WIDTH * max_ratio;
    let n_taps = 2 * half_len + 1;

    let mut taps = Vec::with_capacity(n_taps);
    for i in 0..n_taps {
        let x = i as f64 - half_len as f64;
        let arg = PI * x / max_ratio as f64;
        let sinc = if x == 0.0 { 1.0 } else { arg.sin() / arg };
        let window = 0.54 - 0.46 * (2.0 * PI * i as f64 / (n_taps - 1) as f64).cos();
        taps.push(up as f64 * sinc * window / max_ratio as f64);
    }
    taps
}
