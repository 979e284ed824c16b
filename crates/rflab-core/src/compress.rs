//! Signal compression codecs
//!
//! The persistence format for captured signals: byte-delta, 16-bit
//! width-delta, run-length, and the combined pulse-sequence codec used for
//! capture blobs. All three primary codecs are byte-exact round-trips:
//! `decode(encode(x)) == x` for every input.
//!
//! Wire formats:
//!
//! - **Delta-8** — first byte verbatim, then signed single-byte deltas;
//!   escape `0x80` introduces a big-endian `i16` delta.
//! - **Delta-16** — first sample as big-endian `u16`, then single-byte
//!   deltas with escapes `0x80` (+`i16`) and `0x81` (+`i32`).
//! - **RLE** — escape byte `0x00`: runs of ≥ 3 encode as `0x00, len, sym`;
//!   a literal `0x00` encodes as `0x00, 0x01, 0x00`.
//! - **Pulse sequence** — `count: u16 BE`, the Delta-16 width stream, then
//!   packed level runs `(run_len << 1) | level` with `run_len ≤ 127`.
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::compress::{rle_encode, rle_decode};
//!
//! let mut data = vec![0xAA; 50];
//! data.extend(vec![0xBB; 50]);
//! let packed = rle_encode(&data);
//! assert!(packed.len() <= 8);
//! assert_eq!(rle_decode(&packed), data);
//! ```

use crate::fixed::Fixed;
use crate::types::{Frame, Pulse, PulseLevel};
use serde::{Deserialize, Serialize};

/// Longest run a single RLE token can carry.
pub const RLE_MAX_RUN_LENGTH: usize = 255;

/// Longest run a single packed level byte can carry.
pub const LEVEL_MAX_RUN_LENGTH: u8 = 127;

/// Codec selector for the adaptive compression front door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Pass-through.
    None,
    /// Byte delta coding (smooth sequences).
    Delta,
    /// Run-length coding (repetitive sequences).
    Rle,
    /// Probe the input and pick whichever of delta/RLE wins.
    Adaptive,
}

/// Outcome of a [`compress`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_size: usize,
    pub compressed_size: usize,
    /// `original / compressed` in Q15.16.
    pub ratio: Fixed,
    /// The algorithm actually applied (resolved from `Adaptive`).
    pub algorithm: CompressionAlgorithm,
}

// ---------------------------------------------------------------------------
// Delta-8
// ---------------------------------------------------------------------------

/// Delta-encode a byte stream. Empty input encodes to zero bytes.
pub fn delta_encode(input: &[u8]) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(input.len() + input.len() / 4 + 1);
    out.push(input[0]);
    let mut last = input[0] as i16;

    for &b in &input[1..] {
        let delta = b as i16 - last;
        // -128 would collide with the escape byte, so it always escapes.
        if (-127..=127).contains(&delta) {
            out.push((delta as i8) as u8);
        } else {
            out.push(0x80);
            out.extend_from_slice(&delta.to_be_bytes());
        }
        last = b as i16;
    }
    out
}

/// Decode a Delta-8 stream.
pub fn delta_decode(input: &[u8]) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(input.len());
    let mut pos = 0;
    let mut last = input[pos] as i16;
    pos += 1;
    out.push(last as u8);

    while pos < input.len() {
        let byte = input[pos];
        pos += 1;
        let delta = if byte == 0x80 && pos + 2 <= input.len() {
            let d = i16::from_be_bytes([input[pos], input[pos + 1]]);
            pos += 2;
            d
        } else {
            (byte as i8) as i16
        };
        last = last.wrapping_add(delta);
        out.push(last as u8);
    }
    out
}

// ---------------------------------------------------------------------------
// Delta-16
// ---------------------------------------------------------------------------

/// Delta-encode a `u16` sample stream (pulse widths).
pub fn delta16_encode(input: &[u16]) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(input.len() * 2 + 2);
    out.extend_from_slice(&input[0].to_be_bytes());
    let mut last = input[0] as i32;

    for &v in &input[1..] {
        let delta = v as i32 - last;
        // -127 and -128 would collide with the 0x81/0x80 escapes.
        if (-126..=127).contains(&delta) {
            out.push((delta as i8) as u8);
        } else if (-32768..=32767).contains(&delta) {
            out.push(0x80);
            out.extend_from_slice(&(delta as i16).to_be_bytes());
        } else {
            out.push(0x81);
            out.extend_from_slice(&delta.to_be_bytes());
        }
        last = v as i32;
    }
    out
}

/// Decode at most `max_samples` from a Delta-16 stream, returning the
/// samples and the number of input bytes consumed.
pub fn delta16_decode_n(input: &[u8], max_samples: usize) -> (Vec<u16>, usize) {
    if input.len() < 2 || max_samples == 0 {
        return (Vec::new(), 0);
    }
    let mut out = Vec::with_capacity(max_samples.min(input.len()));
    let mut pos = 2;
    let mut last = u16::from_be_bytes([input[0], input[1]]) as i32;
    out.push(last as u16);

    while pos < input.len() && out.len() < max_samples {
        let byte = input[pos];
        pos += 1;
        let delta = match byte {
            0x80 if pos + 2 <= input.len() => {
                let d = i16::from_be_bytes([input[pos], input[pos + 1]]) as i32;
                pos += 2;
                d
            }
            0x81 if pos + 4 <= input.len() => {
                let d = i32::from_be_bytes([
                    input[pos],
                    input[pos + 1],
                    input[pos + 2],
                    input[pos + 3],
                ]);
                pos += 4;
                d
            }
            _ => (byte as i8) as i32,
        };
        last = last.wrapping_add(delta);
        out.push(last as u16);
    }
    (out, pos)
}

/// Decode an entire Delta-16 stream.
pub fn delta16_decode(input: &[u8]) -> Vec<u16> {
    delta16_decode_n(input, usize::MAX).0
}

// ---------------------------------------------------------------------------
// RLE
// ---------------------------------------------------------------------------

/// Run-length encode a byte stream.
pub fn rle_encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 8 + 1);
    let mut pos = 0;

    while pos < input.len() {
        let symbol = input[pos];
        let mut run = 1usize;
        while pos + run < input.len()
            && input[pos + run] == symbol
            && run < RLE_MAX_RUN_LENGTH
        {
            run += 1;
        }

        if run >= 3 {
            out.push(0x00);
            out.push(run as u8);
            out.push(symbol);
            pos += run;
        } else {
            if symbol == 0x00 {
                out.push(0x00);
                out.push(0x01);
            }
            out.push(symbol);
            pos += 1;
        }
    }
    out
}

/// Decode an RLE stream back to the original bytes.
pub fn rle_decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut pos = 0;

    while pos < input.len() {
        let byte = input[pos];
        pos += 1;

        if byte != 0x00 {
            out.push(byte);
            continue;
        }
        if pos >= input.len() {
            break;
        }
        let next = input[pos];
        pos += 1;
        match next {
            0x00 => out.push(0x00),
            0x01 => {
                if pos >= input.len() {
                    break;
                }
                out.push(input[pos]);
                pos += 1;
            }
            run => {
                if pos >= input.len() {
                    break;
                }
                let symbol = input[pos];
                pos += 1;
                out.extend(std::iter::repeat(symbol).take(run as usize));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Pulse-sequence codec
// ---------------------------------------------------------------------------

/// Pack a pulse sequence: count header, Delta-16 widths, level runs.
/// Sequences longer than `u16::MAX` are truncated to the header limit.
pub fn pulse_encode(pulses: &[Pulse]) -> Vec<u8> {
    if pulses.is_empty() {
        return Vec::new();
    }
    let count = pulses.len().min(u16::MAX as usize);
    let pulses = &pulses[..count];

    let mut out = Vec::with_capacity(count * 2 + 8);
    out.extend_from_slice(&(count as u16).to_be_bytes());

    let widths: Vec<u16> = pulses.iter().map(|p| p.width_us).collect();
    out.extend_from_slice(&delta16_encode(&widths));

    let mut current = pulses[0].level;
    let mut run: u8 = 1;
    for p in &pulses[1..] {
        if p.level == current && run < LEVEL_MAX_RUN_LENGTH {
            run += 1;
        } else {
            out.push((run << 1) | current.bit());
            current = p.level;
            run = 1;
        }
    }
    out.push((run << 1) | current.bit());
    out
}

/// Unpack a pulse sequence. Widths and levels round-trip exactly;
/// timestamps are reconstructed cumulatively from the widths.
pub fn pulse_decode(input: &[u8]) -> Vec<Pulse> {
    if input.len() < 2 {
        return Vec::new();
    }
    let count = u16::from_be_bytes([input[0], input[1]]) as usize;
    if count == 0 {
        return Vec::new();
    }

    let (widths, consumed) = delta16_decode_n(&input[2..], count);
    let mut pulses = Vec::with_capacity(count);
    let mut pos = 2 + consumed;
    let mut timestamp: u32 = 0;

    while pulses.len() < widths.len() && pos < input.len() {
        let packed = input[pos];
        pos += 1;
        let run = packed >> 1;
        let level = PulseLevel::from_bit(packed & 1);
        for _ in 0..run {
            if pulses.len() >= widths.len() {
                break;
            }
            let width = widths[pulses.len()];
            pulses.push(Pulse {
                level,
                width_us: width,
                timestamp_us: timestamp,
            });
            timestamp = timestamp.wrapping_add(width as u32);
        }
    }
    pulses
}

// ---------------------------------------------------------------------------
// Adaptive front door
// ---------------------------------------------------------------------------

/// Threshold ratio below which compression is not worth the escape
/// overhead: 1.2 in Q15.16.
const WORTHWHILE_RATIO: Fixed = Fixed::from_bits(78_643);

/// Compress with the chosen algorithm, resolving `Adaptive` by probing.
pub fn compress(input: &[u8], algorithm: CompressionAlgorithm) -> (Vec<u8>, CompressionStats) {
    let resolved = match algorithm {
        CompressionAlgorithm::Adaptive => select_algorithm(input),
        other => other,
    };

    let encoded = match resolved {
        CompressionAlgorithm::Delta => delta_encode(input),
        CompressionAlgorithm::Rle => rle_encode(input),
        _ => input.to_vec(),
    };

    let stats = CompressionStats {
        original_size: input.len(),
        compressed_size: encoded.len(),
        ratio: size_ratio(input.len(), encoded.len()),
        algorithm: resolved,
    };
    (encoded, stats)
}

/// Probe up to 256 bytes of the input with each codec and pick the one
/// whose ratio clears [`WORTHWHILE_RATIO`]; otherwise store raw.
pub fn select_algorithm(input: &[u8]) -> CompressionAlgorithm {
    let sample = &input[..input.len().min(256)];
    if sample.is_empty() {
        return CompressionAlgorithm::None;
    }

    let delta_ratio = size_ratio(sample.len(), delta_encode(sample).len());
    let rle_ratio = size_ratio(sample.len(), rle_encode(sample).len());

    if delta_ratio > rle_ratio && delta_ratio > WORTHWHILE_RATIO {
        CompressionAlgorithm::Delta
    } else if rle_ratio > WORTHWHILE_RATIO {
        CompressionAlgorithm::Rle
    } else {
        CompressionAlgorithm::None
    }
}

/// Estimate the compression ratio of `algorithm` on up to 256 bytes of input.
pub fn estimate_ratio(input: &[u8], algorithm: CompressionAlgorithm) -> Fixed {
    let sample = &input[..input.len().min(256)];
    if sample.is_empty() {
        return Fixed::ONE;
    }
    match algorithm {
        CompressionAlgorithm::Delta => size_ratio(sample.len(), delta_encode(sample).len()),
        CompressionAlgorithm::Rle => size_ratio(sample.len(), rle_encode(sample).len()),
        _ => Fixed::ONE,
    }
}

fn size_ratio(original: usize, compressed: usize) -> Fixed {
    if compressed == 0 {
        return Fixed::ONE;
    }
    Fixed::from_bits((((original as i64) << 16) / compressed as i64) as i32)
}

/// Indices of frames whose payload exactly duplicates an earlier frame.
pub fn find_duplicate_frames(frames: &[Frame]) -> Vec<u16> {
    let mut duplicates = Vec::new();
    for i in 0..frames.len() {
        for j in (i + 1)..frames.len() {
            if frames[i].length == frames[j].length
                && frames[i].payload() == frames[j].payload()
                && !duplicates.contains(&(j as u16))
            {
                duplicates.push(j as u16);
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_ramp_round_trip() {
        let data: Vec<u8> = (0..100).collect();
        let encoded = delta_encode(&data);
        assert_eq!(encoded.len(), data.len(), "unit deltas stay single-byte");
        assert_eq!(delta_decode(&encoded), data);
    }

    #[test]
    fn test_delta_large_jumps() {
        let data = [0u8, 200, 10, 255, 0];
        let encoded = delta_encode(&data);
        assert_eq!(delta_decode(&encoded), data);
    }

    #[test]
    fn test_delta_minus_128_escapes() {
        // Delta of exactly -128 must not alias the 0x80 escape byte.
        let data = [200u8, 72];
        let encoded = delta_encode(&data);
        assert_eq!(encoded, vec![200, 0x80, 0xFF, 0x80]);
        assert_eq!(delta_decode(&encoded), data);
    }

    #[test]
    fn test_delta_empty() {
        assert!(delta_encode(&[]).is_empty());
        assert!(delta_decode(&[]).is_empty());
    }

    #[test]
    fn test_delta16_round_trip() {
        let data = [500u16, 510, 505, 40_000, 100, 65_535, 0];
        let encoded = delta16_encode(&data);
        assert_eq!(delta16_decode(&encoded), data);
    }

    #[test]
    fn test_delta16_escape_boundaries() {
        // -126 fits in one byte; -127 and -128 collide with escapes.
        for pair in [[1000u16, 874], [1000, 873], [1000, 872]] {
            let encoded = delta16_encode(&pair);
            assert_eq!(delta16_decode(&encoded), pair, "pair {pair:?}");
        }
        assert_eq!(delta16_encode(&[1000, 874]).len(), 3);
        assert_eq!(delta16_encode(&[1000, 873]).len(), 5);
    }

    #[test]
    fn test_delta16_partial_decode_reports_consumed() {
        let widths = [100u16, 101, 102, 103];
        let mut stream = delta16_encode(&widths);
        let tail_start = stream.len();
        stream.extend_from_slice(&[0xAB, 0xCD]);

        let (decoded, consumed) = delta16_decode_n(&stream, widths.len());
        assert_eq!(decoded, widths);
        assert_eq!(consumed, tail_start);
    }

    #[test]
    fn test_rle_two_runs() {
        let mut data = vec![0xAA; 50];
        data.extend(vec![0xBB; 50]);
        let encoded = rle_encode(&data);
        assert!(encoded.len() <= 8, "encoded {} bytes", encoded.len());
        assert_eq!(rle_decode(&encoded), data);
    }

    #[test]
    fn test_rle_literal_zero() {
        let data = [1u8, 0, 2, 0, 0, 3];
        let encoded = rle_encode(&data);
        assert_eq!(rle_decode(&encoded), data);
    }

    #[test]
    fn test_rle_zero_run() {
        let data = [0u8; 10];
        let encoded = rle_encode(&data);
        assert_eq!(encoded, vec![0x00, 10, 0x00]);
        assert_eq!(rle_decode(&encoded), data);
    }

    #[test]
    fn test_rle_run_longer_than_token() {
        let data = vec![0x55u8; 600];
        let encoded = rle_encode(&data);
        assert!(encoded.len() <= 9);
        assert_eq!(rle_decode(&encoded), data);
    }

    #[test]
    fn test_rle_no_runs() {
        let data = [1u8, 2, 3, 4, 5];
        let encoded = rle_encode(&data);
        assert_eq!(encoded, data.to_vec());
        assert_eq!(rle_decode(&encoded), data);
    }

    fn make_pulses(widths: &[u16], levels: &[u8]) -> Vec<Pulse> {
        let mut ts = 0u32;
        widths
            .iter()
            .zip(levels.iter())
            .map(|(&w, &l)| {
                let p = Pulse::new(PulseLevel::from_bit(l), w, ts);
                ts += w as u32;
                p
            })
            .collect()
    }

    #[test]
    fn test_pulse_codec_round_trip() {
        let pulses = make_pulses(
            &[500, 1000, 480, 520, 1500, 470],
            &[1, 0, 1, 0, 1, 0],
        );
        let encoded = pulse_encode(&pulses);
        let decoded = pulse_decode(&encoded);
        assert_eq!(decoded.len(), pulses.len());
        for (a, b) in pulses.iter().zip(decoded.iter()) {
            assert_eq!(a.width_us, b.width_us);
            assert_eq!(a.level, b.level);
        }
    }

    #[test]
    fn test_pulse_codec_long_level_run() {
        let widths: Vec<u16> = (0..200).map(|i| 100 + i).collect();
        let levels = vec![1u8; 200];
        let pulses = make_pulses(&widths, &levels);
        let decoded = pulse_decode(&pulse_encode(&pulses));
        assert_eq!(decoded.len(), 200);
        assert!(decoded.iter().all(|p| p.level == PulseLevel::Mark));
        assert_eq!(decoded[199].width_us, 299);
    }

    #[test]
    fn test_pulse_codec_empty() {
        assert!(pulse_encode(&[]).is_empty());
        assert!(pulse_decode(&[]).is_empty());
    }

    #[test]
    fn test_pulse_timestamps_cumulative() {
        let pulses = make_pulses(&[100, 200, 300], &[1, 0, 1]);
        let decoded = pulse_decode(&pulse_encode(&pulses));
        assert_eq!(decoded[0].timestamp_us, 0);
        assert_eq!(decoded[1].timestamp_us, 100);
        assert_eq!(decoded[2].timestamp_us, 300);
    }

    #[test]
    fn test_select_algorithm() {
        let runs = vec![0x77u8; 200];
        assert_eq!(select_algorithm(&runs), CompressionAlgorithm::Rle);

        // A smooth ramp deltas to one byte per sample: no win, store raw.
        let ramp: Vec<u8> = (1..=200).map(|i| (i / 2) as u8).collect();
        assert_eq!(select_algorithm(&ramp), CompressionAlgorithm::None);

        assert_eq!(select_algorithm(&[]), CompressionAlgorithm::None);
    }

    #[test]
    fn test_compress_adaptive_resolves() {
        let data = vec![9u8; 64];
        let (encoded, stats) = compress(&data, CompressionAlgorithm::Adaptive);
        assert_eq!(stats.algorithm, CompressionAlgorithm::Rle);
        assert_eq!(stats.original_size, 64);
        assert_eq!(stats.compressed_size, encoded.len());
        assert!(stats.ratio > Fixed::ONE);
        assert_eq!(rle_decode(&encoded), data);
    }

    #[test]
    fn test_find_duplicate_frames() {
        let a = Frame::new(0, 100, -60, 433_920_000, &[1, 2, 3], 0, 4);
        let b = Frame::new(10, 100, -61, 433_920_000, &[4, 5, 6], 4, 4);
        let c = Frame::new(20, 100, -62, 433_920_000, &[1, 2, 3], 8, 4);
        let dups = find_duplicate_frames(&[a, b, c]);
        assert_eq!(dups, vec![2]);
    }
}
