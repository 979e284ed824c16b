//! Core types shared by every analysis engine
//!
//! This module defines the two capture primitives pushed into the core by the
//! radio front-end, [`Pulse`] and [`Frame`], together with the compile-time
//! capacity constants and the crate-wide error type.
//!
//! ## Capture model
//!
//! The front-end demodulates the sub-GHz channel into a stream of level
//! transitions. Each transition becomes a [`Pulse`] (level + width +
//! timestamp). When the demodulator recognises a burst, it reconstructs a
//! [`Frame`] that references the contiguous pulse slice it was built from:
//!
//! ```text
//!  level ─┐ ┌──┐    ┌─┐ ┌────┐
//!         │ │  │    │ │ │    │        pulses: mark/space widths in µs
//!  ───────┘ └──┘────┘ └─┘    └─────
//!         |<------- frame ------->|   frame: payload bytes + pulse range
//! ```
//!
//! Pulses and frames are immutable once ingested; engines only read them.

use serde::{Deserialize, Serialize};

/// Maximum pulses retained per capture session.
pub const MAX_PULSE_COUNT: usize = 4096;

/// Maximum frames retained per capture session.
pub const MAX_FRAME_COUNT: usize = 256;

/// Maximum demodulated payload bytes per frame.
pub const MAX_FRAME_DATA: usize = 64;

/// Minimum representable pulse width in microseconds.
pub const MIN_PULSE_WIDTH_US: u16 = 1;

/// Result type for fallible core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced across the core API.
///
/// The analysis hot paths never unwind: numerical edge cases resolve to
/// documented saturating substitutes, and full buffers silently drop new
/// items while raising a saturation flag. `CoreError` is reserved for API
/// misuse and structural problems the host must know about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("device database full ({0} entries)")]
    DatabaseFull(usize),

    #[error("device name too long: {actual} bytes (max {max})")]
    NameTooLong { actual: usize, max: usize },

    #[error("record too short: expected {expected} bytes, got {actual}")]
    RecordTooShort { expected: usize, actual: usize },

    #[error("record hash mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    HashMismatch { stored: u16, computed: u16 },

    #[error("insufficient samples: need {needed}, have {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("no device named {0:?} in database")]
    UnknownDevice(String),

    #[error("internal invariant broken: {0}")]
    InvariantBroken(&'static str),
}

/// Signal level of a demodulated pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulseLevel {
    /// Carrier absent (level 0).
    Space,
    /// Carrier present (level 1).
    Mark,
}

impl PulseLevel {
    /// Construct from the front-end's raw level bit. Any non-zero value is a mark.
    #[inline]
    pub fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            PulseLevel::Space
        } else {
            PulseLevel::Mark
        }
    }

    /// The raw level bit (0 or 1).
    #[inline]
    pub fn bit(self) -> u8 {
        match self {
            PulseLevel::Space => 0,
            PulseLevel::Mark => 1,
        }
    }

    #[inline]
    pub fn is_mark(self) -> bool {
        matches!(self, PulseLevel::Mark)
    }
}

/// A single demodulated level period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    /// Signal level during this period.
    pub level: PulseLevel,
    /// Width in microseconds, 1..=65535.
    pub width_us: u16,
    /// Absolute capture timestamp of the leading edge, 1 µs resolution.
    pub timestamp_us: u32,
}

impl Pulse {
    /// Create a pulse, clamping the width to the representable minimum.
    pub fn new(level: PulseLevel, width_us: u16, timestamp_us: u32) -> Self {
        Self {
            level,
            width_us: width_us.max(MIN_PULSE_WIDTH_US),
            timestamp_us,
        }
    }
}

/// A reconstructed frame referencing a contiguous slice of the pulse buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Capture timestamp of the first pulse, in microseconds.
    pub timestamp_us: u32,
    /// Total on-air duration in microseconds.
    pub duration_us: u32,
    /// RSSI at capture time, in dBm.
    pub rssi_dbm: i16,
    /// Center frequency of the capture, in Hz.
    pub frequency_hz: u32,
    /// Demodulated payload bytes; only the first `length` are valid.
    pub data: [u8; MAX_FRAME_DATA],
    /// Number of valid payload bytes, 0..=64.
    pub length: u8,
    /// Index of the first pulse of this frame in the session pulse buffer.
    pub pulse_start_idx: u16,
    /// Number of pulses spanned by this frame.
    pub pulse_count: u16,
}

impl Frame {
    /// Build a frame from a payload slice, truncating at [`MAX_FRAME_DATA`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp_us: u32,
        duration_us: u32,
        rssi_dbm: i16,
        frequency_hz: u32,
        payload: &[u8],
        pulse_start_idx: u16,
        pulse_count: u16,
    ) -> Self {
        let len = payload.len().min(MAX_FRAME_DATA);
        let mut data = [0u8; MAX_FRAME_DATA];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            timestamp_us,
            duration_us,
            rssi_dbm,
            frequency_hz,
            data,
            length: len as u8,
            pulse_start_idx,
            pulse_count,
        }
    }

    /// The valid payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length as usize]
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            duration_us: 0,
            rssi_dbm: 0,
            frequency_hz: 0,
            data: [0; MAX_FRAME_DATA],
            length: 0,
            pulse_start_idx: 0,
            pulse_count: 0,
        }
    }
}
