//! Physical-layer RF device fingerprinting
//!
//! Every transmitter carries analog imperfections (oscillator drift,
//! envelope asymmetry, clock instability) that survive demodulation.
//! This engine distils a frame stream into a compact
//! [`RfFingerprint`], matches it against a bounded device database with a
//! weighted similarity metric, and tracks per-device drift over time so a
//! slowly changing (or swapped) transmitter is flagged.
//!
//! The capture path is a small state machine:
//!
//! ```text
//! Idle -> Sampling -> Analyzing -> Matching -> Idle
//!           |  (learning captures take the same path and
//!           v   enroll the result under the pending name)
//!        Learning
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::fingerprint::RfFingerprint;
//!
//! let mut fp = RfFingerprint {
//!     drift_mean: 10_000,
//!     clock_stability_ppm: 12,
//!     ..Default::default()
//! };
//! fp.seal();
//! assert_eq!(fp.unique_hash, fp.compute_hash());
//! assert_eq!(fp.similarity(&fp), 100);
//! ```

use crate::crc::crc16_ccitt;
use crate::stats::{isqrt_u64, SampleSummary};
use crate::types::{CoreError, CoreResult, Frame};
use serde::{Deserialize, Serialize};

/// Frames collected before a capture auto-completes.
pub const FINGERPRINT_SAMPLE_COUNT: usize = 1000;

/// RSSI samples retained for slope analysis.
pub const MAX_SLOPE_SAMPLES: usize = 256;

/// Points in the RSSI envelope signature.
pub const RSSI_SIGNATURE_POINTS: usize = 16;

/// Device database capacity.
pub const MAX_DEVICE_ENTRIES: usize = 128;

/// Fingerprints retained per temporal device record.
pub const TEMPORAL_HISTORY: usize = 10;

/// Longest device name, in bytes.
pub const MAX_DEVICE_NAME: usize = 15;

/// Confidence thresholds for the match bands.
pub const CONFIDENCE_HIGH: u8 = 90;
pub const CONFIDENCE_MEDIUM: u8 = 70;
pub const CONFIDENCE_LOW: u8 = 50;

/// Weighted distance at (or beyond) which two fingerprints are unrelated.
const MAX_WEIGHTED_DISTANCE: u32 = 10_000;

/// Drift percentage above which a temporal record flags drift.
const DRIFT_DETECT_PERCENT: u8 = 20;

// Component weights of the similarity metric, in percent.
const DRIFT_WEIGHT: u32 = 30;
const SLOPE_WEIGHT: u32 = 25;
const CLOCK_WEIGHT: u32 = 20;
const RSSI_WEIGHT: u32 = 25;

/// Capture state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    Sampling,
    Analyzing,
    Matching,
    Learning,
}

impl CaptureState {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureState::Idle => "IDLE",
            CaptureState::Sampling => "SAMPLING",
            CaptureState::Analyzing => "ANALYZING",
            CaptureState::Matching => "MATCHING",
            CaptureState::Learning => "LEARNING",
        }
    }
}

/// Match quality band derived from a similarity percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchConfidence {
    None,
    Low,
    Medium,
    High,
}

impl MatchConfidence {
    pub fn from_percent(confidence: u8) -> Self {
        if confidence >= CONFIDENCE_HIGH {
            MatchConfidence::High
        } else if confidence >= CONFIDENCE_MEDIUM {
            MatchConfidence::Medium
        } else if confidence >= CONFIDENCE_LOW {
            MatchConfidence::Low
        } else {
            MatchConfidence::None
        }
    }
}

// ---------------------------------------------------------------------------
// Fingerprint record
// ---------------------------------------------------------------------------

/// Compact physical-layer fingerprint of one transmitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfFingerprint {
    /// Mean inter-frame interval, µs.
    pub drift_mean: u32,
    /// Variance of the inter-frame interval, µs².
    pub drift_variance: u32,
    /// Mean rising RSSI slope, units/µs.
    pub rise_time_avg: u16,
    /// Mean falling RSSI slope, units/µs.
    pub fall_time_avg: u16,
    /// Symbol-clock deviation in ppm, clamped to 255.
    pub clock_stability_ppm: u8,
    /// 16-point RSSI envelope, each byte `rssi_dbm + 128`.
    pub rssi_signature: [u8; RSSI_SIGNATURE_POINTS],
    /// CRC-16-CCITT over every other field; recompute after any change.
    pub unique_hash: u16,
}

impl RfFingerprint {
    /// Serialized record size in bytes.
    pub const RECORD_BYTES: usize = 31;
    /// Bytes covered by the hash (everything before the hash field).
    const HASHED_BYTES: usize = 29;

    /// Serialize to the on-disk little-endian layout.
    pub fn to_bytes(&self) -> [u8; Self::RECORD_BYTES] {
        let mut out = [0u8; Self::RECORD_BYTES];
        out[0..4].copy_from_slice(&self.drift_mean.to_le_bytes());
        out[4..8].copy_from_slice(&self.drift_variance.to_le_bytes());
        out[8..10].copy_from_slice(&self.rise_time_avg.to_le_bytes());
        out[10..12].copy_from_slice(&self.fall_time_avg.to_le_bytes());
        out[12] = self.clock_stability_ppm;
        out[13..29].copy_from_slice(&self.rssi_signature);
        out[29..31].copy_from_slice(&self.unique_hash.to_le_bytes());
        out
    }

    /// Deserialize and verify the stored hash.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() < Self::RECORD_BYTES {
            return Err(CoreError::RecordTooShort {
                expected: Self::RECORD_BYTES,
                actual: bytes.len(),
            });
        }
        let mut signature = [0u8; RSSI_SIGNATURE_POINTS];
        signature.copy_from_slice(&bytes[13..29]);
        let record = Self {
            drift_mean: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            drift_variance: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            rise_time_avg: u16::from_le_bytes(bytes[8..10].try_into().unwrap()),
            fall_time_avg: u16::from_le_bytes(bytes[10..12].try_into().unwrap()),
            clock_stability_ppm: bytes[12],
            rssi_signature: signature,
            unique_hash: u16::from_le_bytes(bytes[29..31].try_into().unwrap()),
        };
        let computed = record.compute_hash();
        if computed != record.unique_hash {
            return Err(CoreError::HashMismatch {
                stored: record.unique_hash,
                computed,
            });
        }
        Ok(record)
    }

    /// CRC-16-CCITT over the serialized record, excluding the hash field.
    pub fn compute_hash(&self) -> u16 {
        crc16_ccitt(&self.to_bytes()[..Self::HASHED_BYTES])
    }

    /// Store the freshly computed hash in the record.
    pub fn seal(&mut self) {
        self.unique_hash = self.compute_hash();
    }

    /// Weighted feature distance: drift 30%, slopes 25%, clock 20%,
    /// RSSI envelope 25%.
    pub fn weighted_distance(&self, other: &RfFingerprint) -> u32 {
        let drift_dist = self.drift_mean.abs_diff(other.drift_mean)
            + self.drift_variance.abs_diff(other.drift_variance) / 10;

        let slope_dist = (self.rise_time_avg.abs_diff(other.rise_time_avg)
            + self.fall_time_avg.abs_diff(other.fall_time_avg)) as u32;

        let clock_dist =
            self.clock_stability_ppm.abs_diff(other.clock_stability_ppm) as u32;

        let mut rssi_dist = 0u32;
        for (a, b) in self.rssi_signature.iter().zip(other.rssi_signature.iter()) {
            rssi_dist += a.abs_diff(*b) as u32;
        }

        (drift_dist.saturating_mul(DRIFT_WEIGHT) / 100)
            .saturating_add(slope_dist * SLOPE_WEIGHT / 100)
            .saturating_add(clock_dist * CLOCK_WEIGHT / 100)
            .saturating_add(rssi_dist * RSSI_WEIGHT / 100)
    }

    /// Unweighted Euclidean distance (clock deviation weighted 100×).
    pub fn euclidean_distance(&self, other: &RfFingerprint) -> u32 {
        let mut sum: u64 = 0;
        let d = self.drift_mean.abs_diff(other.drift_mean) as u64;
        sum += d * d;
        let d = self.drift_variance.abs_diff(other.drift_variance) as u64;
        sum += d * d;
        let d = self.rise_time_avg.abs_diff(other.rise_time_avg) as u64;
        sum += d * d;
        let d = self.fall_time_avg.abs_diff(other.fall_time_avg) as u64;
        sum += d * d;
        let d = self.clock_stability_ppm.abs_diff(other.clock_stability_ppm) as u64;
        sum += d * d * 100;
        for (a, b) in self.rssi_signature.iter().zip(other.rssi_signature.iter()) {
            let d = a.abs_diff(*b) as u64;
            sum += d * d;
        }
        isqrt_u64(sum)
    }

    /// Unweighted Manhattan distance (clock deviation weighted 10×).
    pub fn manhattan_distance(&self, other: &RfFingerprint) -> u32 {
        let mut sum = self.drift_mean.abs_diff(other.drift_mean);
        sum += self.drift_variance.abs_diff(other.drift_variance);
        sum += self.rise_time_avg.abs_diff(other.rise_time_avg) as u32;
        sum += self.fall_time_avg.abs_diff(other.fall_time_avg) as u32;
        sum += self.clock_stability_ppm.abs_diff(other.clock_stability_ppm) as u32 * 10;
        for (a, b) in self.rssi_signature.iter().zip(other.rssi_signature.iter()) {
            sum += a.abs_diff(*b) as u32;
        }
        sum
    }

    /// Similarity as an integer percentage: 100 at zero distance, falling
    /// linearly to 0 at the maximum expected distance.
    pub fn similarity(&self, other: &RfFingerprint) -> u8 {
        let distance = self.weighted_distance(other);
        if distance >= MAX_WEIGHTED_DISTANCE {
            return 0;
        }
        (100 - distance * 100 / MAX_WEIGHTED_DISTANCE) as u8
    }
}

/// Serialize a fingerprint plus its device name into the binary file image:
/// the 31-byte record followed by a NUL-terminated UTF-8 name.
pub fn export_fingerprint(fingerprint: &RfFingerprint, name: &str) -> CoreResult<Vec<u8>> {
    if name.len() > MAX_DEVICE_NAME {
        return Err(CoreError::NameTooLong {
            actual: name.len(),
            max: MAX_DEVICE_NAME,
        });
    }
    let mut out = Vec::with_capacity(RfFingerprint::RECORD_BYTES + name.len() + 1);
    out.extend_from_slice(&fingerprint.to_bytes());
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    Ok(out)
}

/// Parse a fingerprint file image back into the record and name.
pub fn import_fingerprint(bytes: &[u8]) -> CoreResult<(RfFingerprint, String)> {
    let record = RfFingerprint::from_bytes(bytes)?;
    let name_bytes = &bytes[RfFingerprint::RECORD_BYTES..];
    let end = name_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(name_bytes.len())
        .min(MAX_DEVICE_NAME);
    let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
    Ok((record, name))
}

// ---------------------------------------------------------------------------
// Device database entries
// ---------------------------------------------------------------------------

/// One enrolled device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub fingerprint: RfFingerprint,
    pub name: String,
    pub first_seen: u32,
    pub last_seen: u32,
    pub match_count: u32,
}

/// Drift-tracking record for one device: baseline plus a ring of the most
/// recent matched fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRecord {
    pub device_id: u16,
    pub baseline: RfFingerprint,
    history: [RfFingerprint; TEMPORAL_HISTORY],
    history_count: u32,
    pub first_seen: u32,
    pub last_seen: u32,
    pub match_count: u32,
    pub drift_detected: bool,
    /// Last computed drift from baseline, percent.
    pub drift_magnitude: u8,
}

impl TemporalRecord {
    fn new(device_id: u16, baseline: RfFingerprint, now_us: u32) -> Self {
        Self {
            device_id,
            baseline,
            history: [RfFingerprint::default(); TEMPORAL_HISTORY],
            history_count: 0,
            first_seen: now_us,
            last_seen: now_us,
            match_count: 0,
            drift_detected: false,
            drift_magnitude: 0,
        }
    }

    fn push_history(&mut self, fingerprint: RfFingerprint) {
        let idx = (self.history_count as usize) % TEMPORAL_HISTORY;
        self.history[idx] = fingerprint;
        self.history_count += 1;
    }

    /// Valid history entries (ring order, oldest not guaranteed first).
    pub fn history(&self) -> &[RfFingerprint] {
        let len = (self.history_count as usize).min(TEMPORAL_HISTORY);
        &self.history[..len]
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Capture, analysis, matching, and enrollment engine.
#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    state: CaptureState,
    frames_captured: u32,
    last_frame_timestamp: u32,
    intervals: Vec<u32>,
    symbol_timings: Vec<u32>,
    rssi_samples: Vec<u8>,
    rssi_envelope: [u8; RSSI_SIGNATURE_POINTS],
    current: RfFingerprint,
    learning_name: Option<String>,
    devices: Vec<DeviceEntry>,
    temporal: Vec<TemporalRecord>,
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintEngine {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            frames_captured: 0,
            last_frame_timestamp: 0,
            intervals: Vec::with_capacity(FINGERPRINT_SAMPLE_COUNT),
            symbol_timings: Vec::with_capacity(FINGERPRINT_SAMPLE_COUNT),
            rssi_samples: Vec::with_capacity(MAX_SLOPE_SAMPLES),
            rssi_envelope: [0; RSSI_SIGNATURE_POINTS],
            current: RfFingerprint::default(),
            learning_name: None,
            devices: Vec::with_capacity(MAX_DEVICE_ENTRIES),
            temporal: Vec::with_capacity(MAX_DEVICE_ENTRIES),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn state_str(&self) -> &'static str {
        self.state.as_str()
    }

    /// Begin an anonymous capture.
    pub fn start_capture(&mut self) {
        self.reset_capture();
        self.state = CaptureState::Sampling;
        tracing::info!("fingerprint capture started");
    }

    /// Begin a capture that will enroll the result under `name`.
    pub fn start_learning(&mut self, name: &str) -> CoreResult<()> {
        if name.len() > MAX_DEVICE_NAME {
            return Err(CoreError::NameTooLong {
                actual: name.len(),
                max: MAX_DEVICE_NAME,
            });
        }
        self.reset_capture();
        self.state = CaptureState::Learning;
        self.learning_name = Some(name.to_owned());
        tracing::info!(device = name, "fingerprint learning started");
        Ok(())
    }

    /// Stop sampling. A capture with at least one frame is finalized and
    /// analyzed; an empty one returns to Idle.
    pub fn stop_capture(&mut self) {
        if self.is_capturing() && self.frames_captured > 0 {
            self.finish_capture();
        } else {
            self.state = CaptureState::Idle;
            tracing::info!("fingerprint capture stopped with no frames");
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Sampling | CaptureState::Learning)
    }

    /// Sampling progress as 0..=100. Outside a capture this reports 100.
    pub fn progress_percent(&self) -> u8 {
        if !self.is_capturing() {
            return 100;
        }
        ((self.frames_captured as u64 * 100) / FINGERPRINT_SAMPLE_COUNT as u64).min(100) as u8
    }

    /// Fold one frame into the capture. No-op outside Sampling/Learning.
    pub fn process_frame(&mut self, frame: &Frame) {
        if !self.is_capturing() {
            return;
        }
        let now = frame.timestamp_us;

        if self.last_frame_timestamp > 0 && self.intervals.len() < FINGERPRINT_SAMPLE_COUNT {
            self.intervals
                .push(now.wrapping_sub(self.last_frame_timestamp));
        }
        self.last_frame_timestamp = now;

        if frame.length > 0 && self.symbol_timings.len() < FINGERPRINT_SAMPLE_COUNT {
            self.symbol_timings
                .push(frame.duration_us / frame.length as u32);
        }

        let idx = (self.frames_captured as usize) % RSSI_SIGNATURE_POINTS;
        self.rssi_envelope[idx] = rssi_to_offset_byte(frame.rssi_dbm);

        self.frames_captured += 1;
        if self.frames_captured as usize >= FINGERPRINT_SAMPLE_COUNT {
            self.finish_capture();
        }
    }

    /// Fold one high-rate RSSI sample into the slope buffer.
    pub fn process_rssi_sample(&mut self, rssi: u8, _timestamp_us: u32) {
        if !self.is_capturing() {
            return;
        }
        if self.rssi_samples.len() < MAX_SLOPE_SAMPLES {
            self.rssi_samples.push(rssi);
        }
    }

    fn finish_capture(&mut self) {
        self.state = CaptureState::Analyzing;
        self.analyze();
        tracing::info!(
            frames = self.frames_captured,
            hash = self.current.unique_hash,
            "fingerprint capture complete"
        );

        if let Some(name) = self.learning_name.take() {
            let fp = self.current;
            let now = self.last_frame_timestamp;
            match self.add_device(&name, fp, now) {
                Ok(id) => tracing::info!(device = %name, id, "device enrolled"),
                Err(e) => tracing::warn!(device = %name, error = %e, "enrollment failed"),
            }
            self.state = CaptureState::Idle;
        } else {
            self.state = CaptureState::Matching;
        }
    }

    /// Derive all fingerprint features from the capture buffers.
    fn analyze(&mut self) {
        if self.intervals.len() >= 10 {
            let stats = SampleSummary::from_samples(&self.intervals);
            self.current.drift_mean = stats.mean;
            self.current.drift_variance = stats.variance;
        }

        if self.rssi_samples.len() >= 10 {
            let (rise, fall) = mean_slopes(&self.rssi_samples);
            self.current.rise_time_avg = rise;
            self.current.fall_time_avg = fall;
        }

        if self.symbol_timings.len() >= 10 {
            let stats = SampleSummary::from_samples(&self.symbol_timings);
            if stats.mean > 0 {
                let ppm = (stats.std_dev as u64 * 1_000_000) / stats.mean as u64;
                self.current.clock_stability_ppm = ppm.min(255) as u8;
            }
        }

        self.current.rssi_signature = self.rssi_envelope;
        self.current.seal();
    }

    /// Point-in-time copy of the current fingerprint (zeroed before the
    /// first completed analysis).
    pub fn snapshot_fingerprint(&self) -> RfFingerprint {
        self.current
    }

    fn reset_capture(&mut self) {
        self.frames_captured = 0;
        self.last_frame_timestamp = 0;
        self.intervals.clear();
        self.symbol_timings.clear();
        self.rssi_samples.clear();
        self.rssi_envelope = [0; RSSI_SIGNATURE_POINTS];
        self.current = RfFingerprint::default();
        self.learning_name = None;
    }

    /// Abandon any in-progress capture and return to Idle, discarding the
    /// partial sample buffers. The device database is untouched.
    pub fn abort_capture(&mut self) {
        self.reset_capture();
        self.state = CaptureState::Idle;
    }

    /// Reset everything, including the device database.
    pub fn reset(&mut self) {
        self.reset_capture();
        self.state = CaptureState::Idle;
        self.devices.clear();
        self.temporal.clear();
    }

    // -- device database ----------------------------------------------------

    /// Enroll a fingerprint under a name, returning the new device id.
    pub fn add_device(
        &mut self,
        name: &str,
        fingerprint: RfFingerprint,
        now_us: u32,
    ) -> CoreResult<u16> {
        if self.devices.len() >= MAX_DEVICE_ENTRIES {
            return Err(CoreError::DatabaseFull(MAX_DEVICE_ENTRIES));
        }
        if name.len() > MAX_DEVICE_NAME {
            return Err(CoreError::NameTooLong {
                actual: name.len(),
                max: MAX_DEVICE_NAME,
            });
        }
        self.devices.push(DeviceEntry {
            fingerprint,
            name: name.to_owned(),
            first_seen: now_us,
            last_seen: now_us,
            match_count: 1,
        });
        Ok((self.devices.len() - 1) as u16)
    }

    /// Delete a device. Later ids shift down; temporal records follow.
    pub fn remove_device(&mut self, device_id: u16) -> bool {
        let idx = device_id as usize;
        if idx >= self.devices.len() {
            return false;
        }
        self.devices.remove(idx);
        self.temporal.retain(|r| r.device_id != device_id);
        for record in &mut self.temporal {
            if record.device_id > device_id {
                record.device_id -= 1;
            }
        }
        tracing::info!(device_id, "device removed from database");
        true
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, device_id: u16) -> Option<&DeviceEntry> {
        self.devices.get(device_id as usize)
    }

    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    pub fn find_device_by_name(&self, name: &str) -> Option<u16> {
        self.devices
            .iter()
            .position(|d| d.name == name)
            .map(|i| i as u16)
    }

    /// Temporal drift record for a device, if one exists.
    pub fn temporal_record(&self, device_id: u16) -> Option<&TemporalRecord> {
        self.temporal.iter().find(|r| r.device_id == device_id)
    }

    // -- matching -----------------------------------------------------------

    /// Match a fingerprint against the database. Returns the best confidence
    /// and, when it reaches the Low band, the matched device id (updating
    /// that device's temporal record).
    pub fn match_device(
        &mut self,
        fingerprint: &RfFingerprint,
        now_us: u32,
    ) -> (u8, Option<u16>) {
        let mut best_confidence = 0u8;
        let mut best_id = 0u16;

        for (i, entry) in self.devices.iter().enumerate() {
            let confidence = fingerprint.similarity(&entry.fingerprint);
            if confidence > best_confidence {
                best_confidence = confidence;
                best_id = i as u16;
            }
        }

        if best_confidence >= CONFIDENCE_LOW {
            let entry = &mut self.devices[best_id as usize];
            entry.last_seen = now_us;
            entry.match_count += 1;
            self.update_temporal(best_id, fingerprint, now_us);
            (best_confidence, Some(best_id))
        } else {
            (best_confidence, None)
        }
    }

    fn update_temporal(&mut self, device_id: u16, fingerprint: &RfFingerprint, now_us: u32) {
        let idx = match self.temporal.iter().position(|r| r.device_id == device_id) {
            Some(i) => i,
            None => {
                if self.temporal.len() >= MAX_DEVICE_ENTRIES {
                    return;
                }
                self.temporal
                    .push(TemporalRecord::new(device_id, *fingerprint, now_us));
                self.temporal.len() - 1
            }
        };
        let record = &mut self.temporal[idx];

        record.push_history(*fingerprint);
        record.last_seen = now_us;
        record.match_count += 1;

        // Refresh drift against the enrollment baseline.
        let distance = record.baseline.euclidean_distance(fingerprint);
        let drift_percent = (distance / (MAX_WEIGHTED_DISTANCE / 100)).min(100) as u8;
        record.drift_magnitude = drift_percent;
        record.drift_detected = drift_percent > DRIFT_DETECT_PERCENT;
        if record.drift_detected {
            tracing::warn!(device_id, drift_percent, "temporal drift detected");
        }
    }

    /// Drift of `fingerprint` against a device's baseline:
    /// `(drift_detected, drift_percent)`. Unknown devices report no drift.
    pub fn check_drift(&mut self, device_id: u16, fingerprint: &RfFingerprint) -> (bool, u8) {
        let record = match self.temporal.iter_mut().find(|r| r.device_id == device_id) {
            Some(r) => r,
            None => return (false, 0),
        };
        let distance = record.baseline.euclidean_distance(fingerprint);
        let drift_percent = (distance / (MAX_WEIGHTED_DISTANCE / 100)).min(100) as u8;
        record.drift_magnitude = drift_percent;
        record.drift_detected = drift_percent > DRIFT_DETECT_PERCENT;
        (record.drift_detected, drift_percent)
    }

    /// Counterfeit check: confidence against the claimed device, forced to
    /// zero when any other enrolled device matches better.
    pub fn detect_counterfeit(
        &self,
        fingerprint: &RfFingerprint,
        claimed_device: &str,
    ) -> CoreResult<u8> {
        let claimed_id = self
            .find_device_by_name(claimed_device)
            .ok_or_else(|| CoreError::UnknownDevice(claimed_device.to_owned()))?;

        let claimed_confidence =
            fingerprint.similarity(&self.devices[claimed_id as usize].fingerprint);

        let mut best_other = 0u8;
        for (i, entry) in self.devices.iter().enumerate() {
            if i as u16 == claimed_id {
                continue;
            }
            best_other = best_other.max(fingerprint.similarity(&entry.fingerprint));
        }

        if best_other > claimed_confidence {
            tracing::warn!(
                claimed = claimed_device,
                claimed_confidence,
                best_other,
                "counterfeit indication"
            );
            Ok(0)
        } else {
            Ok(claimed_confidence)
        }
    }
}

/// Map a dBm reading into the unsigned envelope byte `rssi + 128`.
fn rssi_to_offset_byte(rssi_dbm: i16) -> u8 {
    (rssi_dbm + 128).clamp(0, 255) as u8
}

/// Mean positive and negative first differences of an RSSI sample run.
fn mean_slopes(samples: &[u8]) -> (u16, u16) {
    let mut total_rise = 0u32;
    let mut total_fall = 0u32;
    let mut rise_count = 0u32;
    let mut fall_count = 0u32;

    for pair in samples.windows(2) {
        let diff = pair[1] as i16 - pair[0] as i16;
        if diff > 0 {
            total_rise += diff as u32;
            rise_count += 1;
        } else if diff < 0 {
            total_fall += (-diff) as u32;
            fall_count += 1;
        }
    }

    let rise = if rise_count > 0 {
        (total_rise / rise_count) as u16
    } else {
        0
    };
    let fall = if fall_count > 0 {
        (total_fall / fall_count) as u16
    } else {
        0
    };
    (rise, fall)
}
