//! Core facade: buffer ownership, event routing, and snapshots
//!
//! [`CoreContext`] is the single composition root the host talks to. It owns
//! the session pulse/frame buffers and all four analysis engines behind one
//! mutex, and presents two surfaces:
//!
//! - the **ingest surface** (`on_pulse`, `on_frame`, `on_rssi_sample`) —
//!   constant-time per event, callable from the capture thread;
//! - the **analyze/query surface** (`*_analyze`, `snapshot_*`, matching) —
//!   callable from the analysis/UI thread.
//!
//! Both surfaces serialize on the context mutex, so every snapshot is a
//! point-in-time consistent copy. The core never spawns threads and never
//! blocks other than on that mutex. Full buffers drop new items silently
//! and raise the corresponding [`Saturation`] counter.
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::context::CoreContext;
//!
//! let core = CoreContext::new();
//! core.fingerprinting_start();
//! for i in 0..100u32 {
//!     core.on_frame(i * 10_000, 3_200, -72, 433_920_000, &[0xA5; 16], 0, 32);
//! }
//! assert_eq!(core.fingerprint_progress(), 10);
//! assert!(core.healthy());
//! ```

use crate::clustering::{
    extract_frame_features, find_optimal_k, kmeans, Dataset, KMeansResult, StreamingClusterer,
};
use crate::compress::pulse_encode;
use crate::fingerprint::{export_fingerprint, FingerprintEngine, RfFingerprint};
use crate::protocol::{ProtocolHypothesis, ProtocolInferenceEngine};
use crate::threat::{ThreatAnalyzer, ThreatAssessment};
use crate::types::{CoreError, CoreResult, Frame, Pulse, PulseLevel, MAX_FRAME_COUNT, MAX_PULSE_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-buffer drop counters; non-zero values mean the host out-ran a
/// capacity and should treat the affected results as partial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saturation {
    pub pulses_dropped: u32,
    pub frames_dropped: u32,
    pub protocol_pulses_dropped: u32,
    pub protocol_frames_dropped: u32,
    pub threat_payloads_dropped: u32,
    pub cluster_points_dropped: u32,
}

impl Saturation {
    /// Whether any buffer has dropped anything.
    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}

struct CoreState {
    pulses: Vec<Pulse>,
    frames: Vec<Frame>,
    fingerprint: FingerprintEngine,
    protocol: ProtocolInferenceEngine,
    threat: ThreatAnalyzer,
    clusterer: StreamingClusterer,
    saturation: Saturation,
    healthy: bool,
}

impl CoreState {
    fn new() -> Self {
        Self {
            pulses: Vec::with_capacity(MAX_PULSE_COUNT),
            frames: Vec::with_capacity(MAX_FRAME_COUNT),
            fingerprint: FingerprintEngine::new(),
            protocol: ProtocolInferenceEngine::new(),
            threat: ThreatAnalyzer::new(),
            clusterer: StreamingClusterer::new(3),
            saturation: Saturation::default(),
            healthy: true,
        }
    }
}

/// Thread-safe facade over the analysis core.
pub struct CoreContext {
    inner: Mutex<CoreState>,
}

impl Default for CoreContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreContext {
    /// Create a core with all engines Idle and every buffer reserved to its
    /// compile-time capacity. No allocation grows after this call.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CoreState::new()),
        }
    }

    /// Engine state never unwinds, so a poisoned lock only means a caller
    /// panicked outside the core; the data is still consistent.
    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- ingest surface -----------------------------------------------------

    /// Ingest one demodulated pulse.
    pub fn on_pulse(&self, level: u8, width_us: u16, timestamp_us: u32) {
        let pulse = Pulse::new(PulseLevel::from_bit(level), width_us, timestamp_us);
        let mut state = self.lock();

        if state.pulses.len() < MAX_PULSE_COUNT {
            state.pulses.push(pulse);
        } else {
            state.saturation.pulses_dropped += 1;
        }
        if !state.protocol.add_pulse(&pulse) {
            state.saturation.protocol_pulses_dropped += 1;
        }
    }

    /// Ingest one reconstructed frame and fan it out to every engine.
    #[allow(clippy::too_many_arguments)]
    pub fn on_frame(
        &self,
        timestamp_us: u32,
        duration_us: u32,
        rssi_dbm: i16,
        frequency_hz: u32,
        payload: &[u8],
        pulse_start_idx: u16,
        pulse_count: u16,
    ) {
        let frame = Frame::new(
            timestamp_us,
            duration_us,
            rssi_dbm,
            frequency_hz,
            payload,
            pulse_start_idx,
            pulse_count,
        );
        let mut state = self.lock();

        if state.frames.len() < MAX_FRAME_COUNT {
            state.frames.push(frame);
        } else {
            state.saturation.frames_dropped += 1;
        }

        state.fingerprint.process_frame(&frame);
        if !state.protocol.add_frame(&frame) {
            state.saturation.protocol_frames_dropped += 1;
        }
        if state.threat.is_analyzing() && !state.threat.add_frame(&frame) {
            state.saturation.threat_payloads_dropped += 1;
        }
        for point in extract_frame_features(&frame) {
            if !state.clusterer.add_point(point) {
                state.saturation.cluster_points_dropped += 1;
            }
        }
    }

    /// Ingest one high-rate RSSI sample for slope analysis.
    pub fn on_rssi_sample(&self, rssi: u8, timestamp_us: u32) {
        self.lock().fingerprint.process_rssi_sample(rssi, timestamp_us);
    }

    // -- fingerprinting control/query ---------------------------------------

    pub fn fingerprinting_start(&self) {
        self.lock().fingerprint.start_capture();
    }

    pub fn fingerprinting_stop(&self) {
        self.lock().fingerprint.stop_capture();
    }

    /// Start a capture that enrolls the result under `name` on completion.
    pub fn fingerprinting_start_learning(&self, name: &str) -> CoreResult<()> {
        self.lock().fingerprint.start_learning(name)
    }

    /// Sampling progress, 0..=100.
    pub fn fingerprint_progress(&self) -> u8 {
        self.lock().fingerprint.progress_percent()
    }

    pub fn fingerprint_state_str(&self) -> &'static str {
        self.lock().fingerprint.state_str()
    }

    /// Copy of the most recent fingerprint.
    pub fn snapshot_fingerprint(&self) -> RfFingerprint {
        self.lock().fingerprint.snapshot_fingerprint()
    }

    /// Match a fingerprint against the device table.
    pub fn match_fingerprint(&self, fingerprint: &RfFingerprint, now_us: u32) -> (u8, Option<u16>) {
        self.lock().fingerprint.match_device(fingerprint, now_us)
    }

    /// Enroll a fingerprint directly (e.g. loaded from storage).
    pub fn add_device(
        &self,
        name: &str,
        fingerprint: RfFingerprint,
        now_us: u32,
    ) -> CoreResult<u16> {
        self.lock().fingerprint.add_device(name, fingerprint, now_us)
    }

    pub fn remove_device(&self, device_id: u16) -> bool {
        self.lock().fingerprint.remove_device(device_id)
    }

    pub fn device_count(&self) -> usize {
        self.lock().fingerprint.device_count()
    }

    /// Counterfeit probe against a claimed identity.
    pub fn detect_counterfeit(
        &self,
        fingerprint: &RfFingerprint,
        claimed_device: &str,
    ) -> CoreResult<u8> {
        self.lock().fingerprint.detect_counterfeit(fingerprint, claimed_device)
    }

    /// Binary fingerprint-file image for a stored device.
    pub fn export_device_fingerprint(&self, device_id: u16) -> CoreResult<Vec<u8>> {
        let state = self.lock();
        let entry = state
            .fingerprint
            .device(device_id)
            .ok_or_else(|| CoreError::UnknownDevice(format!("id {device_id}")))?;
        export_fingerprint(&entry.fingerprint, &entry.name)
    }

    // -- threat control/query ------------------------------------------------

    pub fn threat_start(&self) {
        self.lock().threat.start_analysis();
    }

    pub fn threat_stop(&self) {
        self.lock().threat.stop_analysis();
    }

    /// Run the full vulnerability assessment over collected frames.
    pub fn threat_assess(&self) -> ThreatAssessment {
        self.lock().threat.assess()
    }

    /// Copy of the last assessment.
    pub fn snapshot_assessment(&self) -> ThreatAssessment {
        self.lock().threat.snapshot_assessment()
    }

    /// Plain-text report, truncated to `max_len` bytes.
    pub fn threat_report(&self, max_len: usize) -> String {
        self.lock().threat.report_text(max_len)
    }

    // -- protocol control/query ----------------------------------------------

    /// Run the protocol-inference pipeline over accumulated pulses/frames.
    pub fn protocol_analyze(&self) -> CoreResult<()> {
        self.lock().protocol.analyze()
    }

    /// Copy of the current protocol hypothesis.
    pub fn snapshot_hypothesis(&self) -> ProtocolHypothesis {
        self.lock().protocol.snapshot_hypothesis()
    }

    // -- clustering ----------------------------------------------------------

    /// Run k-means over a caller-owned dataset. Structural corruption in
    /// the result latches [`healthy`](Self::healthy) false.
    pub fn cluster_run(&self, data: &mut Dataset, k: u8) -> KMeansResult {
        let result = kmeans(data, k);
        if !result.is_structurally_valid(data.len()) {
            self.lock().healthy = false;
            tracing::error!(k = result.k, "k-means result failed structural check");
        }
        result
    }

    /// Silhouette-driven k selection over a caller-owned dataset.
    pub fn cluster_find_optimal_k(
        &self,
        data: &mut Dataset,
        k_min: u8,
        k_max: u8,
    ) -> KMeansResult {
        let result = find_optimal_k(data, k_min, k_max);
        if !result.is_structurally_valid(data.len()) {
            self.lock().healthy = false;
        }
        result
    }

    /// Last completed streaming re-cluster over ingested frame features.
    pub fn snapshot_clusters(&self) -> KMeansResult {
        self.lock().clusterer.snapshot()
    }

    // -- session / export ----------------------------------------------------

    /// Point-in-time saturation counters.
    pub fn saturation(&self) -> Saturation {
        self.lock().saturation
    }

    /// False after a detected internal invariant violation; the host should
    /// tear the core down.
    pub fn healthy(&self) -> bool {
        self.lock().healthy
    }

    pub fn pulse_count(&self) -> usize {
        self.lock().pulses.len()
    }

    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    /// Copy of the session pulse buffer.
    pub fn export_pulses(&self) -> Vec<Pulse> {
        self.lock().pulses.clone()
    }

    /// Session pulses packed with the pulse-sequence codec.
    pub fn export_pulse_blob(&self) -> Vec<u8> {
        pulse_encode(&self.lock().pulses)
    }

    /// CSV rows for every session frame (no header).
    pub fn export_frames_csv(&self) -> String {
        let state = self.lock();
        let mut out = String::new();
        for frame in &state.frames {
            out.push_str(&frame_csv_row(frame));
            out.push('\n');
        }
        out
    }

    /// Return every engine to Idle with empty buffers. The device database
    /// survives; use [`remove_device`](Self::remove_device) to prune it.
    pub fn reset_session(&self) {
        let mut state = self.lock();
        state.pulses.clear();
        state.frames.clear();
        state.fingerprint.abort_capture();
        state.protocol.reset();
        state.threat.stop_analysis();
        state.clusterer.reset();
        state.saturation = Saturation::default();
        tracing::info!("session reset");
    }
}

/// One exporter row: `timestamp_us,frequency_hz,rssi_dbm,data_hex`.
pub fn frame_csv_row(frame: &Frame) -> String {
    let mut row = format!(
        "{},{},{},",
        frame.timestamp_us, frame.frequency_hz, frame.rssi_dbm
    );
    for byte in frame.payload() {
        let _ = write!(row, "{byte:02x}");
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::pulse_decode;
    use crate::clustering::DataPoint;
    use crate::fixed::Fixed;
    use crate::threat::RiskLevel;
    use std::sync::Arc;

    #[test]
    fn test_pulse_ingest_and_saturation() {
        let core = CoreContext::new();
        for i in 0..(MAX_PULSE_COUNT + 5) as u32 {
            core.on_pulse(1, 500, i * 1000);
        }
        assert_eq!(core.pulse_count(), MAX_PULSE_COUNT);
        assert_eq!(core.saturation().pulses_dropped, 5);
        assert!(core.saturation().any());
    }

    #[test]
    fn test_frame_ingest_fans_out() {
        let core = CoreContext::new();
        core.threat_start();
        for i in 0..60u32 {
            core.on_frame(i * 5_000, 2_000, -65, 433_920_000, &[0xAA, 0x55, i as u8], 0, 8);
        }
        assert_eq!(core.frame_count(), 60);
        // Two feature points per frame, re-clustered at the 50-point mark.
        let clusters = core.snapshot_clusters();
        assert!(clusters.k > 0);
        assert!(!core.saturation().any());
    }

    #[test]
    fn test_fingerprint_flow() {
        let core = CoreContext::new();
        core.fingerprinting_start();
        assert_eq!(core.fingerprint_state_str(), "SAMPLING");
        for i in 0..200u32 {
            core.on_frame(i * 10_000, 3_200, -70, 433_920_000, &[0x11; 16], 0, 32);
        }
        assert_eq!(core.fingerprint_progress(), 20);
        core.fingerprinting_stop();

        let fp = core.snapshot_fingerprint();
        assert_eq!(fp.drift_mean, 10_000);
        assert_eq!(fp.unique_hash, fp.compute_hash());

        let id = core.add_device("opener", fp, 0).unwrap();
        let (confidence, matched) = core.match_fingerprint(&fp, 100);
        assert_eq!(confidence, 100);
        assert_eq!(matched, Some(id));

        let blob = core.export_device_fingerprint(id).unwrap();
        assert!(blob.len() > RfFingerprint::RECORD_BYTES);
        assert!(core.export_device_fingerprint(99).is_err());
    }

    #[test]
    fn test_threat_flow_identical_frames() {
        let core = CoreContext::new();
        core.threat_start();
        for i in 0..256u32 {
            core.on_frame(i * 1_000, 500, -60, 315_000_000, &[0xAA; 16], 0, 4);
        }
        let assessment = core.threat_assess();
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!(assessment.vulnerability_score >= 900);

        let report = core.threat_report(2048);
        assert!(report.contains("CRITICAL"));
    }

    #[test]
    fn test_protocol_flow() {
        let core = CoreContext::new();
        let mut ts = 0u32;
        for i in 0..60 {
            let width = if i % 2 == 0 { 400 } else { 2_000 };
            core.on_pulse((i % 2 == 0) as u8, width, ts);
            ts += width as u32;
        }
        core.protocol_analyze().unwrap();
        let hyp = core.snapshot_hypothesis();
        assert!(hyp.overall_confidence > 0);
        assert_eq!(hyp.modulation.as_str(), "OOK");
    }

    #[test]
    fn test_protocol_analyze_without_data() {
        let core = CoreContext::new();
        assert!(core.protocol_analyze().is_err());
        // A zeroed hypothesis, not stale garbage.
        assert_eq!(core.snapshot_hypothesis().overall_confidence, 0);
    }

    #[test]
    fn test_cluster_run_keeps_healthy() {
        let core = CoreContext::new();
        let mut data = Dataset::new();
        for (x, y) in [(1, 1), (2, 1), (30, 30), (31, 31)] {
            data.push(DataPoint::new(Fixed::from_int(x), Fixed::from_int(y)));
        }
        let result = core.cluster_run(&mut data, 2);
        assert!(result.converged);
        assert!(core.healthy());

        let best = core.cluster_find_optimal_k(&mut data, 2, 3);
        assert!(best.k >= 2);
        assert!(core.healthy());
    }

    #[test]
    fn test_csv_row_format() {
        let frame = Frame::new(123_456, 1_000, -71, 433_920_000, &[0xDE, 0xAD, 0xBE], 0, 4);
        assert_eq!(frame_csv_row(&frame), "123456,433920000,-71,deadbe");
    }

    #[test]
    fn test_pulse_blob_round_trip() {
        let core = CoreContext::new();
        core.on_pulse(1, 500, 0);
        core.on_pulse(0, 1_000, 500);
        core.on_pulse(1, 480, 1_500);

        let blob = core.export_pulse_blob();
        let decoded = pulse_decode(&blob);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].width_us, 500);
        assert_eq!(decoded[1].width_us, 1_000);
        assert_eq!(decoded[2].level, PulseLevel::Mark);
    }

    #[test]
    fn test_reset_session() {
        let core = CoreContext::new();
        core.fingerprinting_start();
        core.threat_start();
        for i in 0..20u32 {
            core.on_pulse(1, 500, i * 600);
            core.on_frame(i * 5_000, 1_000, -60, 433_920_000, &[1, 2, 3], 0, 4);
        }
        core.reset_session();

        assert_eq!(core.pulse_count(), 0);
        assert_eq!(core.frame_count(), 0);
        assert_eq!(core.saturation(), Saturation::default());
        assert_eq!(core.snapshot_clusters().k, 0);
        assert_eq!(core.fingerprint_state_str(), "IDLE");
    }

    #[test]
    fn test_cross_thread_ingest_and_query() {
        let core = Arc::new(CoreContext::new());
        let ingest = Arc::clone(&core);

        let handle = std::thread::spawn(move || {
            for i in 0..500u32 {
                ingest.on_pulse((i % 2) as u8, 300 + (i % 7) as u16, i * 400);
                if i % 10 == 0 {
                    ingest.on_frame(i * 400, 2_000, -64, 868_000_000, &[i as u8; 8], 0, 16);
                }
            }
        });

        for _ in 0..100 {
            let _ = core.saturation();
            let _ = core.snapshot_hypothesis();
            let _ = core.fingerprint_progress();
        }
        handle.join().unwrap();
        assert_eq!(core.pulse_count(), 500);
        assert!(core.healthy());
    }
}
