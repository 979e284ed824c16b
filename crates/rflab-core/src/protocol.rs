//! Blind protocol inference from pulse timing
//!
//! Derives a structured hypothesis about an unknown sub-GHz protocol from
//! demodulated pulses and frames: modulation class, bit encoding, symbol
//! timing and baud rate, preamble, and frame layout, each with its own
//! confidence, combined into an overall score.
//!
//! The pipeline mirrors how a human analyst reads a pulse view:
//!
//! 1. Histogram mark and space widths separately.
//! 2. Find up to three width peaks (the symbol alphabet).
//! 3. Classify modulation from pulse-length shape (OOK ≻ FSK ≻ ASK).
//! 4. Classify encoding from transition rate and peak ratios.
//! 5. Take the shortest symbol as the base period; derive baud.
//! 6. Find the longest byte prefix shared by all frames (preamble).
//! 7. Estimate payload/checksum split from average frame length.
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::protocol::ProtocolInferenceEngine;
//! use rflab_core::types::{Frame, Pulse, PulseLevel};
//!
//! let mut engine = ProtocolInferenceEngine::new();
//! let mut ts = 0;
//! for i in 0..40 {
//!     let width = if i % 2 == 0 { 500 } else { 1500 };
//!     let level = if i % 2 == 0 { PulseLevel::Mark } else { PulseLevel::Space };
//!     engine.add_pulse(&Pulse::new(level, width, ts));
//!     ts += width as u32;
//! }
//! engine.analyze().unwrap();
//! assert!(engine.hypothesis().overall_confidence > 0);
//! ```

use crate::stats::SampleSummary;
use crate::types::{CoreError, CoreResult, Frame, Pulse};
use serde::{Deserialize, Serialize};

/// Pulses retained for analysis.
pub const MAX_PROTOCOL_PULSES: usize = 4096;

/// Frames retained for analysis.
pub const MAX_PROTOCOL_FRAMES: usize = 100;

/// Width-histogram resolution.
pub const MAX_PULSE_BINS: usize = 256;

/// Symbol alphabet capacity of a hypothesis.
pub const MAX_SYMBOL_TYPES: usize = 8;

/// Peaks extracted from the mark histogram.
pub const MAX_SYMBOL_CLUSTERS: usize = 3;

/// Minimum pulses before [`ProtocolInferenceEngine::analyze`] will run.
pub const MIN_ANALYSIS_PULSES: usize = 10;

/// Minimum frames that also satisfy the analysis precondition.
pub const MIN_ANALYSIS_FRAMES: usize = 2;

/// Pulse width above which a pulse reads as OOK keying.
const OOK_WIDTH_THRESHOLD_US: u16 = 1000;

/// Modulation classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modulation {
    Ook,
    Ask,
    Fsk,
    Gfsk,
    Msk,
    Psk,
    #[default]
    Unknown,
}

impl Modulation {
    pub fn as_str(self) -> &'static str {
        match self {
            Modulation::Ook => "OOK",
            Modulation::Ask => "ASK",
            Modulation::Fsk => "FSK",
            Modulation::Gfsk => "GFSK",
            Modulation::Msk => "MSK",
            Modulation::Psk => "PSK",
            Modulation::Unknown => "Unknown",
        }
    }
}

/// Bit-encoding classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Nrz,
    Manchester,
    ManchesterIeee,
    Miller,
    Pwm,
    Ppm,
    Rz,
    #[default]
    Unknown,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Nrz => "NRZ",
            Encoding::Manchester => "Manchester",
            Encoding::ManchesterIeee => "Manchester-IEEE",
            Encoding::Miller => "Miller",
            Encoding::Pwm => "PWM",
            Encoding::Ppm => "PPM",
            Encoding::Rz => "RZ",
            Encoding::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Timing histogram
// ---------------------------------------------------------------------------

/// Integer-microsecond pulse-width histogram with linear binning between
/// the observed extremes.
#[derive(Debug, Clone, Default)]
pub struct TimingHistogram {
    bins: Vec<u32>,
    pub min_width_us: u16,
    pub max_width_us: u16,
    pub bin_width_us: u16,
    pub total_samples: u32,
    pub peak_bin: usize,
    pub peak_count: u32,
}

impl TimingHistogram {
    /// Build from a width population. Empty input yields an empty histogram.
    pub fn build(widths: &[u16]) -> Self {
        if widths.is_empty() {
            return Self::default();
        }
        let mut min = widths[0];
        let mut max = widths[0];
        for &w in widths {
            min = min.min(w);
            max = max.max(w);
        }
        let range = (max - min) as usize;
        let num_bins = range.clamp(1, MAX_PULSE_BINS);
        let bin_width = ((range / num_bins) as u16).max(1);

        let mut hist = Self {
            bins: vec![0; num_bins],
            min_width_us: min,
            max_width_us: max,
            bin_width_us: bin_width,
            total_samples: 0,
            peak_bin: 0,
            peak_count: 0,
        };
        for &w in widths {
            let bin = (((w - min) / bin_width) as usize).min(num_bins - 1);
            hist.bins[bin] += 1;
            hist.total_samples += 1;
            if hist.bins[bin] > hist.peak_count {
                hist.peak_count = hist.bins[bin];
                hist.peak_bin = bin;
            }
        }
        hist
    }

    pub fn counts(&self) -> &[u32] {
        &self.bins
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Center width of a bin, in microseconds.
    pub fn bin_center_us(&self, bin: usize) -> u16 {
        self.min_width_us + bin as u16 * self.bin_width_us
    }
}

// ---------------------------------------------------------------------------
// Hypothesis
// ---------------------------------------------------------------------------

/// One entry of the inferred symbol alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolCluster {
    /// Representative pulse width.
    pub center_us: u16,
    /// Acceptance window around the center.
    pub spread_us: u16,
    pub symbol_id: u8,
    /// Samples that formed this cluster's histogram peak.
    pub count: u32,
}

/// The inferred protocol description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolHypothesis {
    pub modulation: Modulation,
    pub encoding: Encoding,
    pub baud_rate: u32,
    pub symbol_period_us: u16,
    /// Shortest symbol width (first cluster).
    pub short_pulse_us: u16,
    /// Second symbol width, when a second cluster exists.
    pub long_pulse_us: u16,
    /// Symbol alphabet, at most [`MAX_SYMBOL_TYPES`] entries.
    pub symbols: Vec<SymbolCluster>,
    /// First bytes of the shared prefix, big-endian packed.
    pub preamble_pattern: u16,
    pub preamble_length_bits: u16,
    pub payload_length_bits: u16,
    pub checksum_length_bits: u16,
    pub total_frame_bits: u16,
    pub modulation_confidence: u8,
    pub encoding_confidence: u8,
    pub timing_confidence: u8,
    pub structure_confidence: u8,
    /// Arithmetic mean of the four axis confidences.
    pub overall_confidence: u8,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Accumulates pulses and frames, then runs the inference pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProtocolInferenceEngine {
    pulses: Vec<Pulse>,
    frames: Vec<Frame>,
    mark_histogram: TimingHistogram,
    space_histogram: TimingHistogram,
    clusters: Vec<SymbolCluster>,
    hypothesis: ProtocolHypothesis,
    pulses_dropped: u32,
    frames_dropped: u32,
}

impl ProtocolInferenceEngine {
    pub fn new() -> Self {
        Self {
            pulses: Vec::with_capacity(MAX_PROTOCOL_PULSES),
            frames: Vec::with_capacity(MAX_PROTOCOL_FRAMES),
            ..Default::default()
        }
    }

    /// Add a pulse; returns false (dropping it) once the buffer is full.
    pub fn add_pulse(&mut self, pulse: &Pulse) -> bool {
        if self.pulses.len() >= MAX_PROTOCOL_PULSES {
            self.pulses_dropped += 1;
            return false;
        }
        self.pulses.push(*pulse);
        true
    }

    /// Add a frame; returns false (dropping it) once the buffer is full.
    pub fn add_frame(&mut self, frame: &Frame) -> bool {
        if self.frames.len() >= MAX_PROTOCOL_FRAMES {
            self.frames_dropped += 1;
            return false;
        }
        self.frames.push(*frame);
        true
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn dropped(&self) -> (u32, u32) {
        (self.pulses_dropped, self.frames_dropped)
    }

    pub fn reset(&mut self) {
        self.pulses.clear();
        self.frames.clear();
        self.mark_histogram = TimingHistogram::default();
        self.space_histogram = TimingHistogram::default();
        self.clusters.clear();
        self.hypothesis = ProtocolHypothesis::default();
        self.pulses_dropped = 0;
        self.frames_dropped = 0;
    }

    /// The current hypothesis (zeroed before the first analysis).
    pub fn hypothesis(&self) -> &ProtocolHypothesis {
        &self.hypothesis
    }

    /// Point-in-time copy of the hypothesis.
    pub fn snapshot_hypothesis(&self) -> ProtocolHypothesis {
        self.hypothesis.clone()
    }

    /// Run the full pipeline. Requires at least [`MIN_ANALYSIS_PULSES`]
    /// pulses or [`MIN_ANALYSIS_FRAMES`] frames.
    pub fn analyze(&mut self) -> CoreResult<()> {
        if self.pulses.len() < MIN_ANALYSIS_PULSES && self.frames.len() < MIN_ANALYSIS_FRAMES {
            return Err(CoreError::InsufficientData {
                needed: MIN_ANALYSIS_PULSES,
                got: self.pulses.len(),
            });
        }

        self.build_histograms();
        self.cluster_pulses();
        self.detect_modulation();
        self.detect_encoding();
        self.analyze_timing();
        self.detect_preamble();
        self.estimate_frame_structure();
        self.finalize_hypothesis();

        tracing::info!(
            modulation = self.hypothesis.modulation.as_str(),
            encoding = self.hypothesis.encoding.as_str(),
            baud = self.hypothesis.baud_rate,
            confidence = self.hypothesis.overall_confidence,
            "protocol analysis complete"
        );
        Ok(())
    }

    fn build_histograms(&mut self) {
        let marks: Vec<u16> = self
            .pulses
            .iter()
            .filter(|p| p.level.is_mark())
            .map(|p| p.width_us)
            .collect();
        let spaces: Vec<u16> = self
            .pulses
            .iter()
            .filter(|p| !p.level.is_mark())
            .map(|p| p.width_us)
            .collect();
        self.mark_histogram = TimingHistogram::build(&marks);
        self.space_histogram = TimingHistogram::build(&spaces);
    }

    /// Peak-pick the mark histogram into up to three symbol clusters: a bin
    /// strictly above both neighbors carrying more than 5% of all samples.
    fn cluster_pulses(&mut self) {
        self.clusters.clear();
        let hist = &self.mark_histogram;
        if hist.total_samples < MIN_ANALYSIS_PULSES as u32 {
            return;
        }
        let floor = hist.total_samples / 20;
        let bins = hist.counts();

        for i in 1..bins.len().saturating_sub(1) {
            if self.clusters.len() >= MAX_SYMBOL_CLUSTERS {
                break;
            }
            if bins[i] > bins[i - 1] && bins[i] > bins[i + 1] && bins[i] > floor {
                self.clusters.push(SymbolCluster {
                    center_us: hist.bin_center_us(i),
                    spread_us: hist.bin_width_us * 2,
                    symbol_id: self.clusters.len() as u8,
                    count: bins[i],
                });
            }
        }
        tracing::debug!(clusters = self.clusters.len(), "pulse clusters detected");
    }

    fn detect_modulation(&mut self) {
        let count = self.pulses.len();
        let long_pulses = self
            .pulses
            .iter()
            .filter(|p| p.width_us > OOK_WIDTH_THRESHOLD_US)
            .count();

        // OOK takes precedence over FSK over ASK.
        let modulation = if count < MIN_ANALYSIS_PULSES {
            Modulation::Unknown
        } else if long_pulses > count / 3 {
            Modulation::Ook
        } else if self.clusters.len() >= 2 {
            Modulation::Fsk
        } else {
            Modulation::Ask
        };

        let confidence = match modulation {
            Modulation::Ook => {
                if self.mark_space_asymmetric() {
                    90
                } else {
                    50
                }
            }
            Modulation::Fsk => 85,
            Modulation::Ask => {
                if self.clusters.len() == 1 {
                    80
                } else {
                    50
                }
            }
            _ => 30,
        };

        self.hypothesis.modulation = modulation;
        self.hypothesis.modulation_confidence = confidence;
    }

    /// OOK carriers idle for long stretches: mean mark and space widths
    /// differ by at least 2:1.
    fn mark_space_asymmetric(&self) -> bool {
        let mut total_mark = 0u64;
        let mut total_space = 0u64;
        let mut marks = 0u64;
        let mut spaces = 0u64;
        for p in &self.pulses {
            if p.level.is_mark() {
                total_mark += p.width_us as u64;
                marks += 1;
            } else {
                total_space += p.width_us as u64;
                spaces += 1;
            }
        }
        if marks == 0 || spaces == 0 {
            return false;
        }
        let avg_mark = total_mark / marks;
        let avg_space = total_space / spaces;
        avg_space > avg_mark * 2 || avg_mark > avg_space * 2
    }

    fn detect_encoding(&mut self) {
        if self.frames.len() < MIN_ANALYSIS_FRAMES {
            self.hypothesis.encoding = Encoding::Unknown;
            self.hypothesis.encoding_confidence = 40;
            return;
        }

        let (encoding, confidence) = if self.transition_rate_manchester() {
            (Encoding::Manchester, 85)
        } else if self.cluster_ratio_pwm() {
            (Encoding::Pwm, 80)
        } else if self.check_miller() {
            (Encoding::Miller, 60)
        } else {
            (Encoding::Nrz, 70)
        };

        self.hypothesis.encoding = encoding;
        self.hypothesis.encoding_confidence = confidence;
    }

    /// Manchester shows a level transition rate near one per two pulses:
    /// rate within (0.4, 0.6) over at least 20 pulses.
    fn transition_rate_manchester(&self) -> bool {
        if self.pulses.len() < 20 {
            return false;
        }
        let mut transitions = 0u32;
        for pair in self.pulses.windows(2) {
            if pair[0].level != pair[1].level {
                transitions += 1;
            }
        }
        let total = (self.pulses.len() - 1) as u32;
        transitions * 10 > total * 4 && transitions * 10 < total * 6
    }

    /// PWM shows exactly two symbol widths in a ~2:1 ratio.
    fn cluster_ratio_pwm(&self) -> bool {
        if self.clusters.len() < 2 {
            return false;
        }
        let w1 = self.clusters[0].center_us as u32;
        let w2 = self.clusters[1].center_us as u32;
        if w1 == 0 || w2 == 0 {
            return false;
        }
        // 1.8 < w1/w2 < 2.2, or 0.45 < w1/w2 < 0.55.
        let direct = w1 * 10 > w2 * 18 && w1 * 10 < w2 * 22;
        let reciprocal = w1 * 100 > w2 * 45 && w1 * 100 < w2 * 55;
        direct || reciprocal
    }

    /// Miller detection hook; needs half-bit phase tracking not implemented
    /// here, so it never claims a match.
    fn check_miller(&self) -> bool {
        false
    }

    fn analyze_timing(&mut self) {
        self.hypothesis.symbol_period_us = self
            .clusters
            .iter()
            .map(|c| c.center_us)
            .min()
            .unwrap_or(0);
        self.hypothesis.baud_rate = if self.hypothesis.symbol_period_us > 0 {
            1_000_000 / self.hypothesis.symbol_period_us as u32
        } else {
            0
        };

        let widths: Vec<u32> = self.pulses.iter().map(|p| p.width_us as u32).collect();
        let stats = SampleSummary::from_samples(&widths);
        self.hypothesis.timing_confidence = if stats.mean > 0 && stats.std_dev < stats.mean / 10 {
            90
        } else if stats.mean > 0 && stats.std_dev < stats.mean / 5 {
            70
        } else {
            50
        };
    }

    /// Longest byte-aligned prefix common to every frame.
    fn detect_preamble(&mut self) {
        self.hypothesis.preamble_pattern = 0;
        self.hypothesis.preamble_length_bits = 0;
        if self.frames.len() < MIN_ANALYSIS_FRAMES {
            return;
        }

        let min_len = self
            .frames
            .iter()
            .map(|f| f.length as usize)
            .min()
            .unwrap_or(0);
        let first = &self.frames[0];

        let mut prefix_bytes = 0usize;
        'bytes: for byte in 0..min_len {
            for frame in &self.frames[1..] {
                if frame.data[byte] != first.data[byte] {
                    break 'bytes;
                }
            }
            prefix_bytes += 1;
        }

        self.hypothesis.preamble_length_bits = (prefix_bytes * 8) as u16;
        if prefix_bytes >= 2 {
            self.hypothesis.preamble_pattern =
                ((first.data[0] as u16) << 8) | first.data[1] as u16;
        } else if prefix_bytes == 1 {
            self.hypothesis.preamble_pattern = (first.data[0] as u16) << 8;
        }
    }

    fn estimate_frame_structure(&mut self) {
        if self.frames.is_empty() {
            self.hypothesis.structure_confidence = 40;
            return;
        }

        let total: u32 = self.frames.iter().map(|f| f.length as u32).sum();
        let avg_len = (total / self.frames.len() as u32) as i32;
        let preamble_bytes = (self.hypothesis.preamble_length_bits / 8) as i32;

        let mut payload = avg_len - preamble_bytes;
        if payload > 3 {
            payload -= 2;
        } else if payload > 2 {
            payload -= 1;
        }
        self.hypothesis.payload_length_bits = (payload.max(0) * 8) as u16;
        self.hypothesis.checksum_length_bits = if avg_len > 4 { 16 } else { 8 };

        self.hypothesis.total_frame_bits = self.hypothesis.preamble_length_bits
            + self.hypothesis.payload_length_bits
            + self.hypothesis.checksum_length_bits;

        self.hypothesis.structure_confidence = if self.frames.len() >= 10 {
            80
        } else if self.frames.len() >= 5 {
            60
        } else {
            40
        };
    }

    fn finalize_hypothesis(&mut self) {
        let hyp = &mut self.hypothesis;

        hyp.symbols = self
            .clusters
            .iter()
            .take(MAX_SYMBOL_TYPES)
            .copied()
            .collect();
        hyp.short_pulse_us = self.clusters.first().map_or(0, |c| c.center_us);
        hyp.long_pulse_us = self.clusters.get(1).map_or(0, |c| c.center_us);

        hyp.overall_confidence = ((hyp.modulation_confidence as u16
            + hyp.encoding_confidence as u16
            + hyp.timing_confidence as u16
            + hyp.structure_confidence as u16)
            / 4) as u8;

        hyp.description = format!(
            "Protocol: {}/{} @ {} baud\n\
             Symbol period: {} us\n\
             Frame: {} preamble + {} payload + {} checksum bits\n\
             Confidence: {}%\n",
            hyp.modulation.as_str(),
            hyp.encoding.as_str(),
            hyp.baud_rate,
            hyp.symbol_period_us,
            hyp.preamble_length_bits,
            hyp.payload_length_bits,
            hyp.checksum_length_bits,
            hyp.overall_confidence,
        );
    }
}

/// Coarse single-frame hypothesis for real-time display: a modulation guess
/// from RSSI and a bit rate from the frame duration.
pub fn quick_analyze(frame: &Frame) -> ProtocolHypothesis {
    let mut hyp = ProtocolHypothesis::default();

    if frame.rssi_dbm < -80 {
        hyp.modulation = Modulation::Ook;
        hyp.modulation_confidence = 60;
    } else {
        hyp.modulation = Modulation::Ask;
        hyp.modulation_confidence = 50;
    }

    if frame.duration_us > 0 && frame.length > 0 {
        hyp.baud_rate =
            ((frame.length as u64 * 8 * 1_000_000) / frame.duration_us as u64) as u32;
    }

    hyp.overall_confidence = 40;
    hyp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PulseLevel;

    /// Alternating mark/space train with the given mark widths and a
    /// constant space width.
    fn push_train(engine: &mut ProtocolInferenceEngine, marks: &[u16], space_us: u16) {
        let mut ts = 0u32;
        for &m in marks {
            engine.add_pulse(&Pulse::new(PulseLevel::Mark, m, ts));
            ts += m as u32;
            engine.add_pulse(&Pulse::new(PulseLevel::Space, space_us, ts));
            ts += space_us as u32;
        }
    }

    /// Mark widths clustered around two centers with edge outliers so both
    /// histogram peaks sit interior to the bin range.
    fn pwm_mark_widths() -> Vec<u16> {
        let mut widths = Vec::new();
        widths.extend([190u16; 2]);
        widths.extend([199u16; 5]);
        widths.extend([200u16; 20]);
        widths.extend([201u16; 5]);
        widths.extend([399u16; 5]);
        widths.extend([400u16; 20]);
        widths.extend([401u16; 5]);
        widths.extend([410u16; 2]);
        widths
    }

    fn frame_with(payload: &[u8]) -> Frame {
        Frame::new(0, payload.len() as u32 * 1600, -60, 433_920_000, payload, 0, 16)
    }

    #[test]
    fn test_analyze_requires_data() {
        let mut engine = ProtocolInferenceEngine::new();
        assert!(matches!(
            engine.analyze(),
            Err(CoreError::InsufficientData { .. })
        ));
        push_train(&mut engine, &[500; 5], 500);
        // 10 pulses clears the bar.
        assert!(engine.analyze().is_ok());
    }

    #[test]
    fn test_cluster_detection_two_peaks() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &pwm_mark_widths(), 200);
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        assert_eq!(hyp.symbols.len(), 2, "symbols: {:?}", hyp.symbols);
        assert_eq!(hyp.short_pulse_us, 200);
        assert_eq!(hyp.long_pulse_us, 400);
        assert_eq!(hyp.symbols[0].symbol_id, 0);
        assert_eq!(hyp.symbols[1].symbol_id, 1);
    }

    #[test]
    fn test_pwm_encoding_detected() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &pwm_mark_widths(), 200);
        engine.add_frame(&frame_with(&[0xAA, 0x55, 0x01, 0x02, 0x03, 0x04]));
        engine.add_frame(&frame_with(&[0xAA, 0x55, 0x09, 0x08, 0x07, 0x06]));
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        assert_eq!(hyp.encoding, Encoding::Pwm);
        assert_eq!(hyp.encoding_confidence, 80);
        // Two width clusters without long OOK gaps reads as FSK.
        assert_eq!(hyp.modulation, Modulation::Fsk);
    }

    #[test]
    fn test_ook_classification() {
        let mut engine = ProtocolInferenceEngine::new();
        // Short marks, long silent gaps: classic OOK keying.
        push_train(&mut engine, &[500; 30], 2000);
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        assert_eq!(hyp.modulation, Modulation::Ook);
        assert_eq!(hyp.modulation_confidence, 90);
    }

    #[test]
    fn test_ask_fallback() {
        let mut engine = ProtocolInferenceEngine::new();
        // Uniform short pulses: no long gaps, no second cluster.
        push_train(&mut engine, &[300; 20], 310);
        engine.analyze().unwrap();
        assert_eq!(engine.hypothesis().modulation, Modulation::Ask);
    }

    #[test]
    fn test_manchester_transition_rate() {
        let mut engine = ProtocolInferenceEngine::new();
        // Doubled levels: M M S S M M S S ... ~0.52 transition rate.
        let mut ts = 0u32;
        for i in 0..40 {
            let level = if (i / 2) % 2 == 0 {
                PulseLevel::Mark
            } else {
                PulseLevel::Space
            };
            engine.add_pulse(&Pulse::new(level, 300, ts));
            ts += 300;
        }
        engine.add_frame(&frame_with(&[1, 2, 3]));
        engine.add_frame(&frame_with(&[1, 2, 4]));
        engine.analyze().unwrap();
        assert_eq!(engine.hypothesis().encoding, Encoding::Manchester);
    }

    #[test]
    fn test_nrz_default_encoding() {
        let mut engine = ProtocolInferenceEngine::new();
        // Fully alternating levels, one width cluster: not Manchester, not PWM.
        push_train(&mut engine, &[300; 20], 300);
        engine.add_frame(&frame_with(&[1, 2, 3]));
        engine.add_frame(&frame_with(&[4, 5, 6]));
        engine.analyze().unwrap();
        assert_eq!(engine.hypothesis().encoding, Encoding::Nrz);
        assert_eq!(engine.hypothesis().encoding_confidence, 70);
    }

    #[test]
    fn test_timing_from_shortest_cluster() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &pwm_mark_widths(), 200);
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        assert_eq!(hyp.symbol_period_us, 200);
        assert_eq!(hyp.baud_rate, 5000);
    }

    #[test]
    fn test_preamble_common_prefix() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &[500; 10], 500);
        engine.add_frame(&frame_with(&[0xAA, 0x55, 0x10, 0x20]));
        engine.add_frame(&frame_with(&[0xAA, 0x55, 0x30, 0x40]));
        engine.add_frame(&frame_with(&[0xAA, 0x55, 0x50, 0x60]));
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        assert_eq!(hyp.preamble_length_bits, 16);
        assert_eq!(hyp.preamble_pattern, 0xAA55);
    }

    #[test]
    fn test_no_common_prefix() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &[500; 10], 500);
        engine.add_frame(&frame_with(&[0x11, 0x22]));
        engine.add_frame(&frame_with(&[0x33, 0x44]));
        engine.analyze().unwrap();
        assert_eq!(engine.hypothesis().preamble_length_bits, 0);
        assert_eq!(engine.hypothesis().preamble_pattern, 0);
    }

    #[test]
    fn test_frame_structure_estimate() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &[500; 10], 500);
        for i in 0..10u8 {
            engine.add_frame(&frame_with(&[0xAA, 0x55, i, i + 1, i + 2, i + 3, i + 4, i + 5]));
        }
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        // 8 bytes average, 2 preamble, minus the 2-byte checksum guess.
        assert_eq!(hyp.payload_length_bits, 32);
        assert_eq!(hyp.checksum_length_bits, 16);
        assert_eq!(
            hyp.total_frame_bits,
            hyp.preamble_length_bits + hyp.payload_length_bits + hyp.checksum_length_bits
        );
        assert_eq!(hyp.structure_confidence, 80);
    }

    #[test]
    fn test_overall_confidence_is_mean() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &pwm_mark_widths(), 200);
        engine.add_frame(&frame_with(&[0xAA, 0x55, 1, 2, 3, 4]));
        engine.add_frame(&frame_with(&[0xAA, 0x55, 5, 6, 7, 8]));
        engine.analyze().unwrap();

        let hyp = engine.hypothesis();
        let mean = (hyp.modulation_confidence as u16
            + hyp.encoding_confidence as u16
            + hyp.timing_confidence as u16
            + hyp.structure_confidence as u16)
            / 4;
        assert_eq!(hyp.overall_confidence as u16, mean);
        assert!(hyp.description.contains("FSK"));
        assert!(hyp.description.contains("baud"));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut engine = ProtocolInferenceEngine::new();
        push_train(&mut engine, &[500; 20], 500);
        engine.analyze().unwrap();
        engine.reset();
        assert_eq!(engine.pulse_count(), 0);
        assert_eq!(engine.frame_count(), 0);
        assert_eq!(engine.hypothesis().overall_confidence, 0);
    }

    #[test]
    fn test_pulse_capacity_drops() {
        let mut engine = ProtocolInferenceEngine::new();
        let p = Pulse::new(PulseLevel::Mark, 100, 0);
        for _ in 0..MAX_PROTOCOL_PULSES {
            assert!(engine.add_pulse(&p));
        }
        assert!(!engine.add_pulse(&p));
        assert_eq!(engine.dropped().0, 1);
    }

    #[test]
    fn test_quick_analyze() {
        let weak = Frame::new(0, 8_000, -95, 433_920_000, &[1, 2, 3, 4], 0, 8);
        let hyp = quick_analyze(&weak);
        assert_eq!(hyp.modulation, Modulation::Ook);
        assert_eq!(hyp.modulation_confidence, 60);
        // 4 bytes over 8 ms -> 4000 bits/s.
        assert_eq!(hyp.baud_rate, 4000);
        assert_eq!(hyp.overall_confidence, 40);

        let strong = Frame::new(0, 8_000, -40, 433_920_000, &[1, 2, 3, 4], 0, 8);
        assert_eq!(quick_analyze(&strong).modulation, Modulation::Ask);
    }
}
