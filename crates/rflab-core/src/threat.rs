//! Threat and vulnerability assessment of frame populations
//!
//! Scores how attackable an observed transmitter population looks: low
//! payload entropy, static bit fields, missing integrity checks, missing
//! rolling codes, and byte-exact replays each add to a composite 0–1000
//! vulnerability score with fixed risk bands.
//!
//! Analysis inputs accumulate into a bounded payload ring and a running
//! byte-frequency table; [`ThreatAnalyzer::assess`] runs every detector and
//! produces a [`ThreatAssessment`] snapshot plus a plain-text report.
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::threat::{ThreatAnalyzer, RiskLevel};
//!
//! let mut analyzer = ThreatAnalyzer::new();
//! analyzer.start_analysis();
//! for _ in 0..20 {
//!     analyzer.add_payload(&[0xAA; 16]);
//! }
//! let assessment = analyzer.assess();
//! assert!(assessment.vulnerability_score >= 700);
//! assert!(matches!(assessment.level, RiskLevel::High | RiskLevel::Critical));
//! ```

use crate::crc::{Crc, CrcParams};
use crate::fixed::Fixed;
use crate::stats::{entropy_from_freqs, shannon_entropy};
use crate::types::Frame;
use serde::{Deserialize, Serialize};

/// Longest payload retained per frame.
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Payload ring capacity.
pub const MAX_THREAT_FRAMES: usize = 256;

/// Samples required before rolling-code analysis is meaningful.
pub const ENTROPY_HISTORY_SIZE: usize = 100;

/// Replay index list capacity.
pub const MAX_REPLAY_INDICES: usize = 10;

/// Fixed-field list capacity.
pub const MAX_FIXED_FIELDS: usize = 8;

/// Longest preamble the prefix scan considers, in bytes.
const MAX_PREAMBLE_BYTES: usize = 4;

/// Score band thresholds.
pub const VULN_SCORE_CRITICAL: u16 = 900;
pub const VULN_SCORE_HIGH: u16 = 700;
pub const VULN_SCORE_MEDIUM: u16 = 400;
pub const VULN_SCORE_LOW: u16 = 200;

/// CRC variants the fit search tries, in order.
pub const CRC_CANDIDATES: [CrcParams; 7] = [
    CrcParams {
        name: "CRC-8",
        width: 8,
        poly: 0x07,
        init: 0x00,
        reflect_in: false,
        reflect_out: false,
        xor_out: 0x00,
    },
    CrcParams {
        name: "CRC-8-CCITT",
        width: 8,
        poly: 0x07,
        init: 0x00,
        reflect_in: false,
        reflect_out: false,
        xor_out: 0x55,
    },
    CrcParams {
        name: "CRC-16",
        width: 16,
        poly: 0x8005,
        init: 0x0000,
        reflect_in: true,
        reflect_out: true,
        xor_out: 0x0000,
    },
    CrcParams {
        name: "CRC-16-CCITT",
        width: 16,
        poly: 0x1021,
        init: 0xFFFF,
        reflect_in: true,
        reflect_out: true,
        xor_out: 0x0000,
    },
    CrcParams {
        name: "CRC-16-IBM",
        width: 16,
        poly: 0x8005,
        init: 0x0000,
        reflect_in: true,
        reflect_out: true,
        xor_out: 0x0000,
    },
    CrcParams {
        name: "CRC-32",
        width: 32,
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        reflect_in: true,
        reflect_out: true,
        xor_out: 0xFFFF_FFFF,
    },
    CrcParams {
        name: "CRC-32-MPEG",
        width: 32,
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        reflect_in: false,
        reflect_out: false,
        xor_out: 0x0000_0000,
    },
];

/// Risk band of an assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Band for a composite vulnerability score.
    pub fn from_score(score: u16) -> Self {
        if score >= VULN_SCORE_CRITICAL {
            RiskLevel::Critical
        } else if score >= VULN_SCORE_HIGH {
            RiskLevel::High
        } else if score >= VULN_SCORE_MEDIUM {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// A CRC variant that fit the observed frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrcFit {
    pub name: &'static str,
    pub polynomial: u32,
    pub width: u8,
    /// Byte offset of the CRC within the payload.
    pub position: u8,
}

/// A payload field that behaves like a rolling code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingCodeField {
    pub position: u8,
    pub length: u8,
    /// The observed value series at that position.
    pub sequence: Vec<u32>,
}

/// Composite assessment snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub level: RiskLevel,
    /// Composite score, 0..=1000.
    pub vulnerability_score: u16,
    /// Shannon entropy in bits per byte.
    pub entropy_bits: Fixed,
    pub has_checksum: bool,
    pub has_rolling_code: bool,
    pub is_static: bool,
    /// Percentage of bit positions constant across all frames.
    pub static_ratio: u8,
}

/// Analyzer lifecycle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Collecting,
    Assessing,
    Complete,
}

#[derive(Debug, Clone, Copy)]
struct StoredPayload {
    data: [u8; MAX_PAYLOAD_SIZE],
    len: u8,
}

impl StoredPayload {
    fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

/// Frame-population vulnerability analyzer.
#[derive(Debug, Clone)]
pub struct ThreatAnalyzer {
    state: AnalysisState,
    payloads: Vec<StoredPayload>,
    byte_freqs: [u32; 256],
    total_bytes: u64,
    entropy_per_byte: Fixed,
    static_mask: [u8; MAX_PAYLOAD_SIZE],
    static_mask_len: u8,
    static_ratio: u8,
    preamble_len: u8,
    preamble: u32,
    crc_fit: Option<CrcFit>,
    rolling_code: Option<RollingCodeField>,
    replay_indices: Vec<u16>,
    exact_replay: bool,
    assessment: ThreatAssessment,
    dropped: u32,
}

impl Default for ThreatAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatAnalyzer {
    pub fn new() -> Self {
        Self {
            state: AnalysisState::Idle,
            payloads: Vec::with_capacity(MAX_THREAT_FRAMES),
            byte_freqs: [0; 256],
            total_bytes: 0,
            entropy_per_byte: Fixed::ZERO,
            static_mask: [0; MAX_PAYLOAD_SIZE],
            static_mask_len: 0,
            static_ratio: 0,
            preamble_len: 0,
            preamble: 0,
            crc_fit: None,
            rolling_code: None,
            replay_indices: Vec::with_capacity(MAX_REPLAY_INDICES),
            exact_replay: false,
            assessment: ThreatAssessment::default(),
            dropped: 0,
        }
    }

    /// Clear all accumulated state and begin collecting.
    pub fn start_analysis(&mut self) {
        *self = Self::new();
        self.state = AnalysisState::Collecting;
        tracing::info!("threat analysis started");
    }

    pub fn stop_analysis(&mut self) {
        self.state = AnalysisState::Idle;
    }

    pub fn is_analyzing(&self) -> bool {
        self.state != AnalysisState::Idle
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    /// Fold a frame's payload into the population.
    pub fn add_frame(&mut self, frame: &Frame) -> bool {
        self.add_payload(frame.payload())
    }

    /// Fold a raw payload into the population; returns false (dropping it)
    /// once the ring is full.
    pub fn add_payload(&mut self, data: &[u8]) -> bool {
        if self.payloads.len() >= MAX_THREAT_FRAMES {
            self.dropped += 1;
            return false;
        }
        let len = data.len().min(MAX_PAYLOAD_SIZE);
        let mut stored = StoredPayload {
            data: [0; MAX_PAYLOAD_SIZE],
            len: len as u8,
        };
        stored.data[..len].copy_from_slice(&data[..len]);
        self.payloads.push(stored);

        for &b in &data[..len] {
            self.byte_freqs[b as usize] += 1;
            self.total_bytes += 1;
        }
        true
    }

    pub fn frame_count(&self) -> usize {
        self.payloads.len()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    // -- detectors ----------------------------------------------------------

    /// Shannon entropy over the aggregated byte-frequency table.
    pub fn entropy(&mut self) -> Fixed {
        self.entropy_per_byte = entropy_from_freqs(&self.byte_freqs, self.total_bytes);
        self.entropy_per_byte
    }

    /// Build the per-bit static mask over the common payload length and
    /// derive the static ratio.
    pub fn detect_static_patterns(&mut self) {
        if self.payloads.len() < 2 {
            self.static_mask_len = 0;
            self.static_ratio = 0;
            return;
        }

        let min_len = self
            .payloads
            .iter()
            .map(|p| p.len as usize)
            .min()
            .unwrap_or(0);
        self.static_mask_len = min_len as u8;
        self.static_mask[..min_len].fill(0xFF);

        let first = self.payloads[0];
        for payload in &self.payloads[1..] {
            for byte in 0..min_len {
                let diff = first.data[byte] ^ payload.data[byte];
                self.static_mask[byte] &= !diff;
            }
        }

        let total_bits = (min_len * 8) as u32;
        if total_bits == 0 {
            self.static_ratio = 0;
            return;
        }
        let static_bits: u32 = self.static_mask[..min_len]
            .iter()
            .map(|b| b.count_ones())
            .sum();
        self.static_ratio = (static_bits * 100 / total_bits) as u8;
    }

    /// The per-bit static mask (one mask byte per payload byte).
    pub fn static_mask(&self) -> &[u8] {
        &self.static_mask[..self.static_mask_len as usize]
    }

    pub fn static_ratio(&self) -> u8 {
        self.static_ratio
    }

    /// Longest common byte prefix across all payloads, up to 4 bytes.
    pub fn detect_preamble(&mut self) {
        self.preamble_len = 0;
        self.preamble = 0;
        if self.payloads.len() < 2 {
            return;
        }

        let first = self.payloads[0];
        let max_len = (first.len as usize).min(MAX_PREAMBLE_BYTES);

        for len in 1..=max_len {
            let all_match = self.payloads[1..]
                .iter()
                .all(|p| p.len as usize >= len && p.bytes()[..len] == first.bytes()[..len]);
            if !all_match {
                break;
            }
            self.preamble_len = len as u8;
            self.preamble = first.bytes()[..len]
                .iter()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        }
    }

    pub fn preamble(&self) -> (u32, u8) {
        (self.preamble, self.preamble_len)
    }

    /// Try every candidate polynomial at trailing positions `len-2..len-4`
    /// of each frame; declare a fit when more than 80% of frames match.
    /// Needs at least 5 frames.
    pub fn analyze_crc(&mut self) {
        self.crc_fit = None;
        if self.payloads.len() < 5 {
            return;
        }

        for params in CRC_CANDIDATES {
            let crc = Crc::new(params);
            let width_bytes = crc.width_bytes();
            let mut match_count = 0usize;
            let mut found_position = 0u8;

            for payload in &self.payloads {
                let len = payload.len as usize;
                if len < 3 {
                    continue;
                }
                for offset in 2..=4usize {
                    let Some(pos) = len.checked_sub(offset) else {
                        break;
                    };
                    if pos == 0 || pos + width_bytes > len {
                        continue;
                    }
                    let computed = crc.compute(&payload.bytes()[..pos]);
                    let stored = payload.bytes()[pos..pos + width_bytes]
                        .iter()
                        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
                    if computed == stored {
                        match_count += 1;
                        found_position = pos as u8;
                        break;
                    }
                }
            }

            if match_count > self.payloads.len() * 8 / 10 {
                self.crc_fit = Some(CrcFit {
                    name: params.name,
                    polynomial: params.poly,
                    width: params.width,
                    position: found_position,
                });
                tracing::info!(crc = params.name, "checksum scheme identified");
                break;
            }
        }
    }

    pub fn crc_fit(&self) -> Option<&CrcFit> {
        self.crc_fit.as_ref()
    }

    /// Look for a 4-byte field that changes every frame without being a
    /// trivial counter or a repeating series. Needs at least
    /// [`ENTROPY_HISTORY_SIZE`] frames.
    pub fn detect_rolling_code(&mut self) {
        self.rolling_code = None;
        if self.payloads.len() < ENTROPY_HISTORY_SIZE {
            return;
        }

        let min_len = self
            .payloads
            .iter()
            .map(|p| p.len as usize)
            .min()
            .unwrap_or(0);

        for byte_pos in 0..min_len {
            let mut values = Vec::with_capacity(ENTROPY_HISTORY_SIZE);
            for payload in self.payloads.iter().take(ENTROPY_HISTORY_SIZE) {
                if byte_pos + 4 <= payload.len as usize {
                    let v = payload.bytes()[byte_pos..byte_pos + 4]
                        .iter()
                        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
                    values.push(v);
                }
            }
            if values.len() < 10 {
                continue;
            }

            if is_trivially_sequential(&values) {
                continue;
            }
            if sequence_passes_randomness(&values) {
                tracing::info!(byte_pos, "rolling code field detected");
                self.rolling_code = Some(RollingCodeField {
                    position: byte_pos as u8,
                    length: 4,
                    sequence: values,
                });
                break;
            }
        }
    }

    pub fn rolling_code(&self) -> Option<&RollingCodeField> {
        self.rolling_code.as_ref()
    }

    /// Collect byte-exact duplicate frames (up to 10 indices).
    pub fn detect_replay(&mut self) {
        self.exact_replay = false;
        self.replay_indices.clear();

        for i in 0..self.payloads.len() {
            let found = self.payloads[(i + 1)..].iter().any(|other| {
                other.len == self.payloads[i].len && other.bytes() == self.payloads[i].bytes()
            });
            if found {
                self.exact_replay = true;
                if self.replay_indices.len() < MAX_REPLAY_INDICES {
                    self.replay_indices.push(i as u16);
                }
            }
        }
    }

    pub fn replay_indices(&self) -> &[u16] {
        &self.replay_indices
    }

    /// Whether a payload is new to the population.
    pub fn is_unique(&self, data: &[u8]) -> bool {
        !self
            .payloads
            .iter()
            .any(|p| p.len as usize == data.len() && p.bytes() == data)
    }

    // -- assessment ---------------------------------------------------------

    /// Run every detector and compute the composite assessment.
    pub fn assess(&mut self) -> ThreatAssessment {
        self.state = AnalysisState::Assessing;

        self.entropy();
        self.detect_static_patterns();
        self.detect_preamble();
        self.analyze_crc();
        self.detect_rolling_code();
        self.detect_replay();

        let score = self.vulnerability_score();
        self.assessment = ThreatAssessment {
            level: RiskLevel::from_score(score),
            vulnerability_score: score,
            entropy_bits: self.entropy_per_byte,
            has_checksum: self.crc_fit.is_some(),
            has_rolling_code: self.rolling_code.is_some(),
            is_static: self.static_ratio > 80,
            static_ratio: self.static_ratio,
        };

        self.state = AnalysisState::Complete;
        tracing::info!(
            level = self.assessment.level.as_str(),
            score = self.assessment.vulnerability_score,
            "threat assessment complete"
        );
        self.assessment
    }

    /// Composite 0–1000 score: low entropy up to 300, static ratio up to
    /// 250, missing CRC 200, missing rolling code 150, replay 100.
    fn vulnerability_score(&self) -> u16 {
        let mut score: u32 = 0;

        let threshold = Fixed::from_int(4);
        if self.entropy_per_byte < threshold {
            let deficit = (threshold - self.entropy_per_byte).to_bits() as i64;
            score += ((deficit * 75) >> 16) as u32;
        }

        score += self.static_ratio as u32 * 250 / 100;

        if self.crc_fit.is_none() {
            score += 200;
        }
        if self.rolling_code.is_none() {
            score += 150;
        }
        if self.exact_replay {
            score += 100;
        }

        score.min(1000) as u16
    }

    /// The last computed assessment (zeroed before the first [`assess`]).
    pub fn snapshot_assessment(&self) -> ThreatAssessment {
        self.assessment
    }

    /// Render the fixed-layout report, truncated to `max_len` bytes.
    pub fn report_text(&self, max_len: usize) -> String {
        let a = &self.assessment;
        let recommendation = match a.level {
            RiskLevel::Critical => "CRITICAL: Device is highly vulnerable to replay attacks",
            RiskLevel::High => "HIGH: Implement rolling code or encryption immediately",
            RiskLevel::Medium => "MEDIUM: Consider adding authentication mechanisms",
            RiskLevel::Low => "LOW: Device has basic security measures in place",
        };

        let mut report = format!(
            "RF THREAT ANALYSIS REPORT\n\
             ========================\n\n\
             Risk Level: {}\n\
             Vulnerability Score: {}/1000\n\n\
             ENTROPY ANALYSIS:\n\
             \x20 Entropy per byte: {:.2} bits\n\n\
             PATTERN ANALYSIS:\n\
             \x20 Static ratio: {}%\n\
             \x20 Preamble length: {} bytes\n\
             \x20 Fixed preamble: {:#010X}\n\n\
             SECURITY FEATURES:\n\
             \x20 Checksum/CRC: {}\n\
             \x20 Rolling code: {}\n\
             \x20 Replay vulnerable: {}\n\n\
             RECOMMENDATION:\n\
             \x20 {}\n",
            a.level.as_str(),
            a.vulnerability_score,
            a.entropy_bits.to_f64(),
            a.static_ratio,
            self.preamble_len,
            self.preamble,
            if a.has_checksum { "YES" } else { "NO" },
            if a.has_rolling_code { "YES" } else { "NO" },
            if self.exact_replay { "YES" } else { "NO" },
            recommendation,
        );
        report.truncate(max_len);
        report
    }

    /// Contiguous runs of fully static bytes as `(position, length)` pairs.
    /// Call [`detect_static_patterns`] (or [`assess`]) first.
    pub fn find_fixed_fields(&self) -> Vec<(u8, u8)> {
        let mut fields = Vec::new();
        let len = self.static_mask_len as usize;
        let mut run_start: Option<usize> = None;

        for byte in 0..len {
            if self.static_mask[byte] == 0xFF {
                run_start.get_or_insert(byte);
            } else if let Some(start) = run_start.take() {
                if fields.len() < MAX_FIXED_FIELDS {
                    fields.push((start as u8, (byte - start) as u8));
                }
            }
        }
        if let Some(start) = run_start {
            if fields.len() < MAX_FIXED_FIELDS {
                fields.push((start as u8, (len - start) as u8));
            }
        }
        fields
    }
}

/// Quick single-frame triage: entropy plus an all-same-byte probe, banded
/// into High (700) / Medium (400) / Low (200).
pub fn quick_assess(frame: &Frame) -> ThreatAssessment {
    let payload = frame.payload();
    let entropy = shannon_entropy(payload);

    let uniform = payload.len() > 1 && payload.iter().all(|&b| b == payload[0]);

    let (level, score) = if entropy < Fixed::from_int(2) || uniform {
        (RiskLevel::High, 700)
    } else if entropy < Fixed::from_int(4) {
        (RiskLevel::Medium, 400)
    } else {
        (RiskLevel::Low, 200)
    };

    ThreatAssessment {
        level,
        vulnerability_score: score,
        entropy_bits: entropy,
        has_checksum: false,
        has_rolling_code: false,
        is_static: uniform,
        static_ratio: if uniform { 100 } else { 0 },
    }
}

/// A series is trivially sequential when every step is -1, 0, or +1.
fn is_trivially_sequential(values: &[u32]) -> bool {
    values.windows(2).all(|w| {
        let step = w[1] as i64 - w[0] as i64;
        (-1..=1).contains(&step)
    })
}

/// Reject series that repeat with any period up to half their length.
fn sequence_passes_randomness(values: &[u32]) -> bool {
    for period in 1..=values.len() / 2 {
        if values
            .iter()
            .enumerate()
            .all(|(i, &v)| v == values[i % period])
        {
            return false;
        }
    }
    true
}

/// Bit-level Hamming distance between two equal-prefix byte slices.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

/// Verify a single-byte additive checksum at `checksum_pos`.
pub fn verify_sum_checksum(data: &[u8], checksum_pos: usize) -> bool {
    if checksum_pos >= data.len() {
        return false;
    }
    let sum = data[..checksum_pos]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    sum == data[checksum_pos]
}
