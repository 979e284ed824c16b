//! # RF Lab Core Analysis Library
//!
//! This crate is the analysis core of an on-device RF laboratory for the
//! 300–928 MHz bands. A radio front-end (out of scope here) demodulates the
//! channel into pulses and frames; this crate turns those into knowledge:
//!
//! - **Fingerprinting** — per-device physical-layer signatures from timing
//!   drift, RSSI envelope shape, and clock stability, with a bounded device
//!   database, weighted matching, and temporal-drift tracking
//! - **Protocol inference** — modulation, encoding, symbol timing, and
//!   frame-structure hypotheses from pulse-width statistics
//! - **Clustering** — deterministic k-means over 2-D signal features with
//!   silhouette-scored k selection and a streaming variant
//! - **Threat assessment** — entropy, static-field, CRC-fit, rolling-code,
//!   and replay analysis combined into a 0–1000 vulnerability score
//! - **Compression** — delta/RLE/pulse-sequence codecs used as the
//!   persistence format for captures
//!
//! Everything computes in Q15.16 fixed point ([`fixed::Fixed`]) with no
//! floating point in any analysis path, and every buffer is reserved to a
//! compile-time capacity at construction, so memory use is bounded after
//! init.
//!
//! ## Signal Flow
//!
//! ```text
//! front-end → (pulses, frames, RSSI) → CoreContext
//!                                         ├── FingerprintEngine → matches, drift
//!                                         ├── ProtocolInferenceEngine → hypothesis
//!                                         ├── ThreatAnalyzer → assessment, report
//!                                         └── StreamingClusterer → cluster map
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::context::CoreContext;
//!
//! let core = CoreContext::new();
//!
//! // Capture thread pushes demodulated events:
//! let mut ts = 0u32;
//! for i in 0..40 {
//!     let width = if i % 2 == 0 { 500 } else { 1500 };
//!     core.on_pulse((i % 2 == 0) as u8, width, ts);
//!     ts += width as u32;
//! }
//!
//! // Analysis thread asks for a protocol hypothesis:
//! core.protocol_analyze().unwrap();
//! let hypothesis = core.snapshot_hypothesis();
//! assert!(hypothesis.overall_confidence > 0);
//! ```

pub mod clustering;
pub mod compress;
pub mod context;
pub mod crc;
pub mod fingerprint;
pub mod fixed;
pub mod matrix;
pub mod protocol;
pub mod stats;
pub mod threat;
pub mod types;

pub use context::{frame_csv_row, CoreContext, Saturation};
pub use fingerprint::{FingerprintEngine, MatchConfidence, RfFingerprint};
pub use fixed::Fixed;
pub use protocol::{Encoding, Modulation, ProtocolHypothesis, ProtocolInferenceEngine};
pub use threat::{RiskLevel, ThreatAnalyzer, ThreatAssessment};
pub use types::{CoreError, CoreResult, Frame, Pulse, PulseLevel};
