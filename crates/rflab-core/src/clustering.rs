//! K-means clustering over 2-D signal feature points
//!
//! Groups captured signals in a two-dimensional fixed-point feature space:
//! deterministic k-means (k ≤ 5) with silhouette-scored quality, automatic
//! k selection, and a streaming variant that re-clusters as points arrive.
//! Seeding uses the first k points, so results are reproducible for a given
//! input order.
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::clustering::{kmeans, DataPoint, Dataset};
//! use rflab_core::fixed::Fixed;
//!
//! let mut data = Dataset::new();
//! for (x, y) in [(10, 10), (20, 20), (11, 10), (21, 20), (10, 11), (20, 21)] {
//!     data.push(DataPoint::new(Fixed::from_int(x), Fixed::from_int(y)));
//! }
//! let result = kmeans(&mut data, 2);
//! assert!(result.converged);
//! assert_eq!(result.point_count_total(), 6);
//! ```

use crate::fixed::Fixed;
use crate::types::{Frame, Pulse};
use serde::{Deserialize, Serialize};

/// Maximum clusters.
pub const KMEANS_MAX_K: usize = 5;

/// Iteration cap before convergence is forced.
pub const KMEANS_MAX_ITERATIONS: u32 = 100;

/// Maximum points a [`Dataset`] retains.
pub const MAX_DATASET_POINTS: usize = 4096;

/// Maximum sequence length for DTW comparison.
pub const DTW_MAX_LENGTH: usize = 128;

/// Streaming re-cluster interval, in points.
pub const RECLUSTER_INTERVAL: usize = 50;

/// Total centroid movement (Manhattan) below which k-means is converged:
/// 0.5% of unit scale.
const CONVERGENCE_THRESHOLD: Fixed = Fixed::from_bits(65_536 / 200);

/// A 2-D feature point with its current cluster assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: Fixed,
    pub y: Fixed,
    pub cluster_id: u8,
}

impl DataPoint {
    pub fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y, cluster_id: 0 }
    }
}

/// Pairwise distance metric over feature points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
    /// `1 - cosine_similarity`, so it behaves as a distance.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two points under this metric.
    pub fn distance(self, a: &DataPoint, b: &DataPoint) -> Fixed {
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Manhattan => manhattan_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }
}

/// Euclidean distance in feature space.
pub fn euclidean_distance(a: &DataPoint, b: &DataPoint) -> Fixed {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx.saturating_mul(dx)
        .saturating_add(dy.saturating_mul(dy))
        .sqrt()
}

/// Manhattan distance in feature space.
pub fn manhattan_distance(a: &DataPoint, b: &DataPoint) -> Fixed {
    (a.x - b.x).abs().saturating_add((a.y - b.y).abs())
}

/// Cosine distance `1 - cos(a, b)`; degenerate inputs yield [`Fixed::MAX`].
pub fn cosine_distance(a: &DataPoint, b: &DataPoint) -> Fixed {
    let dot = a.x.saturating_mul(b.x).saturating_add(a.y.saturating_mul(b.y));
    let norm_a = a.x.saturating_mul(a.x).saturating_add(a.y.saturating_mul(a.y)).sqrt();
    let norm_b = b.x.saturating_mul(b.x).saturating_add(b.y.saturating_mul(b.y)).sqrt();
    if norm_a == Fixed::ZERO || norm_b == Fixed::ZERO {
        return Fixed::MAX;
    }
    Fixed::ONE - dot / norm_a.saturating_mul(norm_b)
}

/// Bounded collection of feature points.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    points: Vec<DataPoint>,
}

impl Dataset {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(MAX_DATASET_POINTS),
        }
    }

    /// Append a point; returns false (dropping it) once at capacity.
    pub fn push(&mut self, point: DataPoint) -> bool {
        if self.points.len() >= MAX_DATASET_POINTS {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Bounding box `(min_x, max_x, min_y, max_y)`; the unit box when empty.
    pub fn bounds(&self) -> (Fixed, Fixed, Fixed, Fixed) {
        if self.points.is_empty() {
            return (Fixed::ZERO, Fixed::ONE, Fixed::ZERO, Fixed::ONE);
        }
        let mut min_x = self.points[0].x;
        let mut max_x = self.points[0].x;
        let mut min_y = self.points[0].y;
        let mut max_y = self.points[0].y;
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        (min_x, max_x, min_y, max_y)
    }
}

/// One cluster center and its assignment bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Centroid {
    pub x: Fixed,
    pub y: Fixed,
    /// Points assigned in the last assignment pass.
    pub point_count: u16,
    /// Sum of squared distances of assigned points.
    pub inertia: Fixed,
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KMeansResult {
    pub k: u8,
    pub centroids: [Centroid; KMEANS_MAX_K],
    pub iterations: u32,
    pub converged: bool,
    pub total_inertia: Fixed,
    /// Mean silhouette over all points, in [-1, 1].
    pub silhouette_score: Fixed,
}

impl KMeansResult {
    /// Sum of per-centroid assignment counts.
    pub fn point_count_total(&self) -> usize {
        self.centroids[..self.k as usize]
            .iter()
            .map(|c| c.point_count as usize)
            .sum()
    }

    /// Structural sanity: `k` within bounds and counts covering the dataset.
    pub fn is_structurally_valid(&self, dataset_len: usize) -> bool {
        self.k as usize <= KMEANS_MAX_K
            && (!self.converged || self.point_count_total() == dataset_len)
    }
}

/// Run k-means on the dataset, writing assignments into the points.
///
/// `k` of zero (or beyond [`KMEANS_MAX_K`]) falls back to the default of 3,
/// and is always clamped to the dataset size. An empty dataset yields a
/// zeroed result.
pub fn kmeans(data: &mut Dataset, k: u8) -> KMeansResult {
    let mut result = KMeansResult::default();
    if data.is_empty() {
        return result;
    }

    let mut k = k as usize;
    if k == 0 || k > KMEANS_MAX_K {
        k = 3;
    }
    k = k.min(data.len());
    result.k = k as u8;

    for i in 0..k {
        result.centroids[i].x = data.points[i].x;
        result.centroids[i].y = data.points[i].y;
    }

    iterate(&mut result, data);

    result.total_inertia = Fixed::ZERO;
    for c in &result.centroids[..k] {
        result.total_inertia = result.total_inertia.saturating_add(c.inertia);
    }
    result.silhouette_score = silhouette_score(data, &result);
    result
}

/// Assign/update loop with Manhattan-movement convergence.
fn iterate(result: &mut KMeansResult, data: &mut Dataset) {
    for iter in 0..KMEANS_MAX_ITERATIONS {
        let prev = result.centroids;

        assign_points(result, data);
        update_centroids(result, data);

        result.iterations = iter + 1;

        let mut movement = Fixed::ZERO;
        for i in 0..result.k as usize {
            movement = movement
                .saturating_add((result.centroids[i].x - prev[i].x).abs())
                .saturating_add((result.centroids[i].y - prev[i].y).abs());
        }
        if movement < CONVERGENCE_THRESHOLD {
            result.converged = true;
            break;
        }
    }
}

/// Assign every point to its nearest centroid (ties to the lower id) and
/// accumulate per-cluster counts and inertia.
fn assign_points(result: &mut KMeansResult, data: &mut Dataset) {
    let k = result.k as usize;
    for c in &mut result.centroids[..k] {
        c.point_count = 0;
        c.inertia = Fixed::ZERO;
    }

    for point in &mut data.points {
        let mut best = 0usize;
        let mut best_dist = Fixed::MAX;
        for (j, c) in result.centroids[..k].iter().enumerate() {
            let centroid_point = DataPoint::new(c.x, c.y);
            let dist = euclidean_distance(point, &centroid_point);
            if dist < best_dist {
                best_dist = dist;
                best = j;
            }
        }

        point.cluster_id = best as u8;
        result.centroids[best].point_count += 1;
        result.centroids[best].inertia = result.centroids[best]
            .inertia
            .saturating_add(best_dist.saturating_mul(best_dist));
    }
}

/// Move each centroid to the mean of its assigned points. Empty clusters
/// keep their previous position.
fn update_centroids(result: &mut KMeansResult, data: &Dataset) {
    let k = result.k as usize;
    let mut sum_x = [0i64; KMEANS_MAX_K];
    let mut sum_y = [0i64; KMEANS_MAX_K];
    let mut counts = [0i64; KMEANS_MAX_K];

    for point in &data.points {
        let c = (point.cluster_id as usize).min(k - 1);
        sum_x[c] += point.x.to_bits() as i64;
        sum_y[c] += point.y.to_bits() as i64;
        counts[c] += 1;
    }

    for i in 0..k {
        if counts[i] > 0 {
            result.centroids[i].x = Fixed::from_bits((sum_x[i] / counts[i]) as i32);
            result.centroids[i].y = Fixed::from_bits((sum_y[i] / counts[i]) as i32);
        }
    }
}

/// Mean silhouette coefficient of the clustering, in [-1, 1]. Zero when
/// there are fewer than two clusters or two points.
pub fn silhouette_score(data: &Dataset, result: &KMeansResult) -> Fixed {
    if result.k < 2 || data.len() < 2 {
        return Fixed::ZERO;
    }

    let points = data.points();
    let mut total = 0i64;

    for (i, point) in points.iter().enumerate() {
        let own = point.cluster_id;

        // a(i): mean distance to same-cluster peers.
        let mut a_sum = 0i64;
        let mut a_count = 0i64;
        for (j, other) in points.iter().enumerate() {
            if i != j && other.cluster_id == own {
                a_sum += euclidean_distance(point, other).to_bits() as i64;
                a_count += 1;
            }
        }
        let a = if a_count > 0 { a_sum / a_count } else { 0 };

        // b(i): smallest mean distance to any other cluster.
        let mut b = i64::MAX;
        for c in 0..result.k {
            if c == own {
                continue;
            }
            let mut sum = 0i64;
            let mut count = 0i64;
            for other in points {
                if other.cluster_id == c {
                    sum += euclidean_distance(point, other).to_bits() as i64;
                    count += 1;
                }
            }
            if count > 0 {
                b = b.min(sum / count);
            }
        }
        if b == i64::MAX {
            continue;
        }

        let max_ab = a.max(b);
        if max_ab > 0 {
            // s(i) = (b - a) / max(a, b), scaled to Q15.16.
            total += ((b - a) << 16) / max_ab;
        }
    }

    Fixed::from_bits((total / points.len() as i64) as i32)
}

/// Run k-means for every k in `[k_min, k_max]` and return the run with the
/// best silhouette score.
pub fn find_optimal_k(data: &mut Dataset, k_min: u8, k_max: u8) -> KMeansResult {
    let k_min = k_min.max(1);
    let k_max = k_max.min(KMEANS_MAX_K as u8).max(k_min);

    let mut best = KMeansResult::default();
    let mut best_score = Fixed::MIN;
    for k in k_min..=k_max {
        let result = kmeans(data, k);
        if result.silhouette_score > best_score {
            best_score = result.silhouette_score;
            best = result;
        }
    }
    best
}

/// Append-only dataset that re-clusters every [`RECLUSTER_INTERVAL`] points.
#[derive(Debug, Clone)]
pub struct StreamingClusterer {
    dataset: Dataset,
    result: KMeansResult,
    k: u8,
    dropped: u32,
}

impl StreamingClusterer {
    pub fn new(k: u8) -> Self {
        Self {
            dataset: Dataset::new(),
            result: KMeansResult::default(),
            k,
            dropped: 0,
        }
    }

    /// Add a point, re-clustering on the interval boundary. Returns false
    /// when the point was dropped for capacity.
    pub fn add_point(&mut self, point: DataPoint) -> bool {
        if !self.dataset.push(point) {
            self.dropped += 1;
            return false;
        }
        if self.dataset.len() % RECLUSTER_INTERVAL == 0 {
            self.result = kmeans(&mut self.dataset, self.k);
            tracing::debug!(
                points = self.dataset.len(),
                k = self.result.k,
                silhouette = self.result.silhouette_score.to_f64(),
                "streaming re-cluster"
            );
        }
        true
    }

    /// The last completed clustering pass.
    pub fn snapshot(&self) -> KMeansResult {
        self.result
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Points dropped after the dataset filled.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.dataset.clear();
        self.result = KMeansResult::default();
        self.dropped = 0;
    }
}

// ---------------------------------------------------------------------------
// Feature extraction
// ---------------------------------------------------------------------------

/// Feature points from one frame: (duration ms, length bytes) and
/// (RSSI dBm, frequency MHz). Empty frames produce nothing.
pub fn extract_frame_features(frame: &Frame) -> Vec<DataPoint> {
    if frame.length == 0 {
        return Vec::new();
    }
    vec![
        DataPoint::new(
            Fixed::from_int((frame.duration_us / 1000) as i32),
            Fixed::from_int(frame.length as i32),
        ),
        DataPoint::new(
            Fixed::from_int(frame.rssi_dbm as i32),
            Fixed::from_int((frame.frequency_hz / 1_000_000) as i32),
        ),
    ]
}

/// Feature points from consecutive pulse pairs: (mark width, space width)
/// in microseconds.
pub fn extract_pulse_features(pulses: &[Pulse]) -> Vec<DataPoint> {
    if pulses.len() < 2 {
        return Vec::new();
    }
    let mut features = Vec::with_capacity(pulses.len() / 2);
    let mut i = 0;
    while i + 1 < pulses.len() {
        features.push(DataPoint::new(
            Fixed::from_int(pulses[i].width_us as i32),
            Fixed::from_int(pulses[i + 1].width_us as i32),
        ));
        i += 2;
    }
    features
}

// ---------------------------------------------------------------------------
// Dynamic time warping
// ---------------------------------------------------------------------------

/// DTW alignment cost between two fixed-point sequences, normalised by the
/// longer length. Sequences are truncated at [`DTW_MAX_LENGTH`]. One empty
/// input yields [`Fixed::MAX`]; two empty inputs yield zero.
pub fn dtw_distance(seq1: &[Fixed], seq2: &[Fixed]) -> Fixed {
    let a = &seq1[..seq1.len().min(DTW_MAX_LENGTH)];
    let b = &seq2[..seq2.len().min(DTW_MAX_LENGTH)];
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Fixed::ZERO,
        (true, false) | (false, true) => return Fixed::MAX,
        _ => {}
    }

    // Two-row dynamic program over i64 cost bits.
    const INF: i64 = i64::MAX / 4;
    let mut prev = vec![INF; b.len() + 1];
    let mut curr = vec![INF; b.len() + 1];
    prev[0] = 0;

    for &av in a {
        curr[0] = INF;
        for (j, &bv) in b.iter().enumerate() {
            let cost = (av - bv).abs().to_bits() as i64;
            let best = prev[j].min(prev[j + 1]).min(curr[j]);
            curr[j + 1] = cost + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let total = prev[b.len()];
    Fixed::from_bits((total / a.len().max(b.len()) as i64) as i32)
}

/// DTW distance between two pulse trains, over their width sequences.
pub fn pulse_dtw_distance(pulses1: &[Pulse], pulses2: &[Pulse]) -> Fixed {
    let seq1: Vec<Fixed> = pulses1
        .iter()
        .take(DTW_MAX_LENGTH)
        .map(|p| Fixed::from_int(p.width_us as i32))
        .collect();
    let seq2: Vec<Fixed> = pulses2
        .iter()
        .take(DTW_MAX_LENGTH)
        .map(|p| Fixed::from_int(p.width_us as i32))
        .collect();
    dtw_distance(&seq1, &seq2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PulseLevel;

    fn two_cluster_data() -> Dataset {
        let mut data = Dataset::new();
        for (x, y) in [
            (10, 10),
            (20, 20),
            (11, 10),
            (21, 20),
            (10, 11),
            (20, 21),
        ] {
            data.push(DataPoint::new(Fixed::from_int(x), Fixed::from_int(y)));
        }
        data
    }

    #[test]
    fn test_kmeans_two_clusters() {
        let mut data = two_cluster_data();
        let result = kmeans(&mut data, 2);

        assert!(result.converged);
        assert!(result.iterations <= 5, "took {} iterations", result.iterations);
        assert_eq!(result.k, 2);
        assert_eq!(result.point_count_total(), 6);
        assert!(
            result.silhouette_score.to_f64() > 0.5,
            "silhouette {}",
            result.silhouette_score
        );

        // Intra-cluster spread is small compared with the separation.
        let c0 = DataPoint::new(result.centroids[0].x, result.centroids[0].y);
        let c1 = DataPoint::new(result.centroids[1].x, result.centroids[1].y);
        let inter = euclidean_distance(&c0, &c1);
        for p in data.points() {
            let own = if p.cluster_id == 0 { &c0 } else { &c1 };
            assert!(euclidean_distance(p, own) < inter);
        }
    }

    #[test]
    fn test_kmeans_centroid_is_mean() {
        let mut data = Dataset::new();
        for x in [2, 4] {
            data.push(DataPoint::new(Fixed::from_int(x), Fixed::ZERO));
        }
        for x in [100, 102] {
            data.push(DataPoint::new(Fixed::from_int(x), Fixed::ZERO));
        }
        let result = kmeans(&mut data, 2);
        assert!(result.converged);
        assert_eq!(result.centroids[0].x, Fixed::from_int(3));
        assert_eq!(result.centroids[1].x, Fixed::from_int(101));
    }

    #[test]
    fn test_kmeans_k_fallbacks() {
        let mut data = two_cluster_data();
        // k = 0 falls back to the default of 3.
        let result = kmeans(&mut data, 0);
        assert_eq!(result.k, 3);
        // k beyond the dataset clamps down.
        let mut tiny = Dataset::new();
        tiny.push(DataPoint::new(Fixed::ONE, Fixed::ONE));
        tiny.push(DataPoint::new(Fixed::TWO, Fixed::TWO));
        let result = kmeans(&mut tiny, 5);
        assert_eq!(result.k, 2);
    }

    #[test]
    fn test_kmeans_empty_dataset() {
        let mut data = Dataset::new();
        let result = kmeans(&mut data, 3);
        assert_eq!(result.k, 0);
        assert!(!result.converged);
        assert_eq!(result.total_inertia, Fixed::ZERO);
    }

    #[test]
    fn test_kmeans_single_point() {
        let mut data = Dataset::new();
        data.push(DataPoint::new(Fixed::from_int(7), Fixed::from_int(7)));
        let result = kmeans(&mut data, 3);
        assert_eq!(result.k, 1);
        assert!(result.converged);
        assert_eq!(result.centroids[0].point_count, 1);
        // Fewer than two clusters: silhouette degenerates to zero.
        assert_eq!(result.silhouette_score, Fixed::ZERO);
    }

    #[test]
    fn test_find_optimal_k_picks_two() {
        let mut data = two_cluster_data();
        let best = find_optimal_k(&mut data, 2, 4);
        assert_eq!(best.k, 2, "expected k=2, silhouette {}", best.silhouette_score);
    }

    #[test]
    fn test_structural_validity() {
        let mut data = two_cluster_data();
        let result = kmeans(&mut data, 2);
        assert!(result.is_structurally_valid(data.len()));
    }

    #[test]
    fn test_streaming_reclusters_on_interval() {
        let mut sc = StreamingClusterer::new(2);
        for i in 0..49 {
            let base = if i % 2 == 0 { 10 } else { 40 };
            sc.add_point(DataPoint::new(
                Fixed::from_int(base),
                Fixed::from_int(base),
            ));
        }
        // No pass has run yet.
        assert_eq!(sc.snapshot().k, 0);
        sc.add_point(DataPoint::new(Fixed::from_int(10), Fixed::from_int(10)));
        let snap = sc.snapshot();
        assert_eq!(snap.k, 2);
        assert_eq!(snap.point_count_total(), 50);
    }

    #[test]
    fn test_streaming_reset() {
        let mut sc = StreamingClusterer::new(2);
        for _ in 0..50 {
            sc.add_point(DataPoint::new(Fixed::ONE, Fixed::ONE));
        }
        sc.reset();
        assert!(sc.is_empty());
        assert_eq!(sc.snapshot().k, 0);
    }

    #[test]
    fn test_distance_metrics() {
        let a = DataPoint::new(Fixed::ZERO, Fixed::ZERO);
        let b = DataPoint::new(Fixed::from_int(3), Fixed::from_int(4));
        assert!((euclidean_distance(&a, &b).to_f64() - 5.0).abs() < 0.01);
        assert_eq!(manhattan_distance(&a, &b), Fixed::from_int(7));
        assert_eq!(DistanceMetric::Manhattan.distance(&a, &b), Fixed::from_int(7));
        // Zero vector has undefined angle.
        assert_eq!(cosine_distance(&a, &b), Fixed::MAX);

        let c = DataPoint::new(Fixed::from_int(6), Fixed::from_int(8));
        assert!(cosine_distance(&b, &c).abs().to_bits() < 256);
    }

    #[test]
    fn test_extract_frame_features() {
        let frame = Frame::new(0, 12_000, -70, 433_920_000, &[1, 2, 3, 4], 0, 8);
        let features = extract_frame_features(&frame);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].x, Fixed::from_int(12));
        assert_eq!(features[0].y, Fixed::from_int(4));
        assert_eq!(features[1].x, Fixed::from_int(-70));
        assert_eq!(features[1].y, Fixed::from_int(433));
    }

    #[test]
    fn test_extract_frame_features_empty() {
        let frame = Frame::new(0, 1000, -70, 433_920_000, &[], 0, 0);
        assert!(extract_frame_features(&frame).is_empty());
    }

    #[test]
    fn test_extract_pulse_features() {
        let pulses = [
            Pulse::new(PulseLevel::Mark, 500, 0),
            Pulse::new(PulseLevel::Space, 1000, 500),
            Pulse::new(PulseLevel::Mark, 510, 1500),
            Pulse::new(PulseLevel::Space, 990, 2010),
        ];
        let features = extract_pulse_features(&pulses);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].x, Fixed::from_int(500));
        assert_eq!(features[0].y, Fixed::from_int(1000));
    }

    #[test]
    fn test_dtw_identical_sequences() {
        let seq: Vec<Fixed> = (0..10).map(Fixed::from_int).collect();
        assert_eq!(dtw_distance(&seq, &seq), Fixed::ZERO);
    }

    #[test]
    fn test_dtw_offset_sequences() {
        let a: Vec<Fixed> = (0..8).map(|_| Fixed::from_int(10)).collect();
        let b: Vec<Fixed> = (0..8).map(|_| Fixed::from_int(13)).collect();
        let d = dtw_distance(&a, &b);
        assert!((d.to_f64() - 3.0).abs() < 0.5, "dtw {d}");
    }

    #[test]
    fn test_dtw_empty_inputs() {
        let seq = [Fixed::ONE];
        assert_eq!(dtw_distance(&[], &[]), Fixed::ZERO);
        assert_eq!(dtw_distance(&seq, &[]), Fixed::MAX);
    }

    #[test]
    fn test_dtw_warping_alignment() {
        // A stretched copy aligns with low cost.
        let a = [1, 2, 3, 4].map(Fixed::from_int);
        let b = [1, 1, 2, 2, 3, 3, 4, 4].map(Fixed::from_int);
        let stretched = dtw_distance(&a, &b);
        let different = dtw_distance(&a, &[9, 9, 9, 9].map(Fixed::from_int));
        assert!(stretched < different);
    }

    #[test]
    fn test_dataset_capacity() {
        let mut data = Dataset::new();
        for _ in 0..MAX_DATASET_POINTS {
            assert!(data.push(DataPoint::default()));
        }
        assert!(!data.push(DataPoint::default()));
        assert_eq!(data.len(), MAX_DATASET_POINTS);
    }

    #[test]
    fn test_dataset_bounds() {
        let mut data = Dataset::new();
        data.push(DataPoint::new(Fixed::from_int(-5), Fixed::from_int(2)));
        data.push(DataPoint::new(Fixed::from_int(9), Fixed::from_int(-3)));
        let (min_x, max_x, min_y, max_y) = data.bounds();
        assert_eq!(min_x, Fixed::from_int(-5));
        assert_eq!(max_x, Fixed::from_int(9));
        assert_eq!(min_y, Fixed::from_int(-3));
        assert_eq!(max_y, Fixed::from_int(2));
    }
}
