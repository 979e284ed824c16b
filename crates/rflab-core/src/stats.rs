//! Online and batch statistics over fixed-point sample streams
//!
//! The numerical workhorses shared by the analysis engines:
//!
//! - **[`Welford`]** — single-pass online mean/variance. The naïve two-pass
//!   sum-of-squares cancels catastrophically on integer streams whose mean is
//!   large relative to their spread (inter-frame intervals in µs are exactly
//!   that); Welford's update sidesteps it.
//! - **[`FixedHistogram`]** — bounded-bin histogram with percentile, mode,
//!   and median estimators.
//! - **[`shannon_entropy`]** — bits-per-byte entropy over byte streams.
//! - **[`SampleSummary`]** — integer-domain batch statistics for microsecond
//!   quantities that exceed the Q15.16 integer range.
//! - **[`FirFilter`] / [`IirFilter`] / [`MovingAverage`]** — direct-form
//!   filters with statically bounded state.
//! - **[`LinearRegression`]** — least-squares fit with r².
//!
//! ## Example
//!
//! ```rust
//! use rflab_core::fixed::Fixed;
//! use rflab_core::stats::Welford;
//!
//! let mut w = Welford::new();
//! for v in 1..=10 {
//!     w.add(Fixed::from_int(v));
//! }
//! assert!((w.mean().to_f64() - 5.5).abs() < 0.1);
//! assert!((w.variance().to_f64() - 9.166).abs() < 0.5);
//! ```

use crate::fixed::Fixed;

/// Maximum histogram bins.
pub const HISTOGRAM_MAX_BINS: usize = 256;

/// Maximum points retained by [`LinearRegression`].
pub const REGRESSION_MAX_POINTS: usize = 1000;

/// Maximum FIR filter order.
pub const FIR_MAX_ORDER: usize = 8;

/// Maximum IIR filter order.
pub const IIR_MAX_ORDER: usize = 4;

// ---------------------------------------------------------------------------
// Welford online accumulator
// ---------------------------------------------------------------------------

/// Welford's online mean/variance accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Welford {
    n: u32,
    mean: Fixed,
    m2: Fixed,
    min: Fixed,
    max: Fixed,
}

impl Welford {
    pub fn new() -> Self {
        Self {
            n: 0,
            mean: Fixed::ZERO,
            m2: Fixed::ZERO,
            min: Fixed::MAX,
            max: Fixed::MIN,
        }
    }

    /// Fold one sample into the accumulator.
    pub fn add(&mut self, x: Fixed) {
        self.n += 1;
        if x < self.min {
            self.min = x;
        }
        if x > self.max {
            self.max = x;
        }
        let delta = x - self.mean;
        self.mean = self.mean + Fixed::from_bits(delta.to_bits() / self.n as i32);
        let delta2 = x - self.mean;
        self.m2 = self.m2.saturating_add(delta.saturating_mul(delta2));
    }

    pub fn count(&self) -> u32 {
        self.n
    }

    pub fn mean(&self) -> Fixed {
        self.mean
    }

    /// Sample variance `m2 / (n-1)`; zero with fewer than two samples.
    pub fn variance(&self) -> Fixed {
        if self.n < 2 {
            return Fixed::ZERO;
        }
        Fixed::from_bits(self.m2.to_bits() / (self.n - 1) as i32)
    }

    pub fn std_dev(&self) -> Fixed {
        self.variance().sqrt()
    }

    /// Smallest sample seen; zero before any sample.
    pub fn min(&self) -> Fixed {
        if self.n == 0 {
            Fixed::ZERO
        } else {
            self.min
        }
    }

    /// Largest sample seen; zero before any sample.
    pub fn max(&self) -> Fixed {
        if self.n == 0 {
            Fixed::ZERO
        } else {
            self.max
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Bounded-bin fixed-point histogram.
///
/// Out-of-range samples are rejected rather than clamped, so
/// `sum(bins) == total_samples` holds at all times.
#[derive(Debug, Clone)]
pub struct FixedHistogram {
    bins: Vec<u32>,
    min_val: Fixed,
    max_val: Fixed,
    bin_width: Fixed,
    total_samples: u32,
    peak_bin: usize,
    peak_count: u32,
}

impl FixedHistogram {
    /// Create a histogram over [min_val, max_val] with at most 256 bins.
    pub fn new(num_bins: usize, min_val: Fixed, max_val: Fixed) -> Self {
        let num_bins = num_bins.clamp(1, HISTOGRAM_MAX_BINS);
        let span = max_val - min_val;
        let bin_width = if span.to_bits() / num_bins as i32 == 0 {
            Fixed::ONE
        } else {
            Fixed::from_bits(span.to_bits() / num_bins as i32)
        };
        Self {
            bins: vec![0; num_bins],
            min_val,
            max_val,
            bin_width,
            total_samples: 0,
            peak_bin: 0,
            peak_count: 0,
        }
    }

    /// Add one sample; values outside [min, max] are dropped.
    pub fn add(&mut self, value: Fixed) {
        if value < self.min_val || value > self.max_val {
            return;
        }
        let raw = (value - self.min_val).to_bits() / self.bin_width.to_bits();
        let bin = (raw as usize).min(self.bins.len() - 1);

        self.bins[bin] += 1;
        self.total_samples += 1;
        if self.bins[bin] > self.peak_count {
            self.peak_count = self.bins[bin];
            self.peak_bin = bin;
        }
    }

    pub fn counts(&self) -> &[u32] {
        &self.bins
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn total_samples(&self) -> u32 {
        self.total_samples
    }

    pub fn peak_bin(&self) -> usize {
        self.peak_bin
    }

    pub fn peak_count(&self) -> u32 {
        self.peak_count
    }

    pub fn bin_width(&self) -> Fixed {
        self.bin_width
    }

    /// Probability per bin in Q15.16 (zeros when empty).
    pub fn normalized(&self) -> Vec<Fixed> {
        if self.total_samples == 0 {
            return vec![Fixed::ZERO; self.bins.len()];
        }
        self.bins
            .iter()
            .map(|&c| {
                Fixed::from_bits((((c as i64) << 16) / self.total_samples as i64) as i32)
            })
            .collect()
    }

    /// Index of the smallest bin whose cumulative count reaches
    /// `total · percentile / 100`.
    pub fn percentile(&self, percentile: u8) -> usize {
        let target = (self.total_samples as u64 * percentile as u64) / 100;
        let mut cumulative = 0u64;
        for (i, &c) in self.bins.iter().enumerate() {
            cumulative += c as u64;
            if cumulative >= target {
                return i;
            }
        }
        self.bins.len() - 1
    }

    /// Center value of the most populated bin.
    pub fn mode(&self) -> Fixed {
        self.bin_center(self.peak_bin)
    }

    /// Center value of the 50th-percentile bin.
    pub fn median(&self) -> Fixed {
        self.bin_center(self.percentile(50))
    }

    fn bin_center(&self, bin: usize) -> Fixed {
        self.min_val
            + Fixed::from_bits(self.bin_width.to_bits() * bin as i32)
            + Fixed::from_bits(self.bin_width.to_bits() / 2)
    }

    pub fn clear(&mut self) {
        self.bins.fill(0);
        self.total_samples = 0;
        self.peak_bin = 0;
        self.peak_count = 0;
    }
}

// ---------------------------------------------------------------------------
// Entropy
// ---------------------------------------------------------------------------

/// Shannon entropy of a byte stream in bits per byte, Q15.16.
pub fn shannon_entropy(data: &[u8]) -> Fixed {
    if data.is_empty() {
        return Fixed::ZERO;
    }
    let mut freqs = [0u32; 256];
    for &b in data {
        freqs[b as usize] += 1;
    }
    entropy_from_freqs(&freqs, data.len() as u64)
}

/// Shannon entropy from a pre-aggregated byte-frequency table.
pub fn entropy_from_freqs(freqs: &[u32; 256], total: u64) -> Fixed {
    if total == 0 {
        return Fixed::ZERO;
    }
    let mut entropy = Fixed::ZERO;
    for &f in freqs.iter() {
        if f == 0 {
            continue;
        }
        let p = Fixed::from_bits((((f as i64) << 16) / total as i64) as i32);
        if p == Fixed::ZERO {
            continue;
        }
        // -p · log2(p); log2 is negative over (0, 1].
        entropy = entropy - p * p.log2();
    }
    entropy
}

// ---------------------------------------------------------------------------
// Integer-domain batch statistics
// ---------------------------------------------------------------------------

/// Batch statistics over raw `u32` samples (microsecond intervals and the
/// like, whose magnitudes exceed the Q15.16 integer range).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleSummary {
    pub min: u32,
    pub max: u32,
    pub mean: u32,
    /// Population variance, saturated to `u32::MAX`.
    pub variance: u32,
    pub std_dev: u32,
}

impl SampleSummary {
    /// Compute min/max/mean/variance/std-dev in one pass over the slice.
    pub fn from_samples(data: &[u32]) -> Self {
        if data.is_empty() {
            return Self::default();
        }

        let mut sum = 0u64;
        let mut min = data[0];
        let mut max = data[0];
        for &v in data {
            sum += v as u64;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        let mean = (sum / data.len() as u64) as u32;

        let mut variance_sum = 0u64;
        for &v in data {
            let diff = v as i64 - mean as i64;
            variance_sum = variance_sum.saturating_add((diff * diff) as u64);
        }
        let variance64 = variance_sum / data.len() as u64;
        let variance = variance64.min(u32::MAX as u64) as u32;

        Self {
            min,
            max,
            mean,
            variance,
            std_dev: isqrt_u64(variance64),
        }
    }
}

/// Integer square root of a `u64`, rounded down, saturated to `u32`.
pub fn isqrt_u64(value: u64) -> u32 {
    if value == 0 {
        return 0;
    }
    let mut v = value;
    let mut result = 0u64;
    let mut bit = 1u64 << 62;
    while bit > v {
        bit >>= 2;
    }
    while bit != 0 {
        if v >= result + bit {
            v -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }
    result.min(u32::MAX as u64) as u32
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Direct-form FIR filter, order ≤ 8.
#[derive(Debug, Clone)]
pub struct FirFilter {
    coeffs: [Fixed; FIR_MAX_ORDER],
    history: [Fixed; FIR_MAX_ORDER],
    order: usize,
    index: usize,
}

impl FirFilter {
    /// Build from coefficient taps, truncated at order 8.
    pub fn new(coeffs: &[Fixed]) -> Self {
        let order = coeffs.len().clamp(1, FIR_MAX_ORDER);
        let mut c = [Fixed::ZERO; FIR_MAX_ORDER];
        c[..order].copy_from_slice(&coeffs[..order]);
        Self {
            coeffs: c,
            history: [Fixed::ZERO; FIR_MAX_ORDER],
            order,
            index: 0,
        }
    }

    /// Push one sample, returning the filtered output.
    pub fn process(&mut self, input: Fixed) -> Fixed {
        self.history[self.index] = input;
        self.index = (self.index + 1) % self.order;

        let mut output = Fixed::ZERO;
        for i in 0..self.order {
            let idx = (self.index + self.order - 1 - i) % self.order;
            output = output + self.coeffs[i] * self.history[idx];
        }
        output
    }

    pub fn reset(&mut self) {
        self.history = [Fixed::ZERO; FIR_MAX_ORDER];
        self.index = 0;
    }
}

/// Direct-form IIR filter, order ≤ 4.
#[derive(Debug, Clone)]
pub struct IirFilter {
    a_coeffs: [Fixed; IIR_MAX_ORDER],
    b_coeffs: [Fixed; IIR_MAX_ORDER],
    x_history: [Fixed; IIR_MAX_ORDER],
    y_history: [Fixed; IIR_MAX_ORDER],
    order: usize,
    index: usize,
}

impl IirFilter {
    /// Build from denominator (`a`) and numerator (`b`) coefficients.
    pub fn new(a: &[Fixed], b: &[Fixed]) -> Self {
        let order = a.len().min(b.len()).clamp(1, IIR_MAX_ORDER);
        let mut ac = [Fixed::ZERO; IIR_MAX_ORDER];
        let mut bc = [Fixed::ZERO; IIR_MAX_ORDER];
        ac[..order].copy_from_slice(&a[..order]);
        bc[..order].copy_from_slice(&b[..order]);
        Self {
            a_coeffs: ac,
            b_coeffs: bc,
            x_history: [Fixed::ZERO; IIR_MAX_ORDER],
            y_history: [Fixed::ZERO; IIR_MAX_ORDER],
            order,
            index: 0,
        }
    }

    /// Push one sample, returning the filtered output.
    pub fn process(&mut self, input: Fixed) -> Fixed {
        self.x_history[self.index] = input;

        let mut output = Fixed::ZERO;
        for i in 0..self.order {
            let idx = (self.index + self.order - i) % self.order;
            output = output + self.b_coeffs[i] * self.x_history[idx];
        }
        for i in 1..self.order {
            let idx = (self.index + self.order - i) % self.order;
            output = output - self.a_coeffs[i] * self.y_history[idx];
        }
        if self.a_coeffs[0] != Fixed::ZERO {
            output = output / self.a_coeffs[0];
        }

        self.y_history[self.index] = output;
        self.index = (self.index + 1) % self.order;
        output
    }

    pub fn reset(&mut self) {
        self.x_history = [Fixed::ZERO; IIR_MAX_ORDER];
        self.y_history = [Fixed::ZERO; IIR_MAX_ORDER];
        self.index = 0;
    }
}

/// Boxcar moving average over a fixed window (zero-filled until warm).
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buffer: Vec<Fixed>,
    index: usize,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            buffer: vec![Fixed::ZERO; window.clamp(1, 256)],
            index: 0,
        }
    }

    /// Push one sample, returning the window mean.
    pub fn update(&mut self, value: Fixed) -> Fixed {
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.buffer.len();

        let mut sum = 0i64;
        for v in &self.buffer {
            sum += v.to_bits() as i64;
        }
        Fixed::from_bits((sum / self.buffer.len() as i64) as i32)
    }

    pub fn reset(&mut self) {
        self.buffer.fill(Fixed::ZERO);
        self.index = 0;
    }
}

// ---------------------------------------------------------------------------
// Linear regression
// ---------------------------------------------------------------------------

/// Least-squares line fit over bounded (x, y) pairs.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    points: Vec<(Fixed, Fixed)>,
    slope: Fixed,
    intercept: Fixed,
    r_squared: Fixed,
    correlation: Fixed,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(REGRESSION_MAX_POINTS),
            slope: Fixed::ZERO,
            intercept: Fixed::ZERO,
            r_squared: Fixed::ZERO,
            correlation: Fixed::ZERO,
        }
    }

    /// Add a point; returns false (dropping the point) once at capacity.
    pub fn add_point(&mut self, x: Fixed, y: Fixed) -> bool {
        if self.points.len() >= REGRESSION_MAX_POINTS {
            return false;
        }
        self.points.push((x, y));
        true
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    /// Fit slope/intercept/r² from the accumulated points. With fewer than
    /// two points the coefficients stay zero.
    pub fn calculate(&mut self) {
        let n = self.points.len();
        if n < 2 {
            return;
        }

        let mut sum_x = 0i64;
        let mut sum_y = 0i64;
        for &(x, y) in &self.points {
            sum_x += x.to_bits() as i64;
            sum_y += y.to_bits() as i64;
        }
        let mean_x = Fixed::from_bits((sum_x / n as i64) as i32);
        let mean_y = Fixed::from_bits((sum_y / n as i64) as i32);

        let mut num = Fixed::ZERO;
        let mut den = Fixed::ZERO;
        for &(x, y) in &self.points {
            let dx = x - mean_x;
            let dy = y - mean_y;
            num = num.saturating_add(dx.saturating_mul(dy));
            den = den.saturating_add(dx.saturating_mul(dx));
        }
        if den != Fixed::ZERO {
            self.slope = num / den;
            self.intercept = mean_y - self.slope * mean_x;
        }

        let mut ss_res = Fixed::ZERO;
        let mut ss_tot = Fixed::ZERO;
        for &(x, y) in &self.points {
            let res = y - self.predict(x);
            let tot = y - mean_y;
            ss_res = ss_res.saturating_add(res.saturating_mul(res));
            ss_tot = ss_tot.saturating_add(tot.saturating_mul(tot));
        }
        if ss_tot != Fixed::ZERO {
            self.r_squared = Fixed::ONE - ss_res / ss_tot;
        }

        self.correlation = self.r_squared.sqrt();
        if num < Fixed::ZERO {
            self.correlation = -self.correlation;
        }
    }

    /// Evaluate the fitted line at `x`.
    pub fn predict(&self, x: Fixed) -> Fixed {
        self.intercept + self.slope * x
    }

    pub fn slope(&self) -> Fixed {
        self.slope
    }

    pub fn intercept(&self) -> Fixed {
        self.intercept
    }

    pub fn r_squared(&self) -> Fixed {
        self.r_squared
    }

    pub fn correlation(&self) -> Fixed {
        self.correlation
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.slope = Fixed::ZERO;
        self.intercept = Fixed::ZERO;
        self.r_squared = Fixed::ZERO;
        self.correlation = Fixed::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welford_one_through_ten() {
        let mut w = Welford::new();
        for v in 1..=10 {
            w.add(Fixed::from_int(v));
        }
        assert_eq!(w.count(), 10);
        assert!((w.mean().to_f64() - 5.5).abs() < 0.1);
        assert!((w.variance().to_f64() - 9.166).abs() < 0.5);
        assert_eq!(w.min(), Fixed::from_int(1));
        assert_eq!(w.max(), Fixed::from_int(10));
    }

    #[test]
    fn test_welford_insufficient_samples() {
        let mut w = Welford::new();
        assert_eq!(w.variance(), Fixed::ZERO);
        assert_eq!(w.min(), Fixed::ZERO);
        w.add(Fixed::from_int(7));
        assert_eq!(w.variance(), Fixed::ZERO);
        assert_eq!(w.mean(), Fixed::from_int(7));
    }

    #[test]
    fn test_welford_constant_stream() {
        let mut w = Welford::new();
        for _ in 0..50 {
            w.add(Fixed::from_int(42));
        }
        assert_eq!(w.mean(), Fixed::from_int(42));
        assert!(w.variance().abs().to_bits() < 16);
    }

    #[test]
    fn test_histogram_counts_and_peak() {
        let mut h = FixedHistogram::new(10, Fixed::ZERO, Fixed::from_int(10));
        for v in [1, 1, 1, 5, 9] {
            h.add(Fixed::from_int(v));
        }
        assert_eq!(h.total_samples(), 5);
        assert_eq!(h.counts().iter().sum::<u32>(), h.total_samples());
        assert_eq!(h.peak_count(), 3);
        assert_eq!(h.counts()[h.peak_bin()], h.peak_count());
    }

    #[test]
    fn test_histogram_rejects_out_of_range() {
        let mut h = FixedHistogram::new(4, Fixed::ZERO, Fixed::from_int(4));
        h.add(Fixed::from_int(-1));
        h.add(Fixed::from_int(5));
        assert_eq!(h.total_samples(), 0);
    }

    #[test]
    fn test_histogram_percentile_median() {
        let mut h = FixedHistogram::new(10, Fixed::ZERO, Fixed::from_int(10));
        for v in 0..10 {
            h.add(Fixed::from_int(v));
        }
        let median = h.median().to_f64();
        assert!((median - 4.5).abs() < 1.1, "median {median}");
        assert_eq!(h.percentile(100), 9);
        assert_eq!(h.percentile(0), 0);
    }

    #[test]
    fn test_histogram_mode() {
        let mut h = FixedHistogram::new(10, Fixed::ZERO, Fixed::from_int(10));
        for _ in 0..5 {
            h.add(Fixed::from_f64(5.2));
        }
        h.add(Fixed::from_int(1));
        let mode = h.mode().to_f64();
        assert!((mode - 5.5).abs() < 0.6, "mode {mode}");
    }

    #[test]
    fn test_entropy_uniform_bytes() {
        let data: Vec<u8> = (0..=255).collect();
        let h = shannon_entropy(&data);
        assert!(h.to_f64() > 7.0, "uniform entropy {h}");
    }

    #[test]
    fn test_entropy_constant_bytes() {
        let data = [0x42u8; 100];
        let h = shannon_entropy(&data);
        assert!(h.to_f64() < 0.1, "constant entropy {h}");
    }

    #[test]
    fn test_entropy_sixteen_symbols() {
        let data: Vec<u8> = (0..96).map(|i| (i % 16) as u8).collect();
        let h = shannon_entropy(&data).to_f64();
        assert!(h > 3.0 && h < 5.0, "16-symbol entropy {h}");
    }

    #[test]
    fn test_entropy_empty() {
        assert_eq!(shannon_entropy(&[]), Fixed::ZERO);
    }

    #[test]
    fn test_sample_summary() {
        let data = [10u32, 20, 30, 40, 50];
        let s = SampleSummary::from_samples(&data);
        assert_eq!(s.min, 10);
        assert_eq!(s.max, 50);
        assert_eq!(s.mean, 30);
        assert_eq!(s.variance, 200);
        assert_eq!(s.std_dev, 14);
    }

    #[test]
    fn test_sample_summary_empty() {
        assert_eq!(SampleSummary::from_samples(&[]), SampleSummary::default());
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt_u64(0), 0);
        assert_eq!(isqrt_u64(16), 4);
        assert_eq!(isqrt_u64(15), 3);
        assert_eq!(isqrt_u64(1_000_000), 1000);
        assert_eq!(isqrt_u64(u64::MAX), u32::MAX);
    }

    #[test]
    fn test_fir_moving_average() {
        // 4-tap boxcar.
        let quarter = Fixed::from_f64(0.25);
        let mut fir = FirFilter::new(&[quarter; 4]);
        let mut last = Fixed::ZERO;
        for _ in 0..8 {
            last = fir.process(Fixed::from_int(8));
        }
        assert!((last.to_f64() - 8.0).abs() < 0.01);
    }

    #[test]
    fn test_iir_leaky_integrator() {
        // y[n] = x[n] + 0.5 y[n-1]  =>  DC gain 2.
        let a = [Fixed::ONE, Fixed::from_f64(-0.5)];
        let b = [Fixed::ONE, Fixed::ZERO];
        let mut iir = IirFilter::new(&a, &b);
        let mut last = Fixed::ZERO;
        for _ in 0..30 {
            last = iir.process(Fixed::ONE);
        }
        assert!((last.to_f64() - 2.0).abs() < 0.05, "DC gain {last}");
    }

    #[test]
    fn test_moving_average_warmup() {
        let mut ma = MovingAverage::new(4);
        // Window zero-fills, so the first update averages 10,0,0,0.
        assert!((ma.update(Fixed::from_int(10)).to_f64() - 2.5).abs() < 0.01);
        ma.update(Fixed::from_int(10));
        ma.update(Fixed::from_int(10));
        let full = ma.update(Fixed::from_int(10));
        assert!((full.to_f64() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_linear_regression_exact_line() {
        let mut reg = LinearRegression::new();
        for x in 1..=4 {
            reg.add_point(Fixed::from_int(x), Fixed::from_int(2 * x + 1));
        }
        reg.calculate();
        assert!((reg.slope().to_f64() - 2.0).abs() < 0.01);
        assert!((reg.intercept().to_f64() - 1.0).abs() < 0.05);
        assert!(reg.r_squared().to_f64() > 0.99);
        assert!(reg.correlation().to_f64() > 0.99);
        assert!((reg.predict(Fixed::from_int(10)).to_f64() - 21.0).abs() < 0.2);
    }

    #[test]
    fn test_linear_regression_negative_slope() {
        let mut reg = LinearRegression::new();
        for x in 0..6 {
            reg.add_point(Fixed::from_int(x), Fixed::from_int(10 - x));
        }
        reg.calculate();
        assert!(reg.slope() < Fixed::ZERO);
        assert!(reg.correlation() < Fixed::ZERO);
    }

    #[test]
    fn test_linear_regression_underfilled() {
        let mut reg = LinearRegression::new();
        reg.add_point(Fixed::ONE, Fixed::ONE);
        reg.calculate();
        assert_eq!(reg.slope(), Fixed::ZERO);
        assert_eq!(reg.r_squared(), Fixed::ZERO);
    }
}
