// [libs/infra/histo/src/histogram.rs]
//! Histogram and profile value types: fixed-binning H1D/H2D
//! and the value-axis profiles Prof1D/Prof2D, each carrying its own
//! bin-level accumulators plus a set of axis-wide total sums that survive
//! merges independently of the visible binning (ROOT's `fSumw`, `fSumw2`,
//! `fSumwx`, `fSumwx2` convention).
//!
//! Bins are fixed-width and out-of-range fills are dropped from the
//! binned content but still counted in the total sums, matching the
//! common "integrated statistics ignore the display range" convention.

use crate::metadata::HistoFlags;
use serde::{Deserialize, Serialize};

fn bin_index(x: f64, min: f64, max: f64, n_bins: usize) -> Option<usize> {
    if !x.is_finite() || x < min || x >= max || n_bins == 0 {
        return None;
    }
    let width = (max - min) / n_bins as f64;
    let i = ((x - min) / width) as usize;
    Some(i.min(n_bins - 1))
}

/// Running total sums for a single value axis: `w`, `w^2`, `w*x`, `w*x^2`.
/// The ROOT-style mean/stddev/effective-count formulas fall out of these
/// four accumulators alone, independent of the visible binning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisTotals {
    sum_w: f64,
    sum_w2: f64,
    sum_wx: f64,
    sum_wx2: f64,
}

impl AxisTotals {
    fn fill(&mut self, x: f64, weight: f64) {
        self.sum_w += weight;
        self.sum_w2 += weight * weight;
        self.sum_wx += weight * x;
        self.sum_wx2 += weight * x * x;
    }

    fn merge(&mut self, other: &AxisTotals) {
        self.sum_w += other.sum_w;
        self.sum_w2 += other.sum_w2;
        self.sum_wx += other.sum_wx;
        self.sum_wx2 += other.sum_wx2;
    }

    /// Weighted mean, `sum(w*x) / sum(w)`.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.sum_w == 0.0 {
            0.0
        } else {
            self.sum_wx / self.sum_w
        }
    }

    /// Weighted standard deviation.
    #[must_use]
    pub fn stddev(&self) -> f64 {
        if self.sum_w == 0.0 {
            0.0
        } else {
            let variance = self.sum_wx2 / self.sum_w - self.mean().powi(2);
            variance.max(0.0).sqrt()
        }
    }

    /// Kish effective sample size, `(sum w)^2 / sum(w^2)`.
    #[must_use]
    pub fn effective_count(&self) -> f64 {
        if self.sum_w2 == 0.0 {
            0.0
        } else {
            self.sum_w * self.sum_w / self.sum_w2
        }
    }

    /// Total accumulated weight.
    #[must_use]
    pub fn sum_w(&self) -> f64 {
        self.sum_w
    }
}

/// A one-dimensional, fixed-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H1D {
    /// Object name. On the wire this may carry a `!hex` metadata suffix;
    /// see [`crate::metadata`].
    pub name: String,
    /// Out-of-band flags (`StoreVsTsId`, ..).
    pub flags: HistoFlags,
    n_bins: usize,
    min: f64,
    max: f64,
    bin_contents: Vec<f64>,
    bin_sum_w2: Vec<f64>,
    totals: AxisTotals,
}

impl H1D {
    /// Creates an empty histogram with `n_bins` equal-width bins over `[min, max)`.
    #[must_use]
    pub fn new(name: impl Into<String>, n_bins: usize, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            flags: HistoFlags::empty(),
            n_bins,
            min,
            max,
            bin_contents: vec![0.0; n_bins],
            bin_sum_w2: vec![0.0; n_bins],
            totals: AxisTotals::default(),
        }
    }

    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Lower edge of the axis.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper edge of the axis.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Fills `x` with `weight`, updating the total sums unconditionally
    /// and the binned content when `x` falls inside `[min, max)`.
    pub fn fill(&mut self, x: f64, weight: f64) {
        self.totals.fill(x, weight);
        if let Some(i) = bin_index(x, self.min, self.max, self.n_bins) {
            self.bin_contents[i] += weight;
            self.bin_sum_w2[i] += weight * weight;
        }
    }

    /// Content of bin `i`.
    #[must_use]
    pub fn bin_content(&self, i: usize) -> f64 {
        self.bin_contents[i]
    }

    /// Statistical error of bin `i`, `sqrt(sum w^2)`.
    #[must_use]
    pub fn bin_error(&self, i: usize) -> f64 {
        self.bin_sum_w2[i].sqrt()
    }

    /// Raw accumulated squared weight of bin `i`.
    #[must_use]
    pub fn bin_sum_w2(&self, i: usize) -> f64 {
        self.bin_sum_w2[i]
    }

    /// Axis-wide total sums, independent of the visible binning.
    #[must_use]
    pub fn totals(&self) -> &AxisTotals {
        &self.totals
    }

    /// Absorbs `other`'s bin contents and total sums into `self`.
    ///
    /// # Errors
    /// Returns [`crate::HistoError::ShapeMismatch`] if the binning differs.
    pub fn merge(&mut self, other: &H1D) -> crate::Result<()> {
        if self.n_bins != other.n_bins || self.min != other.min || self.max != other.max {
            return Err(crate::HistoError::ShapeMismatch { name: self.name.clone(), reason: "binning differs" });
        }
        for i in 0..self.n_bins {
            self.bin_contents[i] += other.bin_contents[i];
            self.bin_sum_w2[i] += other.bin_sum_w2[i];
        }
        self.totals.merge(&other.totals);
        Ok(())
    }
}

/// A two-dimensional, fixed-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2D {
    /// Object name; see [`H1D::name`].
    pub name: String,
    /// Out-of-band flags.
    pub flags: HistoFlags,
    n_bins_x: usize,
    min_x: f64,
    max_x: f64,
    n_bins_y: usize,
    min_y: f64,
    max_y: f64,
    bin_contents: Vec<f64>,
    bin_sum_w2: Vec<f64>,
    totals_x: AxisTotals,
    totals_y: AxisTotals,
}

impl H2D {
    /// Creates an empty histogram over `[min_x, max_x) x [min_y, max_y)`.
    #[must_use]
    pub fn new(name: impl Into<String>, n_bins_x: usize, min_x: f64, max_x: f64, n_bins_y: usize, min_y: f64, max_y: f64) -> Self {
        Self {
            name: name.into(),
            flags: HistoFlags::empty(),
            n_bins_x,
            min_x,
            max_x,
            n_bins_y,
            min_y,
            max_y,
            bin_contents: vec![0.0; n_bins_x * n_bins_y],
            bin_sum_w2: vec![0.0; n_bins_x * n_bins_y],
            totals_x: AxisTotals::default(),
            totals_y: AxisTotals::default(),
        }
    }

    /// Fills `(x, y)` with `weight`.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) {
        self.totals_x.fill(x, weight);
        self.totals_y.fill(y, weight);
        if let (Some(ix), Some(iy)) = (bin_index(x, self.min_x, self.max_x, self.n_bins_x), bin_index(y, self.min_y, self.max_y, self.n_bins_y)) {
            let flat = iy * self.n_bins_x + ix;
            self.bin_contents[flat] += weight;
            self.bin_sum_w2[flat] += weight * weight;
        }
    }

    /// Content of bin `(ix, iy)`.
    #[must_use]
    pub fn bin_content(&self, ix: usize, iy: usize) -> f64 {
        self.bin_contents[iy * self.n_bins_x + ix]
    }

    /// Total sums along the x axis.
    #[must_use]
    pub fn totals_x(&self) -> &AxisTotals {
        &self.totals_x
    }

    /// Total sums along the y axis.
    #[must_use]
    pub fn totals_y(&self) -> &AxisTotals {
        &self.totals_y
    }

    /// Absorbs `other`'s bin contents and total sums into `self`.
    ///
    /// # Errors
    /// Returns [`crate::HistoError::ShapeMismatch`] if the binning differs.
    pub fn merge(&mut self, other: &H2D) -> crate::Result<()> {
        if self.n_bins_x != other.n_bins_x || self.n_bins_y != other.n_bins_y || self.min_x != other.min_x || self.max_x != other.max_x || self.min_y != other.min_y || self.max_y != other.max_y {
            return Err(crate::HistoError::ShapeMismatch { name: self.name.clone(), reason: "binning differs" });
        }
        for i in 0..self.bin_contents.len() {
            self.bin_contents[i] += other.bin_contents[i];
            self.bin_sum_w2[i] += other.bin_sum_w2[i];
        }
        self.totals_x.merge(&other.totals_x);
        self.totals_y.merge(&other.totals_y);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct ProfileBin {
    sum_w: f64,
    sum_w2: f64,
    sum_wv: f64,
    sum_wv2: f64,
}

impl ProfileBin {
    fn fill(&mut self, v: f64, weight: f64) {
        self.sum_w += weight;
        self.sum_w2 += weight * weight;
        self.sum_wv += weight * v;
        self.sum_wv2 += weight * v * v;
    }

    fn merge(&mut self, other: &ProfileBin) {
        self.sum_w += other.sum_w;
        self.sum_w2 += other.sum_w2;
        self.sum_wv += other.sum_wv;
        self.sum_wv2 += other.sum_wv2;
    }

    fn mean(&self) -> f64 {
        if self.sum_w == 0.0 {
            0.0
        } else {
            self.sum_wv / self.sum_w
        }
    }

    fn stddev(&self) -> f64 {
        if self.sum_w == 0.0 {
            0.0
        } else {
            (self.sum_wv2 / self.sum_w - self.mean().powi(2)).max(0.0).sqrt()
        }
    }

    fn effective_count(&self) -> f64 {
        if self.sum_w2 == 0.0 {
            0.0
        } else {
            self.sum_w * self.sum_w / self.sum_w2
        }
    }

    fn sem(&self) -> f64 {
        let n = self.effective_count();
        if n == 0.0 {
            0.0
        } else {
            self.stddev() / n.sqrt()
        }
    }
}

/// A one-dimensional profile: per-bin mean/stddev/SEM of a value axis `v`
/// accumulated against a binned coordinate `x` (ROOT's `TProfile`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prof1D {
    /// Object name; see [`H1D::name`].
    pub name: String,
    /// Out-of-band flags.
    pub flags: HistoFlags,
    n_bins: usize,
    min: f64,
    max: f64,
    bins: Vec<ProfileBin>,
    totals: AxisTotals,
}

impl Prof1D {
    /// Creates an empty profile with `n_bins` bins over `[min, max)`.
    #[must_use]
    pub fn new(name: impl Into<String>, n_bins: usize, min: f64, max: f64) -> Self {
        Self { name: name.into(), flags: HistoFlags::empty(), n_bins, min, max, bins: vec![ProfileBin::default(); n_bins], totals: AxisTotals::default() }
    }

    /// Fills the bin containing `x` with value `v`, weighted by `weight`.
    pub fn fill(&mut self, x: f64, v: f64, weight: f64) {
        self.totals.fill(x, weight);
        if let Some(i) = bin_index(x, self.min, self.max, self.n_bins) {
            self.bins[i].fill(v, weight);
        }
    }

    /// Mean value accumulated in bin `i`.
    #[must_use]
    pub fn bin_mean(&self, i: usize) -> f64 {
        self.bins[i].mean()
    }

    /// Standard deviation of the values accumulated in bin `i`.
    #[must_use]
    pub fn bin_stddev(&self, i: usize) -> f64 {
        self.bins[i].stddev()
    }

    /// Effective (Kish) number of entries in bin `i`.
    #[must_use]
    pub fn bin_effective_count(&self, i: usize) -> f64 {
        self.bins[i].effective_count()
    }

    /// Standard error of the mean of bin `i`.
    #[must_use]
    pub fn bin_sem(&self, i: usize) -> f64 {
        self.bins[i].sem()
    }

    /// Axis-wide total sums over the binned coordinate `x`.
    #[must_use]
    pub fn totals(&self) -> &AxisTotals {
        &self.totals
    }

    /// Absorbs `other`'s per-bin accumulators and total sums into `self`.
    ///
    /// # Errors
    /// Returns [`crate::HistoError::ShapeMismatch`] if the binning differs.
    pub fn merge(&mut self, other: &Prof1D) -> crate::Result<()> {
        if self.n_bins != other.n_bins || self.min != other.min || self.max != other.max {
            return Err(crate::HistoError::ShapeMismatch { name: self.name.clone(), reason: "binning differs" });
        }
        for i in 0..self.n_bins {
            self.bins[i].merge(&other.bins[i]);
        }
        self.totals.merge(&other.totals);
        Ok(())
    }
}

/// A two-dimensional profile: per-bin mean/stddev/SEM of a value axis `v`
/// accumulated against a binned `(x, y)` coordinate (ROOT's `TProfile2D`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prof2D {
    /// Object name; see [`H1D::name`].
    pub name: String,
    /// Out-of-band flags.
    pub flags: HistoFlags,
    n_bins_x: usize,
    min_x: f64,
    max_x: f64,
    n_bins_y: usize,
    min_y: f64,
    max_y: f64,
    bins: Vec<ProfileBin>,
    totals_x: AxisTotals,
    totals_y: AxisTotals,
}

impl Prof2D {
    /// Creates an empty profile over `[min_x, max_x) x [min_y, max_y)`.
    #[must_use]
    pub fn new(name: impl Into<String>, n_bins_x: usize, min_x: f64, max_x: f64, n_bins_y: usize, min_y: f64, max_y: f64) -> Self {
        Self {
            name: name.into(),
            flags: HistoFlags::empty(),
            n_bins_x,
            min_x,
            max_x,
            n_bins_y,
            min_y,
            max_y,
            bins: vec![ProfileBin::default(); n_bins_x * n_bins_y],
            totals_x: AxisTotals::default(),
            totals_y: AxisTotals::default(),
        }
    }

    /// Fills the bin containing `(x, y)` with value `v`, weighted by `weight`.
    pub fn fill(&mut self, x: f64, y: f64, v: f64, weight: f64) {
        self.totals_x.fill(x, weight);
        self.totals_y.fill(y, weight);
        if let (Some(ix), Some(iy)) = (bin_index(x, self.min_x, self.max_x, self.n_bins_x), bin_index(y, self.min_y, self.max_y, self.n_bins_y)) {
            self.bins[iy * self.n_bins_x + ix].fill(v, weight);
        }
    }

    /// Mean value accumulated in bin `(ix, iy)`.
    #[must_use]
    pub fn bin_mean(&self, ix: usize, iy: usize) -> f64 {
        self.bins[iy * self.n_bins_x + ix].mean()
    }

    /// Absorbs `other`'s per-bin accumulators and total sums into `self`.
    ///
    /// # Errors
    /// Returns [`crate::HistoError::ShapeMismatch`] if the binning differs.
    pub fn merge(&mut self, other: &Prof2D) -> crate::Result<()> {
        if self.n_bins_x != other.n_bins_x || self.n_bins_y != other.n_bins_y || self.min_x != other.min_x || self.max_x != other.max_x || self.min_y != other.min_y || self.max_y != other.max_y {
            return Err(crate::HistoError::ShapeMismatch { name: self.name.clone(), reason: "binning differs" });
        }
        for i in 0..self.bins.len() {
            self.bins[i].merge(&other.bins[i]);
        }
        self.totals_x.merge(&other.totals_x);
        self.totals_y.merge(&other.totals_y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h1d_fill_updates_bin_content_and_totals() {
        let mut h = H1D::new("x", 10, 0.0, 10.0);
        h.fill(3.5, 2.0);
        h.fill(3.9, 1.0);
        assert_eq!(h.bin_content(3), 3.0);
        assert_eq!(h.totals().sum_w(), 3.0);
        assert!((h.totals().mean() - 3.6333333333333333).abs() < 1e-9);
    }

    #[test]
    fn h1d_out_of_range_fill_counts_in_totals_but_not_bins() {
        let mut h = H1D::new("x", 10, 0.0, 10.0);
        h.fill(-5.0, 1.0);
        h.fill(99.0, 1.0);
        assert_eq!(h.totals().sum_w(), 2.0);
        assert_eq!((0..10).map(|i| h.bin_content(i)).sum::<f64>(), 0.0);
    }

    #[test]
    fn h1d_merge_sums_bins_and_totals() {
        let mut a = H1D::new("x", 4, 0.0, 4.0);
        let mut b = H1D::new("x", 4, 0.0, 4.0);
        a.fill(0.5, 1.0);
        b.fill(0.5, 2.0);
        b.fill(2.5, 1.0);
        a.merge(&b).unwrap();
        assert_eq!(a.bin_content(0), 3.0);
        assert_eq!(a.bin_content(2), 1.0);
        assert_eq!(a.totals().sum_w(), 4.0);
    }

    #[test]
    fn h1d_merge_rejects_mismatched_binning() {
        let mut a = H1D::new("x", 4, 0.0, 4.0);
        let b = H1D::new("x", 8, 0.0, 4.0);
        assert!(matches!(a.merge(&b), Err(crate::HistoError::ShapeMismatch { .. })));
    }

    #[test]
    fn h2d_fill_lands_in_the_right_flattened_bin() {
        let mut h = H2D::new("xy", 2, 0.0, 2.0, 2, 0.0, 2.0);
        h.fill(1.5, 1.5, 1.0);
        assert_eq!(h.bin_content(1, 1), 1.0);
        assert_eq!(h.bin_content(0, 0), 0.0);
    }

    #[test]
    fn prof1d_bin_mean_matches_the_weighted_average_of_its_values() {
        let mut p = Prof1D::new("v_vs_x", 2, 0.0, 2.0);
        p.fill(0.5, 10.0, 1.0);
        p.fill(0.5, 20.0, 1.0);
        assert!((p.bin_mean(0) - 15.0).abs() < 1e-9);
        assert!(p.bin_sem(0) > 0.0);
    }

    #[test]
    fn prof2d_fill_accumulates_the_value_axis_per_xy_bin() {
        let mut p = Prof2D::new("v_vs_xy", 1, 0.0, 1.0, 1, 0.0, 1.0);
        p.fill(0.5, 0.5, 4.0, 1.0);
        p.fill(0.5, 0.5, 6.0, 1.0);
        assert!((p.bin_mean(0, 0) - 5.0).abs() < 1e-9);
    }
}
