//! Binning, correlation and summary statistics used by the render plans

use serde::Serialize;

/// One fixed-width bin of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub label: String,
    pub start: f64,
    pub end: f64,
    pub center: f64,
    pub count: usize,
}

/// Equal-width binning over `[lo, hi]`. A zero-width range uses a step of 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    pub lo: f64,
    pub step: f64,
    pub bins: usize,
}

impl Binning {
    pub fn over(values: &[f64], bins: usize) -> Option<Self> {
        let (lo, hi) = min_max(values)?;
        let step = if hi == lo { 1.0 } else { (hi - lo) / bins as f64 };
        Some(Self { lo, step, bins })
    }

    /// Bin of a value; the maximum lands in the last bin.
    pub fn index(&self, v: f64) -> usize {
        let raw = ((v - self.lo) / self.step).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.bins - 1)
        }
    }

    pub fn start(&self, i: usize) -> f64 {
        self.lo + i as f64 * self.step
    }

    pub fn end(&self, i: usize) -> f64 {
        self.lo + (i + 1) as f64 * self.step
    }

    pub fn center(&self, i: usize) -> f64 {
        self.lo + (i as f64 + 0.5) * self.step
    }

    pub fn counts(&self, values: &[f64]) -> Vec<usize> {
        let mut counts = vec![0; self.bins];
        for v in values {
            counts[self.index(*v)] += 1;
        }
        counts
    }
}

pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let Some(binning) = Binning::over(values, bins) else {
        return Vec::new();
    };
    binning
        .counts(values)
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            label: format!("{:.2}-{:.2}", binning.start(i), binning.end(i)),
            start: binning.start(i),
            end: binning.end(i),
            center: binning.center(i),
            count,
        })
        .collect()
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
    )
}

/// Position of `v` within `[min, max]` scaled to `[0, 1]`; a constant range maps to 0.5.
pub fn normalize(v: f64, (min, max): (f64, f64)) -> f64 {
    if max == min {
        0.5
    } else {
        (v - min) / (max - min)
    }
}

/// Pearson correlation of paired samples. Zero variance on either side yields 0.
pub fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Five-number summary read at fixed sorted positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let at = |q: f64| sorted[((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1)];
        Some(Self {
            min: sorted[0],
            q1: at(0.25),
            median: at(0.5),
            q3: at(0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}
