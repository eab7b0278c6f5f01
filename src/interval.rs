//! Reference-position coverage maps.
//!
//! A `CoverageMap` is a piecewise-constant depth function over integer
//! coordinates, stored as a boundary-delta map. Bundles use three of them:
//! match coverage, intron coverage, and non-allelic match coverage.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct CoverageMap {
    // boundary -> depth delta entering at that coordinate
    diff: BTreeMap<i32, i32>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.diff.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }

    /// Add one unit of depth over `[s, t)`. Degenerate intervals are ignored.
    pub fn add(&mut self, s: i32, t: i32) {
        if s >= t {
            return;
        }
        *self.diff.entry(s).or_insert(0) += 1;
        *self.diff.entry(t).or_insert(0) -= 1;
    }

    /// Depth at a single coordinate.
    pub fn depth_at(&self, p: i32) -> i32 {
        self.diff.range(..=p).map(|(_, d)| d).sum()
    }

    pub fn covered(&self, p: i32) -> bool {
        self.depth_at(p) > 0
    }

    /// Mean, standard deviation, and maximum depth over `[l, r)`, weighting
    /// each constant segment by its length.
    pub fn rectangle(&self, l: i32, r: i32) -> (f64, f64, f64) {
        if l >= r {
            return (0.0, 0.0, 0.0);
        }
        let total = (r - l) as f64;
        let mut depth = self.depth_at(l - 1) + self.diff.get(&l).copied().unwrap_or(0);
        let mut prev = l;
        let mut sum = 0.0;
        let mut sq = 0.0;
        let mut max = depth as f64;

        for (&b, &d) in self.diff.range((l + 1)..r) {
            let len = (b - prev) as f64;
            sum += depth as f64 * len;
            sq += (depth as f64) * (depth as f64) * len;
            prev = b;
            depth += d;
            if depth as f64 > max {
                max = depth as f64;
            }
        }
        let len = (r - prev) as f64;
        sum += depth as f64 * len;
        sq += (depth as f64) * (depth as f64) * len;

        let ave = sum / total;
        let var = (sq / total - ave * ave).max(0.0);
        (ave, var.sqrt(), max)
    }

    /// Maximal covered (depth > 0) blocks within `[l, r)`.
    pub fn covered_blocks(&self, l: i32, r: i32) -> Vec<(i32, i32)> {
        let mut blocks = Vec::new();
        if l >= r {
            return blocks;
        }
        let mut depth = self.depth_at(l - 1) + self.diff.get(&l).copied().unwrap_or(0);
        let mut open: Option<i32> = if depth > 0 { Some(l) } else { None };

        for (&b, &d) in self.diff.range((l + 1)..r) {
            let next = depth + d;
            if depth <= 0 && next > 0 {
                open = Some(b);
            } else if depth > 0 && next <= 0 {
                if let Some(s) = open.take() {
                    blocks.push((s, b));
                }
            }
            depth = next;
        }
        if let Some(s) = open {
            blocks.push((s, r));
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_over_uniform_coverage() {
        let mut m = CoverageMap::new();
        for _ in 0..10 {
            m.add(100, 150);
        }
        let (ave, dev, max) = m.rectangle(100, 150);
        assert!((ave - 10.0).abs() < 1e-9);
        assert!(dev.abs() < 1e-9);
        assert!((max - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rectangle_with_step() {
        let mut m = CoverageMap::new();
        m.add(0, 10); // depth 1 on [0,10)
        m.add(5, 10); // depth 2 on [5,10)
        let (ave, _, max) = m.rectangle(0, 10);
        assert!((ave - 1.5).abs() < 1e-9);
        assert!((max - 2.0).abs() < 1e-9);
        assert_eq!(m.depth_at(7), 2);
        assert!(!m.covered(10));
    }

    #[test]
    fn covered_blocks_split_at_gaps() {
        let mut m = CoverageMap::new();
        m.add(100, 120);
        m.add(130, 150);
        assert_eq!(m.covered_blocks(100, 150), vec![(100, 120), (130, 150)]);
        assert_eq!(m.covered_blocks(90, 160), vec![(100, 120), (130, 150)]);
        assert_eq!(m.covered_blocks(105, 115), vec![(105, 115)]);
    }
}
