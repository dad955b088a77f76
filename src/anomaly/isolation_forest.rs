//! Seeded isolation forest over a one-dimensional score distribution
//!
//! Each tree isolates points by recursive uniform random splits; points that
//! are isolated in few splits are outliers. The anomaly score of a point is
//! `2^(-E[h(x)] / c(ψ))` where `h` is the path length and `c(ψ)` the average
//! path length of an unsuccessful BST search over the sub-sample size `ψ`.
//!
//! Conventions:
//! - `score_samples` is the negated anomaly score: higher = more normal.
//! - `offset` is the `contamination` percentile of the training scores.
//! - `decision = score_samples - offset`; a point is an outlier iff `decision < 0`.
//!
//! A single `StdRng` seeded from `seed` drives every tree, so the same data and
//! seed always produce the same forest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::detector::{OutlierModel, OutlierScore};
use crate::config::AnomalyConfig;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a BST of `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(values: &[f64], fraction: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug)]
enum Node {
    Leaf { size: usize },
    Split { threshold: f64, left: Box<Node>, right: Box<Node> },
}

impl Node {
    fn build(values: &[f64], depth: usize, max_depth: usize, rng: &mut StdRng) -> Self {
        if depth >= max_depth || values.len() <= 1 {
            return Node::Leaf { size: values.len() };
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if max <= min {
            return Node::Leaf { size: values.len() };
        }

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<f64>, Vec<f64>) = values.iter().copied().partition(|&v| v <= threshold);

        Node::Split {
            threshold,
            left: Box::new(Node::build(&left, depth + 1, max_depth, rng)),
            right: Box::new(Node::build(&right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, value: f64) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split { threshold, left, right } => {
                    node = if value <= *threshold { left.as_ref() } else { right.as_ref() };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Forest fitted on one record set.
#[derive(Debug)]
pub struct FittedForest {
    trees: Vec<Node>,
    sample_size: usize,
    /// Threshold on `score_samples` separating outliers from inliers.
    pub offset: f64,
}

impl FittedForest {
    /// Negated anomaly score, in [-1, 0). Higher = more normal.
    pub fn score_sample(&self, value: f64) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(value)).sum::<f64>()
            / self.trees.len() as f64;
        -(2f64.powf(-mean_path / average_path_length(self.sample_size)))
    }

    pub fn decision(&self, value: f64) -> f64 {
        self.score_sample(value) - self.offset
    }
}

/// Isolation forest parameters. Fitting is a pure function of data + seed.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl IsolationForest {
    pub fn new(n_estimators: usize, max_samples: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            max_samples,
            contamination,
            seed,
        }
    }

    pub fn from_config(config: &AnomalyConfig) -> Self {
        Self::new(
            config.n_estimators,
            config.max_samples,
            config.contamination,
            config.seed,
        )
    }

    /// Fit on `values`. Requires at least two values.
    pub fn fit(&self, values: &[f64]) -> Option<FittedForest> {
        if values.len() < 2 || self.n_estimators == 0 {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let sample_size = self.max_samples.clamp(2, values.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..self.n_estimators)
            .map(|_| {
                let sample: Vec<f64> = if sample_size >= values.len() {
                    values.to_vec()
                } else {
                    rand::seq::index::sample(&mut rng, values.len(), sample_size)
                        .into_iter()
                        .map(|i| values[i])
                        .collect()
                };
                Node::build(&sample, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = FittedForest {
            trees,
            sample_size,
            offset: 0.0,
        };
        let training_scores: Vec<f64> = values.iter().map(|&v| forest.score_sample(v)).collect();
        forest.offset = percentile(&training_scores, self.contamination);
        Some(forest)
    }
}

impl OutlierModel for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn fit_score(&self, values: &[f64]) -> Vec<OutlierScore> {
        let Some(forest) = self.fit(values) else {
            return values
                .iter()
                .map(|_| OutlierScore {
                    decision: 0.0,
                    is_outlier: false,
                })
                .collect();
        };

        values
            .iter()
            .map(|&v| {
                let decision = forest.decision(v);
                OutlierScore {
                    decision,
                    is_outlier: decision < 0.0,
                }
            })
            .collect()
    }
}
