//! Bagged CART classifier.
//!
//! Trees are grown on bootstrap samples with Gini splits over a random subset
//! of features per node. A tree votes with the fraud ratio of the leaf a row
//! lands in; the forest probability is the mean of those votes.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::error::TrainingError;

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 160,
            max_depth: Some(16),
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        fraud_ratio: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A tree stored as an index-linked arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { fraud_ratio } => return *fraud_ratio,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Checks that every split references an existing feature and child with a
    /// finite threshold, and that every leaf holds a ratio in [0, 1].
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { fraud_ratio } => {
                    if !(0.0..=1.0).contains(fraud_ratio) {
                        return Err(format!("leaf {index} has fraud ratio {fraud_ratio} outside [0, 1]"));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {index} splits on missing feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has non-finite threshold {threshold}"));
                    }
                    // Children are always pushed after their parent, which rules out cycles.
                    if *left <= index || *right <= index || *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {index} has invalid children {left}/{right}"));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], params: &ForestParams) -> Result<Self, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if rows.len() != labels.len() {
            return Err(TrainingError::InvalidParameters(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(TrainingError::InvalidParameters(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(TrainingError::InvalidParameters("rows have no features".to_string()));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != n_features) {
            return Err(TrainingError::WidthMismatch {
                expected: n_features,
                found: row.len(),
            });
        }

        let trees = (0..params.n_estimators)
            .map(|tree_index| {
                let mut rng = tree_rng(params.seed, tree_index as u64);
                let sample: Vec<usize> = (0..rows.len()).map(|_| rng.gen_range(0..rows.len())).collect();
                TreeBuilder {
                    rows,
                    labels,
                    params,
                    max_features: max_features(n_features),
                    rng,
                    nodes: Vec::new(),
                }
                .build(sample)
            })
            .collect();

        Ok(Self { n_features, trees })
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(i, tree)| tree.validate(self.n_features).map_err(|e| format!("tree {i}: {e}")))
    }
}

/// Per-tree stream derived from the forest seed, independent of tree count.
fn tree_rng(seed: u64, tree_index: u64) -> Pcg64Mcg {
    Pcg64Mcg::seed_from_u64(seed ^ tree_index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

fn max_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features)
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [bool],
    params: &'a ForestParams,
    max_features: usize,
    rng: Pcg64Mcg,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn build(mut self, mut sample: Vec<usize>) -> DecisionTree {
        self.grow(&mut sample, 0);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, sample: &mut [usize], depth: usize) -> usize {
        let index = self.nodes.len();
        let positives = sample.iter().filter(|&&i| self.labels[i]).count();
        let fraud_ratio = positives as f64 / sample.len() as f64;
        self.nodes.push(Node::Leaf { fraud_ratio });

        let pure = positives == 0 || positives == sample.len();
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_reached || sample.len() < self.params.min_samples_split.max(2) {
            return index;
        }

        let Some(split) = self.best_split(sample, positives) else {
            return index;
        };

        let mut boundary = 0;
        for i in 0..sample.len() {
            if self.rows[sample[i]][split.feature] <= split.threshold {
                sample.swap(i, boundary);
                boundary += 1;
            }
        }
        if boundary == 0 || boundary == sample.len() {
            return index;
        }
        let (left_sample, right_sample) = sample.split_at_mut(boundary);
        let left = self.grow(left_sample, depth + 1);
        let right = self.grow(right_sample, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&mut self, sample: &[usize], positives: usize) -> Option<SplitCandidate> {
        let n_features = self.rows[0].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        for i in 0..self.max_features {
            let j = self.rng.gen_range(i..n_features);
            features.swap(i, j);
        }

        let parent_impurity = gini(positives, sample.len()) * sample.len() as f64;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, bool)> = Vec::with_capacity(sample.len());

        for &feature in &features[..self.max_features] {
            column.clear();
            column.extend(sample.iter().map(|&i| (self.rows[i][feature], self.labels[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_positives = 0;
            for split_at in 1..column.len() {
                if column[split_at - 1].1 {
                    left_positives += 1;
                }
                let (lower, upper) = (column[split_at - 1].0, column[split_at].0);
                if lower == upper || split_at < min_leaf || column.len() - split_at < min_leaf {
                    continue;
                }
                let left_len = split_at;
                let right_len = column.len() - split_at;
                let impurity = gini(left_positives, left_len) * left_len as f64
                    + gini(positives - left_positives, right_len) * right_len as f64;
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: lower + (upper - lower) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best.filter(|b| b.impurity < parent_impurity - 1e-12)
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}
