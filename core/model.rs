/*!
 * Model variants - five pure policy-choice strategies sharing one
 * capability: `choose(features) -> policy_index`.
 *
 * Modeled as a tagged variant rather than a trait-object hierarchy:
 * there are exactly five kinds, configuration is a factory that
 * returns one of them, and none of them read or mutate the
 * measurement table. Random/RoundRobin/Sequential carry per-model
 * counters, so `choose` takes `&mut self`; Static and DecisionTree
 * never touch that state, which is what makes them repeat-safe
 * across calls with identical features (see the round-robin /
 * sequential counters below, which intentionally are not).
 */

use crate::error::ApolloError;
use crate::package::ModelPackage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A node in a decision tree: an internal (feature_index, threshold)
/// split, or a leaf carrying a policy index.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf {
        policy: usize,
    },
    Split {
        feature_index: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    /// Top-down walk: the left branch is taken when
    /// `features[feature_index] <= threshold`. A feature index past
    /// the end of the vector is treated as 0.0.
    fn eval(&self, features: &[f64]) -> usize {
        match self {
            TreeNode::Leaf { policy } => *policy,
            TreeNode::Split {
                feature_index,
                threshold,
                left,
                right,
            } => {
                let value = features.get(*feature_index).copied().unwrap_or(0.0);
                if value <= *threshold {
                    left.eval(features)
                } else {
                    right.eval(features)
                }
            }
        }
    }

    fn validate(&self, num_policies: usize, num_features: usize) -> Result<(), ApolloError> {
        match self {
            TreeNode::Leaf { policy } => {
                if *policy >= num_policies {
                    return Err(ApolloError::Package {
                        detail: format!(
                            "decision tree leaf policy {policy} out of range [0, {num_policies})"
                        ),
                    });
                }
                Ok(())
            }
            TreeNode::Split {
                feature_index,
                left,
                right,
                ..
            } => {
                if *feature_index >= num_features {
                    return Err(ApolloError::Package {
                        detail: format!(
                            "decision tree feature index {feature_index} >= feature count {num_features}"
                        ),
                    });
                }
                left.validate(num_policies, num_features)?;
                right.validate(num_policies, num_features)
            }
        }
    }

    fn from_json(value: &serde_json::Value) -> Result<TreeNode, ApolloError> {
        let malformed = || ApolloError::Package {
            detail: "malformed decision tree node".to_string(),
        };
        let obj = value.as_object().ok_or_else(malformed)?;
        if let Some(policy) = obj.get("policy") {
            let policy = policy.as_u64().ok_or_else(malformed)? as usize;
            return Ok(TreeNode::Leaf { policy });
        }
        let feature_index = obj
            .get("feature_index")
            .and_then(|v| v.as_u64())
            .ok_or_else(malformed)? as usize;
        let threshold = obj
            .get("threshold")
            .and_then(|v| v.as_f64())
            .ok_or_else(malformed)?;
        let left = obj.get("left").ok_or_else(malformed)?;
        let right = obj.get("right").ok_or_else(malformed)?;
        Ok(TreeNode::Split {
            feature_index,
            threshold,
            left: Box::new(TreeNode::from_json(left)?),
            right: Box::new(TreeNode::from_json(right)?),
        })
    }
}

/// One of the five policy-choice strategies. `choose` is the single
/// capability every variant exposes.
#[derive(Debug)]
pub enum Model {
    Random {
        num_policies: usize,
        rng: StdRng,
    },
    RoundRobin {
        num_policies: usize,
        counter: usize,
    },
    Sequential {
        num_policies: usize,
        counter: usize,
    },
    Static {
        num_policies: usize,
        k: usize,
    },
    DecisionTree {
        num_policies: usize,
        root: TreeNode,
    },
}

impl Model {
    pub fn random(num_policies: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Model::Random { num_policies, rng }
    }

    pub fn round_robin(num_policies: usize) -> Self {
        Model::RoundRobin {
            num_policies,
            counter: 0,
        }
    }

    pub fn sequential(num_policies: usize) -> Self {
        Model::Sequential {
            num_policies,
            counter: 0,
        }
    }

    pub fn static_policy(num_policies: usize, k: usize) -> Result<Self, ApolloError> {
        if k >= num_policies {
            return Err(ApolloError::Config {
                detail: format!("static policy {k} out of range [0, {num_policies})"),
            });
        }
        Ok(Model::Static { num_policies, k })
    }

    pub fn decision_tree(num_policies: usize, root: TreeNode, num_features: usize) -> Result<Self, ApolloError> {
        root.validate(num_policies, num_features)?;
        Ok(Model::DecisionTree { num_policies, root })
    }

    /// Build a model from a parsed package, for the given region's
    /// `num_policies`. Used by the model wrapper's `configure`.
    pub fn from_package(package: &ModelPackage, num_policies: usize) -> Result<Self, ApolloError> {
        match package.model_type.name.as_str() {
            "Random" => Ok(Model::random(num_policies, package.seed)),
            "RoundRobin" => Ok(Model::round_robin(num_policies)),
            "Sequential" => Ok(Model::sequential(num_policies)),
            "Static" => {
                let k = package.policy.ok_or_else(|| ApolloError::Package {
                    detail: "Static model package missing 'policy' field".to_string(),
                })?;
                if k < 0 {
                    return Err(ApolloError::Package {
                        detail: format!("Static model policy {k} must be non-negative"),
                    });
                }
                Model::static_policy(num_policies, k as usize).map_err(|_| ApolloError::Package {
                    detail: format!("Static model policy {k} out of range [0, {num_policies})"),
                })
            }
            "DecisionTree" => {
                let tree_json = package.tree.as_ref().ok_or_else(|| ApolloError::Package {
                    detail: "DecisionTree model package missing 'tree' field".to_string(),
                })?;
                let root = TreeNode::from_json(tree_json)?;
                Model::decision_tree(num_policies, root, package.features.count)
            }
            other => Err(ApolloError::Package {
                detail: format!("unknown model type name '{other}'"),
            }),
        }
    }

    pub fn num_policies(&self) -> usize {
        match self {
            Model::Random { num_policies, .. }
            | Model::RoundRobin { num_policies, .. }
            | Model::Sequential { num_policies, .. }
            | Model::Static { num_policies, .. }
            | Model::DecisionTree { num_policies, .. } => *num_policies,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Model::Random { .. } => "Random",
            Model::RoundRobin { .. } => "RoundRobin",
            Model::Sequential { .. } => "Sequential",
            Model::Static { .. } => "Static",
            Model::DecisionTree { .. } => "DecisionTree",
        }
    }

    /// Choose a policy index in `[0, num_policies)` given the current
    /// feature vector.
    pub fn choose(&mut self, features: &[f64]) -> usize {
        match self {
            Model::Random { num_policies, rng } => rng.gen_range(0..*num_policies),
            Model::RoundRobin {
                num_policies,
                counter,
            } => {
                let idx = *counter % *num_policies;
                *counter = counter.wrapping_add(1);
                idx
            }
            Model::Sequential {
                num_policies,
                counter,
            } => {
                let idx = (*counter).min(*num_policies - 1);
                *counter = counter.saturating_add(1);
                idx
            }
            Model::Static { k, .. } => *k,
            Model::DecisionTree { root, .. } => root.eval(features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_model_ignores_features() {
        let mut model = Model::static_policy(4, 2).unwrap();
        assert_eq!(model.choose(&[]), 2);
        assert_eq!(model.choose(&[99.0]), 2);
    }

    #[test]
    fn static_model_rejects_out_of_range_policy() {
        assert!(Model::static_policy(4, 4).is_err());
    }

    #[test]
    fn round_robin_cycles_through_policies() {
        let mut model = Model::round_robin(3);
        let seq: Vec<usize> = (0..7).map(|_| model.choose(&[])).collect();
        assert_eq!(seq, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn sequential_saturates_at_last_policy() {
        let mut model = Model::sequential(3);
        let seq: Vec<usize> = (0..5).map(|_| model.choose(&[])).collect();
        assert_eq!(seq, vec![0, 1, 2, 2, 2]);
    }

    #[test]
    fn random_model_stays_in_range() {
        let mut model = Model::random(5, Some(42));
        for _ in 0..200 {
            let idx = model.choose(&[]);
            assert!(idx < 5);
        }
    }

    #[test]
    fn random_model_is_reproducible_with_a_seed() {
        let mut a = Model::random(5, Some(7));
        let mut b = Model::random(5, Some(7));
        let seq_a: Vec<usize> = (0..20).map(|_| a.choose(&[])).collect();
        let seq_b: Vec<usize> = (0..20).map(|_| b.choose(&[])).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn decision_tree_walks_left_when_at_or_below_threshold() {
        let root = TreeNode::Split {
            feature_index: 0,
            threshold: 10.0,
            left: Box::new(TreeNode::Leaf { policy: 0 }),
            right: Box::new(TreeNode::Leaf { policy: 1 }),
        };
        let mut model = Model::decision_tree(2, root, 1).unwrap();
        assert_eq!(model.choose(&[5.0]), 0);
        assert_eq!(model.choose(&[10.0]), 0);
        assert_eq!(model.choose(&[10.1]), 1);
    }

    #[test]
    fn decision_tree_treats_missing_feature_as_zero() {
        let root = TreeNode::Split {
            feature_index: 3,
            threshold: -1.0,
            left: Box::new(TreeNode::Leaf { policy: 0 }),
            right: Box::new(TreeNode::Leaf { policy: 1 }),
        };
        let mut model = Model::decision_tree(2, root, 4).unwrap();
        assert_eq!(model.choose(&[1.0]), 1);
    }

    #[test]
    fn decision_tree_rejects_out_of_range_leaf_policy() {
        let root = TreeNode::Leaf { policy: 5 };
        assert!(Model::decision_tree(2, root, 0).is_err());
    }

    #[test]
    fn decision_tree_rejects_feature_index_beyond_count() {
        let root = TreeNode::Split {
            feature_index: 4,
            threshold: 0.0,
            left: Box::new(TreeNode::Leaf { policy: 0 }),
            right: Box::new(TreeNode::Leaf { policy: 0 }),
        };
        assert!(Model::decision_tree(1, root, 2).is_err());
    }

    #[test]
    fn decision_tree_parses_from_json() {
        let json = serde_json::json!({
            "feature_index": 0,
            "threshold": 2.5,
            "left": { "policy": 0 },
            "right": { "policy": 1 },
        });
        let root = TreeNode::from_json(&json).unwrap();
        let mut model = Model::decision_tree(2, root, 1).unwrap();
        assert_eq!(model.choose(&[1.0]), 0);
        assert_eq!(model.choose(&[3.0]), 1);
    }

    #[test]
    fn only_static_and_decision_tree_repeat_deterministically() {
        let mut rr = Model::round_robin(2);
        let first = rr.choose(&[]);
        let second = rr.choose(&[]);
        assert_ne!(first, second);

        let mut st = Model::static_policy(2, 1).unwrap();
        assert_eq!(st.choose(&[]), st.choose(&[]));
    }
}
