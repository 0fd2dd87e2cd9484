/*!
 * Feature bag - named scalar features, process-wide, ordered by
 * first insertion.
 *
 * Mirrors the original Apollo::features vector: a linear scan on
 * set/get (feature counts per process are small, single digits to
 * low tens) and a hard clear at the end of every region.
 */

/// A single named scalar feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub value: f64,
}

/// Ordered set of features, single-writer between region boundaries.
#[derive(Debug, Clone, Default)]
pub struct FeatureBag {
    features: Vec<Feature>,
}

impl FeatureBag {
    pub fn new() -> Self {
        FeatureBag {
            features: Vec::new(),
        }
    }

    /// Update an existing entry in place (preserving its index within
    /// the current sequence) or append a new one.
    pub fn set_feature(&mut self, name: &str, value: f64) {
        if let Some(existing) = self.features.iter_mut().find(|f| f.name == name) {
            existing.value = value;
        } else {
            self.features.push(Feature {
                name: name.to_string(),
                value,
            });
        }
    }

    /// Value of `name`, or 0.0 if the bag has no entry for it.
    pub fn get_feature(&self, name: &str) -> f64 {
        self.features
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value)
            .unwrap_or(0.0)
    }

    /// The current ordered sequence of values: the feature vector
    /// passed to models and used as a measurement key.
    pub fn snapshot(&self) -> Vec<f64> {
        self.features.iter().map(|f| f.value).collect()
    }

    /// Empty the bag. Called at the end of every region.
    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut bag = FeatureBag::new();
        bag.set_feature("n", 3.0);
        assert_eq!(bag.get_feature("n"), 3.0);
    }

    #[test]
    fn get_missing_feature_defaults_to_zero() {
        let bag = FeatureBag::new();
        assert_eq!(bag.get_feature("missing"), 0.0);
    }

    #[test]
    fn repeated_set_preserves_index_position() {
        let mut bag = FeatureBag::new();
        bag.set_feature("a", 1.0);
        bag.set_feature("b", 2.0);
        bag.set_feature("a", 9.0);
        assert_eq!(bag.snapshot(), vec![9.0, 2.0]);
    }

    #[test]
    fn clear_empties_the_sequence() {
        let mut bag = FeatureBag::new();
        bag.set_feature("a", 1.0);
        bag.clear();
        assert!(bag.is_empty());
        assert_eq!(bag.snapshot(), Vec::<f64>::new());
    }

    #[test]
    fn consistent_calling_order_reproduces_identical_snapshots() {
        let mut bag = FeatureBag::new();
        bag.set_feature("n", 3.0);
        let first = bag.snapshot();
        bag.clear();
        bag.set_feature("n", 3.0);
        let second = bag.snapshot();
        assert_eq!(first, second);
    }
}
