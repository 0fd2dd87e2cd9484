/*!
 * Measurement table - (feature-vector, policy-index) -> aggregated
 * timing.
 *
 * Feature vectors are used as a hash map key, which requires
 * element-wise equality of floats. Callers are expected to supply
 * discretized features (bucketed integers cast to f64); this
 * precondition is documented, not silently enforced by rounding.
 */

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A feature vector wrapper with bitwise float equality and hashing,
/// so it can be used as a `HashMap` key.
#[derive(Debug, Clone)]
pub struct FeatureVec(pub Vec<f64>);

impl PartialEq for FeatureVec {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for FeatureVec {}

impl Hash for FeatureVec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for v in &self.0 {
            v.to_bits().hash(state);
        }
    }
}

/// (feature-vector, policy-index) key into the measurement table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasureKey {
    pub features: FeatureVec,
    pub policy_index: usize,
}

impl MeasureKey {
    pub fn new(features: &[f64], policy_index: usize) -> Self {
        MeasureKey {
            features: FeatureVec(features.to_vec()),
            policy_index,
        }
    }
}

/// Aggregated timing for one (features, policy) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
    pub exec_count: u64,
    pub time_total: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub last: f64,
}

impl MeasurementRecord {
    fn first(duration: f64) -> Self {
        MeasurementRecord {
            exec_count: 1,
            time_total: duration,
            min: duration,
            max: duration,
            avg: duration,
            last: duration,
        }
    }

    fn update(&mut self, duration: f64) {
        self.exec_count += 1;
        self.time_total += duration;
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
        self.last = duration;
        self.avg = self.time_total / self.exec_count as f64;
    }
}

/// Mapping (feature-vector, policy-index) -> MeasurementRecord for one
/// region. No concurrent access is permitted: the region that owns
/// this table is driven from a single application thread.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    records: HashMap<MeasureKey, MeasurementRecord>,
}

impl MeasurementTable {
    pub fn new() -> Self {
        MeasurementTable {
            records: HashMap::new(),
        }
    }

    pub fn record(&mut self, features: &[f64], policy_index: usize, duration: f64) {
        let key = MeasureKey::new(features, policy_index);
        match self.records.get_mut(&key) {
            Some(existing) => existing.update(duration),
            None => {
                self.records.insert(key, MeasurementRecord::first(duration));
            }
        }
    }

    pub fn iterate(&self) -> impl Iterator<Item = (&MeasureKey, &MeasurementRecord)> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, features: &[f64], policy_index: usize) -> Option<&MeasurementRecord> {
        self.records.get(&MeasureKey::new(features, policy_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_has_count_one() {
        let mut table = MeasurementTable::new();
        table.record(&[1.0], 0, 0.5);
        let rec = table.get(&[1.0], 0).unwrap();
        assert_eq!(rec.exec_count, 1);
        assert_eq!(rec.time_total, 0.5);
        assert_eq!(rec.avg, 0.5);
    }

    #[test]
    fn repeated_record_aggregates_min_max_avg_last() {
        let mut table = MeasurementTable::new();
        table.record(&[1.0], 0, 0.9);
        table.record(&[1.0], 0, 1.1);
        let rec = table.get(&[1.0], 0).unwrap();
        assert_eq!(rec.exec_count, 2);
        assert!((rec.time_total - 2.0).abs() < 1e-12);
        assert_eq!(rec.min, 0.9);
        assert_eq!(rec.max, 1.1);
        assert_eq!(rec.last, 1.1);
        assert!((rec.avg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distinct_policies_at_same_features_are_distinct_keys() {
        let mut table = MeasurementTable::new();
        table.record(&[1.0], 0, 1.0);
        table.record(&[1.0], 1, 2.0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn clear_resets_the_table() {
        let mut table = MeasurementTable::new();
        table.record(&[1.0], 0, 1.0);
        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn static_selection_scenario_has_one_key_with_ten_executions() {
        let mut table = MeasurementTable::new();
        for _ in 0..10 {
            table.record(&[3.0], 2, 1.0);
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&[3.0], 2).unwrap().exec_count, 10);
    }
}
