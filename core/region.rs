/*!
 * Region - a named code site whose executions are autotuned.
 *
 * Drives the begin -> getPolicyIndex -> end state machine, records
 * one measurement per end(), and owns its measurement table and
 * model wrapper exclusively (the facade owns the region itself and
 * the shared feature bag).
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::ApolloError;
use crate::feature::FeatureBag;
use crate::measure::{FeatureVec, MeasurementTable};
use crate::model::Model;
use crate::model_wrapper::ModelWrapper;

/// Longest region name the wire format's 64-byte NUL-padded field can
/// hold (63 bytes of name plus a terminating NUL).
pub const MAX_REGION_NAME_LEN: usize = 63;

struct RegionState {
    inside: bool,
    t_begin: Instant,
    current_policy: usize,
    policy_chosen_this_call: bool,
    last_policy: Option<usize>,
    current_step: i64,
    exec_count_total: u64,
    exec_count_current_step: u64,
    exec_count_current_policy: u64,
    measures: MeasurementTable,
    best_policies: HashMap<FeatureVec, (usize, f64)>,
}

impl RegionState {
    fn new() -> Self {
        RegionState {
            inside: false,
            t_begin: Instant::now(),
            current_policy: 0,
            policy_chosen_this_call: false,
            last_policy: None,
            current_step: 0,
            exec_count_total: 0,
            exec_count_current_step: 0,
            exec_count_current_policy: 0,
            measures: MeasurementTable::new(),
            best_policies: HashMap::new(),
        }
    }
}

pub struct Region {
    name: String,
    num_policies: usize,
    model: ModelWrapper,
    state: Mutex<RegionState>,
    features: Arc<Mutex<FeatureBag>>,
}

impl Region {
    pub fn new(
        name: &str,
        num_policies: usize,
        initial_model: Model,
        features: Arc<Mutex<FeatureBag>>,
    ) -> Result<Self, ApolloError> {
        if name.len() > MAX_REGION_NAME_LEN {
            return Err(ApolloError::Config {
                detail: format!(
                    "region name '{name}' exceeds {MAX_REGION_NAME_LEN} characters"
                ),
            });
        }
        Ok(Region {
            name: name.to_string(),
            num_policies,
            model: ModelWrapper::new(initial_model),
            state: Mutex::new(RegionState::new()),
            features,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_policies(&self) -> usize {
        self.num_policies
    }

    pub fn model(&self) -> &ModelWrapper {
        &self.model
    }

    /// Precondition: not currently inside a begin/end pair.
    pub fn begin(&self) -> Result<(), ApolloError> {
        let mut state = self.state.lock();
        if state.inside {
            return Err(ApolloError::Protocol {
                detail: format!("begin() called while region '{}' is already inside", self.name),
            });
        }
        state.inside = true;
        state.t_begin = Instant::now();
        state.policy_chosen_this_call = false;
        Ok(())
    }

    /// Precondition: currently inside a begin/end pair. Repeated calls
    /// within the same pair return the same value: the model is only
    /// consulted on the first call of a begin/end pair.
    pub fn get_policy_index(&self) -> Result<usize, ApolloError> {
        let snapshot = self.features.lock().snapshot();
        let mut state = self.state.lock();
        if !state.inside {
            return Err(ApolloError::Protocol {
                detail: format!(
                    "getPolicyIndex() called on region '{}' while not inside a begin/end pair",
                    self.name
                ),
            });
        }
        if !state.policy_chosen_this_call {
            let idx = self.model.get_index(&snapshot);
            if state.last_policy != Some(idx) {
                state.exec_count_current_policy = 0;
                state.last_policy = Some(idx);
            }
            state.current_policy = idx;
            state.policy_chosen_this_call = true;
        }
        Ok(state.current_policy)
    }

    /// Precondition: currently inside a begin/end pair. Records a
    /// measurement keyed by the current feature snapshot and the
    /// policy chosen this pair, then clears the shared feature bag.
    pub fn end(&self) -> Result<(), ApolloError> {
        let snapshot = self.features.lock().snapshot();
        let mut state = self.state.lock();
        if !state.inside {
            return Err(ApolloError::Protocol {
                detail: format!("end() called on region '{}' while not inside", self.name),
            });
        }
        let duration = state.t_begin.elapsed().as_secs_f64();
        let policy = state.current_policy;
        state.measures.record(&snapshot, policy, duration);
        state.exec_count_total += 1;
        state.exec_count_current_step += 1;
        state.exec_count_current_policy += 1;
        state.inside = false;
        drop(state);
        self.features.lock().clear();
        Ok(())
    }

    /// Local reduction (§4.6): for each distinct feature vector, keep
    /// the (policy, avg) with the smallest avg, tie-broken by the
    /// lowest policy index. Writes the result into `best_policies`
    /// and returns a copy for the caller (the collective reducer).
    pub fn reduce_best_policies(&self) -> HashMap<FeatureVec, (usize, f64)> {
        let mut state = self.state.lock();
        let mut local: HashMap<FeatureVec, (usize, f64)> = HashMap::new();
        for (key, record) in state.measures.iterate() {
            local
                .entry(key.features.clone())
                .and_modify(|entry| {
                    if record.avg < entry.1
                        || (record.avg == entry.1 && key.policy_index < entry.0)
                    {
                        *entry = (key.policy_index, record.avg);
                    }
                })
                .or_insert((key.policy_index, record.avg));
        }
        state.best_policies = local.clone();
        local
    }

    pub fn best_policies(&self) -> HashMap<FeatureVec, (usize, f64)> {
        self.state.lock().best_policies.clone()
    }

    pub fn measurement_count(&self) -> usize {
        self.state.lock().measures.len()
    }

    pub fn exec_count_total(&self) -> u64 {
        self.state.lock().exec_count_total
    }

    /// Called by `flushAllRegionMeasurements`: advances the step
    /// counter and resets the per-step execution counter.
    pub fn begin_step(&self, step: i64) {
        let mut state = self.state.lock();
        state.current_step = step;
        state.exec_count_current_step = 0;
    }

    pub fn clear_measurements(&self) {
        self.state.lock().measures.clear();
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        let inside = self.state.lock().inside;
        if inside {
            let _ = self.end();
        }
    }
}
