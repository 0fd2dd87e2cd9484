/*!
 * Model wrapper - owns the currently-active model for one region and
 * swaps it atomically on reconfigure.
 *
 * Evaluation is read-write (Random/RoundRobin/Sequential carry
 * counters), so the active model lives behind a `parking_lot::RwLock`
 * rather than a bare atomic pointer: `get_index` takes the write lock
 * briefly to mutate counter state, `configure` takes it to publish a
 * fully-constructed replacement. Either way no caller ever observes a
 * half-installed model.
 */

use parking_lot::RwLock;

use crate::error::ApolloError;
use crate::model::Model;
use crate::package::ModelPackage;

pub struct ModelWrapper {
    active: RwLock<Model>,
}

impl ModelWrapper {
    pub fn new(model: Model) -> Self {
        ModelWrapper {
            active: RwLock::new(model),
        }
    }

    pub fn get_index(&self, features: &[f64]) -> usize {
        self.active.write().choose(features)
    }

    pub fn num_policies(&self) -> usize {
        self.active.read().num_policies()
    }

    pub fn type_name(&self) -> &'static str {
        self.active.read().type_name()
    }

    /// Parse `package` and, if it targets `region_name` (by exact name
    /// or `__ANY_REGION__`), install the new model. Returns whether a
    /// swap happened; a package that doesn't name this region is a
    /// no-op, not an error.
    pub fn configure(
        &self,
        package: &ModelPackage,
        region_name: &str,
    ) -> Result<bool, ApolloError> {
        if !package.applies_to(region_name) {
            return Ok(false);
        }
        let num_policies = self.active.read().num_policies();
        let new_model = Model::from_package(package, num_policies)?;
        *self.active.write() = new_model;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Driver, FeatureSpec, ModelType};

    fn package(region_names: Vec<&str>, type_name: &str, policy: Option<i64>) -> ModelPackage {
        ModelPackage {
            driver: Driver {
                format: "int".to_string(),
                rules: "0".to_string(),
            },
            model_type: ModelType {
                index: 0,
                name: type_name.to_string(),
            },
            region_names: region_names.into_iter().map(str::to_string).collect(),
            features: FeatureSpec {
                count: 0,
                names: vec![],
            },
            policy,
            seed: None,
            tree: None,
        }
    }

    #[test]
    fn configure_with_wildcard_replaces_model() {
        let wrapper = ModelWrapper::new(Model::static_policy(4, 0).unwrap());
        let pkg = package(vec!["__ANY_REGION__"], "Static", Some(1));
        assert!(wrapper.configure(&pkg, "any_name").unwrap());
        assert_eq!(wrapper.get_index(&[]), 1);
        assert_eq!(wrapper.type_name(), "Static");
    }

    #[test]
    fn configure_targeted_at_other_region_is_a_noop() {
        let wrapper = ModelWrapper::new(Model::static_policy(4, 0).unwrap());
        let pkg = package(vec!["other_region"], "Static", Some(3));
        assert!(!wrapper.configure(&pkg, "this_region").unwrap());
        assert_eq!(wrapper.get_index(&[]), 0);
    }

    #[test]
    fn configure_preserves_num_policies_across_swap() {
        let wrapper = ModelWrapper::new(Model::static_policy(4, 0).unwrap());
        let pkg = package(vec!["R"], "RoundRobin", None);
        assert!(wrapper.configure(&pkg, "R").unwrap());
        assert_eq!(wrapper.num_policies(), 4);
    }

    #[test]
    fn get_index_is_stable_across_repeated_calls_for_static() {
        let wrapper = ModelWrapper::new(Model::static_policy(4, 2).unwrap());
        assert_eq!(wrapper.get_index(&[1.0]), wrapper.get_index(&[1.0]));
    }
}
