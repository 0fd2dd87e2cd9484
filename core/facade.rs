/*!
 * Apollo facade - the process-wide entry point.
 *
 * Owns the region registry and the shared feature bag, and is the
 * thing external code (the instrumented application, the model
 * delivery transport) actually holds a handle to. Reached lazily via
 * [`Apollo::instance`], a `std::sync::OnceLock` rather than a
 * third-party lazy-static crate - this codebase already reaches for
 * `std`/`parking_lot` primitives first.
 */

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::config::{self, Topology};
use crate::dispatcher;
use crate::error::ApolloError;
use crate::feature::FeatureBag;
use crate::measure::FeatureVec;
use crate::model::Model;
use crate::reducer;
use crate::region::Region;
use crate::transport::{CollectiveTransport, LoopbackTransport};

pub struct Apollo {
    regions: RwLock<HashMap<String, Arc<Region>>>,
    features: Arc<Mutex<FeatureBag>>,
    best_policies_global: RwLock<HashMap<(String, FeatureVec), (usize, f64)>>,
    topology: Topology,
    init_model_env: Option<String>,
    transport: Box<dyn CollectiveTransport + Send + Sync>,
}

static INSTANCE: OnceLock<Apollo> = OnceLock::new();

impl Apollo {
    /// The process singleton, initialized exactly once on first access.
    pub fn instance() -> &'static Apollo {
        INSTANCE.get_or_init(Apollo::init_from_environment)
    }

    fn init_from_environment() -> Self {
        let require_topology = matches!(
            env::var("APOLLO_REQUIRE_TOPOLOGY").as_deref(),
            Ok("1") | Ok("true")
        );
        let topology = Topology::discover(require_topology).unwrap_or_else(|e| {
            eprintln!("[Apollo] {e}; falling back to single-process topology");
            Topology::default()
        });
        Apollo {
            regions: RwLock::new(HashMap::new()),
            features: Arc::new(Mutex::new(FeatureBag::new())),
            best_policies_global: RwLock::new(HashMap::new()),
            topology,
            init_model_env: env::var("APOLLO_INIT_MODEL").ok(),
            transport: Box::new(LoopbackTransport),
        }
    }

    /// A non-singleton instance for tests and embedders that want
    /// their own transport instead of the default loopback.
    pub fn with_transport(
        topology: Topology,
        transport: Box<dyn CollectiveTransport + Send + Sync>,
    ) -> Self {
        Apollo {
            regions: RwLock::new(HashMap::new()),
            features: Arc::new(Mutex::new(FeatureBag::new())),
            best_policies_global: RwLock::new(HashMap::new()),
            topology,
            init_model_env: None,
            transport,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn set_feature(&self, name: &str, value: f64) {
        self.features.lock().set_feature(name, value);
    }

    pub fn get_feature(&self, name: &str) -> f64 {
        self.features.lock().get_feature(name)
    }

    fn initial_model(&self, num_policies: usize) -> Result<Model, ApolloError> {
        match &self.init_model_env {
            Some(spec) => config::parse_init_model(spec, num_policies),
            None => Ok(Model::round_robin(num_policies)),
        }
    }

    /// Register a new region under `name`. Fails if the name is
    /// already taken or exceeds the wire format's name length.
    pub fn register_region(
        &self,
        name: &str,
        num_policies: usize,
    ) -> Result<Arc<Region>, ApolloError> {
        let mut regions = self.regions.write();
        if regions.contains_key(name) {
            return Err(ApolloError::DuplicateRegion {
                name: name.to_string(),
            });
        }
        let model = self.initial_model(num_policies)?;
        let region = Arc::new(Region::new(name, num_policies, model, self.features.clone())?);
        regions.insert(name.to_string(), region.clone());
        Ok(region)
    }

    pub fn region(&self, name: &str) -> Option<Arc<Region>> {
        self.regions.read().get(name).cloned()
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.read().keys().cloned().collect()
    }

    /// Parse and dispatch a JSON model package to every region it
    /// targets.
    pub fn attach_model(&self, bytes: &[u8]) -> Result<(), ApolloError> {
        let regions = self.regions.read();
        dispatcher::dispatch_model_package(bytes, &regions)
    }

    /// Local-reduce every region's measurements, exchange them across
    /// ranks via the configured transport, merge into
    /// `best_policies_global`, then advance every region to `step`.
    pub fn flush_all_region_measurements(&self, step: i64) -> Result<(), ApolloError> {
        let per_region: Vec<(String, HashMap<FeatureVec, (usize, f64)>)> = {
            let regions = self.regions.read();
            regions
                .values()
                .map(|r| (r.name().to_string(), r.reduce_best_policies()))
                .collect()
        };

        let global = reducer::collective_reduce(self.transport.as_ref(), &per_region)?;
        *self.best_policies_global.write() = global;

        let regions = self.regions.read();
        for region in regions.values() {
            region.begin_step(step);
        }
        Ok(())
    }

    pub fn best_policies_global(&self) -> HashMap<(String, FeatureVec), (usize, f64)> {
        self.best_policies_global.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;

    fn facade() -> Apollo {
        Apollo::with_transport(Topology::default(), Box::new(LoopbackTransport))
    }

    #[test]
    fn duplicate_region_registration_fails() {
        let apollo = facade();
        apollo.register_region("loop1", 4).unwrap();
        let err = apollo.register_region("loop1", 4).unwrap_err();
        assert!(matches!(err, ApolloError::DuplicateRegion { .. }));
    }

    #[test]
    fn set_feature_is_visible_through_region_measurements() {
        let apollo = facade();
        let region = apollo.register_region("loop1", 2).unwrap();
        apollo.set_feature("n", 5.0);
        region.begin().unwrap();
        assert_eq!(apollo.get_feature("n"), 5.0);
        region.get_policy_index().unwrap();
        region.end().unwrap();
    }

    #[test]
    fn wildcard_attach_model_reconfigures_all_registered_regions() {
        let apollo = facade();
        apollo.register_region("A", 4).unwrap();
        apollo.register_region("B", 4).unwrap();
        apollo.register_region("C", 4).unwrap();
        let json = br#"{
            "driver": { "format": "int", "rules": "0" },
            "type": { "index": 3, "name": "Static" },
            "region_names": ["__ANY_REGION__"],
            "features": { "count": 0, "names": [] },
            "policy": 1
        }"#;
        apollo.attach_model(json).unwrap();
        for name in ["A", "B", "C"] {
            assert_eq!(apollo.region(name).unwrap().model().get_index(&[]), 1);
        }
    }

    #[test]
    fn flush_measurements_populates_best_policies_global() {
        let apollo = facade();
        let region = apollo.register_region("loop1", 2).unwrap();
        // Drive two measurements through begin/end, swapping the
        // active model between them so both policies get recorded.
        apollo
            .attach_model(
                br#"{
            "driver": { "format": "int", "rules": "0" },
            "type": { "index": 3, "name": "Static" },
            "region_names": ["loop1"],
            "features": { "count": 0, "names": [] },
            "policy": 0
        }"#,
            )
            .unwrap();
        region.begin().unwrap();
        region.get_policy_index().unwrap();
        region.end().unwrap();

        apollo
            .attach_model(
                br#"{
            "driver": { "format": "int", "rules": "0" },
            "type": { "index": 3, "name": "Static" },
            "region_names": ["loop1"],
            "features": { "count": 0, "names": [] },
            "policy": 1
        }"#,
            )
            .unwrap();
        region.begin().unwrap();
        region.get_policy_index().unwrap();
        region.end().unwrap();

        apollo.flush_all_region_measurements(1).unwrap();
        let global = apollo.best_policies_global();
        let key = ("loop1".to_string(), FeatureVec(vec![]));
        assert!(global.contains_key(&key));
    }
}
