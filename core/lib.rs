/*!
 * Apollo - an online autotuning runtime for parallel HPC applications.
 *
 * Application code marks code regions whose execution is parameterized
 * by a discrete policy index. Apollo selects a policy from a per-region
 * decision model, measures the resulting execution time, and
 * periodically reduces measurements into a refined model - locally,
 * and across ranks via a collective exchange.
 */

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod feature;
pub mod measure;
pub mod model;
pub mod model_wrapper;
pub mod package;
pub mod reducer;
pub mod region;
pub mod transport;

pub use config::Topology;
pub use error::ApolloError;
pub use facade::Apollo;
pub use feature::{Feature, FeatureBag};
pub use measure::{FeatureVec, MeasureKey, MeasurementRecord, MeasurementTable};
pub use model::{Model, TreeNode};
pub use model_wrapper::ModelWrapper;
pub use package::ModelPackage;
pub use region::Region;
pub use transport::{CollectiveTransport, LoopbackTransport};
