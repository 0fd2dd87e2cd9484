/*!
 * Configuration - topology discovery and initial-model parsing from
 * the process environment.
 *
 * Topology mirrors what a job scheduler (SLURM) hands a launched
 * process: node/proc/cpu counts read from well-known environment
 * variables. None of this is validated against the scheduler itself
 * (out of scope, §6) - only the variables are read and parsed.
 */

use crate::error::ApolloError;
use crate::model::Model;
use std::env;

/// Topology snapshot plus the parsed initial-model selection, both
/// read once at facade init.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub num_nodes: usize,
    pub num_procs: usize,
    pub num_cpus_per_node: usize,
    pub num_procs_per_node: usize,
    pub num_threads_per_proc_cap: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Topology {
            num_nodes: 1,
            num_procs: 1,
            num_cpus_per_node: 1,
            num_procs_per_node: 1,
            num_threads_per_proc_cap: 1,
        }
    }
}

fn read_env_int(name: &str, require: bool) -> Result<Option<usize>, ApolloError> {
    match env::var(name) {
        Ok(val) => val.parse::<usize>().map(Some).map_err(|_| ApolloError::Config {
            detail: format!("environment variable {name}='{val}' is not a valid integer"),
        }),
        Err(env::VarError::NotPresent) => {
            if require {
                Err(ApolloError::Config {
                    detail: format!("required environment variable {name} is not set"),
                })
            } else {
                Ok(None)
            }
        }
        Err(env::VarError::NotUnicode(_)) => Err(ApolloError::Config {
            detail: format!("environment variable {name} is not valid unicode"),
        }),
    }
}

impl Topology {
    /// Discover topology from the environment. When `require_topology`
    /// is true, a missing variable is a fatal configuration error
    /// (distributed launch); when false, missing variables silently
    /// default to 1 (single-process/test runs).
    pub fn discover(require_topology: bool) -> Result<Self, ApolloError> {
        let num_nodes = read_env_int("SLURM_NNODES", require_topology)?.unwrap_or(1);
        let num_procs = read_env_int("SLURM_NPROCS", require_topology)?.unwrap_or(1);
        let num_cpus_per_node = read_env_int("SLURM_CPUS_ON_NODE", require_topology)?.unwrap_or(1);
        let num_procs_per_node =
            read_env_int("SLURM_NTASKS_PER_NODE", require_topology)?.unwrap_or(1);
        // OMP_NUM_THREADS is never required even under require_topology:
        // a job with no OpenMP threading simply caps at 1.
        let num_threads_per_proc_cap = read_env_int("OMP_NUM_THREADS", false)?.unwrap_or(1);

        Ok(Topology {
            num_nodes,
            num_procs,
            num_cpus_per_node,
            num_procs_per_node,
            num_threads_per_proc_cap,
        })
    }
}

/// Parse `APOLLO_INIT_MODEL` as `"Name"` or `"Static,K"`. `num_policies`
/// bounds a `Static` selection's `K`. Callers without the variable set
/// should fall back to a default model rather than call this.
pub fn parse_init_model(value: &str, num_policies: usize) -> Result<Model, ApolloError> {
    let mut parts = value.splitn(2, ',');
    let name = parts.next().unwrap_or("").trim();
    let rest = parts.next();

    match name {
        "Random" => Ok(Model::random(num_policies, None)),
        "RoundRobin" => Ok(Model::round_robin(num_policies)),
        "Sequential" => Ok(Model::sequential(num_policies)),
        "Static" => {
            let k_str = rest.ok_or_else(|| ApolloError::Config {
                detail: "APOLLO_INIT_MODEL='Static' requires a policy index: 'Static,K'".to_string(),
            })?;
            let k: usize = k_str.trim().parse().map_err(|_| ApolloError::Config {
                detail: format!("APOLLO_INIT_MODEL static policy '{k_str}' is not an integer"),
            })?;
            Model::static_policy(num_policies, k)
        }
        other => Err(ApolloError::Config {
            detail: format!("unknown APOLLO_INIT_MODEL name '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology_is_single_process() {
        assert_eq!(Topology::default(), Topology {
            num_nodes: 1,
            num_procs: 1,
            num_cpus_per_node: 1,
            num_procs_per_node: 1,
            num_threads_per_proc_cap: 1,
        });
    }

    #[test]
    fn parses_bare_model_names() {
        let m = parse_init_model("RoundRobin", 4).unwrap();
        assert_eq!(m.type_name(), "RoundRobin");
    }

    #[test]
    fn parses_static_with_policy_index() {
        let mut m = parse_init_model("Static,2", 4).unwrap();
        assert_eq!(m.choose(&[]), 2);
    }

    #[test]
    fn static_without_policy_index_is_a_config_error() {
        assert!(parse_init_model("Static", 4).is_err());
    }

    #[test]
    fn static_with_out_of_range_policy_is_a_config_error() {
        assert!(parse_init_model("Static,9", 4).is_err());
    }

    #[test]
    fn unknown_model_name_is_a_config_error() {
        assert!(parse_init_model("Python", 4).is_err());
    }
}
