/*!
 * Error taxonomy - typed failures for configuration, package ingest,
 * protocol misuse, and collective exchange.
 *
 * See the error handling design: configuration errors are fatal at
 * init, package/collective errors are reported and leave prior state
 * untouched, protocol errors are fail-fast.
 */

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ApolloError {
    /// Bad environment variable, bad initial model, out-of-range static
    /// policy. Fatal at process init.
    Config { detail: String },

    /// JSON parse failure, unknown model type name, malformed tree.
    /// The affected region's model is left unchanged.
    Package { detail: String },

    /// begin() while inside, end() while outside, getPolicyIndex()
    /// outside. Fail-fast misuse of the region state machine.
    Protocol { detail: String },

    /// Rank-divergent feature counts, transport failure during the
    /// collective exchange. The global best-policy table retains its
    /// prior value.
    Collective { detail: String },

    /// A region name collided with an already-registered region.
    DuplicateRegion { name: String },
}

impl fmt::Display for ApolloError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApolloError::Config { detail } => write!(f, "configuration error: {detail}"),
            ApolloError::Package { detail } => write!(f, "model package error: {detail}"),
            ApolloError::Protocol { detail } => write!(f, "protocol error: {detail}"),
            ApolloError::Collective { detail } => write!(f, "collective reduction error: {detail}"),
            ApolloError::DuplicateRegion { name } => {
                write!(f, "region '{name}' is already registered")
            }
        }
    }
}

impl std::error::Error for ApolloError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = ApolloError::Package {
            detail: "unknown type name Foo".to_string(),
        };
        assert!(err.to_string().contains("Foo"));
    }

    #[test]
    fn duplicate_region_names_the_region() {
        let err = ApolloError::DuplicateRegion {
            name: "loop1".to_string(),
        };
        assert!(err.to_string().contains("loop1"));
    }
}
