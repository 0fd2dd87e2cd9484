/*!
 * Collective transport - a pluggable `all_gather`-shaped seam
 * standing in for `MPI_Allgather`, so the best-policy reducer is
 * testable without a parallel launcher.
 */

use crate::error::ApolloError;

/// One collective operation: every rank contributes `bytes` and gets
/// back every rank's contribution, in rank order.
pub trait CollectiveTransport {
    fn all_gather(&self, bytes: Vec<u8>) -> Result<Vec<Vec<u8>>, ApolloError>;

    fn rank(&self) -> i32;
}

/// Single-rank loopback transport: echoes the local buffer back as
/// the sole participant. Used for single-process runs and tests where
/// no real MPI binding is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackTransport;

impl CollectiveTransport for LoopbackTransport {
    fn all_gather(&self, bytes: Vec<u8>) -> Result<Vec<Vec<u8>>, ApolloError> {
        Ok(vec![bytes])
    }

    fn rank(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_returns_its_own_buffer_as_the_only_entry() {
        let transport = LoopbackTransport;
        let gathered = transport.all_gather(vec![1, 2, 3]).unwrap();
        assert_eq!(gathered, vec![vec![1, 2, 3]]);
        assert_eq!(transport.rank(), 0);
    }
}
