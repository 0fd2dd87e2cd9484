/*!
 * Apollo Cluster Demo - simulated multi-rank collective reduction
 *
 * This demonstrates the cross-rank half of the best-policy reducer
 * without a real MPI binding: three simulated ranks each report a
 * local best policy for the same region and feature vector, and the
 * collective reduce picks the global winner.
 */

use apollo::error::ApolloError;
use apollo::measure::FeatureVec;
use apollo::reducer::{self, PackedRecord};
use apollo::transport::CollectiveTransport;
use std::collections::HashMap;

/// A transport that already knows every rank's packed buffer, useful
/// for demonstrating the reduce step in a single thread.
struct SimulatedCluster {
    local_rank: i32,
    all_buffers: Vec<Vec<u8>>,
}

impl CollectiveTransport for SimulatedCluster {
    fn all_gather(&self, _bytes: Vec<u8>) -> Result<Vec<Vec<u8>>, ApolloError> {
        Ok(self.all_buffers.clone())
    }

    fn rank(&self) -> i32 {
        self.local_rank
    }
}

fn main() {
    println!("{}", "=".repeat(80));
    println!("APOLLO CLUSTER DEMO - Simulated Collective Reduction");
    println!("{}", "=".repeat(80));
    println!();

    // Each rank measured the same region/feature vector with a
    // different policy and average time.
    let per_rank_best = [
        (0i32, 2usize, 0.40),
        (1i32, 1usize, 0.25),
        (2i32, 0usize, 0.25),
    ];

    println!("Per-rank local best policy for region 'loop1', features=[]:");
    let mut buffers = Vec::new();
    for (rank, policy, avg) in per_rank_best {
        println!("  rank {rank}: policy {policy}, avg {avg:.3}s");
        let mut best = HashMap::new();
        best.insert(FeatureVec(vec![]), (policy, avg));
        let packed = reducer::pack_best_policies(rank, &[("loop1".to_string(), best)]).unwrap();
        buffers.push(packed);
    }

    let transport = SimulatedCluster {
        local_rank: 0,
        all_buffers: buffers,
    };

    let per_region = Vec::new();
    let global = reducer::collective_reduce(&transport, &per_region).unwrap();

    println!();
    println!("Global reduction result:");
    for ((region, features), (policy, avg)) in &global {
        println!("  region '{region}' features={:?} -> policy {policy} (avg {avg:.3}s)", features.0);
    }
    println!();
    println!("Rank 1 and rank 2 tied on avg time (0.25s); policy 0 won the tie-break");
    println!("because it has the lower policy index among the tied entries.");

    demo_wire_round_trip();
}

fn demo_wire_round_trip() {
    println!();
    println!("{}", "-".repeat(80));
    println!("Wire format round trip");
    println!("{}", "-".repeat(80));

    let mut best = HashMap::new();
    best.insert(FeatureVec(vec![1.0, 2.0]), (3usize, 0.125));
    let packed = reducer::pack_best_policies(7, &[("kernel2".to_string(), best)]).unwrap();
    println!("Packed {} bytes for rank 7", packed.len());

    let records: Vec<PackedRecord> = reducer::unpack_best_policies(&packed).unwrap();
    for record in records {
        println!(
            "  rank={} region='{}' features={:?} policy={} avg={}",
            record.rank, record.region_name, record.features, record.policy_index, record.avg_time
        );
    }
}
