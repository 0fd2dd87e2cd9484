/*!
 * Apollo Demo - single-process region lifecycle
 *
 * This demonstrates:
 * 1. Registering a region and driving it through begin/getPolicyIndex/end
 * 2. Local best-policy reduction from accumulated measurements
 * 3. Reconfiguring a region's model via a JSON package, wildcard and targeted
 */

use apollo::{Apollo, LoopbackTransport, Topology};
use std::thread;
use std::time::Duration;

fn main() {
    println!("{}", "=".repeat(80));
    println!("APOLLO - Online Autotuning Runtime");
    println!("{}", "=".repeat(80));
    println!();

    let apollo = Apollo::with_transport(Topology::default(), Box::new(LoopbackTransport));

    demo_region_lifecycle(&apollo);
    println!();
    demo_local_reduction(&apollo);
    println!();
    demo_model_package_ingest(&apollo);
}

fn demo_region_lifecycle(apollo: &Apollo) {
    println!("Demo 1: Region Lifecycle");
    println!("{}", "-".repeat(80));

    let region = apollo.register_region("loop1", 4).unwrap();
    println!("Registered region 'loop1' with {} policies", region.num_policies());

    for call in 0..5 {
        apollo.set_feature("trip_count", 1000.0);
        region.begin().unwrap();
        let policy = region.get_policy_index().unwrap();
        thread::sleep(Duration::from_micros(50));
        region.end().unwrap();
        println!("  call {call}: policy {policy}");
    }

    println!("Executions recorded: {}", region.exec_count_total());
}

fn demo_local_reduction(apollo: &Apollo) {
    println!("Demo 2: Local Best-Policy Reduction");
    println!("{}", "-".repeat(80));

    let region = apollo.register_region("kernel2", 3).unwrap();
    apollo
        .attach_model(
            br#"{
        "driver": { "format": "int", "rules": "0" },
        "type": { "index": 3, "name": "RoundRobin" },
        "region_names": ["kernel2"],
        "features": { "count": 0, "names": [] }
    }"#,
        )
        .unwrap();

    for _ in 0..9 {
        region.begin().unwrap();
        region.get_policy_index().unwrap();
        region.end().unwrap();
    }

    let best = region.reduce_best_policies();
    println!("Local best policies for 'kernel2':");
    for (features, (policy, avg)) in &best {
        println!("  features={:?} -> policy {} (avg {:.6}s)", features.0, policy, avg);
    }
}

fn demo_model_package_ingest(apollo: &Apollo) {
    println!("Demo 3: Model Package Ingest");
    println!("{}", "-".repeat(80));

    apollo.register_region("A", 4).unwrap();
    apollo.register_region("B", 4).unwrap();

    let wildcard = br#"{
        "driver": { "format": "int", "rules": "0" },
        "type": { "index": 3, "name": "Static" },
        "region_names": ["__ANY_REGION__"],
        "features": { "count": 0, "names": [] },
        "policy": 2
    }"#;
    apollo.attach_model(wildcard).unwrap();
    println!("After wildcard attach: A={}, B={}",
        apollo.region("A").unwrap().model().get_index(&[]),
        apollo.region("B").unwrap().model().get_index(&[]));

    let targeted = br#"{
        "driver": { "format": "int", "rules": "0" },
        "type": { "index": 3, "name": "Static" },
        "region_names": ["B"],
        "features": { "count": 0, "names": [] },
        "policy": 3
    }"#;
    apollo.attach_model(targeted).unwrap();
    println!("After targeted attach to B: A={}, B={}",
        apollo.region("A").unwrap().model().get_index(&[]),
        apollo.region("B").unwrap().model().get_index(&[]));
}
