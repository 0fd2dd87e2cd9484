/*!
 * Apollo CLI - manually exercise the facade from the command line.
 *
 * Commands:
 * - register NAME NUM_POLICIES     Register a region
 * - run NAME FEATURE=VALUE...      begin/getPolicyIndex/end once
 * - attach FILE                    Ingest a JSON model package from a file
 * - flush STEP                     Local+collective reduce, advance to STEP
 * - status                         Show registered regions and their models
 */

use apollo::Apollo;
use std::path::PathBuf;

#[derive(Debug)]
enum Command {
    Register { name: String, num_policies: usize },
    Run { name: String, features: Vec<(String, f64)> },
    Attach { file: PathBuf },
    Flush { step: i64 },
    Status,
}

impl Command {
    fn parse() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        if args.len() < 2 {
            return Err("no command specified".to_string());
        }

        match args[1].as_str() {
            "register" => {
                let name = args.get(2).cloned().ok_or("region name required")?;
                let num_policies = args
                    .get(3)
                    .and_then(|s| s.parse().ok())
                    .ok_or("num_policies required")?;
                Ok(Command::Register { name, num_policies })
            }
            "run" => {
                let name = args.get(2).cloned().ok_or("region name required")?;
                let mut features = Vec::new();
                for arg in &args[3..] {
                    let (k, v) = arg.split_once('=').ok_or("expected FEATURE=VALUE")?;
                    let value: f64 = v.parse().map_err(|_| format!("bad feature value '{v}'"))?;
                    features.push((k.to_string(), value));
                }
                Ok(Command::Run { name, features })
            }
            "attach" => {
                let file = args.get(2).map(PathBuf::from).ok_or("file path required")?;
                Ok(Command::Attach { file })
            }
            "flush" => {
                let step = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
                Ok(Command::Flush { step })
            }
            "status" => Ok(Command::Status),
            other => Err(format!("unknown command '{other}'")),
        }
    }

    fn execute(&self, apollo: &Apollo) -> Result<(), String> {
        match self {
            Command::Register { name, num_policies } => {
                apollo
                    .register_region(name, *num_policies)
                    .map_err(|e| e.to_string())?;
                println!("registered region '{name}' with {num_policies} policies");
                Ok(())
            }
            Command::Run { name, features } => {
                let region = apollo.region(name).ok_or_else(|| format!("no such region '{name}'"))?;
                for (k, v) in features {
                    apollo.set_feature(k, *v);
                }
                region.begin().map_err(|e| e.to_string())?;
                let policy = region.get_policy_index().map_err(|e| e.to_string())?;
                region.end().map_err(|e| e.to_string())?;
                println!("region '{name}' chose policy {policy}");
                Ok(())
            }
            Command::Attach { file } => {
                let bytes = std::fs::read(file).map_err(|e| format!("reading {file:?}: {e}"))?;
                apollo.attach_model(&bytes).map_err(|e| e.to_string())?;
                println!("attached model package from {file:?}");
                Ok(())
            }
            Command::Flush { step } => {
                apollo
                    .flush_all_region_measurements(*step)
                    .map_err(|e| e.to_string())?;
                println!("flushed measurements at step {step}");
                Ok(())
            }
            Command::Status => {
                println!("Apollo status");
                println!("{}", "=".repeat(40));
                let topology = apollo.topology();
                println!(
                    "topology: nodes={} procs={} cpus_per_node={} procs_per_node={} threads_cap={}",
                    topology.num_nodes,
                    topology.num_procs,
                    topology.num_cpus_per_node,
                    topology.num_procs_per_node,
                    topology.num_threads_per_proc_cap,
                );
                println!();
                for name in apollo.region_names() {
                    let region = apollo.region(&name).unwrap();
                    println!(
                        "region '{}': model={} policies={} measurements={} executions={}",
                        name,
                        region.model().type_name(),
                        region.num_policies(),
                        region.measurement_count(),
                        region.exec_count_total(),
                    );
                }
                Ok(())
            }
        }
    }

    fn print_help() {
        println!("Apollo - online autotuning runtime");
        println!();
        println!("USAGE:");
        println!("    apollo-cli <COMMAND> [ARGS]");
        println!();
        println!("COMMANDS:");
        println!("    register NAME NUM_POLICIES   Register a region");
        println!("    run NAME [FEATURE=VALUE...]  begin/getPolicyIndex/end once");
        println!("    attach FILE                  Ingest a JSON model package from a file");
        println!("    flush STEP                   Local+collective reduce, advance to STEP");
        println!("    status                       Show registered regions and their models");
    }
}

fn main() {
    match Command::parse() {
        Ok(command) => {
            let apollo = Apollo::instance();
            if let Err(e) = command.execute(apollo) {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            Command::print_help();
            std::process::exit(1);
        }
    }
}
