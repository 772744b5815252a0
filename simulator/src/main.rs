use anyhow::Context;
use clap::Parser;
use iqrcore::format::{color_for_score, default_color_stops, format_timestamp};
use log::info;
use rpc_bridge::bridge::{bind_address, RpcBridge, SimulatedService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ServiceConfig;

mod generator;
mod rpc_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Simulated IQR query and video service")]
struct Args {
    /// Load the service config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 9000)]
    port: u16,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 250)]
    results: usize,
    /// `query:isCompleted` polls answered false before completion
    #[arg(long, default_value_t = 2)]
    completion_polls: u32,
    /// Run a single synthetic query to completion and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Serve the RPC endpoint until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let service_config = if let Some(path) = args.config {
        ServiceConfig::load(path)?
    } else {
        ServiceConfig::from_args(args.seed, args.results, args.completion_polls)
    };
    let service = Arc::new(SimulatedService::new(service_config));

    if args.offline {
        let page = service
            .runner()
            .run_to_completion("offline plan")
            .context("running offline query")?;
        println!(
            "Offline run -> results {}, feedback requests {}, records {}",
            page.result_ids.len(),
            page.feedback_ids.len(),
            page.results.len()
        );
        let stops = default_color_stops();
        for id in page.result_ids.iter().take(5) {
            if let Some(result) = page.results.get(id) {
                println!(
                    "  #{} id {} relevancy {:.3} ({}) start {}",
                    result.rank,
                    result.instance_id,
                    result.relevancy_score,
                    color_for_score(result.relevancy_score, &stops),
                    format_timestamp(result.start_time, true, &chrono::Utc)
                );
            }
        }
        service.runner().shut_down();
    }

    if args.serve {
        let bridge = RpcBridge::spawn(service, bind_address(args.port));
        info!("serving on {} (Ctrl+C to stop)", bridge.address());
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
