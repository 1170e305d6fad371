mod arg;

use bgp_bully::{config, engine};
use clap::Parser;

fn setup_logger(verbose: bool) {
    let level = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    let config = simplelog::ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("Failed to initialize logger");
}

/// Load the scenario file and drive it to completion, without deciding the
/// process exit code. Kept separate from `main` so every fallible path
/// funnels through a single `Result`, per the single-exit-site design.
async fn run(args: &arg::BgpBully) -> Result<(), String> {
    let (global, scenario) =
        config::load(&args.config_file).map_err(|e| format!("configuration error: {e}"))?;
    engine::run(&global, &scenario)
        .await
        .map_err(|e| format!("{e}"))
}

#[tokio::main]
async fn main() {
    let args = arg::BgpBully::parse();
    setup_logger(args.verbose);
    match run(&args).await {
        Ok(()) => {
            log::info!("scenario completed successfully");
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
