use std::time::Instant;

use patchfind_cli::logging::setup_logging;
use patchfind_cli::{run, LocateResult, LocatorConfig, RunPaths};
use patchfind_core::init_thread_pool;

/// Environment variable naming an optional JSON or TOML configuration file
const CONFIG_ENV: &str = "PATCHFIND_CONFIG";

fn load_config() -> LocateResult<LocatorConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            log::info!("Loading configuration from {}", path.to_string_lossy());
            LocatorConfig::load(path)
        }
        None => Ok(LocatorConfig::default()),
    }
}

fn locate(paths: &RunPaths) -> LocateResult<()> {
    let config = load_config()?;
    init_thread_pool(config.n_threads)?;
    log::debug!("Using {} of {} cores", config.n_threads, num_cpus::get());

    let t0 = Instant::now();
    let location = run(paths, config)?;
    log::info!(
        "Located {} patches in {:.2?}{}",
        location.patch_centres.len(),
        t0.elapsed(),
        if location.upside_down { " (upside down)" } else { "" }
    );
    Ok(())
}

fn main() {
    let logger = match setup_logging("info") {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Logger initialization failed: {}", e);
            None
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 7 {
        log::warn!("Expected 6 paths, got {}; using default paths", args.len().saturating_sub(1));
    }
    let paths = RunPaths::from_args(&args);

    let code = match locate(&paths) {
        Ok(()) => 1,
        Err(e) => {
            log::error!("{}", e);
            -1
        }
    };
    if let Some(handle) = logger {
        handle.flush();
    }
    std::process::exit(code);
}
