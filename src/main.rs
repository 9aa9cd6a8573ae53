//! RAX Share - Entry Point
//!
//! Prepares the storage tree for the request-handling layer: loads the
//! configuration, creates the storage root and reports its current state.

use log::{error, info, warn};
use std::process;

use rax_share::error::handlers::handle_error;
use rax_share::{ShareConfig, ShareService};

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching storage manager...");

    let config = match ShareConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let service = match ShareService::open(&config) {
        Ok(service) => service,
        Err(e) => {
            handle_error(&e);
            process::exit(1);
        }
    };

    match service.browse("").await {
        Ok(view) => {
            info!(
                "Storage root holds {} folders and {} files",
                view.listing.folders.len(),
                view.listing.files.len()
            );
            if view.usage.is_available() {
                let usage = view.usage.snapshot();
                info!(
                    "Volume usage: {} MB used, {} MB free ({}%)",
                    usage.used_mb(),
                    usage.free_mb(),
                    usage.used_percent
                );
            } else {
                warn!("Volume usage is unavailable on this platform");
            }
        }
        Err(e) => handle_error(&e),
    }
}
