// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadloop - WhatsApp lead-qualification bot.
//!
//! This is the binary entry point. The webhook server and the scheduler
//! run as separate long-lived processes sharing only the database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod runtime;

use clap::{Parser, Subcommand};

/// Leadloop - WhatsApp lead-qualification bot.
#[derive(Parser, Debug)]
#[command(name = "leadloop", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server (CRM and gateway triggers).
    Serve,
    /// Start the background scheduler loop.
    Scheduler,
    /// Run the initial-contact flow once for a single lead.
    Dispatch {
        /// CRM lead id to contact.
        #[arg(long)]
        lead_id: i64,
        /// Addressee first name when the CRM contact carries none.
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match leadloop_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            leadloop_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    runtime::init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Commands::Serve => runtime::run_serve(config).await,
        Commands::Scheduler => runtime::run_scheduler(config).await,
        Commands::Dispatch { lead_id, name } => {
            runtime::run_dispatch(config, lead_id, name.as_deref()).await
        }
    };

    if let Err(e) = result {
        eprintln!("leadloop: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_is_valid() {
        let config = leadloop_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "leadloop");
    }
}
