//! Grant Election Engine
//!
//! Periodic grant elections per region: beneficiaries register with a bond,
//! voters spend voice credits quadratically, awardees are ranked with an
//! optional random rotation and the reward vault is split and committed to
//! through a two-phase finalization.

pub mod config;
pub mod election;
pub mod errors;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ElectionConfiguration, EngineConfig, LoggingConfig};
pub use election::{Collaborators, GrantElections};
pub use errors::{Error, ErrorKind, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the election engine with proper logging
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grant_elections=info".into()),
        )
        .init();

    tracing::info!("🗳️  Grant elections v{} initialized", VERSION);
    Ok(())
}

/// Initialize logging from loaded configuration
///
/// `RUST_LOG` still takes precedence over `logging.level`.
pub fn init_with(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("grant_elections={}", logging.level).into()
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format.as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| Error::config(format!("Failed to install logging: {e}")))?;

    tracing::info!(
        level = %logging.level,
        format = %logging.format,
        "🗳️  Grant elections v{} initialized",
        VERSION
    );
    Ok(())
}
