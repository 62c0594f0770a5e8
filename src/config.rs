//! Configuration for the election engine
//!
//! Engine settings load from environment variables with validation. The
//! per-term election defaults table lives here too; governance rewrites rows
//! of it at runtime through [`crate::election::GrantElections::set_configuration`].

use crate::types::{Amount, ElectionTerm, ONE_DAY, ShareType, tokens};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Default total allocation distributed through one reward vault
pub const DEFAULT_VAULT_ALLOCATION: Amount = tokens(100);

/// Longest registration, voting and cooldown span a term may configure
pub const MAX_ELECTION_SPAN: i64 = 100 * 365 * ONE_DAY;

/// Default election parameters for one grant term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfiguration {
    /// How many top candidates take part in the randomized reshuffle
    pub ranking: usize,
    /// How many top-ranked candidates win
    pub awardees: usize,
    pub use_randomization: bool,
    pub registration_period: i64,
    pub voting_period: i64,
    pub cooldown_period: i64,
    pub registration_bond: Amount,
    pub registration_bond_required: bool,
    pub finalization_incentive: Amount,
    pub enabled: bool,
    pub share_type: ShareType,
}

impl ElectionConfiguration {
    /// Shipped defaults for `term`
    pub fn default_for(term: ElectionTerm) -> Self {
        let (bond, ranking, awardees, period_days, cooldown_days) = match term {
            ElectionTerm::Monthly => (tokens(50), 3, 1, 7, 21),
            ElectionTerm::Quarterly => (tokens(100), 5, 2, 14, 83),
            ElectionTerm::Yearly => (tokens(1000), 7, 3, 30, 358),
        };

        Self {
            ranking,
            awardees,
            use_randomization: true,
            registration_period: period_days * ONE_DAY,
            voting_period: period_days * ONE_DAY,
            cooldown_period: cooldown_days * ONE_DAY,
            registration_bond: bond,
            registration_bond_required: true,
            finalization_incentive: tokens(2000),
            enabled: true,
            share_type: ShareType::EqualWeight,
        }
    }

    /// Reject rows the engine cannot run
    pub fn validate(&self) -> Result<()> {
        if self.awardees > self.ranking {
            return Err(Error::InvalidConfiguration(format!(
                "awardees ({}) must not exceed ranking ({})",
                self.awardees, self.ranking
            )));
        }
        if self.registration_period < 0 || self.voting_period < 0 || self.cooldown_period < 0 {
            return Err(Error::InvalidConfiguration(
                "periods must not be negative".to_string(),
            ));
        }
        let span = self
            .registration_period
            .checked_add(self.voting_period)
            .and_then(|span| span.checked_add(self.cooldown_period))
            .filter(|span| *span <= MAX_ELECTION_SPAN);
        if span.is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "registration, voting and cooldown periods must total at most {MAX_ELECTION_SPAN} seconds"
            )));
        }
        Ok(())
    }
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Units distributed across the awardees of one vault
    pub vault_allocation: Amount,

    /// Secret feeding locally derived random numbers (base64 encoded, minimum 32 bytes)
    pub randomness_secret: String,
}

impl EngineConfig {
    /// Load engine configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let vault_allocation = match std::env::var("ELECTION_VAULT_ALLOCATION") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::config("Invalid ELECTION_VAULT_ALLOCATION"))?,
            Err(_) => DEFAULT_VAULT_ALLOCATION,
        };

        let randomness_secret = std::env::var("ELECTION_RANDOMNESS_SECRET")
            .map_err(|_| Error::config("ELECTION_RANDOMNESS_SECRET environment variable required"))?;
        Self::validate_secret(&randomness_secret, "ELECTION_RANDOMNESS_SECRET")?;

        Ok(Self {
            vault_allocation,
            randomness_secret,
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        use base64::Engine;
        let randomness_secret =
            base64::engine::general_purpose::STANDARD.encode(rand::random::<[u8; 32]>());

        Self {
            vault_allocation: DEFAULT_VAULT_ALLOCATION,
            randomness_secret,
        }
    }

    /// Validate a base64-encoded secret
    fn validate_secret(secret: &str, name: &str) -> Result<()> {
        use base64::Engine;
        let decoded = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(secret)
                .map_err(|_| Error::config(format!("{name} must be valid base64")))?,
        );

        if decoded.len() < 32 {
            return Err(Error::config(format!(
                "{name} must be at least 32 bytes when decoded"
            )));
        }

        Ok(())
    }

    /// Decoded randomness secret, wiped from memory on drop
    pub fn randomness_secret_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.randomness_secret)
            .map(Zeroizing::new)
            .map_err(|_| Error::config("Invalid randomness secret"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let engine = EngineConfig::from_env()?;

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
        };

        Ok(Self { engine, logging })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            engine: EngineConfig::for_testing(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
