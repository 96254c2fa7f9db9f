//! Startup configuration, assembled from environment variables via
//! `dotenvy` plus manual `env::var` reads — no config-file layering.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub database_auth_token: Option<String>,
    pub map_seed: String,
}

const MINIMUM_SEED_LENGTH: usize = 10;

impl ServerConfig {
    /// Reads and validates the four required startup inputs from the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// The actual validation logic, parameterised over how a variable
    /// is looked up. `from_env` is a thin wrapper over this with
    /// `std::env::var`; tests supply a fixed map instead, so the path
    /// under test is the real one rather than a reimplementation of it.
    ///
    /// A map seed shorter than ten characters is rejected immediately:
    /// it's cheap to generate a longer one and an accidentally short
    /// seed produces a far more repetitive map than players expect.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_auth_token = lookup("TURSO_AUTH_TOKEN");

        let map_seed = lookup("MAP_SEED").context("MAP_SEED must be set")?;
        if map_seed.len() < MINIMUM_SEED_LENGTH {
            bail!("MAP_SEED must be at least {MINIMUM_SEED_LENGTH} characters, got {}", map_seed.len());
        }

        Ok(Self {
            bind_addr,
            database_url,
            database_auth_token,
            map_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(vars: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| vars.get(key).map(|value| value.to_string())
    }

    #[test]
    fn rejects_short_seeds() {
        let vars = HashMap::from([("DATABASE_URL", "libsql://example"), ("MAP_SEED", "short")]);
        let err = ServerConfig::from_lookup(lookup_from(vars)).unwrap_err();
        assert!(err.to_string().contains("at least"));
    }

    #[test]
    fn rejects_missing_database_url() {
        let vars = HashMap::from([("MAP_SEED", "TEST_SEED_A1B2C3D4")]);
        let err = ServerConfig::from_lookup(lookup_from(vars)).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn accepts_a_full_valid_environment() {
        let vars = HashMap::from([
            ("BIND_ADDR", "127.0.0.1:4000"),
            ("DATABASE_URL", "libsql://example"),
            ("TURSO_AUTH_TOKEN", "secret-token"),
            ("MAP_SEED", "TEST_SEED_A1B2C3D4"),
        ]);
        let config = ServerConfig::from_lookup(lookup_from(vars)).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.database_url, "libsql://example");
        assert_eq!(config.database_auth_token.as_deref(), Some("secret-token"));
        assert_eq!(config.map_seed, "TEST_SEED_A1B2C3D4");
    }

    #[test]
    fn defaults_bind_addr_and_leaves_auth_token_unset() {
        let vars = HashMap::from([("DATABASE_URL", "libsql://example"), ("MAP_SEED", "TEST_SEED_A1B2C3D4")]);
        let config = ServerConfig::from_lookup(lookup_from(vars)).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.database_auth_token.is_none());
    }
}
