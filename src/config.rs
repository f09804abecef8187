use crate::domain::units::MAX_DECIMALS;
use crate::domain::Decimal;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: IpAddr,
    /// Exponent between smallest units and display amounts.
    pub token_decimals: u32,
    /// Protocol fee applied when token creation does not name one.
    pub default_fee_rate: Decimal,
    pub leaderboard_limit: usize,
    pub seed_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            token_decimals: 18,
            default_fee_rate: Decimal::from_scaled(1, 2),
            leaderboard_limit: 10,
            seed_file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let port = parse_or(&env_map, "PORT", defaults.port, "must be a valid u16")?;

        let bind_addr = parse_or(
            &env_map,
            "BIND_ADDR",
            defaults.bind_addr,
            "must be an IPv4 or IPv6 address",
        )?;

        let token_decimals = parse_or(
            &env_map,
            "TOKEN_DECIMALS",
            defaults.token_decimals,
            "must be a valid u32",
        )?;
        if token_decimals > MAX_DECIMALS {
            return Err(ConfigError::InvalidValue(
                "TOKEN_DECIMALS".to_string(),
                format!("must be <= {}, got {}", MAX_DECIMALS, token_decimals),
            ));
        }

        let default_fee_rate = match env_map.get("DEFAULT_FEE_RATE") {
            Some(raw) => Decimal::from_str_canonical(raw).map_err(|_| {
                ConfigError::InvalidValue(
                    "DEFAULT_FEE_RATE".to_string(),
                    "must be a decimal number".to_string(),
                )
            })?,
            None => defaults.default_fee_rate,
        };
        if default_fee_rate.is_negative() || default_fee_rate >= Decimal::one() {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_FEE_RATE".to_string(),
                format!("must be in [0, 1), got {}", default_fee_rate),
            ));
        }

        let leaderboard_limit = parse_or(
            &env_map,
            "LEADERBOARD_LIMIT",
            defaults.leaderboard_limit,
            "must be a positive integer",
        )?;
        if leaderboard_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "LEADERBOARD_LIMIT".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let seed_file = match env_map.get("SEED_FILE").map(|s| s.trim()) {
            None | Some("") => None,
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.is_file() {
                    return Err(ConfigError::InvalidValue(
                        "SEED_FILE".to_string(),
                        "file not found or unreadable".to_string(),
                    ));
                }
                Some(path)
            }
        };

        Ok(Config {
            port,
            bind_addr,
            token_decimals,
            default_fee_rate,
            leaderboard_limit,
            seed_file,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn invalid_key(result: Result<Config, ConfigError>) -> String {
        match result {
            Err(ConfigError::InvalidValue(k, _)) => k,
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1");
        assert_eq!(config.token_decimals, 18);
        assert_eq!(config.default_fee_rate.to_canonical_string(), "0.01");
        assert_eq!(config.leaderboard_limit, 10);
        assert!(config.seed_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_env_map(env(&[
            ("PORT", "9000"),
            ("BIND_ADDR", "0.0.0.0"),
            ("TOKEN_DECIMALS", "6"),
            ("DEFAULT_FEE_RATE", "0.025"),
            ("LEADERBOARD_LIMIT", "25"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0");
        assert_eq!(config.token_decimals, 6);
        assert_eq!(config.default_fee_rate.to_canonical_string(), "0.025");
        assert_eq!(config.leaderboard_limit, 25);
    }

    #[test]
    fn test_invalid_port() {
        assert_eq!(invalid_key(Config::from_env_map(env(&[("PORT", "not_a_number")]))), "PORT");
    }

    #[test]
    fn test_invalid_bind_addr() {
        assert_eq!(
            invalid_key(Config::from_env_map(env(&[("BIND_ADDR", "localhost")]))),
            "BIND_ADDR"
        );
    }

    #[test]
    fn test_token_decimals_out_of_range() {
        assert_eq!(
            invalid_key(Config::from_env_map(env(&[("TOKEN_DECIMALS", "37")]))),
            "TOKEN_DECIMALS"
        );
    }

    #[test]
    fn test_fee_rate_out_of_range() {
        assert_eq!(
            invalid_key(Config::from_env_map(env(&[("DEFAULT_FEE_RATE", "1")]))),
            "DEFAULT_FEE_RATE"
        );
        assert_eq!(
            invalid_key(Config::from_env_map(env(&[("DEFAULT_FEE_RATE", "-0.1")]))),
            "DEFAULT_FEE_RATE"
        );
    }

    #[test]
    fn test_zero_leaderboard_limit() {
        assert_eq!(
            invalid_key(Config::from_env_map(env(&[("LEADERBOARD_LIMIT", "0")]))),
            "LEADERBOARD_LIMIT"
        );
    }

    #[test]
    fn test_seed_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let config = Config::from_env_map(env(&[("SEED_FILE", path.as_str())])).unwrap();
        assert_eq!(config.seed_file.as_deref(), Some(file.path()));

        assert_eq!(
            invalid_key(Config::from_env_map(env(&[("SEED_FILE", "/nonexistent/seed.json")]))),
            "SEED_FILE"
        );
    }
}
