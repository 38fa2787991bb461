use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use dotenvy::dotenv;
use strum_macros::{Display, EnumString};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub log_level: tracing::Level,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub leave: LeaveConfig,
}

/// Where the staffing-capacity check is enforced in a request's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CapacityEnforcement {
    Off,
    Submit,
    Approval,
    Both,
}

impl CapacityEnforcement {
    pub fn at_submit(self) -> bool {
        matches!(self, CapacityEnforcement::Submit | CapacityEnforcement::Both)
    }

    pub fn at_approval(self) -> bool {
        matches!(self, CapacityEnforcement::Approval | CapacityEnforcement::Both)
    }
}

/// Knobs of the leave engine.
#[derive(Debug, Clone)]
pub struct LeaveConfig {
    pub capacity_enforcement: CapacityEnforcement,
    pub weekend_days: Vec<Weekday>,
    /// Remaining balance (days) at or below which a threshold event is raised.
    pub low_balance_threshold: f64,
    pub auto_post_on_approval: bool,
}

impl Default for LeaveConfig {
    fn default() -> Self {
        Self {
            capacity_enforcement: CapacityEnforcement::Both,
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
            low_balance_threshold: 3.0,
            auto_post_on_approval: true,
        }
    }
}

impl LeaveConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity_enforcement: env_or("CAPACITY_ENFORCEMENT", defaults.capacity_enforcement)?,
            weekend_days: match env::var("WEEKEND_DAYS") {
                Ok(raw) => parse_weekdays(&raw)?,
                Err(_) => defaults.weekend_days,
            },
            low_balance_threshold: env_or("LOW_BALANCE_THRESHOLD", defaults.low_balance_threshold)?,
            auto_post_on_approval: env_or("AUTO_POST_ON_APPROVAL", defaults.auto_post_on_approval)?,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 8)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            log_level: env_or("LOG_LEVEL", tracing::Level::DEBUG)?,
            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", 1000)?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            leave: LeaveConfig::from_env()?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Parses a comma list such as `sat,sun` or `Friday, Saturday`.
pub fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Weekday>()
                .map_err(|_| anyhow!("unknown weekday {s:?} in WEEKEND_DAYS"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekend_list_accepts_short_and_long_names() {
        let days = parse_weekdays("fri, Saturday").unwrap();
        assert_eq!(days, vec![Weekday::Fri, Weekday::Sat]);
        assert!(parse_weekdays("sat,funday").is_err());
        assert!(parse_weekdays("").unwrap().is_empty());
    }

    #[test]
    fn enforcement_points() {
        let both: CapacityEnforcement = "BOTH".parse().unwrap();
        assert!(both.at_submit() && both.at_approval());
        let approval: CapacityEnforcement = "approval".parse().unwrap();
        assert!(!approval.at_submit());
        assert!(approval.at_approval());
        assert!(!CapacityEnforcement::Off.at_submit());
    }
}
