use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::info;
use time::format_description;
use time::UtcOffset;

use crate::error::{HubError, HubResult};
use crate::sensors::DEFAULT_SEED;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub listen_addr: String,
    pub ws_path: String,
    pub hub_name: String,
    pub save_interval_minutes: u8,
    pub history_capacity: usize,
    pub update_interval: Duration,
    pub tick_rate_hz: u32,
    pub sample_interval: Duration,
    pub max_connections: usize,
    pub utc_offset: UtcOffset,
    /// Simulated source reports a fault every n polls; 0 disables
    pub sim_fault_every: u64,
    pub sim_seed: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            listen_addr: "0.0.0.0:8080".to_string(),
            ws_path: "/sensors".to_string(),
            hub_name: "SensorHub".to_string(),
            save_interval_minutes: 1,
            history_capacity: 180,
            update_interval: Duration::from_millis(1000),
            tick_rate_hz: 50,
            sample_interval: Duration::from_millis(100),
            max_connections: 8,
            utc_offset: UtcOffset::UTC,
            sim_fault_every: 0,
            sim_seed: DEFAULT_SEED,
        }
    }
}

impl HubConfig {
    pub fn new() -> HubResult<Self> {
        // Load environment variables
        dotenv::dotenv().ok();

        let config = Self::from_vars(|key| env::var(key).ok())?;
        info!(
            "Configuration: listen={} path={} save every {} min, history {} records, tick {} Hz",
            config.listen_addr,
            config.ws_path,
            config.save_interval_minutes,
            config.history_capacity,
            config.tick_rate_hz
        );
        Ok(config)
    }

    /// Build a configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_vars<F>(lookup: F) -> HubResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = HubConfig::default();

        let listen_addr = lookup("LISTEN_ADDR").unwrap_or(defaults.listen_addr);
        let ws_path = lookup("WS_PATH").unwrap_or(defaults.ws_path);
        if !ws_path.starts_with('/') {
            return Err(HubError::Config(format!(
                "WS_PATH must start with '/', got '{}'",
                ws_path
            )));
        }
        let hub_name = lookup("HUB_NAME").unwrap_or(defaults.hub_name);

        let save_interval_minutes = parse_or(
            &lookup,
            "SAVE_INTERVAL_MINUTES",
            defaults.save_interval_minutes,
        )?;
        if !(1..=60).contains(&save_interval_minutes) {
            return Err(HubError::Config(format!(
                "SAVE_INTERVAL_MINUTES must be within 1..=60, got {}",
                save_interval_minutes
            )));
        }

        let history_capacity = parse_or(&lookup, "HISTORY_CAPACITY", defaults.history_capacity)?;
        if history_capacity == 0 {
            return Err(HubError::Config("HISTORY_CAPACITY must be positive".into()));
        }

        let update_interval_ms = parse_or(
            &lookup,
            "UPDATE_INTERVAL_MS",
            defaults.update_interval.as_millis() as u64,
        )?;

        let tick_rate_hz = parse_or(&lookup, "TICK_RATE_HZ", defaults.tick_rate_hz)?;
        if !(1..=1000).contains(&tick_rate_hz) {
            return Err(HubError::Config(format!(
                "TICK_RATE_HZ must be within 1..=1000, got {}",
                tick_rate_hz
            )));
        }

        let sample_interval_ms = parse_or(
            &lookup,
            "SAMPLE_INTERVAL_MS",
            defaults.sample_interval.as_millis() as u64,
        )?;
        if sample_interval_ms == 0 {
            return Err(HubError::Config("SAMPLE_INTERVAL_MS must be positive".into()));
        }

        let max_connections = parse_or(&lookup, "MAX_CONNECTIONS", defaults.max_connections)?;
        if max_connections == 0 {
            return Err(HubError::Config("MAX_CONNECTIONS must be positive".into()));
        }

        let utc_offset = match lookup("UTC_OFFSET") {
            Some(raw) => parse_offset(&raw)?,
            None => defaults.utc_offset,
        };

        let sim_fault_every = parse_or(&lookup, "SIM_FAULT_EVERY", defaults.sim_fault_every)?;
        let sim_seed = parse_or(&lookup, "SIM_SEED", defaults.sim_seed)?;

        Ok(HubConfig {
            listen_addr,
            ws_path,
            hub_name,
            save_interval_minutes,
            history_capacity,
            update_interval: Duration::from_millis(update_interval_ms),
            tick_rate_hz,
            sample_interval: Duration::from_millis(sample_interval_ms),
            max_connections,
            utc_offset,
            sim_fault_every,
            sim_seed,
        })
    }

    /// Scheduler period derived from the tick rate
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> HubResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| HubError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_offset(raw: &str) -> HubResult<UtcOffset> {
    let format = format_description::parse("[offset_hour sign:mandatory]:[offset_minute]")
        .map_err(|e| HubError::Config(format!("offset format error: {}", e)))?;
    UtcOffset::parse(raw.trim(), &format)
        .map_err(|e| HubError::Config(format!("UTC_OFFSET has invalid value '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> HubResult<HubConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HubConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.ws_path, "/sensors");
        assert_eq!(config.history_capacity, 180);
        assert_eq!(config.save_interval_minutes, 1);
        assert_eq!(config.update_interval, Duration::from_millis(1000));
        assert_eq!(config.tick_period(), Duration::from_millis(20));
        assert_eq!(config.utc_offset, UtcOffset::UTC);
        assert_eq!(config.sim_fault_every, 0);
        assert_eq!(config.sim_seed, DEFAULT_SEED);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("HISTORY_CAPACITY", "3"),
            ("SAVE_INTERVAL_MINUTES", "5"),
            ("UTC_OFFSET", "+01:00"),
            ("MAX_CONNECTIONS", "2"),
            ("SIM_FAULT_EVERY", "25"),
            ("SIM_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.history_capacity, 3);
        assert_eq!(config.save_interval_minutes, 5);
        assert_eq!(config.utc_offset.whole_hours(), 1);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.sim_fault_every, 25);
        assert_eq!(config.sim_seed, 42);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config_from(&[("HISTORY_CAPACITY", "zero")]).is_err());
        assert!(config_from(&[("HISTORY_CAPACITY", "0")]).is_err());
        assert!(config_from(&[("SAVE_INTERVAL_MINUTES", "61")]).is_err());
        assert!(config_from(&[("TICK_RATE_HZ", "0")]).is_err());
        assert!(config_from(&[("WS_PATH", "sensors")]).is_err());
        assert!(config_from(&[("UTC_OFFSET", "CET")]).is_err());
        assert!(config_from(&[("SIM_FAULT_EVERY", "-1")]).is_err());
    }
}
