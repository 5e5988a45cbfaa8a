use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A pre-vetted test identity that receives a fixed low verdict instead of
/// live scoring. Loaded from configuration at startup; never embedded in
/// scoring code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedIdentity {
    pub name: String,
    pub mobile: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_host: String,
    pub api_port: u16,
    pub cors_origin: String,
    pub workers: usize,
    pub carrier_data_path: String,
    pub session_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
    pub starting_balance: Decimal,
    pub decoy_balance: Decimal,
    pub trusted_identities: Vec<TrustedIdentity>,
    pub trusted_identity_score: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_host: "0.0.0.0".to_string(),
            api_port: 5000,
            cors_origin: "*".to_string(),
            workers: 4,
            carrier_data_path: "data/telecom_mock_data.json".to_string(),
            session_ttl_minutes: 30,
            sweep_interval_secs: 60,
            starting_balance: dec!(50000),
            decoy_balance: dec!(245000),
            trusted_identities: Vec::new(),
            trusted_identity_score: 10,
        }
    }
}

/// Load configuration: defaults, then an optional `key=value` file, then
/// environment variable overrides.
pub fn load_config(config_file: Option<&Path>) -> Result<Settings> {
    dotenv::dotenv().ok();

    let mut settings = Settings::default();

    if let Some(path) = config_file {
        load_from_file(&mut settings, path)?;
    }

    load_from_env(&mut settings);

    Ok(settings)
}

fn load_from_env(settings: &mut Settings) {
    if let Ok(host) = env::var("API_HOST") {
        settings.api_host = host;
    }

    if let Ok(port) = env::var("API_PORT") {
        if let Ok(port) = port.parse() {
            settings.api_port = port;
        }
    }

    if let Ok(origin) = env::var("CORS_ORIGIN") {
        settings.cors_origin = origin;
    }

    if let Ok(workers) = env::var("API_WORKERS") {
        if let Ok(workers) = workers.parse() {
            settings.workers = workers;
        }
    }

    if let Ok(path) = env::var("CARRIER_DATA_PATH") {
        settings.carrier_data_path = path;
    }

    if let Ok(minutes) = env::var("SESSION_TTL_MINUTES") {
        if let Ok(minutes) = minutes.parse() {
            settings.session_ttl_minutes = minutes;
        }
    }

    if let Ok(secs) = env::var("SWEEP_INTERVAL_SECS") {
        if let Ok(secs) = secs.parse() {
            settings.sweep_interval_secs = secs;
        }
    }

    if let Ok(balance) = env::var("STARTING_BALANCE") {
        if let Ok(balance) = balance.parse() {
            settings.starting_balance = balance;
        }
    }

    if let Ok(balance) = env::var("DECOY_BALANCE") {
        if let Ok(balance) = balance.parse() {
            settings.decoy_balance = balance;
        }
    }

    if let Ok(list) = env::var("TRUSTED_IDENTITIES") {
        settings.trusted_identities = parse_trusted_identities(&list);
    }

    if let Ok(score) = env::var("TRUSTED_IDENTITY_SCORE") {
        if let Ok(score) = score.parse() {
            settings.trusted_identity_score = score;
        }
    }
}

/// Load configuration from a `key=value` file.
fn load_from_file(settings: &mut Settings, path: &Path) -> Result<()> {
    let file = File::open(path).context("Failed to open configuration file")?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line.context("Failed to read line from configuration file")?;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(index) = line.find('=') {
            let key = line[..index].trim();
            let value = line[index + 1..].trim();

            match key {
                "API_HOST" => settings.api_host = value.to_string(),
                "API_PORT" => {
                    if let Ok(port) = value.parse() {
                        settings.api_port = port;
                    }
                }
                "CORS_ORIGIN" => settings.cors_origin = value.to_string(),
                "API_WORKERS" => {
                    if let Ok(workers) = value.parse() {
                        settings.workers = workers;
                    }
                }
                "CARRIER_DATA_PATH" => settings.carrier_data_path = value.to_string(),
                "SESSION_TTL_MINUTES" => {
                    if let Ok(minutes) = value.parse() {
                        settings.session_ttl_minutes = minutes;
                    }
                }
                "SWEEP_INTERVAL_SECS" => {
                    if let Ok(secs) = value.parse() {
                        settings.sweep_interval_secs = secs;
                    }
                }
                "STARTING_BALANCE" => {
                    if let Ok(balance) = value.parse() {
                        settings.starting_balance = balance;
                    }
                }
                "DECOY_BALANCE" => {
                    if let Ok(balance) = value.parse() {
                        settings.decoy_balance = balance;
                    }
                }
                "TRUSTED_IDENTITIES" => {
                    settings.trusted_identities = parse_trusted_identities(value);
                }
                "TRUSTED_IDENTITY_SCORE" => {
                    if let Ok(score) = value.parse() {
                        settings.trusted_identity_score = score;
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Allow-list format: comma-separated `name:mobile` pairs, e.g.
/// `Demo User:9999900001,QA Account:9999900002`.
fn parse_trusted_identities(value: &str) -> Vec<TrustedIdentity> {
    value
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            let (name, mobile) = entry.rsplit_once(':')?;
            let name = name.trim();
            let mobile = mobile.trim();
            if name.is_empty() || mobile.is_empty() {
                return None;
            }
            Some(TrustedIdentity {
                name: name.to_string(),
                mobile: mobile.to_string(),
            })
        })
        .collect()
}
