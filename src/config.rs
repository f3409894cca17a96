use serde::Deserialize;
use std::path::PathBuf;

/// Default request body cap (1 MiB). Lead forms are a few hundred bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub debug: bool,
    pub leads_json_path: PathBuf,
    pub leads_csv_path: PathBuf,
    pub static_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: parse_port(std::env::var("PORT").ok().as_deref())?,
            debug: parse_debug_flag(std::env::var("DEBUG").ok().as_deref()),
            leads_json_path: path_var("LEADS_JSON_PATH", "leads.json")?,
            leads_csv_path: path_var("LEADS_CSV_PATH", "leads.csv")?,
            static_dir: path_var("STATIC_DIR", "public")?,
            max_body_bytes: parse_max_body_bytes(std::env::var("MAX_BODY_BYTES").ok().as_deref())?,
        };

        Ok(config)
    }

    /// Log the loaded settings. Called once tracing is up, since the log
    /// filter itself depends on `debug`.
    pub fn log_summary(&self) {
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", self.port);
        tracing::debug!("Debug mode: {}", self.debug);
        tracing::debug!("Leads JSON file: {}", self.leads_json_path.display());
        tracing::debug!("Leads CSV file: {}", self.leads_csv_path.display());
        tracing::debug!("Static directory: {}", self.static_dir.display());
    }
}

/// `PORT`, defaulting to 5000.
pub fn parse_port(raw: Option<&str>) -> anyhow::Result<u16> {
    raw.unwrap_or("5000")
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))
        .and_then(|port: u16| {
            if port == 0 {
                anyhow::bail!("PORT must be a valid number between 1-65535");
            }
            Ok(port)
        })
}

/// `MAX_BODY_BYTES`, defaulting to 1 MiB.
pub fn parse_max_body_bytes(raw: Option<&str>) -> anyhow::Result<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_BODY_BYTES);
    };
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))
        .and_then(|n: usize| {
            if n == 0 {
                anyhow::bail!("MAX_BODY_BYTES cannot be zero");
            }
            Ok(n)
        })
}

/// `DEBUG` is on unless set to something other than "true" (any case).
pub fn parse_debug_flag(raw: Option<&str>) -> bool {
    raw.map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(true)
}

fn path_var(name: &str, default: &str) -> anyhow::Result<PathBuf> {
    match std::env::var(name) {
        Ok(value) => {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(PathBuf::from(value))
        }
        Err(_) => Ok(PathBuf::from(default)),
    }
}
