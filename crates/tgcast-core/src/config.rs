use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, read from the environment (plus an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // HTTP surface
    pub bind_addr: String,
    pub port: u16,

    // Recipient registry
    pub bots_dir: PathBuf,

    // Telegram Bot API
    pub telegram_api_base: String,
    pub telegram_parse_mode: Option<String>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let cfg = Self::from_lookup(|key| env::var(key).ok())?;

        // Registrations create channel folders lazily, but the root must be writable up front.
        fs::create_dir_all(&cfg.bots_dir)?;

        Ok(cfg)
    }

    /// Build a config from an arbitrary key lookup. `load()` uses the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var::<u16>(&get, "PORT")?.unwrap_or(3000);

        let bots_dir = PathBuf::from(get("BOTS_DIR").unwrap_or_else(|| "./bots".to_string()));

        let telegram_api_base = get("TELEGRAM_API_BASE")
            .unwrap_or_else(|| "https://api.telegram.org".to_string())
            .trim_end_matches('/')
            .to_string();

        // Unset means Markdown (the format operators already rely on); set-but-empty disables.
        let telegram_parse_mode = match lookup("TELEGRAM_PARSE_MODE") {
            None => Some("Markdown".to_string()),
            Some(v) => non_empty(v),
        };

        let request_timeout =
            Duration::from_millis(parse_var::<u64>(&get, "REQUEST_TIMEOUT_MS")?.unwrap_or(10_000));
        if request_timeout.is_zero() {
            return Err(Error::Config(
                "REQUEST_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            port,
            bots_dir,
            telegram_api_base,
            telegram_parse_mode,
            request_timeout,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
