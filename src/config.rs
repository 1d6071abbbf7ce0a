//! Server configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_STROKE_POINTS: usize = 10_000;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory served as the HTTP fallback (the browser client).
    pub static_dir: Option<PathBuf>,
    /// Per-stroke cap on accumulated points.
    pub max_stroke_points: usize,
    /// Bounded outbound queue per connection.
    pub client_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: None,
            max_stroke_points: DEFAULT_MAX_STROKE_POINTS,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: default `0.0.0.0`
    /// - `PORT`: default 3000
    /// - `STATIC_DIR`: no static files served when absent
    /// - `MAX_STROKE_POINTS`: default 10000, must be positive
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256, must be positive
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a non-blank variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let static_dir = lookup("STATIC_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);
        let max_stroke_points = parse_positive(&lookup, "MAX_STROKE_POINTS", DEFAULT_MAX_STROKE_POINTS)?;
        let client_channel_capacity =
            parse_positive(&lookup, "CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY)?;

        Ok(Self { host, port, static_dir, max_stroke_points, client_channel_capacity })
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let Some(raw) = lookup(var).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    let parsed = raw.trim().parse::<T>();
    parsed.map_err(|_| ConfigError::Invalid { var, value: raw })
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    let value = parse_var(lookup, var, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid { var, value: "0".into() });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
