use std::net::IpAddr;
use std::str::FromStr;

use chrono::FixedOffset;
use zreport_core::report::{TrendWindow, DEFAULT_TREND_WEEKS};
use zreport_core::source::DEFAULT_EVENT_CACHE_TTL_SECS;
use zreport_zabbix::auth::DEFAULT_REPORT_GROUP;
use zreport_zabbix::client::DEFAULT_TIMEOUT_SECS;
use zreport_zabbix::AuthMode;

/// Message shown while the dashboard is in maintenance mode.
pub const DEFAULT_MAINTENANCE_MESSAGE: &str = "Zabbix is under maintenance.";

/// Default lifetime of a login session, in minutes.
pub const DEFAULT_SESSION_TTL_MINS: i64 = 480;
/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_MINS: i64 = 525_600;

/// Errors raised while loading [`ServerConfig`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for the Zabbix frontend.
#[derive(Clone)]
pub struct ZabbixConfig {
    /// Frontend base URL (the JSON-RPC path is appended by the client).
    pub url: String,
    /// Shared API token. Required unless users log in interactively.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ZabbixConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZabbixConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Frontend maintenance switch.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceConfig {
    /// When set, every route except `/health` answers 503.
    pub deny_access: bool,
    /// Peers still let through while `deny_access` is set.
    pub allowed_ips: Vec<IpAddr>,
    pub message: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub zabbix: ZabbixConfig,
    pub auth_mode: AuthMode,
    /// Group an interactive user must belong to.
    pub report_group: String,
    pub session_ttl_mins: i64,
    pub event_cache_ttl_secs: u64,
    pub trend: TrendWindow,
    /// Offset from UTC at which report days start.
    pub utc_offset: FixedOffset,
    pub maintenance: MaintenanceConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `ZABBIX_URL`                 | **required**               |
    /// | `ZABBIX_TOKEN`               | required unless `AUTH_MODE=zabbix` |
    /// | `ZABBIX_TIMEOUT_SECS`        | `30`                       |
    /// | `AUTH_MODE`                  | unset                      |
    /// | `REPORT_GROUP`               | `reports`                  |
    /// | `SESSION_TTL_MINS`           | `480`                      |
    /// | `EVENT_CACHE_TTL_SECS`       | `6000`                     |
    /// | `TREND_WEEKS`                | `10`                       |
    /// | `TREND_INCLUDE_CURRENT_WEEK` | `false`                    |
    /// | `REPORT_UTC_OFFSET_MINUTES`  | `0`                        |
    /// | `DENY_GUI_ACCESS`            | `false`                    |
    /// | `GUI_ACCESS_IP_RANGE`        | empty                      |
    /// | `GUI_WARNING_MSG`            | built-in message           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or("PORT", var("PORT"), 3000u16)?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs =
            parse_or("REQUEST_TIMEOUT_SECS", var("REQUEST_TIMEOUT_SECS"), 30u64)?;

        let auth_mode = match var("AUTH_MODE") {
            None => AuthMode::Unset,
            Some(value) => AuthMode::from_str(&value).map_err(|reason| ConfigError::Invalid {
                var: "AUTH_MODE",
                value,
                reason,
            })?,
        };

        let url = var("ZABBIX_URL").ok_or(ConfigError::Missing("ZABBIX_URL"))?;
        let token = var("ZABBIX_TOKEN");
        if token.is_none() && auth_mode != AuthMode::Interactive {
            return Err(ConfigError::Missing("ZABBIX_TOKEN"));
        }
        let zabbix = ZabbixConfig {
            url,
            token,
            timeout_secs: parse_or(
                "ZABBIX_TIMEOUT_SECS",
                var("ZABBIX_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?,
        };

        let report_group = var("REPORT_GROUP").unwrap_or_else(|| DEFAULT_REPORT_GROUP.into());
        let session_ttl_mins = parse_or(
            "SESSION_TTL_MINS",
            var("SESSION_TTL_MINS"),
            DEFAULT_SESSION_TTL_MINS,
        )?;
        if !(1..=MAX_SESSION_TTL_MINS).contains(&session_ttl_mins) {
            return Err(ConfigError::Invalid {
                var: "SESSION_TTL_MINS",
                value: session_ttl_mins.to_string(),
                reason: format!("must be between 1 and {MAX_SESSION_TTL_MINS}"),
            });
        }
        let event_cache_ttl_secs = parse_or(
            "EVENT_CACHE_TTL_SECS",
            var("EVENT_CACHE_TTL_SECS"),
            DEFAULT_EVENT_CACHE_TTL_SECS,
        )?;

        let trend = TrendWindow {
            weeks: parse_or("TREND_WEEKS", var("TREND_WEEKS"), DEFAULT_TREND_WEEKS)?,
            include_current: parse_bool(
                "TREND_INCLUDE_CURRENT_WEEK",
                var("TREND_INCLUDE_CURRENT_WEEK"),
            )?,
        };
        if trend.weeks == 0 {
            return Err(ConfigError::Invalid {
                var: "TREND_WEEKS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let offset_minutes: i32 = parse_or(
            "REPORT_UTC_OFFSET_MINUTES",
            var("REPORT_UTC_OFFSET_MINUTES"),
            0,
        )?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                var: "REPORT_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
                reason: "must be within +/- 24 hours".into(),
            })?;

        let maintenance = MaintenanceConfig {
            deny_access: parse_bool("DENY_GUI_ACCESS", var("DENY_GUI_ACCESS"))?,
            allowed_ips: match var("GUI_ACCESS_IP_RANGE") {
                Some(raw) => parse_ip_list(&raw)?,
                None => Vec::new(),
            },
            message: var("GUI_WARNING_MSG").unwrap_or_else(|| DEFAULT_MAINTENANCE_MESSAGE.into()),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            zabbix,
            auth_mode,
            report_group,
            session_ttl_mins,
            event_cache_ttl_secs,
            trend,
            utc_offset,
            maintenance,
        })
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected true or false".into(),
        }),
    }
}

/// Parse the allow list: a JSON array of addresses. Single quotes are
/// accepted in place of double quotes.
fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "GUI_ACCESS_IP_RANGE",
        value: raw.to_string(),
        reason,
    };

    let entries: Vec<String> =
        serde_json::from_str(&raw.replace('\'', "\"")).map_err(|e| invalid(e.to_string()))?;

    entries
        .iter()
        .map(|ip| {
            ip.trim()
                .parse::<IpAddr>()
                .map_err(|e| invalid(format!("'{ip}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[("ZABBIX_URL", "http://zbx"), ("ZABBIX_TOKEN", "tok")];

    #[test]
    fn defaults_apply() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, ["http://localhost:5173"]);
        assert_eq!(config.auth_mode, AuthMode::Unset);
        assert_eq!(config.report_group, "reports");
        assert_eq!(config.event_cache_ttl_secs, 6000);
        assert_eq!(config.trend, TrendWindow::default());
        assert_eq!(config.zabbix.timeout_secs, 30);
        assert!(!config.maintenance.deny_access);
        assert_eq!(config.maintenance.message, DEFAULT_MAINTENANCE_MESSAGE);
    }

    #[test]
    fn zabbix_url_is_required() {
        assert_matches!(
            load(&[("ZABBIX_TOKEN", "tok")]),
            Err(ConfigError::Missing("ZABBIX_URL"))
        );
    }

    #[test]
    fn token_is_optional_only_for_interactive_mode() {
        assert_matches!(
            load(&[("ZABBIX_URL", "http://zbx")]),
            Err(ConfigError::Missing("ZABBIX_TOKEN"))
        );
        assert_matches!(
            load(&[("ZABBIX_URL", "http://zbx"), ("AUTH_MODE", "external")]),
            Err(ConfigError::Missing("ZABBIX_TOKEN"))
        );
        let config = load(&[("ZABBIX_URL", "http://zbx"), ("AUTH_MODE", "zabbix")]).unwrap();
        assert_eq!(config.auth_mode, AuthMode::Interactive);
        assert!(config.zabbix.token.is_none());
    }

    #[test]
    fn unknown_auth_mode_is_rejected() {
        let mut env = MINIMAL.to_vec();
        env.push(("AUTH_MODE", "ldap"));
        assert_matches!(load(&env), Err(ConfigError::Invalid { var: "AUTH_MODE", .. }));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut env = MINIMAL.to_vec();
        env.push(("PORT", "eighty"));
        assert_matches!(load(&env), Err(ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn trend_settings_are_read() {
        let mut env = MINIMAL.to_vec();
        env.push(("TREND_WEEKS", "4"));
        env.push(("TREND_INCLUDE_CURRENT_WEEK", "true"));
        let config = load(&env).unwrap();
        assert_eq!(config.trend.weeks, 4);
        assert!(config.trend.include_current);
    }

    #[test]
    fn session_ttl_is_bounded() {
        let with_ttl = |ttl: &'static str| {
            let mut env = MINIMAL.to_vec();
            env.push(("SESSION_TTL_MINS", ttl));
            load(&env)
        };
        assert_eq!(with_ttl("45").unwrap().session_ttl_mins, 45);
        assert_eq!(with_ttl("525600").unwrap().session_ttl_mins, 525_600);

        for bad in ["0", "-5", "525601", "9223372036854775807"] {
            assert_matches!(
                with_ttl(bad),
                Err(ConfigError::Invalid { var: "SESSION_TTL_MINS", .. })
            );
        }
    }

    #[test]
    fn utc_offset_is_bounded() {
        let mut env = MINIMAL.to_vec();
        env.push(("REPORT_UTC_OFFSET_MINUTES", "120"));
        assert_eq!(load(&env).unwrap().utc_offset.local_minus_utc(), 7200);

        let mut env = MINIMAL.to_vec();
        env.push(("REPORT_UTC_OFFSET_MINUTES", "100000"));
        assert!(load(&env).is_err());
    }

    #[test]
    fn maintenance_allow_list_accepts_single_quotes() {
        let mut env = MINIMAL.to_vec();
        env.push(("DENY_GUI_ACCESS", "1"));
        env.push(("GUI_ACCESS_IP_RANGE", "['127.0.0.1', '10.0.0.5']"));
        env.push(("GUI_WARNING_MSG", "Back soon"));
        let config = load(&env).unwrap();
        assert!(config.maintenance.deny_access);
        assert_eq!(config.maintenance.allowed_ips.len(), 2);
        assert_eq!(config.maintenance.message, "Back soon");
    }

    #[test]
    fn malformed_allow_list_is_rejected() {
        let mut env = MINIMAL.to_vec();
        env.push(("GUI_ACCESS_IP_RANGE", "['not-an-ip']"));
        assert_matches!(
            load(&env),
            Err(ConfigError::Invalid { var: "GUI_ACCESS_IP_RANGE", .. })
        );
    }
}
