use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    /// Token lifetime in seconds, shared by bearer tokens and the session cookie.
    pub jwt_expires_in: i64,
    pub session_cookie_name: String,
    pub cookie_secure: bool,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_expires_in: i64 = var("JWT_EXPIRES_IN")
            .unwrap_or_else(|| "604800".to_string()) // 7 days
            .parse()
            .context("JWT_EXPIRES_IN must be a number of seconds")?;
        if jwt_expires_in <= 0 {
            anyhow::bail!("JWT_EXPIRES_IN must be positive");
        }

        Ok(Self {
            database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expires_in,
            session_cookie_name: var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| "planit_session".to_string()),
            cookie_secure: match var("COOKIE_SECURE").as_deref() {
                None => true,
                Some(v) => parse_bool(v).context("COOKIE_SECURE must be a boolean")?,
            },
            port: var("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/planit"), ("JWT_SECRET", "s")])
            .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_expires_in, 604_800);
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.session_cookie_name, "planit_session");
        assert!(config.cookie_secure);
    }

    #[test]
    fn required_values_are_reported() {
        let err = load(&[("JWT_SECRET", "s")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "  ")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("PORT", "8081"),
            ("JWT_EXPIRES_IN", "3600"),
            ("COOKIE_SECURE", "off"),
            ("SESSION_COOKIE_NAME", "sid"),
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.jwt_expires_in, 3600);
        assert!(!config.cookie_secure);
        assert_eq!(config.session_cookie_name, "sid");
    }

    #[test]
    fn bad_numbers_fail() {
        assert!(load(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("PORT", "http")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("JWT_EXPIRES_IN", "0")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("JWT_SECRET", "s"), ("COOKIE_SECURE", "maybe")]).is_err());
    }
}
