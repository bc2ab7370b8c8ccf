use std::{env, net::SocketAddr, time::Duration};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub list_cache_ttl: Duration,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://trips.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-trips-session-cookie-secret".to_string());

        let list_cache_ttl = Duration::from_secs(parse_number("LIST_CACHE_TTL_SECS", 60 * 60)?);
        let session_ttl = Duration::from_secs(parse_number("SESSION_TTL_HOURS", 24 * 30)? * 60 * 60);

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            list_cache_ttl,
            session_ttl,
        })
    }
}

fn parse_number(name: &str, default: u64) -> Result<u64, AppError> {
    parse_number_value(name, env::var(name).ok(), default)
}

fn parse_number_value(name: &str, raw: Option<String>, default: u64) -> Result<u64, AppError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|err| AppError::Config(format!("invalid {name}: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_number_uses_default() {
        assert_eq!(parse_number_value("X", None, 3600).unwrap(), 3600);
    }

    #[test]
    fn parses_number() {
        assert_eq!(parse_number_value("X", Some(" 60 ".into()), 3600).unwrap(), 60);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_number_value("LIST_CACHE_TTL_SECS", Some("soon".into()), 3600).unwrap_err();
        assert!(err.to_string().contains("LIST_CACHE_TTL_SECS"));
    }
}
