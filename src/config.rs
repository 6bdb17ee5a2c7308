use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: u64,
    pub backend_timeout_secs: u64,
    pub page_size: u32,
    pub max_pages: u32,
    pub appointments_path: String,
    pub patients_path: String,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url = env::var("BACKEND_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = parsed_or("SESSION_TTL_HOURS", 24);
        let backend_timeout_secs = parsed_or("BACKEND_TIMEOUT_SECS", 15);
        // zero would make refresh fetch nothing
        let page_size = parsed_or("PAGE_SIZE", 100).max(1);
        let max_pages = parsed_or("MAX_PAGES", 50).max(1);
        let appointments_path =
            env::var("APPOINTMENTS_PATH").unwrap_or_else(|_| "/citas".to_string());
        let patients_path = env::var("PATIENTS_PATH").unwrap_or_else(|_| "/pacientes".to_string());

        Ok(Self {
            backend_url,
            bind_addr,
            session_ttl_hours,
            backend_timeout_secs,
            page_size,
            max_pages,
            appointments_path,
            patients_path,
        })
    }

    /// Idle lifetime of a page session, at least one hour.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours.max(1).saturating_mul(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_ttl(hours: u64) -> Config {
        Config {
            backend_url: "http://backend".into(),
            bind_addr: "127.0.0.1:0".into(),
            session_ttl_hours: hours,
            backend_timeout_secs: 15,
            page_size: 100,
            max_pages: 50,
            appointments_path: "/citas".into(),
            patients_path: "/pacientes".into(),
        }
    }

    #[test]
    fn session_ttl_is_clamped() {
        assert_eq!(with_ttl(24).session_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(with_ttl(0).session_ttl(), Duration::from_secs(3600));
        assert_eq!(with_ttl(u64::MAX).session_ttl(), Duration::from_secs(u64::MAX));
    }
}
