use dotenvy::dotenv;
use std::env;

use crate::attendance::lock::DEFAULT_LOCK_HOUR;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,

    /// Hour (local) after which today's attendance locks.
    pub lock_hour: u32,

    /// Enrollment roster export consumed by the attendance views.
    pub roster_path: String,

    // Rate limiting
    pub rate_write_per_min: u32,
    pub rate_read_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://campops.db?mode=rwc".to_string()),
            lock_hour: env::var("ATTENDANCE_LOCK_HOUR")
                .unwrap_or_else(|_| DEFAULT_LOCK_HOUR.to_string())
                .parse()
                .unwrap(),
            roster_path: env::var("ROSTER_PATH").unwrap_or_else(|_| "data/roster.json".to_string()),

            rate_write_per_min: env::var("RATE_WRITE_PER_MIN")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap(),
            rate_read_per_min: env::var("RATE_READ_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
