use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use dotenvy::dotenv;

use crate::services::attendance::AttendancePolicy;
use crate::services::leave::LeavePolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Operating timezone; calendar days and the clock-in window use it
    pub utc_offset: FixedOffset,
    pub clock_in_window_start: NaiveTime,
    pub clock_in_window_end: NaiveTime,
    pub min_session_minutes: i64,
    pub default_work_hours: f64,
    pub max_leave_days: u32,

    pub employee_cache_ttl_secs: u64,
    pub employee_cache_warmup_batch: usize,
}

fn env_or<T>(key: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}"))
}

fn time_or(key: &str, default: &str) -> NaiveTime {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .unwrap_or_else(|e| panic!("{key} must be HH:MM, got '{raw}': {e}"))
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", "1000"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            utc_offset: env_or("UTC_OFFSET", "+00:00"),
            clock_in_window_start: time_or("CLOCK_IN_WINDOW_START", "06:00"),
            clock_in_window_end: time_or("CLOCK_IN_WINDOW_END", "23:00"),
            min_session_minutes: env_or("MIN_SESSION_MINUTES", "10"),
            default_work_hours: env_or("DEFAULT_WORK_HOURS", "8"),
            max_leave_days: env_or("MAX_LEAVE_DAYS", "90"),

            employee_cache_ttl_secs: env_or("EMPLOYEE_CACHE_TTL_SECS", "300"),
            employee_cache_warmup_batch: env_or("EMPLOYEE_CACHE_WARMUP_BATCH", "250"),
        };

        assert!(
            config.clock_in_window_start <= config.clock_in_window_end,
            "CLOCK_IN_WINDOW_START must not be after CLOCK_IN_WINDOW_END"
        );
        config
    }

    pub fn attendance_policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            window_start: self.clock_in_window_start,
            window_end: self.clock_in_window_end,
            min_session: chrono::Duration::minutes(self.min_session_minutes),
            default_work_hours: self.default_work_hours,
        }
    }

    pub fn leave_policy(&self) -> LeavePolicy {
        LeavePolicy {
            max_days: self.max_leave_days,
        }
    }

    pub fn employee_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.employee_cache_ttl_secs)
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            utc_offset: FixedOffset::east_opt(0).unwrap(),
            clock_in_window_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            clock_in_window_end: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            min_session_minutes: 10,
            default_work_hours: 8.0,
            max_leave_days: 90,
            employee_cache_ttl_secs: 60,
            employee_cache_warmup_batch: 10,
        }
    }
}
