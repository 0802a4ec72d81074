use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Source of "now" in the operating timezone. Handlers read it once at the
/// request boundary and pass the value down.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Settable clock for tests.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<FixedOffset>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(rfc3339: &str) -> Self {
        Self {
            now: std::sync::Mutex::new(DateTime::parse_from_rfc3339(rfc3339).unwrap()),
        }
    }

    pub fn set(&self, rfc3339: &str) {
        *self.now.lock().unwrap() = DateTime::parse_from_rfc3339(rfc3339).unwrap();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap()
    }
}
