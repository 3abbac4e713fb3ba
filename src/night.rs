//! Nighttime window
//!
//! A wall-clock interval during which the load is forced off. When the start
//! is not before the end the window is taken to span midnight. Both
//! boundaries are inclusive.

use crate::config::NightConfig;
use crate::error::{Result, SwitcherError};
use chrono::{NaiveTime, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl NightWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build the window from hour/minute configuration
    pub fn from_config(cfg: &NightConfig) -> Result<Self> {
        let start = NaiveTime::from_hms_opt(cfg.start_hour, cfg.start_minute, 0)
            .ok_or_else(|| SwitcherError::invalid("night.start", "Not a valid time of day"))?;
        let end = NaiveTime::from_hms_opt(cfg.end_hour, cfg.end_minute, 0)
            .ok_or_else(|| SwitcherError::invalid("night.end", "Not a valid time of day"))?;
        Ok(Self::new(start, end))
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether `now` falls inside the window
    pub fn is_night(&self, now: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= now && now <= self.end
        } else {
            now >= self.start || now <= self.end
        }
    }
}

/// Wall-clock source for the night check
#[derive(Debug, Clone, Copy)]
pub enum WallClock {
    /// System local time
    Local,
    /// A fixed IANA timezone
    Zone(Tz),
}

impl WallClock {
    /// Empty name selects the system local time
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(WallClock::Local);
        }
        name.parse::<Tz>()
            .map(WallClock::Zone)
            .map_err(|_| SwitcherError::invalid("schedule.timezone", "Unknown timezone name"))
    }

    /// Current time of day
    pub fn now(&self) -> NaiveTime {
        match self {
            WallClock::Local => chrono::Local::now().time(),
            WallClock::Zone(tz) => Utc::now().with_timezone(tz).time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_same_day_window() {
        let w = NightWindow::new(t(1, 0), t(5, 30));
        assert!(w.is_night(t(1, 0)));
        assert!(w.is_night(t(3, 0)));
        assert!(w.is_night(t(5, 30)));
        assert!(!w.is_night(t(5, 31)));
        assert!(!w.is_night(t(0, 59)));
        assert!(!w.is_night(t(23, 0)));
    }

    #[test]
    fn test_end_boundary_is_minute_exact() {
        let w = NightWindow::new(t(22, 0), t(6, 0));
        let just_after = NaiveTime::from_hms_opt(6, 0, 1).unwrap();
        assert!(!w.is_night(just_after));
    }

    #[test]
    fn test_equal_start_and_end_covers_whole_day() {
        let w = NightWindow::new(t(12, 0), t(12, 0));
        assert!(w.is_night(t(0, 0)));
        assert!(w.is_night(t(12, 0)));
        assert!(w.is_night(t(18, 45)));
    }

    #[test]
    fn test_from_config_rejects_bad_hour() {
        let cfg = NightConfig {
            start_hour: 24,
            start_minute: 0,
            end_hour: 6,
            end_minute: 0,
        };
        assert!(NightWindow::from_config(&cfg).is_err());
    }

    #[test]
    fn test_wall_clock_from_name() {
        assert!(matches!(WallClock::from_name("").unwrap(), WallClock::Local));
        assert!(matches!(
            WallClock::from_name("Europe/Vienna").unwrap(),
            WallClock::Zone(_)
        ));
        assert!(WallClock::from_name("Nowhere/Special").is_err());
    }
}
