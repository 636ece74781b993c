//! Quarter window generation
//!
//! Splits an inclusive year range into consecutive 3-month windows starting
//! January 1 of the first year. Each window ends the day before the next one
//! starts; generation stops once a window start reaches January 1 of the year
//! after the last year.

use chrono::{Months, NaiveDate};
use std::fmt;

/// Months per window
const WINDOW_MONTHS: u32 = 3;

/// One quarter-length fetch window, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuarterWindow {
    /// First day of the window
    pub start: NaiveDate,
    /// Last day of the window
    pub end: NaiveDate,
}

impl QuarterWindow {
    /// Start date as `YYYYMMDD`
    pub fn start_stamp(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// End date as `YYYYMMDD`
    pub fn end_stamp(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }

    /// Stable identifier used in file names and the resume manifest
    pub fn id(&self) -> String {
        format!("{}_{}", self.start_stamp(), self.end_stamp())
    }
}

impl fmt::Display for QuarterWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start_stamp(), self.end_stamp())
    }
}

/// Generate the windows covering `[Jan 1 start_year, Dec 31 end_year]`
///
/// Returns an empty list when `start_year > end_year` or either year is
/// outside chrono's calendar range.
pub fn quarter_windows(start_year: i32, end_year: i32) -> Vec<QuarterWindow> {
    let mut windows = Vec::new();
    if start_year > end_year {
        return windows;
    }

    let (Some(mut current), Some(limit)) = (
        NaiveDate::from_ymd_opt(start_year, 1, 1),
        end_year
            .checked_add(1)
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
    ) else {
        return windows;
    };

    while current < limit {
        let Some(next) = current.checked_add_months(Months::new(WINDOW_MONTHS)) else {
            break;
        };
        let Some(end) = next.pred_opt() else {
            break;
        };
        windows.push(QuarterWindow {
            start: current,
            end,
        });
        current = next;
    }

    windows
}
