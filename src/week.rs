//! Week range computation.
//!
//! Reporting periods are Monday-to-Sunday weeks. Boundaries are computed
//! in UTC; callers needing different boundaries pass explicit instants.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

/// A Monday-to-Sunday reporting period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRange {
    /// Human label ("This week", "Last week", "Week of May 5").
    pub label: String,
    /// Monday 00:00:00.000 UTC.
    pub start: DateTime<Utc>,
    /// Sunday 23:59:59.999 UTC.
    pub end: DateTime<Utc>,
}

impl WeekRange {
    fn from_monday(monday: NaiveDate, weeks_back: usize) -> Self {
        let start = monday.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(7) - Duration::milliseconds(1);

        let label = match weeks_back {
            0 => "This week".to_string(),
            1 => "Last week".to_string(),
            _ => format!("Week of {}", monday.format("%b %-d")),
        };

        WeekRange { label, start, end }
    }
}

/// Returns the last `count` week ranges, most recent first.
pub fn recent_weeks(count: usize) -> Vec<WeekRange> {
    recent_weeks_from(Utc::now(), count)
}

/// Returns the range `weeks_back` weeks before the current one
/// (0 = the week containing today).
pub fn nth_recent_week(weeks_back: usize) -> WeekRange {
    nth_recent_week_from(Utc::now(), weeks_back)
}

fn recent_weeks_from(now: DateTime<Utc>, count: usize) -> Vec<WeekRange> {
    (0..count).map(|i| nth_recent_week_from(now, i)).collect()
}

fn nth_recent_week_from(now: DateTime<Utc>, weeks_back: usize) -> WeekRange {
    let today = now.date_naive();
    let this_monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let monday = this_monday - Duration::weeks(weeks_back as i64);
    WeekRange::from_monday(monday, weeks_back)
}
