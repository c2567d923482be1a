use crate::error::AnalyticsError;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone};
use core_types::DailyCount;
use serde::{Deserialize, Serialize};

/// A dense day-by-day series over an inclusive date window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHistogram {
    /// `"month/day"` for every day in the window, in order.
    pub labels: Vec<String>,
    /// `raw_values` divided by `max_value`, or all zeros when nothing happened.
    pub values: Vec<f64>,
    #[serde(rename = "rawValues")]
    pub raw_values: Vec<i64>,
    #[serde(rename = "maxValue")]
    pub max_value: i64,
}

/// Returns the inclusive window that starts on the calendar day of
/// `shake_date` (in its own time zone) and ends the day before the same day
/// number one month later.
///
/// A day number the next month does not have rolls over into the month after
/// it (Jan 31 + 1 month is Mar 2 or Mar 3), so the window always spans as many
/// days as the starting month has.
pub fn observation_window<Tz: TimeZone>(
    shake_date: DateTime<Tz>,
) -> Result<(NaiveDate, NaiveDate), AnalyticsError> {
    let start = shake_date.date_naive();
    let end = start
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next_first| next_first.checked_add_days(Days::new(u64::from(start.day0()))))
        .and_then(|same_day_next_month| same_day_next_month.pred_opt())
        .ok_or(AnalyticsError::WindowOutOfRange(start))?;
    Ok((start, end))
}

/// Spreads sparse `(day, count)` rows over the window `[start, end]`.
///
/// Each row overwrites its slot; when two rows land on the same day the later
/// one wins. Rows outside the window are ignored.
pub fn bucket(start: NaiveDate, end: NaiveDate, rows: &[DailyCount]) -> DailyHistogram {
    let days = usize::try_from((end - start).num_days() + 1).unwrap_or(0);

    let mut raw_values = vec![0_i64; days];
    for row in rows {
        let offset = (row.day - start).num_days();
        if let Some(slot) = usize::try_from(offset).ok().and_then(|idx| raw_values.get_mut(idx)) {
            *slot = row.count;
        }
    }

    let labels = (0..days)
        .filter_map(|offset| start.checked_add_days(Days::new(offset as u64)))
        .map(|day| format!("{}/{}", day.month(), day.day()))
        .collect();

    let max_value = raw_values.iter().copied().max().unwrap_or(0).max(0);
    let values = raw_values
        .iter()
        .map(|&raw| {
            if max_value > 0 {
                raw as f64 / max_value as f64
            } else {
                0.0
            }
        })
        .collect();

    DailyHistogram {
        labels,
        values,
        raw_values,
        max_value,
    }
}
