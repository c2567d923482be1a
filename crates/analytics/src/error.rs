use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Observation window starting at {0} falls outside the supported calendar range")]
    WindowOutOfRange(NaiveDate),
}
