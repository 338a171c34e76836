use chrono::{Datelike, Duration, Months, NaiveDate};
use speed_core::{ActionError, Operation, Parameters, param};

use crate::error::ReportError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// An inclusive `[start, end]` date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn day(today: NaiveDate) -> Self {
        Self {
            start: today,
            end: today,
        }
    }

    /// The ISO week (Monday to Sunday) containing `today`.
    pub fn week(today: NaiveDate) -> Result<Self, ReportError> {
        let offset = i64::from(today.weekday().num_days_from_monday());
        let start = today
            .checked_sub_signed(Duration::days(offset))
            .ok_or(ReportError::OutOfRange)?;
        let end = start
            .checked_add_signed(Duration::days(6))
            .ok_or(ReportError::OutOfRange)?;
        Ok(Self { start, end })
    }

    pub fn last_week(today: NaiveDate) -> Result<Self, ReportError> {
        let week_ago = today
            .checked_sub_signed(Duration::days(7))
            .ok_or(ReportError::OutOfRange)?;
        Self::week(week_ago)
    }

    /// First to last day of the calendar month containing `today`.
    pub fn month(today: NaiveDate) -> Result<Self, ReportError> {
        let start = today.with_day(1).ok_or(ReportError::OutOfRange)?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(ReportError::OutOfRange)?;
        Ok(Self { start, end })
    }

    pub fn last_month(today: NaiveDate) -> Result<Self, ReportError> {
        let prev = today
            .with_day(1)
            .and_then(|first| first.pred_opt())
            .ok_or(ReportError::OutOfRange)?;
        Self::month(prev)
    }

    /// Resolve the window an operation asks for.
    ///
    /// Only `date_range` reads parameters (`start_date`, `end_date`); the
    /// other operations are relative to `today`.
    pub fn for_operation(
        operation: Operation,
        parameters: &Parameters,
        today: NaiveDate,
    ) -> Result<Self, ActionError> {
        let window = match operation {
            Operation::DateRange => {
                let start = required_date(parameters, "start_date")?;
                let end = required_date(parameters, "end_date")?;
                Self::new(start, end)?
            }
            Operation::Day => Self::day(today),
            Operation::Week => Self::week(today)?,
            Operation::LastWeek => Self::last_week(today)?,
            Operation::Month => Self::month(today)?,
            Operation::LastMonth => Self::last_month(today)?,
        };
        Ok(window)
    }

    pub fn file_name(&self) -> String {
        if self.start == self.end {
            format!("report_from {}.xlsx", self.start.format(DATE_FORMAT))
        } else {
            format!(
                "report_from {}_to_{}.xlsx",
                self.start.format(DATE_FORMAT),
                self.end.format(DATE_FORMAT)
            )
        }
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ReportError::InvalidDate {
        value: value.to_string(),
    })
}

fn required_date(parameters: &Parameters, key: &str) -> Result<NaiveDate, ActionError> {
    let value = param(parameters, key).ok_or_else(|| ActionError::MissingParameter(key.into()))?;
    Ok(parse_date(value)?)
}
