use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, FieldError};

/// Longest custom range a report may ask for.
pub const MAX_CUSTOM_RANGE_DAYS: i64 = 366;

/// Query dates outside these years are rejected.
pub const MIN_QUERY_YEAR: i32 = 1970;
pub const MAX_QUERY_YEAR: i32 = 9999;

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Seven days starting on the Sunday on or before `date`. `None` at the
    /// edges of the representable calendar.
    pub fn week_of(date: NaiveDate) -> Option<Self> {
        let start = date.checked_sub_signed(Duration::days(i64::from(
            date.weekday().num_days_from_sunday(),
        )))?;
        let end = start.checked_add_signed(Duration::days(6))?;
        Some(Self { start, end })
    }

    /// The calendar month holding `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.day0()));
        // day zero of next month
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Days of `[start, end]` that fall inside this range.
    pub fn overlap_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let from = start.max(self.start);
        let to = end.min(self.end);
        if from > to { 0 } else { (to - from).num_days() + 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Today,
    Week,
    #[default]
    Month,
    Custom,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// today | week | month | custom (default month)
    #[param(value_type = Option<String>, example = "week")]
    pub range: Option<RangeKind>,
    /// Anchor day for today/week/month; defaults to the current day
    #[param(value_type = Option<String>, example = "2026-01-15")]
    pub date: Option<NaiveDate>,
    /// Custom range start
    #[param(value_type = Option<String>, example = "2026-01-01")]
    pub start: Option<NaiveDate>,
    /// Custom range end (inclusive)
    #[param(value_type = Option<String>, example = "2026-01-31")]
    pub end: Option<NaiveDate>,
}

fn in_query_bounds(date: NaiveDate) -> bool {
    (MIN_QUERY_YEAR..=MAX_QUERY_YEAR).contains(&date.year())
}

impl RangeQuery {
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, AppError> {
        let fields = [("date", self.date), ("start", self.start), ("end", self.end)];
        let out_of_bounds: Vec<FieldError> = fields
            .into_iter()
            .filter(|(_, value)| value.is_some_and(|date| !in_query_bounds(date)))
            .map(|(field, _)| {
                FieldError::new(
                    field,
                    format!("must fall between the years {MIN_QUERY_YEAR} and {MAX_QUERY_YEAR}"),
                )
            })
            .collect();
        if !out_of_bounds.is_empty() {
            return Err(AppError::Validation(out_of_bounds));
        }

        let anchor = self.date.unwrap_or(today);
        match self.range.unwrap_or_default() {
            RangeKind::Today => Ok(DateRange::day(anchor)),
            RangeKind::Week => DateRange::week_of(anchor).ok_or_else(|| {
                AppError::Validation(vec![FieldError::new("date", "no full week around this date")])
            }),
            RangeKind::Month => Ok(DateRange::month_of(anchor)),
            RangeKind::Custom => {
                let mut errors = Vec::new();
                if self.start.is_none() {
                    errors.push(FieldError::new("start", "required for a custom range"));
                }
                if self.end.is_none() {
                    errors.push(FieldError::new("end", "required for a custom range"));
                }
                let (Some(start), Some(end)) = (self.start, self.end) else {
                    return Err(AppError::Validation(errors));
                };
                let range = DateRange::new(start, end).ok_or_else(|| {
                    AppError::Validation(vec![FieldError::new("end", "must not be before start")])
                })?;
                if range.days() > MAX_CUSTOM_RANGE_DAYS {
                    return Err(AppError::Validation(vec![FieldError::new(
                        "end",
                        format!("custom ranges are limited to {MAX_CUSTOM_RANGE_DAYS} days"),
                    )]));
                }
                Ok(range)
            }
        }
    }
}
