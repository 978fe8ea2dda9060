//! Which dates a calendar grid shows, and how the focus date moves.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grids start their weeks on Sunday.
pub const WEEK_START: Weekday = Weekday::Sun;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    Day,
}

impl CalendarView {
    pub fn from_key(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "month" => Some(Self::Month),
            "week" => Some(Self::Week),
            "day" => Some(Self::Day),
            _ => None,
        }
    }

    /// Like [`CalendarView::from_key`], but unknown names fall back to the
    /// month view.
    pub fn from_param(raw: &str) -> Self {
        Self::from_key(raw).unwrap_or_else(|| {
            debug!(view = %raw, "unrecognized view name; using month");
            Self::Month
        })
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

impl NavDirection {
    fn sign(self) -> i64 {
        match self {
            Self::Previous => -1,
            Self::Next => 1,
        }
    }
}

/// Inclusive span of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|day| *day <= self.end)
            .collect()
    }
}

/// Every date of the padded month grid: from the Sunday on or before the
/// first of the month to the Saturday on or after its last day.
pub fn month_view_dates(reference: NaiveDate) -> Vec<NaiveDate> {
    month_grid_range(reference).dates()
}

/// Sunday through Saturday of the week containing `reference`.
pub fn week_view_dates(reference: NaiveDate) -> Vec<NaiveDate> {
    week_range(reference).dates()
}

pub fn day_view_date(reference: NaiveDate) -> NaiveDate {
    reference
}

pub fn view_dates(reference: NaiveDate, view: CalendarView) -> Vec<NaiveDate> {
    match view {
        CalendarView::Month => month_view_dates(reference),
        CalendarView::Week => week_view_dates(reference),
        CalendarView::Day => vec![day_view_date(reference)],
    }
}

/// The span of dates a view needs data for.
pub fn view_range(reference: NaiveDate, view: CalendarView) -> DateRange {
    match view {
        CalendarView::Month => month_grid_range(reference),
        CalendarView::Week => week_range(reference),
        CalendarView::Day => DateRange::new(reference, reference),
    }
}

/// Steps the focus date by one unit of the view. Month steps keep the day of
/// month where it exists and otherwise land on the last day of the target
/// month.
pub fn navigate(reference: NaiveDate, view: CalendarView, direction: NavDirection) -> NaiveDate {
    let step = direction.sign();
    match view {
        CalendarView::Month => shift_months(reference, step),
        CalendarView::Week => add_days(reference, step * 7),
        CalendarView::Day => add_days(reference, step),
    }
}

pub fn view_title(reference: NaiveDate, view: CalendarView) -> String {
    match view {
        CalendarView::Month => reference.format("%B %Y").to_string(),
        CalendarView::Week => reference.format("Week of %b %-d, %Y").to_string(),
        CalendarView::Day => reference.format("%A, %B %-d, %Y").to_string(),
    }
}

pub fn is_same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Monday on or before `date`; weekly statistics are keyed by it.
pub fn week_start_monday(date: NaiveDate) -> NaiveDate {
    start_of_week(date, Weekday::Mon)
}

pub fn start_of_week(day: NaiveDate, week_start: Weekday) -> NaiveDate {
    let day_idx = day.weekday().num_days_from_monday() as i64;
    let start_idx = week_start.num_days_from_monday() as i64;
    let diff = (7 + day_idx - start_idx) % 7;
    add_days(day, -diff)
}

pub fn end_of_week(day: NaiveDate, week_start: Weekday) -> NaiveDate {
    add_days(start_of_week(day, week_start), 6)
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

fn month_grid_range(reference: NaiveDate) -> DateRange {
    DateRange::new(
        start_of_week(first_day_of_month(reference), WEEK_START),
        end_of_week(last_day_of_month(reference), WEEK_START),
    )
}

fn week_range(reference: NaiveDate) -> DateRange {
    DateRange::new(
        start_of_week(reference, WEEK_START),
        end_of_week(reference, WEEK_START),
    )
}

fn shift_months(date: NaiveDate, months: i64) -> NaiveDate {
    let span = Months::new(months.unsigned_abs() as u32);
    let shifted = if months < 0 {
        date.checked_sub_months(span)
    } else {
        date.checked_add_months(span)
    };
    shifted.unwrap_or(date)
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(date)
}
