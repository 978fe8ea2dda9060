//! `YYYY-MM-DD` keys joining computed grid dates with fetched records.
//!
//! Server timestamps are cut to their first ten characters rather than
//! converted between timezones, so a record dated `2024-01-15T23:30:00Z`
//! always lands on the 15th.

use std::collections::BTreeMap;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::warn;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const DATE_KEY_LEN: usize = 10;

/// Records that sit on a calendar date.
pub trait DateKeyed {
    /// The raw date or timestamp as received.
    fn raw_date(&self) -> &str;

    fn date_key(&self) -> &str {
        normalize_date_key(self.raw_date())
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn normalize_date_key(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.get(..DATE_KEY_LEN).unwrap_or(trimmed)
}

pub fn parse_date_key(raw: &str) -> anyhow::Result<NaiveDate> {
    let key = normalize_date_key(raw);
    if key.len() != DATE_KEY_LEN {
        return Err(anyhow!("expected YYYY-MM-DD, got: {raw}"));
    }
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .with_context(|| format!("invalid date: {raw}"))
}

/// Resolves a user-supplied date, falling back to `today` when it is absent
/// or unparseable.
pub fn parse_date_param(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return today;
    };

    match parse_date_key(raw) {
        Ok(date) => date,
        Err(err) => {
            warn!(input = %raw, error = %err, "invalid date parameter; using today");
            today
        }
    }
}

/// One record per key; a later record replaces an earlier one.
pub fn index_by_date_key<T>(items: impl IntoIterator<Item = T>) -> BTreeMap<String, T>
where
    T: DateKeyed,
{
    items
        .into_iter()
        .map(|item| (item.date_key().to_string(), item))
        .collect()
}

/// All records per key, in input order.
pub fn group_by_date_key<T>(items: impl IntoIterator<Item = T>) -> BTreeMap<String, Vec<T>>
where
    T: DateKeyed,
{
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in items {
        groups
            .entry(item.date_key().to_string())
            .or_default()
            .push(item);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stamp(&'static str, u32);

    impl DateKeyed for Stamp {
        fn raw_date(&self) -> &str {
            self.0
        }
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn formats_zero_padded_keys() {
        assert_eq!(date_key(ymd(2024, 1, 15)), "2024-01-15");
        assert_eq!(date_key(ymd(2024, 1, 5)), "2024-01-05");
        assert_eq!(date_key(ymd(2024, 12, 31)), "2024-12-31");
    }

    #[test]
    fn truncates_timestamps_without_shifting() {
        assert_eq!(normalize_date_key("2024-01-15T23:30:00.000Z"), "2024-01-15");
        assert_eq!(normalize_date_key("2024-01-15T00:00:00+09:00"), "2024-01-15");
        assert_eq!(normalize_date_key("2024-01-15"), "2024-01-15");
        assert_eq!(normalize_date_key("2024"), "2024");
    }

    #[test]
    fn date_param_falls_back_to_today() {
        let today = ymd(2026, 10, 17);
        assert_eq!(parse_date_param(None, today), today);
        assert_eq!(parse_date_param(Some("   "), today), today);
        assert_eq!(parse_date_param(Some("not-a-date"), today), today);
        assert_eq!(parse_date_param(Some("2024-02-30"), today), today);
        assert_eq!(parse_date_param(Some("2024-02-29"), today), ymd(2024, 2, 29));
        assert_eq!(
            parse_date_param(Some("2024-02-29T10:00:00Z"), today),
            ymd(2024, 2, 29)
        );
    }

    #[test]
    fn index_keeps_last_record_per_day() {
        let index = index_by_date_key(vec![
            Stamp("2024-01-15T08:00:00Z", 1),
            Stamp("2024-01-16T08:00:00Z", 2),
            Stamp("2024-01-15", 3),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index["2024-01-15"].1, 3);
        assert_eq!(index["2024-01-16"].1, 2);
    }

    #[test]
    fn groups_keep_input_order() {
        let groups = group_by_date_key(vec![
            Stamp("2024-01-15T08:00:00Z", 1),
            Stamp("2024-01-16", 2),
            Stamp("2024-01-15T20:00:00Z", 3),
        ]);
        let ids: Vec<u32> = groups["2024-01-15"].iter().map(|s| s.1).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(groups["2024-01-16"].len(), 1);
    }

    #[test]
    fn grid_dates_find_their_records() {
        let index = index_by_date_key(vec![Stamp("2023-12-31T12:00:00Z", 7)]);
        let hits: Vec<u32> = crate::calendar::month_view_dates(ymd(2024, 1, 15))
            .into_iter()
            .filter_map(|date| index.get(&date_key(date)).map(|s| s.1))
            .collect();
        assert_eq!(hits, vec![7]);
    }
}
