//! Publication calendars and date helpers for templates.

use crate::document::PUBLISHED;
use crate::query::Query;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthDates {
    pub month: NaiveDate,
    pub days: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearDates {
    pub year: NaiveDate,
    pub months: Vec<MonthDates>,
}

/// Group timestamps into a sorted year → month → day tree.
pub fn publication_dates(dates: impl IntoIterator<Item = DateTime<FixedOffset>>) -> Vec<YearDates> {
    let mut captured: BTreeMap<i32, BTreeMap<u32, BTreeSet<u32>>> = BTreeMap::new();
    for date in dates {
        captured
            .entry(date.year())
            .or_default()
            .entry(date.month())
            .or_default()
            .insert(date.day());
    }

    captured
        .into_iter()
        .filter_map(|(year, months)| {
            let months = months
                .into_iter()
                .filter_map(|(month, days)| {
                    Some(MonthDates {
                        month: NaiveDate::from_ymd_opt(year, month, 1)?,
                        days: days
                            .into_iter()
                            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                            .collect(),
                    })
                })
                .collect();
            Some(YearDates {
                year: NaiveDate::from_ymd_opt(year, 1, 1)?,
                months,
            })
        })
        .collect()
}

/// The span of publication years in a query, such as `"2015–2016"`.
pub fn publication_range(query: &Query, key: &str) -> Option<String> {
    let years = query
        .iter()
        .filter_map(|doc| doc.datetime(key).map(|dt| dt.year()));
    let (lowest, highest) = years.fold(None, |range: Option<(i32, i32)>, year| match range {
        None => Some((year, year)),
        Some((low, high)) => Some((low.min(year), high.max(year))),
    })?;
    Some(format!("{lowest}\u{2013}{highest}"))
}

/// [`publication_range`] over the usual `published` attribute.
pub fn copyright_range(query: &Query) -> Option<String> {
    publication_range(query, PUBLISHED)
}

/// English ordinal suffix for a day of the month.
///
/// ```
/// use flourish_core::calendar::ordinal;
///
/// assert_eq!(ordinal(1), "st");
/// assert_eq!(ordinal(12), "th");
/// assert_eq!(ordinal(23), "rd");
/// ```
pub fn ordinal(value: u32) -> &'static str {
    if (11..=13).contains(&(value % 100)) {
        return "th";
    }
    match value % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}
