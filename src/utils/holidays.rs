use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::settings::Region;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HolidayScope {
    All,
    Regions(Vec<Region>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Holiday {
    #[schema(value_type = String, format = "date", example = "2026-10-03")]
    pub date: NaiveDate,
    #[schema(example = "Tag der Deutschen Einheit")]
    pub name: String,
    pub scope: HolidayScope,
    pub is_national: bool,
}

/// Easter Sunday, Gauss algorithm (Gregorian calendar). `None` only outside
/// the range chrono can represent.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

struct Rule {
    name: &'static str,
    date: RuleDate,
    regions: Option<&'static [Region]>,
}

enum RuleDate {
    Fixed(u32, u32),
    EasterOffset(i64),
}

use crate::model::settings::Region::*;

const RULES: &[Rule] = &[
    Rule { name: "Neujahr", date: RuleDate::Fixed(1, 1), regions: None },
    Rule { name: "Karfreitag", date: RuleDate::EasterOffset(-2), regions: None },
    Rule { name: "Ostermontag", date: RuleDate::EasterOffset(1), regions: None },
    Rule { name: "Tag der Arbeit", date: RuleDate::Fixed(5, 1), regions: None },
    Rule { name: "Christi Himmelfahrt", date: RuleDate::EasterOffset(39), regions: None },
    Rule { name: "Pfingstmontag", date: RuleDate::EasterOffset(50), regions: None },
    Rule { name: "Tag der Deutschen Einheit", date: RuleDate::Fixed(10, 3), regions: None },
    Rule { name: "1. Weihnachtsfeiertag", date: RuleDate::Fixed(12, 25), regions: None },
    Rule { name: "2. Weihnachtsfeiertag", date: RuleDate::Fixed(12, 26), regions: None },
    Rule { name: "Heilige Drei Könige", date: RuleDate::Fixed(1, 6), regions: Some(&[Bw, By, St]) },
    Rule { name: "Internationaler Frauentag", date: RuleDate::Fixed(3, 8), regions: Some(&[Be, Mv]) },
    Rule { name: "Fronleichnam", date: RuleDate::EasterOffset(60), regions: Some(&[Bw, By, He, Nw, Rp, Sl]) },
    Rule { name: "Augsburger Friedensfest", date: RuleDate::Fixed(8, 8), regions: Some(&[By]) },
    Rule { name: "Mariä Himmelfahrt", date: RuleDate::Fixed(8, 15), regions: Some(&[Sl]) },
    Rule { name: "Weltkindertag", date: RuleDate::Fixed(9, 20), regions: Some(&[Th]) },
    Rule { name: "Reformationstag", date: RuleDate::Fixed(10, 31), regions: Some(&[Bb, Hb, Hh, Mv, Ni, Sn, St, Sh, Th]) },
    Rule { name: "Allerheiligen", date: RuleDate::Fixed(11, 1), regions: Some(&[Bw, By, Nw, Rp, Sl]) },
    Rule { name: "Buß- und Bettag", date: RuleDate::Fixed(11, 18), regions: Some(&[Sn]) },
];

/// National holidays plus the overlay for `region`, sorted by date.
/// Without a region only the national set is returned.
pub fn holidays_for_year(year: i32, region: Option<Region>) -> Vec<Holiday> {
    let easter = easter_sunday(year);

    let mut holidays: Vec<Holiday> = RULES
        .iter()
        .filter(|rule| match (rule.regions, region) {
            (None, _) => true,
            (Some(regions), Some(region)) => regions.contains(&region),
            (Some(_), None) => false,
        })
        .filter_map(|rule| {
            let date = match rule.date {
                RuleDate::Fixed(month, day) => NaiveDate::from_ymd_opt(year, month, day)?,
                RuleDate::EasterOffset(offset) => easter? + Duration::days(offset),
            };
            Some(Holiday {
                date,
                name: rule.name.to_string(),
                scope: match rule.regions {
                    None => HolidayScope::All,
                    Some(regions) => HolidayScope::Regions(regions.to_vec()),
                },
                is_national: rule.regions.is_none(),
            })
        })
        .collect();

    holidays.sort_by_key(|h| h.date);
    holidays
}

pub fn holiday_on(date: NaiveDate, region: Option<Region>) -> Option<Holiday> {
    holidays_for_year(date.year(), region)
        .into_iter()
        .find(|h| h.date == date)
}

pub fn is_holiday(date: NaiveDate, region: Option<Region>) -> bool {
    holiday_on(date, region).is_some()
}

/// Holidays in `[today, today + horizon_days)`, drawn from this and next year.
pub fn upcoming_holidays(region: Option<Region>, today: NaiveDate, horizon_days: u32) -> Vec<Holiday> {
    let until = today + Duration::days(i64::from(horizon_days));
    let mut upcoming: Vec<Holiday> = holidays_for_year(today.year(), region)
        .into_iter()
        .chain(holidays_for_year(today.year() + 1, region))
        .filter(|h| h.date >= today && h.date < until)
        .collect();
    upcoming.sort_by_key(|h| h.date);
    upcoming
}

pub fn days_until_next_holiday(region: Option<Region>, today: NaiveDate) -> Option<(Holiday, i64)> {
    upcoming_holidays(region, today, 365)
        .into_iter()
        .next()
        .map(|h| {
            let days = (h.date - today).num_days();
            (h, days)
        })
}
