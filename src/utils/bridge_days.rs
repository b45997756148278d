use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    model::settings::Region,
    utils::{
        dates::{format_date, is_weekend},
        holidays::{holidays_for_year, is_holiday},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BridgeSide {
    Before,
    After,
}

/// A working day next to a holiday whose use links the holiday with a weekend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BridgeDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub holiday: String,
    pub side: BridgeSide,
    /// Weekend days directly behind the bridge day, seen from the holiday
    pub connected_weekend_days: u32,
    pub reason: String,
}

/// Bridge-day candidates for `year`, one entry per date, sorted by date.
pub fn detect_bridge_days(year: i32, region: Option<Region>) -> Vec<BridgeDay> {
    let mut found: BTreeMap<NaiveDate, BridgeDay> = BTreeMap::new();

    for holiday in holidays_for_year(year, region) {
        for side in [BridgeSide::Before, BridgeSide::After] {
            let step = match side {
                BridgeSide::Before => Duration::days(-1),
                BridgeSide::After => Duration::days(1),
            };
            let candidate = holiday.date + step;
            if is_weekend(candidate) || is_holiday(candidate, region) {
                continue;
            }

            let connected = weekend_run(candidate + step, step);
            let reason = match side {
                BridgeSide::Before => format!(
                    "Brückentag vor {} ({})",
                    holiday.name,
                    format_date(holiday.date)
                ),
                BridgeSide::After => format!(
                    "Brückentag nach {} ({})",
                    holiday.name,
                    format_date(holiday.date)
                ),
            };
            let entry = BridgeDay {
                date: candidate,
                holiday: holiday.name.clone(),
                side,
                connected_weekend_days: connected,
                reason,
            };

            match found.get(&candidate) {
                Some(existing) if existing.connected_weekend_days >= connected => {}
                _ => {
                    found.insert(candidate, entry);
                }
            }
        }
    }

    found.into_values().collect()
}

/// Consecutive weekend days starting at `from`, walking by `step`.
fn weekend_run(from: NaiveDate, step: Duration) -> u32 {
    let mut day = from;
    let mut count = 0;
    while is_weekend(day) {
        count += 1;
        day += step;
    }
    count
}

/// The `limit` bridge days that connect to the most weekend days.
pub fn suggest_bridge_days(year: i32, region: Option<Region>, limit: usize) -> Vec<BridgeDay> {
    let mut days = detect_bridge_days(year, region);
    days.sort_by(|a, b| {
        b.connected_weekend_days
            .cmp(&a.connected_weekend_days)
            .then(a.date.cmp(&b.date))
    });
    days.truncate(limit);
    days
}
