use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;

/// German federal states; holiday overlays are keyed by these codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Region {
    Bw,
    By,
    Be,
    Bb,
    Hb,
    Hh,
    He,
    Mv,
    Ni,
    Nw,
    Rp,
    Sl,
    Sn,
    St,
    Sh,
    Th,
}

impl Region {
    pub fn name(self) -> &'static str {
        match self {
            Region::Bw => "Baden-Württemberg",
            Region::By => "Bayern",
            Region::Be => "Berlin",
            Region::Bb => "Brandenburg",
            Region::Hb => "Bremen",
            Region::Hh => "Hamburg",
            Region::He => "Hessen",
            Region::Mv => "Mecklenburg-Vorpommern",
            Region::Ni => "Niedersachsen",
            Region::Nw => "Nordrhein-Westfalen",
            Region::Rp => "Rheinland-Pfalz",
            Region::Sl => "Saarland",
            Region::Sn => "Sachsen",
            Region::St => "Sachsen-Anhalt",
            Region::Sh => "Schleswig-Holstein",
            Region::Th => "Thüringen",
        }
    }

    /// Unknown codes yield `None`, which callers treat as "national holidays only".
    pub fn lenient(code: &str) -> Option<Self> {
        Region::from_str(code.trim().to_uppercase().as_str()).ok()
    }

    /// Strict parse for admin input.
    pub fn parse(code: &str) -> Result<Self, AppError> {
        Region::lenient(code)
            .ok_or_else(|| AppError::Validation(format!("Invalid region code: {code}")))
    }

    pub fn all() -> Vec<Region> {
        Region::iter().collect()
    }
}

pub const MIN_VACATION_DAYS: u32 = 20;
pub const MAX_VACATION_DAYS: u32 = 40;
pub const MAX_CARRY_OVER_DAYS: u32 = 10;

/// Company-wide absence policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanySettings {
    #[schema(example = "Meine Firma")]
    pub company_name: String,
    pub region: Region,
    #[schema(example = 3)]
    pub max_concurrent_absences: u32,
    #[schema(example = 30)]
    pub vacation_days_per_year: u32,
    #[schema(example = 5)]
    pub carry_over_days: u32,
    pub require_approval: bool,
    pub notify_manager_on_request: bool,
    pub notify_user_on_approval: bool,
    /// ISO weekday numbers, Monday = 1
    #[schema(example = json!([1, 2, 3, 4, 5]))]
    pub working_days: Vec<u8>,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            company_name: "Meine Firma".to_string(),
            region: Region::By,
            max_concurrent_absences: 3,
            vacation_days_per_year: 30,
            carry_over_days: 5,
            require_approval: true,
            notify_manager_on_request: true,
            notify_user_on_approval: true,
            working_days: vec![1, 2, 3, 4, 5],
        }
    }
}

/// Explicit partial update; fields left out keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SettingsUpdate {
    pub company_name: Option<String>,
    #[schema(example = "NW")]
    pub region: Option<String>,
    pub max_concurrent_absences: Option<u32>,
    pub vacation_days_per_year: Option<u32>,
    pub carry_over_days: Option<u32>,
    pub require_approval: Option<bool>,
    pub notify_manager_on_request: Option<bool>,
    pub notify_user_on_approval: Option<bool>,
    pub working_days: Option<Vec<u8>>,
}

impl CompanySettings {
    /// Validates `update` as a whole and only then applies it.
    pub fn apply(&self, update: SettingsUpdate) -> Result<CompanySettings, AppError> {
        let mut next = self.clone();

        if let Some(name) = update.company_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Validation("company_name must not be empty".into()));
            }
            next.company_name = name.to_string();
        }
        if let Some(code) = update.region {
            next.region = Region::parse(&code)?;
        }
        if let Some(max) = update.max_concurrent_absences {
            if max < 1 {
                return Err(AppError::Validation(
                    "max_concurrent_absences must be at least 1".into(),
                ));
            }
            next.max_concurrent_absences = max;
        }
        if let Some(days) = update.vacation_days_per_year {
            if !(MIN_VACATION_DAYS..=MAX_VACATION_DAYS).contains(&days) {
                return Err(AppError::Validation(format!(
                    "vacation_days_per_year must be between {MIN_VACATION_DAYS} and {MAX_VACATION_DAYS}"
                )));
            }
            next.vacation_days_per_year = days;
        }
        if let Some(days) = update.carry_over_days {
            if days > MAX_CARRY_OVER_DAYS {
                return Err(AppError::Validation(format!(
                    "carry_over_days must be at most {MAX_CARRY_OVER_DAYS}"
                )));
            }
            next.carry_over_days = days;
        }
        if let Some(flag) = update.require_approval {
            next.require_approval = flag;
        }
        if let Some(flag) = update.notify_manager_on_request {
            next.notify_manager_on_request = flag;
        }
        if let Some(flag) = update.notify_user_on_approval {
            next.notify_user_on_approval = flag;
        }
        if let Some(mut days) = update.working_days {
            if days.iter().any(|d| !(1..=7).contains(d)) {
                return Err(AppError::Validation(
                    "working_days must be ISO weekdays between 1 and 7".into(),
                ));
            }
            days.sort_unstable();
            days.dedup();
            next.working_days = days;
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let settings = CompanySettings::default();
        assert_eq!(settings.max_concurrent_absences, 3);
        assert_eq!(settings.vacation_days_per_year, 30);
        assert_eq!(settings.region, Region::By);
    }

    #[test]
    fn region_codes_are_case_insensitive() {
        assert_eq!(Region::lenient("nw"), Some(Region::Nw));
        assert_eq!(Region::lenient("XX"), None);
        assert_eq!(Region::Sh.to_string(), "SH");
        assert_eq!(Region::all().len(), 16);
    }

    #[test]
    fn apply_rejects_unknown_region_and_keeps_original() {
        let settings = CompanySettings::default();
        let err = settings
            .apply(SettingsUpdate {
                region: Some("ZZ".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(settings.region, Region::By);
    }

    #[test]
    fn apply_validates_ranges() {
        let settings = CompanySettings::default();
        assert!(
            settings
                .apply(SettingsUpdate {
                    vacation_days_per_year: Some(45),
                    ..Default::default()
                })
                .is_err()
        );
        assert!(
            settings
                .apply(SettingsUpdate {
                    max_concurrent_absences: Some(0),
                    ..Default::default()
                })
                .is_err()
        );

        let next = settings
            .apply(SettingsUpdate {
                region: Some("be".into()),
                max_concurrent_absences: Some(5),
                working_days: Some(vec![5, 1, 2, 2]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(next.region, Region::Be);
        assert_eq!(next.max_concurrent_absences, 5);
        assert_eq!(next.working_days, vec![1, 2, 5]);
    }
}
