use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::settings::Region;
use crate::service::settings::SettingsService;
use crate::utils::bridge_days::{BridgeDay, suggest_bridge_days};
use crate::utils::holidays::{Holiday, days_until_next_holiday, holidays_for_year, upcoming_holidays};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const BRIDGE_DAY_SUGGESTIONS: usize = 3;
const DEFAULT_HORIZON_DAYS: u32 = 90;
const MAX_HORIZON_DAYS: u32 = 366;
const YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Federal state code such as `BY`; defaults to the company region.
    /// Unknown codes fall back to national holidays only.
    pub region: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct UpcomingQuery {
    pub region: Option<String>,
    /// Look-ahead window in days (default 90)
    pub days: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct HolidayList {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(nullable = true)]
    pub region: Option<Region>,
    #[schema(example = "Bayern", nullable = true)]
    pub region_name: Option<&'static str>,
    pub count: usize,
    pub holidays: Vec<Holiday>,
}

#[derive(Serialize, ToSchema)]
pub struct UpcomingHolidays {
    pub holidays: Vec<Holiday>,
    /// Days until the next holiday, absent when none is known
    #[schema(nullable = true)]
    pub days_until_next: Option<i64>,
}

fn year_or_current(year: Option<i32>) -> Result<i32, AppError> {
    let year = year.unwrap_or_else(|| Utc::now().year());
    if YEARS.contains(&year) {
        Ok(year)
    } else {
        Err(AppError::Validation(format!(
            "year must be between {} and {}",
            YEARS.start(),
            YEARS.end()
        )))
    }
}

/// Explicit region wins; otherwise the company setting applies.
async fn resolve_region(
    settings: &SettingsService,
    requested: Option<&str>,
) -> Result<Option<Region>, AppError> {
    match requested {
        Some(code) => Ok(Region::lenient(code)),
        None => Ok(Some(settings.current().await?.region)),
    }
}

#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Public holidays of the year, sorted by date", body = HolidayList),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    settings: web::Data<SettingsService>,
    query: web::Query<HolidayQuery>,
) -> Result<HttpResponse, AppError> {
    let year = year_or_current(query.year)?;
    let region = resolve_region(&settings, query.region.as_deref()).await?;
    let holidays = holidays_for_year(year, region);
    Ok(HttpResponse::Ok().json(HolidayList {
        year,
        region,
        region_name: region.map(Region::name),
        count: holidays.len(),
        holidays,
    }))
}

#[utoipa::path(
    get,
    path = "/api/holidays/upcoming",
    params(UpcomingQuery),
    responses(
        (status = 200, description = "Holidays within the look-ahead window", body = UpcomingHolidays),
        (status = 400, description = "days out of range")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn upcoming(
    _auth: AuthUser,
    settings: web::Data<SettingsService>,
    query: web::Query<UpcomingQuery>,
) -> Result<HttpResponse, AppError> {
    let days = query.days.unwrap_or(DEFAULT_HORIZON_DAYS);
    if days > MAX_HORIZON_DAYS {
        return Err(AppError::Validation(format!(
            "days must not exceed {MAX_HORIZON_DAYS}"
        )));
    }
    let region = resolve_region(&settings, query.region.as_deref()).await?;
    let today = Utc::now().date_naive();
    Ok(HttpResponse::Ok().json(UpcomingHolidays {
        holidays: upcoming_holidays(region, today, days),
        days_until_next: days_until_next_holiday(region, today).map(|(_, days)| days),
    }))
}

#[utoipa::path(
    get,
    path = "/api/holidays/bridge-days",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Best bridge days to take off, most connected weekend days first", body = [BridgeDay])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holiday"
)]
pub async fn bridge_days(
    _auth: AuthUser,
    settings: web::Data<SettingsService>,
    query: web::Query<HolidayQuery>,
) -> Result<HttpResponse, AppError> {
    let year = year_or_current(query.year)?;
    let region = resolve_region(&settings, query.region.as_deref()).await?;
    Ok(HttpResponse::Ok().json(suggest_bridge_days(year, region, BRIDGE_DAY_SUGGESTIONS)))
}
