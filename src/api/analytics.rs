use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::analytics::{AnalyticsSnapshot, DepartmentStat, SickLeaveTrend};
use crate::service::analytics::{AnalyticsQuery, AnalyticsService, DEFAULT_TREND_MONTHS};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub data: AnalyticsSnapshot,
    /// True when a snapshot younger than 24 hours was served
    pub cached: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct PeriodQuery {
    pub year: i32,
    /// 1..=12; the whole year when omitted
    pub month: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
pub struct TrendQuery {
    /// Number of months ending with the current one (default 12)
    pub months: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Absence statistics for the window", body = AnalyticsResponse),
        (status = 400, description = "Invalid year or month"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn get_analytics(
    auth: AuthUser,
    service: web::Data<AnalyticsService>,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_reviewer()?;

    let key = query.key();
    let now = Utc::now();
    let (data, cached) = if query.cached {
        service.cached(&key, now).await?
    } else {
        (service.compute(&key, now).await?, false)
    };
    Ok(HttpResponse::Ok().json(AnalyticsResponse { data, cached }))
}

#[utoipa::path(
    get,
    path = "/api/analytics/departments",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Per-department statistics, most absences first", body = [DepartmentStat]),
        (status = 400, description = "Invalid year or month"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn department_analytics(
    auth: AuthUser,
    service: web::Data<AnalyticsService>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_reviewer()?;
    let stats = service.by_department(query.year, query.month).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[utoipa::path(
    get,
    path = "/api/analytics/sick-trends",
    params(TrendQuery),
    responses(
        (status = 200, description = "Monthly sick days with trend direction", body = [SickLeaveTrend]),
        (status = 400, description = "months out of range"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn sick_trends(
    auth: AuthUser,
    service: web::Data<AnalyticsService>,
    query: web::Query<TrendQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_reviewer()?;
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);
    let trends = service
        .sick_leave_trends(Utc::now().date_naive(), months)
        .await?;
    Ok(HttpResponse::Ok().json(trends))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{TestState, app, bearer};
    use crate::model::absence::{AbsenceKind, AbsenceStatus};
    use crate::model::role::Role;
    use crate::test_support::{absence, date, report};
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    fn state() -> TestState {
        let state = TestState::new();
        state.store.put_user(report("u1", "m1", "Engineering"));
        state.store.put_absence(absence(
            "a1",
            "u1",
            AbsenceKind::Sick,
            date(2024, 6, 10),
            date(2024, 6, 11),
            AbsenceStatus::Approved,
        ));
        state
    }

    #[actix_web::test]
    async fn employees_cannot_read_analytics() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let req = test::TestRequest::get()
            .uri("/api/analytics?year=2024&month=6")
            .insert_header(bearer("u1", Role::Employee))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn cached_flag_reports_snapshot_reuse() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let get = || {
            test::TestRequest::get()
                .uri("/api/analytics?year=2024&month=6&cached=true")
                .insert_header(bearer("m1", Role::Manager))
                .to_request()
        };

        let first: Value = test::call_and_read_body_json(&app, get()).await;
        assert_eq!(first["cached"], false);
        assert_eq!(first["data"]["total_absences"], 1);
        assert_eq!(first["data"]["by_kind"]["sick"], 1);

        let second: Value = test::call_and_read_body_json(&app, get()).await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["data"], first["data"]);
    }

    #[actix_web::test]
    async fn invalid_month_is_rejected() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let req = test::TestRequest::get()
            .uri("/api/analytics/departments?year=2024&month=13")
            .insert_header(bearer("m1", Role::Admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn sick_trends_default_to_a_year() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let req = test::TestRequest::get()
            .uri("/api/analytics/sick-trends")
            .insert_header(bearer("m1", Role::Manager))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 12);
    }
}
