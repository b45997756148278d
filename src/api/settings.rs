use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::settings::{CompanySettings, SettingsUpdate};
use crate::service::settings::SettingsService;
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/settings/company",
    responses(
        (status = 200, description = "Company absence policy", body = CompanySettings),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn get_company_settings(
    _auth: AuthUser,
    service: web::Data<SettingsService>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(service.current().await?))
}

#[utoipa::path(
    put,
    path = "/api/settings/company",
    request_body(
        content = SettingsUpdate,
        description = "Fields to change; omitted fields keep their value",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Updated company policy", body = CompanySettings),
        (status = 400, description = "Unknown region or value out of range"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn update_company_settings(
    auth: AuthUser,
    service: web::Data<SettingsService>,
    payload: web::Json<SettingsUpdate>,
) -> Result<HttpResponse, AppError> {
    let updated = service.update(&auth, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{TestState, app, bearer};
    use crate::model::role::Role;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    fn put(body: Value, role: Role) -> test::TestRequest {
        test::TestRequest::put()
            .uri("/api/settings/company")
            .insert_header(bearer("x1", role))
            .set_json(body)
    }

    #[actix_web::test]
    async fn admin_updates_region() {
        let state = TestState::new();
        let app = test::init_service(app(state.clone())).await;

        let body: Value =
            test::call_and_read_body_json(&app, put(json!({ "region": "nw" }), Role::Admin).to_request()).await;
        assert_eq!(body["region"], "NW");
        assert_eq!(body["vacation_days_per_year"], 30);

        let req = test::TestRequest::get()
            .uri("/api/settings/company")
            .insert_header(bearer("u1", Role::Employee))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["region"], "NW");
    }

    #[actix_web::test]
    async fn invalid_values_and_non_admins_are_refused() {
        let state = TestState::new();
        let app = test::init_service(app(state.clone())).await;

        let resp = test::call_service(&app, put(json!({ "region": "XX" }), Role::Admin).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, put(json!({ "vacation_days_per_year": 50 }), Role::Admin).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(&app, put(json!({ "region": "NW" }), Role::Manager).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
