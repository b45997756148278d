use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::absence::Absence;
use crate::service::absences::{AbsenceService, Transitioned};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Defaults to "Keine Begründung angegeben" when empty
    #[schema(example = "Projektabgabe in dieser Woche")]
    pub reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/approvals",
    responses(
        (status = 200, description = "Pending absences awaiting the caller's decision, oldest first", body = [Absence]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees have no approval queue")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approval"
)]
pub async fn approval_queue(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
) -> Result<HttpResponse, AppError> {
    let pending = service.approval_queue(&auth).await?;
    Ok(HttpResponse::Ok().json(pending))
}

/* =========================
Approve (manager/admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/approvals/{absence_id}/approve",
    params(
        ("absence_id" = String, Path, description = "ID of the absence to approve")
    ),
    responses(
        (status = 200, description = "Absence approved; integration outcomes included", body = Transitioned),
        (status = 403, description = "Caller is not the requester's manager"),
        (status = 404, description = "Absence not found"),
        (status = 409, description = "Absence already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approval"
)]
pub async fn approve_absence(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let approved = service.approve(&auth, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(approved))
}

/* =========================
Reject (manager/admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/approvals/{absence_id}/reject",
    params(
        ("absence_id" = String, Path, description = "ID of the absence to reject")
    ),
    request_body(
        content = RejectRequest,
        description = "Optional rejection reason",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Absence rejected", body = Transitioned),
        (status = 403, description = "Caller is not the requester's manager"),
        (status = 404, description = "Absence not found"),
        (status = 409, description = "Absence already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Approval"
)]
pub async fn reject_absence(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    path: web::Path<String>,
    payload: Option<web::Json<RejectRequest>>,
) -> Result<HttpResponse, AppError> {
    let reason = payload.and_then(|p| p.into_inner().reason);
    let rejected = service.reject(&auth, &path.into_inner(), reason).await?;
    Ok(HttpResponse::Ok().json(rejected))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{TestState, app, bearer};
    use crate::model::absence::{AbsenceKind, AbsenceStatus};
    use crate::model::role::Role;
    use crate::test_support::{absence, date, report, user};
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    fn state() -> TestState {
        let state = TestState::new();
        state.store.put_user(report("u1", "m1", "Engineering"));
        state.store.put_user(user("m1", Role::Manager));
        state.store.put_user(user("m2", Role::Manager));
        state.store.put_absence(absence(
            "a1",
            "u1",
            AbsenceKind::Vacation,
            date(2024, 6, 10),
            date(2024, 6, 12),
            AbsenceStatus::Pending,
        ));
        state
    }

    #[actix_web::test]
    async fn manager_approves_once() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;

        let approve = || {
            test::TestRequest::post()
                .uri("/api/approvals/a1/approve")
                .insert_header(bearer("m1", Role::Manager))
                .to_request()
        };
        let body: Value = test::call_and_read_body_json(&app, approve()).await;
        assert_eq!(body["absence"]["status"], "approved");
        assert_eq!(body["integrations"]["calendar_event"], "skipped");
        assert_eq!(state.store.user("u1").vacation.remaining, 27.0);

        let resp = test::call_service(&app, approve()).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(state.store.user("u1").vacation.remaining, 27.0);
    }

    #[actix_web::test]
    async fn other_manager_is_forbidden() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let req = test::TestRequest::post()
            .uri("/api/approvals/a1/approve")
            .insert_header(bearer("m2", Role::Manager))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn reject_without_body_uses_default_reason() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let req = test::TestRequest::post()
            .uri("/api/approvals/a1/reject")
            .insert_header(bearer("m1", Role::Manager))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["absence"]["status"], "rejected");
        assert_eq!(
            body["absence"]["decision"]["rejection_reason"],
            "Keine Begründung angegeben"
        );
    }

    #[actix_web::test]
    async fn reject_with_reason() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;
        let req = test::TestRequest::post()
            .uri("/api/approvals/a1/reject")
            .insert_header(bearer("m1", Role::Manager))
            .set_json(json!({ "reason": "Release week" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["absence"]["decision"]["rejection_reason"], "Release week");
    }

    #[actix_web::test]
    async fn queue_is_for_reviewers() {
        let state = state();
        let app = test::init_service(app(state.clone())).await;

        let req = test::TestRequest::get()
            .uri("/api/approvals")
            .insert_header(bearer("m1", Role::Manager))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/api/approvals")
            .insert_header(bearer("u1", Role::Employee))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
