use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::absence::{Absence, NewAbsence, UpdateAbsence};
use crate::service::absences::{AbsenceService, CreatedAbsence, ListQuery, PersonalStats};
use actix_web::{HttpResponse, web};
use chrono::Utc;

/* =========================
Submit an absence
========================= */
#[utoipa::path(
    post,
    path = "/api/absences",
    request_body(
        content = NewAbsence,
        description = "Absence request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Absence created; sick leave is approved immediately", body = CreatedAbsence),
        (status = 400, description = "Invalid dates, reason, substitute or auto-reply settings"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Absence"
)]
pub async fn create_absence(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    payload: web::Json<NewAbsence>,
) -> Result<HttpResponse, AppError> {
    let created = service.create(&auth, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/absences",
    params(ListQuery),
    responses(
        (status = 200, description = "Absences, newest first (at most 100)", body = [Absence]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Another user's absences requested without manager rights")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Absence"
)]
pub async fn list_absences(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let absences = service.list(&auth, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(absences))
}

#[utoipa::path(
    get,
    path = "/api/absences/stats",
    responses(
        (status = 200, description = "Counts, vacation balance and upcoming approved absences", body = PersonalStats),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Absence"
)]
pub async fn absence_stats(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
) -> Result<HttpResponse, AppError> {
    let stats = service
        .personal_stats(&auth, Utc::now().date_naive())
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[utoipa::path(
    get,
    path = "/api/absences/{absence_id}",
    params(
        ("absence_id" = String, Path, description = "Absence id")
    ),
    responses(
        (status = 200, description = "Absence details", body = Absence),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Absence not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Absence"
)]
pub async fn get_absence(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let absence = service.get(&auth, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(absence))
}

#[utoipa::path(
    put,
    path = "/api/absences/{absence_id}",
    params(
        ("absence_id" = String, Path, description = "Absence id")
    ),
    request_body(
        content = UpdateAbsence,
        description = "Fields to change; omitted fields keep their value",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Absence updated", body = Absence),
        (status = 400, description = "Invalid change"),
        (status = 403, description = "Only the requester may edit"),
        (status = 404, description = "Absence not found"),
        (status = 409, description = "Absence is no longer pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Absence"
)]
pub async fn update_absence(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    path: web::Path<String>,
    payload: web::Json<UpdateAbsence>,
) -> Result<HttpResponse, AppError> {
    let absence = service
        .update(&auth, &path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(absence))
}

#[utoipa::path(
    delete,
    path = "/api/absences/{absence_id}",
    params(
        ("absence_id" = String, Path, description = "Absence id")
    ),
    responses(
        (status = 200, description = "Absence cancelled", body = Absence),
        (status = 403, description = "Only the requester may cancel"),
        (status = 404, description = "Absence not found"),
        (status = 409, description = "Absence already rejected or cancelled")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Absence"
)]
pub async fn cancel_absence(
    auth: AuthUser,
    service: web::Data<AbsenceService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let absence = service.cancel(&auth, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(absence))
}
