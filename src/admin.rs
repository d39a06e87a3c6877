//! Staff review of consultation requests and admin catalog maintenance.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::*;
use crate::routes::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/staff")
            .service(web::resource("/requests/{id}/").route(web::get().to(get_request)))
            .service(web::resource("/requests/{id}").route(web::delete().to(delete_request)))
            .service(web::resource("/requests/{id}/status").route(web::post().to(update_status)))
            .service(web::resource("/requests/{id}/responses").route(web::post().to(add_response))),
    )
    .service(
        web::scope("/admin")
            .service(web::resource("/services").route(web::post().to(create_service)))
            .service(web::resource("/faqs").route(web::post().to(create_faq)))
            .service(web::resource("/site-content").route(web::post().to(upsert_site_content)))
            .service(web::resource("/consultation-types").route(web::post().to(create_consultation_type)))
            .service(web::resource("/questions").route(web::post().to(create_question)))
            .service(web::resource("/questions/{id}").route(web::delete().to(delete_question)))
            .service(web::resource("/questions/{id}/answers").route(web::post().to(create_answer))),
    );
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetail {
    pub request: ConsultationRequest,
    pub status_display: String,
    pub consultation_type_display: String,
    pub responses: Vec<ConsultationResponse>,
}

fn require_text(value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() { Err(ApiError::BadRequest) } else { Ok(()) }
}

// ---------------- staff ----------------

#[utoipa::path(
    get,
    path = "/staff/requests/{id}/",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request with responses, oldest first", body = RequestDetail),
        (status = 404, description = "Unknown request")
    ),
    security(("bearer" = []))
)]
pub async fn get_request(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let request = data.repo.get_request(id).await?;
    let responses = data.repo.list_responses(id).await?;
    Ok(HttpResponse::Ok().json(RequestDetail {
        status_display: request.status.label().to_string(),
        consultation_type_display: request.consultation_type.label().to_string(),
        request,
        responses,
    }))
}

#[utoipa::path(
    post,
    path = "/staff/requests/{id}/status",
    params(("id" = i64, Path, description = "Request id")),
    request_body = UpdateRequestStatus,
    responses(
        (status = 200, description = "Status changed", body = ConsultationRequest),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer" = []))
)]
pub async fn update_status(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    body: web::Json<UpdateRequestStatus>,
) -> Result<HttpResponse, ApiError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let updated = data.repo.update_request_status(id, body.status).await?;
    info!(id, status = updated.status.as_str(), by = auth.subject(), "request status changed");
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/staff/requests/{id}/responses",
    params(("id" = i64, Path, description = "Request id")),
    request_body = NewConsultationResponse,
    responses(
        (status = 201, description = "Response recorded", body = ConsultationResponse),
        (status = 400, description = "Empty response text"),
        (status = 409, description = "Request already has a final response")
    ),
    security(("bearer" = []))
)]
pub async fn add_response(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    body: web::Json<NewConsultationResponse>,
) -> Result<HttpResponse, ApiError> {
    auth.require_staff()?;
    require_text(&body.response_text)?;
    let created = data.repo.create_response(path.into_inner(), auth.subject(), body.into_inner()).await?;
    info!(request_id = created.request_id, is_final = created.is_final, by = auth.subject(), "response added");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    delete,
    path = "/staff/requests/{id}",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 204, description = "Request and its responses removed"),
        (status = 404, description = "Unknown request")
    ),
    security(("bearer" = []))
)]
pub async fn delete_request(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    auth.require_staff()?;
    let id = path.into_inner();
    data.repo.delete_request(id).await?;
    info!(id, by = auth.subject(), "request deleted");
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- admin catalog ----------------

#[utoipa::path(
    post,
    path = "/admin/services",
    request_body = NewService,
    responses((status = 201, description = "Service created", body = Service), (status = 403, description = "Admins only")),
    security(("bearer" = []))
)]
pub async fn create_service(auth: Auth, data: web::Data<AppState>, body: web::Json<NewService>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    require_text(&body.title)?;
    let created = data.repo.create_service(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    post,
    path = "/admin/faqs",
    request_body = NewFaq,
    responses((status = 201, description = "FAQ created", body = Faq), (status = 403, description = "Admins only")),
    security(("bearer" = []))
)]
pub async fn create_faq(auth: Auth, data: web::Data<AppState>, body: web::Json<NewFaq>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    require_text(&body.question)?;
    require_text(&body.answer)?;
    let created = data.repo.create_faq(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    post,
    path = "/admin/site-content",
    request_body = NewSiteContent,
    responses((status = 200, description = "Section text stored", body = SiteContent)),
    security(("bearer" = []))
)]
pub async fn upsert_site_content(auth: Auth, data: web::Data<AppState>, body: web::Json<NewSiteContent>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let stored = data.repo.upsert_site_content(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stored))
}

#[utoipa::path(
    post,
    path = "/admin/consultation-types",
    request_body = NewConsultationType,
    responses(
        (status = 201, description = "Consultation type created", body = ConsultationType),
        (status = 409, description = "Type key already exists")
    ),
    security(("bearer" = []))
)]
pub async fn create_consultation_type(
    auth: Auth,
    data: web::Data<AppState>,
    body: web::Json<NewConsultationType>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    require_text(&body.title)?;
    let created = data.repo.create_consultation_type(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    post,
    path = "/admin/questions",
    request_body = NewRecentQuestion,
    responses((status = 201, description = "Question created", body = RecentQuestion)),
    security(("bearer" = []))
)]
pub async fn create_question(auth: Auth, data: web::Data<AppState>, body: web::Json<NewRecentQuestion>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    require_text(&body.question)?;
    let created = data.repo.create_question(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    delete,
    path = "/admin/questions/{id}",
    params(("id" = i64, Path, description = "Question id")),
    responses((status = 204, description = "Question and its answers removed"), (status = 404, description = "Unknown question")),
    security(("bearer" = []))
)]
pub async fn delete_question(auth: Auth, path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = path.into_inner();
    data.repo.delete_question(id).await?;
    info!(id, by = auth.subject(), "question deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Answers are signed with the caller's identity.
#[utoipa::path(
    post,
    path = "/admin/questions/{id}/answers",
    params(("id" = i64, Path, description = "Question id")),
    request_body = NewLawyerAnswer,
    responses((status = 201, description = "Answer created", body = LawyerAnswer), (status = 404, description = "Unknown question")),
    security(("bearer" = []))
)]
pub async fn create_answer(
    auth: Auth,
    path: web::Path<Id>,
    data: web::Data<AppState>,
    body: web::Json<NewLawyerAnswer>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    require_text(&body.answer)?;
    let created = data.repo.create_answer(path.into_inner(), auth.subject(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}
