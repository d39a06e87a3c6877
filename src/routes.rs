use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::forms::{ConsultationRequestForm, FieldErrors};
use crate::models::*;
use crate::pagination::{Page, PageWindow};
use crate::questions::{
    QuestionFilter, QuestionListItem, QuestionStats, SearchHit, SearchResponse, QUESTIONS_PER_PAGE, SEARCH_LIMIT,
};
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;

pub const HOME_FAQS: usize = 6;
pub const HOME_RECENT: usize = 5;
pub const LANDING_FAQS: usize = 8;
pub const CONTACT_FAQS: usize = 6;
pub const STAFF_PREVIEW: usize = 10;
pub const REQUESTS_PER_PAGE: usize = 20;

pub const INTAKE_SUCCESS: &str =
    "درخواست مشاوره شما با موفقیت ثبت شد. در اسرع وقت با شما تماس گرفته خواهد شد.";
pub const INTAKE_FAILURE: &str = "خطا در ثبت درخواست. لطفاً اطلاعات را به درستی وارد کنید.";
pub const INTAKE_SUBMITTED_PATH: &str = "/consultation-request/?submitted=1";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(
            web::resource("/consultation-request/")
                .route(web::get().to(consultation_request_page))
                .route(web::post().to(submit_consultation_request)),
        )
        .service(web::resource("/consultation-list/").route(web::get().to(consultation_list)))
        .service(web::resource("/question/{id}/").route(web::get().to(question_detail)))
        .service(web::resource("/questions/").route(web::get().to(questions_list)))
        .service(web::resource("/search").route(web::get().to(search_questions)))
        .service(web::resource("/24-hours-legal-consultation/").route(web::get().to(around_the_clock_consultation)))
        .service(web::resource("/phone-legal-consultation/").route(web::get().to(phone_consultation)))
        .service(web::resource("/in-person-legal-consultation/").route(web::get().to(in_person_consultation)))
        .service(web::resource("/quick-legal-advice/").route(web::get().to(quick_legal_advice)))
        .service(web::resource("/retired-judge-consultation/").route(web::get().to(retired_judge_consultation)))
        .service(web::resource("/contact/").route(web::get().to(contact)))
        .service(web::resource("/health").route(web::get().to(health)));
    crate::admin::config(cfg);
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub jwt_secret: String,
    pub rate_limiter: Option<RateLimiterFacade>,
}

// ---------------- page contexts ----------------

/// A lawyer answer card on the home page, linked to its question.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerCard {
    #[serde(flatten)]
    pub answer: LawyerAnswer,
    pub question: String,
    pub question_url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomeContext {
    pub faqs: Vec<Faq>,
    pub services: Vec<Service>,
    pub consultation_types: Vec<ConsultationTypeView>,
    pub recent_questions: Vec<RecentQuestion>,
    pub lawyer_answers: Vec<AnswerCard>,
    /// Active section text keyed by content type.
    pub site_content: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Notice {
    /// `success` or `error`
    pub level: String,
    pub text: String,
}

impl Notice {
    fn success(text: &str) -> Self {
        Self { level: "success".into(), text: text.into() }
    }

    fn error(text: &str) -> Self {
        Self { level: "error".into(), text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsultationRequestContext {
    pub form: ConsultationRequestForm,
    pub errors: FieldErrors,
    pub notice: Option<Notice>,
    pub consultation_choices: Vec<Choice>,
    /// Latest submissions, only for signed-in staff.
    pub consultation_requests: Option<Vec<ConsultationRequest>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationListContext {
    pub consultation_requests: Page<ConsultationRequest>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionDetailContext {
    pub question: RecentQuestion,
    pub category_display: String,
    pub answers: Vec<LawyerAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionsListContext {
    pub questions: Page<QuestionListItem>,
    pub category_choices: Vec<Choice>,
    pub current_category: String,
    pub current_sort: String,
    #[serde(flatten)]
    pub stats: QuestionStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsultationPageContext {
    pub consultation_types: Vec<ConsultationTypeView>,
    pub faqs: Vec<Faq>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntakePageQuery {
    pub submitted: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// 1-based page number; garbage is a 404 like an out-of-range page.
fn parse_page(raw: Option<&str>) -> Result<usize, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(1),
        Some(s) => s.parse::<usize>().ok().filter(|p| *p >= 1).ok_or(ApiError::NotFound),
    }
}

fn client_ip(req: &HttpRequest) -> String {
    req.connection_info().realip_remote_addr().unwrap_or("unknown").to_string()
}

async fn consultation_types(repo: &dyn Repo, kinds: Option<&[ConsultationKind]>) -> Result<Vec<ConsultationTypeView>, ApiError> {
    let types = repo.list_consultation_types(kinds).await?;
    Ok(types.into_iter().map(ConsultationTypeView::from).collect())
}

fn kind_choices() -> Vec<Choice> {
    ConsultationKind::ALL
        .iter()
        .map(|k| Choice { value: k.as_str().into(), label: k.label().into() })
        .collect()
}

// ---------------- handlers ----------------

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page context", body = HomeContext))
)]
pub async fn home(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let repo = data.repo.as_ref();
    let lawyer_answers = repo
        .list_latest_answers(HOME_RECENT)
        .await?
        .into_iter()
        .map(|(answer, question)| AnswerCard {
            question_url: question.detail_path(),
            question: question.summary(),
            answer,
        })
        .collect();
    let site_content = repo
        .list_site_content()
        .await?
        .into_iter()
        .filter(|c| c.is_active)
        .map(|c| (c.content_type.as_str().to_string(), c.content))
        .collect();
    let ctx = HomeContext {
        faqs: repo.list_faqs(Some(HOME_FAQS)).await?,
        services: repo.list_services().await?,
        consultation_types: consultation_types(repo, None).await?,
        recent_questions: repo.list_recent_questions(HOME_RECENT).await?,
        lawyer_answers,
        site_content,
    };
    Ok(HttpResponse::Ok().json(ctx))
}

async fn staff_preview(repo: &dyn Repo, auth: Option<&Auth>) -> Result<Option<Vec<ConsultationRequest>>, ApiError> {
    match auth {
        Some(a) if a.is_staff() => {
            let (items, _) = repo.list_requests(PageWindow::for_page(1, STAFF_PREVIEW)).await?;
            Ok(Some(items))
        }
        _ => Ok(None),
    }
}

#[utoipa::path(
    get,
    path = "/consultation-request/",
    params(("submitted" = Option<String>, Query, description = "Set after a successful submission")),
    responses((status = 200, description = "Empty intake form", body = ConsultationRequestContext))
)]
pub async fn consultation_request_page(
    auth: Option<Auth>,
    query: web::Query<IntakePageQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let submitted = query.submitted.as_deref().is_some_and(|s| !s.is_empty() && s != "0");
    let ctx = ConsultationRequestContext {
        form: ConsultationRequestForm::default(),
        errors: FieldErrors::new(),
        notice: submitted.then(|| Notice::success(INTAKE_SUCCESS)),
        consultation_choices: kind_choices(),
        consultation_requests: staff_preview(data.repo.as_ref(), auth.as_ref()).await?,
    };
    Ok(HttpResponse::Ok().json(ctx))
}

#[utoipa::path(
    post,
    path = "/consultation-request/",
    request_body(content = ConsultationRequestForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Stored; redirect to the form with a success notice"),
        (status = 400, description = "Invalid fields; nothing stored", body = ConsultationRequestContext),
        (status = 429, description = "Too many submissions from this address")
    )
)]
pub async fn submit_consultation_request(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    form: web::Form<ConsultationRequestForm>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner().cleaned();
    let new = match form.validate_at(Utc::now().date_naive()) {
        Ok(new) => new,
        Err(errors) => {
            info!(fields = ?errors.keys().collect::<Vec<_>>(), "consultation request rejected");
            let ctx = ConsultationRequestContext {
                form,
                errors,
                notice: Some(Notice::error(INTAKE_FAILURE)),
                consultation_choices: kind_choices(),
                consultation_requests: staff_preview(data.repo.as_ref(), auth.as_ref()).await?,
            };
            return Ok(HttpResponse::BadRequest().json(ctx));
        }
    };

    if let Some(limiter) = &data.rate_limiter {
        let ip = client_ip(&req);
        if !limiter.allow_intake(&ip) {
            log::warn!("intake rate limit hit for {ip}");
            return Err(ApiError::TooManyRequests);
        }
    }

    let created = data.repo.create_request(new).await?;
    info!(id = created.id, kind = created.consultation_type.as_str(), "consultation request stored");
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, INTAKE_SUBMITTED_PATH))
        .finish())
}

#[utoipa::path(
    get,
    path = "/consultation-list/",
    params(("page" = Option<usize>, Query, description = "1-based page, 20 per page")),
    responses(
        (status = 200, description = "Newest requests first"),
        (status = 401, description = "Sign-in required"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Page out of range")
    ),
    security(("bearer" = []))
)]
pub async fn consultation_list(
    auth: Auth,
    query: web::Query<PageQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    auth.require_staff()?;
    let page = parse_page(query.page.as_deref())?;
    let window = PageWindow::checked(page, REQUESTS_PER_PAGE).ok_or(ApiError::NotFound)?;
    let (items, total) = data.repo.list_requests(window).await?;
    let consultation_requests = Page::new(items, total, page, REQUESTS_PER_PAGE).ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(ConsultationListContext { consultation_requests }))
}

#[utoipa::path(
    get,
    path = "/question/{id}/",
    params(("id" = i64, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question with its active answers", body = QuestionDetailContext),
        (status = 404, description = "Unknown or inactive question")
    )
)]
pub async fn question_detail(path: web::Path<Id>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let question = data.repo.get_question(id).await?;
    if !question.is_active {
        return Err(ApiError::NotFound);
    }
    let answers = data.repo.list_answers(id).await?;
    Ok(HttpResponse::Ok().json(QuestionDetailContext {
        category_display: question.category.label().to_string(),
        question,
        answers,
    }))
}

#[utoipa::path(
    get,
    path = "/questions/",
    params(
        ("category" = Option<String>, Query, description = "Category key or `all`"),
        ("sort" = Option<String>, Query, description = "newest, oldest, answered or unanswered"),
        ("page" = Option<usize>, Query, description = "1-based page, 12 per page")
    ),
    responses(
        (status = 200, description = "Filtered questions with answer counts and totals"),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn questions_list(query: web::Query<QuestionsQuery>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let current_category = query.category.clone().unwrap_or_else(|| "all".into());
    let current_sort = query.sort.clone().unwrap_or_else(|| "newest".into());
    let filter = QuestionFilter::from_query(Some(current_category.as_str()), Some(current_sort.as_str()));
    let page = parse_page(query.page.as_deref())?;
    let window = PageWindow::checked(page, QUESTIONS_PER_PAGE).ok_or(ApiError::NotFound)?;

    let (items, total) = data.repo.filter_questions(&filter, window).await?;
    let ids: Vec<Id> = items.iter().map(|q| q.id).collect();
    let counts = data.repo.answer_counts(&ids).await?;
    let questions = Page::new(items, total, page, QUESTIONS_PER_PAGE)
        .ok_or(ApiError::NotFound)?
        .map(|q| QuestionListItem {
            category_display: q.category.label().to_string(),
            answers_count: counts.get(&q.id).copied().unwrap_or(0),
            url: q.detail_path(),
            question: q,
        });

    let category_choices = QuestionCategory::ALL
        .iter()
        .map(|c| Choice { value: c.as_str().into(), label: c.label().into() })
        .collect();

    Ok(HttpResponse::Ok().json(QuestionsListContext {
        questions,
        category_choices,
        current_category,
        current_sort,
        stats: data.repo.question_stats().await?,
    }))
}

#[utoipa::path(
    get,
    path = "/search",
    params(("q" = Option<String>, Query, description = "Case-insensitive text")),
    responses((status = 200, description = "Up to 10 newest matches", body = SearchResponse))
)]
pub async fn search_questions(query: web::Query<SearchQuery>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let needle = query.q.as_deref().unwrap_or("").trim();
    if needle.is_empty() {
        return Ok(HttpResponse::Ok().json(SearchResponse { questions: Vec::new() }));
    }
    let hits = data.repo.search_questions(needle, SEARCH_LIMIT).await?;
    Ok(HttpResponse::Ok().json(SearchResponse { questions: hits.iter().map(SearchHit::from).collect() }))
}

async fn consultation_page(
    data: &AppState,
    kinds: Option<&[ConsultationKind]>,
    faqs: usize,
) -> Result<HttpResponse, ApiError> {
    let ctx = ConsultationPageContext {
        consultation_types: consultation_types(data.repo.as_ref(), kinds).await?,
        faqs: data.repo.list_faqs(Some(faqs)).await?,
    };
    Ok(HttpResponse::Ok().json(ctx))
}

const PHONE_AND_ONLINE: &[ConsultationKind] = &[ConsultationKind::Phone, ConsultationKind::Online];

#[utoipa::path(get, path = "/24-hours-legal-consultation/", responses((status = 200, description = "Landing page context", body = ConsultationPageContext)))]
pub async fn around_the_clock_consultation(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    consultation_page(&data, Some(PHONE_AND_ONLINE), LANDING_FAQS).await
}

#[utoipa::path(get, path = "/phone-legal-consultation/", responses((status = 200, description = "Landing page context", body = ConsultationPageContext)))]
pub async fn phone_consultation(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    consultation_page(&data, Some(&[ConsultationKind::Phone]), LANDING_FAQS).await
}

#[utoipa::path(get, path = "/in-person-legal-consultation/", responses((status = 200, description = "Landing page context", body = ConsultationPageContext)))]
pub async fn in_person_consultation(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    consultation_page(&data, Some(&[ConsultationKind::InPerson]), LANDING_FAQS).await
}

#[utoipa::path(get, path = "/quick-legal-advice/", responses((status = 200, description = "Landing page context", body = ConsultationPageContext)))]
pub async fn quick_legal_advice(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    consultation_page(&data, Some(PHONE_AND_ONLINE), LANDING_FAQS).await
}

#[utoipa::path(get, path = "/retired-judge-consultation/", responses((status = 200, description = "Landing page context", body = ConsultationPageContext)))]
pub async fn retired_judge_consultation(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let kinds = [ConsultationKind::Phone, ConsultationKind::Online, ConsultationKind::InPerson];
    consultation_page(&data, Some(&kinds), LANDING_FAQS).await
}

#[utoipa::path(get, path = "/contact/", responses((status = 200, description = "Landing page context", body = ConsultationPageContext)))]
pub async fn contact(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    consultation_page(&data, None, CONTACT_FAQS).await
}

#[utoipa::path(get, path = "/health", responses((status = 200, description = "Process is up")))]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parameter_parsing() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("")).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert!(matches!(parse_page(Some("0")), Err(ApiError::NotFound)));
        assert!(matches!(parse_page(Some("abc")), Err(ApiError::NotFound)));
    }

    #[test]
    fn choices_follow_enum_order() {
        let choices = kind_choices();
        assert_eq!(choices.len(), ConsultationKind::ALL.len());
        assert_eq!(choices[0].value, "phone");
    }
}
