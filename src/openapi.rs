use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::admin::RequestDetail;
use crate::forms::ConsultationRequestForm;
use crate::models::{
    ConsultationKind, ConsultationRequest, ConsultationResponse, ConsultationType, ConsultationTypeView, Faq,
    LawyerAnswer, NewConsultationResponse, NewConsultationType, NewFaq, NewLawyerAnswer, NewRecentQuestion,
    NewService, NewSiteContent, QuestionCategory, RecentQuestion, RequestStatus, Service, SiteContent,
    SiteContentKind, UpdateRequestStatus,
};
use crate::questions::{QuestionListItem, QuestionStats, SearchHit, SearchResponse};
use crate::routes::{
    AnswerCard, Choice, ConsultationPageContext, ConsultationRequestContext, HomeContext, Notice, QuestionDetailContext,
};

/// Registers the staff bearer token scheme referenced by `security(("bearer" = []))`.
struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::home,
        crate::routes::consultation_request_page,
        crate::routes::submit_consultation_request,
        crate::routes::consultation_list,
        crate::routes::question_detail,
        crate::routes::questions_list,
        crate::routes::search_questions,
        crate::routes::around_the_clock_consultation,
        crate::routes::phone_consultation,
        crate::routes::in_person_consultation,
        crate::routes::quick_legal_advice,
        crate::routes::retired_judge_consultation,
        crate::routes::contact,
        crate::routes::health,
        crate::admin::get_request,
        crate::admin::update_status,
        crate::admin::add_response,
        crate::admin::delete_request,
        crate::admin::create_service,
        crate::admin::create_faq,
        crate::admin::upsert_site_content,
        crate::admin::create_consultation_type,
        crate::admin::create_question,
        crate::admin::delete_question,
        crate::admin::create_answer,
    ),
    components(schemas(
        ConsultationKind, QuestionCategory, RequestStatus, SiteContentKind,
        Service, NewService, Faq, NewFaq, SiteContent, NewSiteContent,
        ConsultationType, NewConsultationType, ConsultationTypeView,
        RecentQuestion, NewRecentQuestion, LawyerAnswer, NewLawyerAnswer,
        ConsultationRequest, ConsultationResponse, NewConsultationResponse, UpdateRequestStatus,
        ConsultationRequestForm, QuestionListItem, QuestionStats, SearchHit, SearchResponse,
        HomeContext, AnswerCard, Choice, Notice, ConsultationRequestContext, QuestionDetailContext,
        ConsultationPageContext, RequestDetail
    )),
    modifiers(&BearerScheme),
    tags(
        (name = "pages", description = "Public page contexts"),
        (name = "staff", description = "Consultation request review"),
        (name = "admin", description = "Catalog maintenance"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_public_and_staff_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/consultation-request/"));
        assert!(paths.contains_key("/search"));
        assert!(paths.contains_key("/staff/requests/{id}/status"));
    }
}
