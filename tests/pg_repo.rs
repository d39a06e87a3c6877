#![cfg(feature = "postgres-store")]

use dadpars::models::*;
use dadpars::pagination::PageWindow;
use dadpars::questions::QuestionFilter;
use dadpars::repo::pg::PgRepo;
use dadpars::repo::{IntakeRepo, QuestionRepo, RepoError};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;

/// Skips (returns None) when no database is configured.
async fn pg_repo() -> Option<PgRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .ok()?;
    let repo = PgRepo::new(pool);
    repo.migrate().await.ok()?;
    sqlx::query("TRUNCATE consultation_responses, consultation_requests, lawyer_answers, recent_questions RESTART IDENTITY CASCADE")
        .execute(repo.pool())
        .await
        .ok()?;
    Some(repo)
}

fn request() -> NewConsultationRequest {
    NewConsultationRequest {
        name: "آرش".into(),
        phone: "09351234567".into(),
        email: None,
        consultation_type: ConsultationKind::RetiredJudge,
        subject: "تجدیدنظر".into(),
        description: "رای بدوی".into(),
        preferred_date: None,
        preferred_time: None,
    }
}

#[tokio::test]
#[serial]
async fn pg_status_transitions_and_single_final_response() {
    let Some(repo) = pg_repo().await else { return };
    let req = repo.create_request(request()).await.unwrap();
    assert_eq!(req.status, RequestStatus::Pending);
    assert!(matches!(repo.update_request_status(req.id, RequestStatus::Completed).await, Err(RepoError::Conflict)));
    repo.update_request_status(req.id, RequestStatus::Approved).await.unwrap();

    let fin = || NewConsultationResponse { response_text: "نهایی".into(), is_final: true };
    repo.create_response(req.id, "lawyer1", fin()).await.unwrap();
    assert!(matches!(repo.create_response(req.id, "lawyer1", fin()).await, Err(RepoError::Conflict)));

    repo.delete_request(req.id).await.unwrap();
    assert!(repo.list_responses(req.id).await.unwrap().is_empty());
    let (_, total) = repo.list_requests(PageWindow::for_page(1, 20)).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
#[serial]
async fn pg_question_filters_and_search() {
    let Some(repo) = pg_repo().await else { return };
    for (text, answered) in [("Lease ending early", true), ("lease deposit", false), ("inheritance share", false)] {
        repo.create_question(NewRecentQuestion {
            question: text.into(),
            description: String::new(),
            category: QuestionCategory::RealEstate,
            questioner_name: String::new(),
            is_answered: answered,
            order: 0,
            is_active: true,
        })
        .await
        .unwrap();
    }
    let hits = repo.search_questions("LEASE", 10).await.unwrap();
    assert_eq!(hits.len(), 2);

    let filter = QuestionFilter::from_query(Some("real_estate"), Some("unanswered"));
    let (items, total) = repo.filter_questions(&filter, PageWindow::for_page(1, 12)).await.unwrap();
    assert_eq!(total, 2);
    assert!(items.iter().all(|q| !q.is_answered));

    let stats = repo.question_stats().await.unwrap();
    assert_eq!(stats.total_questions, 3);
}
