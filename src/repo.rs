use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::*;
use crate::pagination::PageWindow;
use crate::questions::{QuestionFilter, QuestionStats};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Services, FAQs and page-section text.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Active services by (order, created_at).
    async fn list_services(&self) -> RepoResult<Vec<Service>>;
    async fn create_service(&self, new: NewService) -> RepoResult<Service>;
    /// Active FAQs by (order, created_at), truncated to `limit`.
    async fn list_faqs(&self, limit: Option<usize>) -> RepoResult<Vec<Faq>>;
    async fn create_faq(&self, new: NewFaq) -> RepoResult<Faq>;
    /// Whether a service with this exact title exists, active or not.
    async fn service_exists(&self, title: &str) -> RepoResult<bool>;
    /// Whether a FAQ with this exact question exists, active or not.
    async fn faq_exists(&self, question: &str) -> RepoResult<bool>;
    async fn list_site_content(&self) -> RepoResult<Vec<SiteContent>>;
    /// Inserts or replaces the row for `new.content_type`.
    async fn upsert_site_content(&self, new: NewSiteContent) -> RepoResult<SiteContent>;
}

#[async_trait]
pub trait ConsultationTypeRepo: Send + Sync {
    /// Active types by (order, created_at); `kinds` restricts to the given keys.
    async fn list_consultation_types(&self, kinds: Option<&[ConsultationKind]>) -> RepoResult<Vec<ConsultationType>>;
    /// `Conflict` when the type key already exists.
    async fn create_consultation_type(&self, new: NewConsultationType) -> RepoResult<ConsultationType>;
}

#[async_trait]
pub trait QuestionRepo: Send + Sync {
    /// Active questions by (order, -created_at).
    async fn list_recent_questions(&self, limit: usize) -> RepoResult<Vec<RecentQuestion>>;
    /// Any question, active or not.
    async fn get_question(&self, id: Id) -> RepoResult<RecentQuestion>;
    /// One window of the filtered list plus the filtered total.
    async fn filter_questions(&self, filter: &QuestionFilter, window: PageWindow) -> RepoResult<(Vec<RecentQuestion>, usize)>;
    async fn question_stats(&self) -> RepoResult<QuestionStats>;
    /// Active answers per question, for the given ids only.
    async fn answer_counts(&self, question_ids: &[Id]) -> RepoResult<HashMap<Id, i64>>;
    /// Active questions whose text or description contains `query`, newest first.
    async fn search_questions(&self, query: &str, limit: usize) -> RepoResult<Vec<RecentQuestion>>;
    async fn create_question(&self, new: NewRecentQuestion) -> RepoResult<RecentQuestion>;
    /// Whether a question with exactly this text exists, active or not.
    async fn question_exists(&self, text: &str) -> RepoResult<bool>;
    /// Removes the question and all of its answers.
    async fn delete_question(&self, id: Id) -> RepoResult<()>;
    /// Active answers of one question by (order, -created_at).
    async fn list_answers(&self, question_id: Id) -> RepoResult<Vec<LawyerAnswer>>;
    /// Active answers on active questions by (order, -created_at), each with its question.
    async fn list_latest_answers(&self, limit: usize) -> RepoResult<Vec<(LawyerAnswer, RecentQuestion)>>;
    async fn create_answer(&self, question_id: Id, lawyer: &str, new: NewLawyerAnswer) -> RepoResult<LawyerAnswer>;
}

#[async_trait]
pub trait IntakeRepo: Send + Sync {
    async fn create_request(&self, new: NewConsultationRequest) -> RepoResult<ConsultationRequest>;
    /// Newest first, plus the total number of requests.
    async fn list_requests(&self, window: PageWindow) -> RepoResult<(Vec<ConsultationRequest>, usize)>;
    async fn get_request(&self, id: Id) -> RepoResult<ConsultationRequest>;
    /// `Conflict` when the current status may not move to `status`.
    async fn update_request_status(&self, id: Id, status: RequestStatus) -> RepoResult<ConsultationRequest>;
    /// Removes the request and all of its responses.
    async fn delete_request(&self, id: Id) -> RepoResult<()>;
    /// Oldest first.
    async fn list_responses(&self, request_id: Id) -> RepoResult<Vec<ConsultationResponse>>;
    /// `Conflict` when `new.is_final` and the request already has a final response.
    async fn create_response(&self, request_id: Id, responder: &str, new: NewConsultationResponse) -> RepoResult<ConsultationResponse>;
}

pub trait Repo: ContentRepo + ConsultationTypeRepo + QuestionRepo + IntakeRepo {}

impl<T> Repo for T where T: ContentRepo + ConsultationTypeRepo + QuestionRepo + IntakeRepo {}

fn take_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(n) = limit {
        items.truncate(n);
    }
    items
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use crate::questions::{display_order, matches_search, newest_first};
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        services: HashMap<Id, Service>,
        faqs: HashMap<Id, Faq>,
        site_content: HashMap<Id, SiteContent>,
        consultation_types: HashMap<Id, ConsultationType>,
        questions: HashMap<Id, RecentQuestion>,
        answers: HashMap<Id, LawyerAnswer>,
        requests: HashMap<Id, ConsultationRequest>,
        responses: HashMap<Id, ConsultationResponse>,
        next_id: Id,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }
    }

    /// Process-local store; optionally mirrored to a JSON snapshot after every write.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
        // one snapshot writer at a time
        persist_lock: Arc<Mutex<()>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Loads `path` when it exists and rewrites it after each mutation.
        /// A snapshot that exists but cannot be read or parsed is an error, so
        /// a damaged file is never silently replaced by an empty store.
        pub fn with_snapshot(path: impl Into<PathBuf>) -> RepoResult<Self> {
            let path = path.into();
            let state = Self::load_state_from(&path)?;
            Ok(Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Some(Arc::new(path)),
                persist_lock: Arc::default(),
            })
        }

        fn load_state_from(path: &Path) -> RepoResult<State> {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!(path = %path.display(), "no snapshot, starting empty");
                    return Ok(State::default());
                }
                Err(e) => {
                    return Err(RepoError::Internal(format!("reading snapshot {}: {e}", path.display())));
                }
            };
            let state = serde_json::from_slice::<State>(&bytes)
                .map_err(|e| RepoError::Internal(format!("parsing snapshot {}: {e}", path.display())))?;
            info!(path = %path.display(), "loaded snapshot");
            Ok(state)
        }

        /// Writes the whole state to a sibling temp file and renames it over the snapshot.
        fn persist(&self) {
            let Some(path) = self.snapshot_path.as_deref() else { return };
            let _guard = match self.persist_lock.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            let bytes = match self.read().and_then(|s| {
                serde_json::to_vec_pretty(&*s).map_err(|e| RepoError::Internal(e.to_string()))
            }) {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "failed to serialise snapshot");
                    return;
                }
            };
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    warn!(path = %dir.display(), error = %e, "failed to create snapshot directory");
                    return;
                }
            }
            let tmp = path.with_extension("tmp");
            if let Err(e) = std::fs::write(&tmp, bytes) {
                warn!(path = %tmp.display(), error = %e, "failed to write snapshot");
                return;
            }
            if let Err(e) = std::fs::rename(&tmp, path) {
                warn!(path = %path.display(), error = %e, "failed to replace snapshot");
            }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    #[async_trait]
    impl ContentRepo for InMemRepo {
        async fn list_services(&self) -> RepoResult<Vec<Service>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.services.values().filter(|x| x.is_active).cloned().collect();
            v.sort_by(|a, b| (a.order, a.created_at, a.id).cmp(&(b.order, b.created_at, b.id)));
            Ok(v)
        }

        async fn create_service(&self, new: NewService) -> RepoResult<Service> {
            let mut s = self.write()?;
            let id = s.next_id();
            let service = Service {
                id,
                title: new.title,
                description: new.description,
                icon: new.icon,
                order: new.order,
                is_active: new.is_active,
                created_at: Utc::now(),
            };
            s.services.insert(id, service.clone());
            drop(s); // release lock before persisting
            self.persist();
            Ok(service)
        }

        async fn list_faqs(&self, limit: Option<usize>) -> RepoResult<Vec<Faq>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.faqs.values().filter(|x| x.is_active).cloned().collect();
            v.sort_by(|a, b| (a.order, a.created_at, a.id).cmp(&(b.order, b.created_at, b.id)));
            Ok(take_limit(v, limit))
        }

        async fn create_faq(&self, new: NewFaq) -> RepoResult<Faq> {
            let mut s = self.write()?;
            let id = s.next_id();
            let now = Utc::now();
            let faq = Faq {
                id,
                question: new.question,
                answer: new.answer,
                order: new.order,
                is_active: new.is_active,
                created_at: now,
                updated_at: now,
            };
            s.faqs.insert(id, faq.clone());
            drop(s);
            self.persist();
            Ok(faq)
        }

        async fn service_exists(&self, title: &str) -> RepoResult<bool> {
            Ok(self.read()?.services.values().any(|x| x.title == title))
        }

        async fn faq_exists(&self, question: &str) -> RepoResult<bool> {
            Ok(self.read()?.faqs.values().any(|x| x.question == question))
        }

        async fn list_site_content(&self) -> RepoResult<Vec<SiteContent>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.site_content.values().filter(|x| x.is_active).cloned().collect();
            v.sort_by_key(|c| c.content_type);
            Ok(v)
        }

        async fn upsert_site_content(&self, new: NewSiteContent) -> RepoResult<SiteContent> {
            let mut s = self.write()?;
            let now = Utc::now();
            let existing = s.site_content.values().find(|c| c.content_type == new.content_type).map(|c| c.id);
            let saved = match existing.and_then(|id| s.site_content.get_mut(&id)) {
                Some(row) => {
                    row.content = new.content;
                    row.is_active = new.is_active;
                    row.updated_at = now;
                    row.clone()
                }
                None => {
                    let id = s.next_id();
                    let row = SiteContent {
                        id,
                        content_type: new.content_type,
                        content: new.content,
                        is_active: new.is_active,
                        created_at: now,
                        updated_at: now,
                    };
                    s.site_content.insert(id, row.clone());
                    row
                }
            };
            drop(s);
            self.persist();
            Ok(saved)
        }
    }

    #[async_trait]
    impl ConsultationTypeRepo for InMemRepo {
        async fn list_consultation_types(&self, kinds: Option<&[ConsultationKind]>) -> RepoResult<Vec<ConsultationType>> {
            let s = self.read()?;
            let mut v: Vec<_> = s
                .consultation_types
                .values()
                .filter(|t| t.is_active && kinds.map_or(true, |k| k.contains(&t.type_key)))
                .cloned()
                .collect();
            v.sort_by(|a, b| (a.order, a.created_at, a.id).cmp(&(b.order, b.created_at, b.id)));
            Ok(v)
        }

        async fn create_consultation_type(&self, new: NewConsultationType) -> RepoResult<ConsultationType> {
            let mut s = self.write()?;
            if s.consultation_types.values().any(|t| t.type_key == new.type_key) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let row = ConsultationType {
                id,
                type_key: new.type_key,
                title: new.title,
                description: new.description,
                icon: new.icon,
                features: new.features,
                button_text: new.button_text,
                button_url: new.button_url,
                button_color: new.button_color,
                order: new.order,
                is_active: new.is_active,
                created_at: Utc::now(),
            };
            s.consultation_types.insert(id, row.clone());
            drop(s);
            self.persist();
            Ok(row)
        }
    }

    #[async_trait]
    impl QuestionRepo for InMemRepo {
        async fn list_recent_questions(&self, limit: usize) -> RepoResult<Vec<RecentQuestion>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.questions.values().filter(|q| q.is_active).cloned().collect();
            v.sort_by(display_order);
            Ok(take_limit(v, Some(limit)))
        }

        async fn get_question(&self, id: Id) -> RepoResult<RecentQuestion> {
            let s = self.read()?;
            s.questions.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn filter_questions(&self, filter: &QuestionFilter, window: PageWindow) -> RepoResult<(Vec<RecentQuestion>, usize)> {
            let s = self.read()?;
            let mut v: Vec<_> = s.questions.values().filter(|q| filter.matches(q)).cloned().collect();
            v.sort_by(|a, b| filter.compare(a, b));
            let total = v.len();
            Ok((window.apply(v), total))
        }

        async fn question_stats(&self) -> RepoResult<QuestionStats> {
            let s = self.read()?;
            let mut stats = QuestionStats::default();
            for q in s.questions.values().filter(|q| q.is_active) {
                stats.total_questions += 1;
                if q.is_answered {
                    stats.answered_questions += 1;
                } else {
                    stats.unanswered_questions += 1;
                }
            }
            Ok(stats)
        }

        async fn answer_counts(&self, question_ids: &[Id]) -> RepoResult<HashMap<Id, i64>> {
            let s = self.read()?;
            let mut counts = HashMap::new();
            for a in s.answers.values().filter(|a| a.is_active && question_ids.contains(&a.question_id)) {
                *counts.entry(a.question_id).or_insert(0) += 1;
            }
            Ok(counts)
        }

        async fn search_questions(&self, query: &str, limit: usize) -> RepoResult<Vec<RecentQuestion>> {
            let needle = query.to_lowercase();
            let s = self.read()?;
            let mut v: Vec<_> = s
                .questions
                .values()
                .filter(|q| q.is_active && matches_search(q, &needle))
                .cloned()
                .collect();
            v.sort_by(newest_first);
            Ok(take_limit(v, Some(limit)))
        }

        async fn question_exists(&self, text: &str) -> RepoResult<bool> {
            Ok(self.read()?.questions.values().any(|q| q.question == text))
        }

        async fn create_question(&self, new: NewRecentQuestion) -> RepoResult<RecentQuestion> {
            let mut s = self.write()?;
            let id = s.next_id();
            let q = RecentQuestion {
                id,
                question: new.question,
                description: new.description,
                category: new.category,
                questioner_name: new.questioner_name,
                is_answered: new.is_answered,
                order: new.order,
                is_active: new.is_active,
                created_at: Utc::now(),
            };
            s.questions.insert(id, q.clone());
            drop(s);
            self.persist();
            Ok(q)
        }

        async fn delete_question(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.questions.remove(&id).ok_or(RepoError::NotFound)?;
            s.answers.retain(|_, a| a.question_id != id);
            drop(s);
            self.persist();
            Ok(())
        }

        async fn list_answers(&self, question_id: Id) -> RepoResult<Vec<LawyerAnswer>> {
            let s = self.read()?;
            let mut v: Vec<_> = s
                .answers
                .values()
                .filter(|a| a.is_active && a.question_id == question_id)
                .cloned()
                .collect();
            v.sort_by(answer_order);
            Ok(v)
        }

        async fn list_latest_answers(&self, limit: usize) -> RepoResult<Vec<(LawyerAnswer, RecentQuestion)>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.answers.values().filter(|a| a.is_active).cloned().collect();
            v.sort_by(answer_order);
            Ok(v
                .into_iter()
                .filter_map(|a| s.questions.get(&a.question_id).filter(|q| q.is_active).cloned().map(|q| (a, q)))
                .take(limit)
                .collect())
        }

        async fn create_answer(&self, question_id: Id, lawyer: &str, new: NewLawyerAnswer) -> RepoResult<LawyerAnswer> {
            let mut s = self.write()?;
            if !s.questions.contains_key(&question_id) {
                return Err(RepoError::NotFound);
            }
            let id = s.next_id();
            let answer = LawyerAnswer {
                id,
                question_id,
                lawyer: lawyer.to_string(),
                answer: new.answer,
                short_answer: new.short_answer,
                lawyer_title: new.lawyer_title,
                icon: new.icon,
                order: new.order,
                is_active: new.is_active,
                created_at: Utc::now(),
            };
            s.answers.insert(id, answer.clone());
            drop(s);
            self.persist();
            Ok(answer)
        }
    }

    fn answer_order(a: &LawyerAnswer, b: &LawyerAnswer) -> std::cmp::Ordering {
        a.order
            .cmp(&b.order)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }

    fn request_newest_first(a: &ConsultationRequest, b: &ConsultationRequest) -> std::cmp::Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
    }

    #[async_trait]
    impl IntakeRepo for InMemRepo {
        async fn create_request(&self, new: NewConsultationRequest) -> RepoResult<ConsultationRequest> {
            let mut s = self.write()?;
            let id = s.next_id();
            let now = Utc::now();
            let req = ConsultationRequest {
                id,
                name: new.name,
                phone: new.phone,
                email: new.email,
                consultation_type: new.consultation_type,
                subject: new.subject,
                description: new.description,
                preferred_date: new.preferred_date,
                preferred_time: new.preferred_time,
                status: RequestStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            s.requests.insert(id, req.clone());
            drop(s);
            self.persist();
            Ok(req)
        }

        async fn list_requests(&self, window: PageWindow) -> RepoResult<(Vec<ConsultationRequest>, usize)> {
            let s = self.read()?;
            let mut v: Vec<_> = s.requests.values().cloned().collect();
            v.sort_by(request_newest_first);
            let total = v.len();
            Ok((window.apply(v), total))
        }

        async fn get_request(&self, id: Id) -> RepoResult<ConsultationRequest> {
            let s = self.read()?;
            s.requests.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn update_request_status(&self, id: Id, status: RequestStatus) -> RepoResult<ConsultationRequest> {
            let mut s = self.write()?;
            let req = s.requests.get_mut(&id).ok_or(RepoError::NotFound)?;
            if !req.status.can_transition_to(status) {
                return Err(RepoError::Conflict);
            }
            req.status = status;
            req.updated_at = Utc::now();
            let updated = req.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }

        async fn delete_request(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            s.requests.remove(&id).ok_or(RepoError::NotFound)?;
            s.responses.retain(|_, r| r.request_id != id);
            drop(s);
            self.persist();
            Ok(())
        }

        async fn list_responses(&self, request_id: Id) -> RepoResult<Vec<ConsultationResponse>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.responses.values().filter(|r| r.request_id == request_id).cloned().collect();
            v.sort_by(|a, b| (a.response_date, a.id).cmp(&(b.response_date, b.id)));
            Ok(v)
        }

        async fn create_response(&self, request_id: Id, responder: &str, new: NewConsultationResponse) -> RepoResult<ConsultationResponse> {
            let mut s = self.write()?;
            if !s.requests.contains_key(&request_id) {
                return Err(RepoError::NotFound);
            }
            if new.is_final && s.responses.values().any(|r| r.request_id == request_id && r.is_final) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let resp = ConsultationResponse {
                id,
                request_id,
                responder: responder.to_string(),
                response_text: new.response_text,
                response_date: Utc::now(),
                is_final: new.is_final,
            };
            s.responses.insert(id, resp.clone());
            drop(s);
            self.persist();
            Ok(resp)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use crate::questions::{CategoryFilter, QuestionOrder};
    use chrono::{DateTime, NaiveDate, NaiveTime};
    use sqlx::{Pool, Postgres};

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub fn pool(&self) -> &Pool<Postgres> { &self.pool }

        /// Applies the embedded migrations under `./migrations`.
        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }
    }

    /// Unique violations become `Conflict`, missing parents `NotFound`.
    fn db_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => RepoError::Conflict,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => RepoError::NotFound,
            _ => RepoError::Internal(e.to_string()),
        }
    }

    fn parse_key<T: std::str::FromStr<Err = UnknownVariant>>(raw: &str) -> RepoResult<T> {
        raw.parse().map_err(|e: UnknownVariant| RepoError::Internal(e.to_string()))
    }

    const SERVICE_COLS: &str = r#"id, title, description, icon, display_order AS "order", is_active, created_at"#;
    const FAQ_COLS: &str = r#"id, question, answer, display_order AS "order", is_active, created_at, updated_at"#;
    const CONTENT_COLS: &str = "id, content_type, content, is_active, created_at, updated_at";
    const TYPE_COLS: &str = "id, type_key, title, description, icon, features, button_text, button_url, button_color, display_order, is_active, created_at";
    const QUESTION_COLS: &str = "id, question, description, category, questioner_name, is_answered, display_order, is_active, created_at";
    const ANSWER_COLS: &str = r#"id, question_id, lawyer, answer, short_answer, lawyer_title, icon, display_order AS "order", is_active, created_at"#;
    const REQUEST_COLS: &str = "id, name, phone, email, consultation_type, subject, description, preferred_date, preferred_time, status, created_at, updated_at";
    const RESPONSE_COLS: &str = "id, request_id, responder, response_text, response_date, is_final";

    #[derive(sqlx::FromRow)]
    struct SiteContentRow {
        id: Id,
        content_type: String,
        content: String,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl TryFrom<SiteContentRow> for SiteContent {
        type Error = RepoError;
        fn try_from(r: SiteContentRow) -> RepoResult<Self> {
            Ok(SiteContent {
                id: r.id,
                content_type: parse_key(&r.content_type)?,
                content: r.content,
                is_active: r.is_active,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        }
    }

    #[derive(sqlx::FromRow)]
    struct ConsultationTypeRow {
        id: Id,
        type_key: String,
        title: String,
        description: String,
        icon: String,
        features: String,
        button_text: String,
        button_url: String,
        button_color: String,
        display_order: i32,
        is_active: bool,
        created_at: DateTime<Utc>,
    }

    impl TryFrom<ConsultationTypeRow> for ConsultationType {
        type Error = RepoError;
        fn try_from(r: ConsultationTypeRow) -> RepoResult<Self> {
            Ok(ConsultationType {
                id: r.id,
                type_key: parse_key(&r.type_key)?,
                title: r.title,
                description: r.description,
                icon: r.icon,
                features: r.features,
                button_text: r.button_text,
                button_url: r.button_url,
                button_color: r.button_color,
                order: r.display_order,
                is_active: r.is_active,
                created_at: r.created_at,
            })
        }
    }

    #[derive(sqlx::FromRow)]
    struct QuestionRow {
        id: Id,
        question: String,
        description: String,
        category: String,
        questioner_name: String,
        is_answered: bool,
        display_order: i32,
        is_active: bool,
        created_at: DateTime<Utc>,
    }

    impl TryFrom<QuestionRow> for RecentQuestion {
        type Error = RepoError;
        fn try_from(r: QuestionRow) -> RepoResult<Self> {
            Ok(RecentQuestion {
                id: r.id,
                question: r.question,
                description: r.description,
                category: parse_key(&r.category)?,
                questioner_name: r.questioner_name,
                is_answered: r.is_answered,
                order: r.display_order,
                is_active: r.is_active,
                created_at: r.created_at,
            })
        }
    }

    #[derive(sqlx::FromRow)]
    struct RequestRow {
        id: Id,
        name: String,
        phone: String,
        email: Option<String>,
        consultation_type: String,
        subject: String,
        description: String,
        preferred_date: Option<NaiveDate>,
        preferred_time: Option<NaiveTime>,
        status: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl TryFrom<RequestRow> for ConsultationRequest {
        type Error = RepoError;
        fn try_from(r: RequestRow) -> RepoResult<Self> {
            Ok(ConsultationRequest {
                id: r.id,
                name: r.name,
                phone: r.phone,
                email: r.email,
                consultation_type: parse_key(&r.consultation_type)?,
                subject: r.subject,
                description: r.description,
                preferred_date: r.preferred_date,
                preferred_time: r.preferred_time,
                status: parse_key(&r.status)?,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        }
    }

    fn convert<R, T: TryFrom<R, Error = RepoError>>(rows: Vec<R>) -> RepoResult<Vec<T>> {
        rows.into_iter().map(T::try_from).collect()
    }

    fn sql_limit(limit: Option<usize>) -> Option<i64> {
        limit.map(|n| n as i64)
    }

    #[async_trait]
    impl ContentRepo for PgRepo {
        async fn list_services(&self) -> RepoResult<Vec<Service>> {
            let sql = format!("SELECT {SERVICE_COLS} FROM services WHERE is_active ORDER BY display_order, created_at, id");
            sqlx::query_as::<_, Service>(&sql).fetch_all(&self.pool).await.map_err(db_err)
        }

        async fn create_service(&self, new: NewService) -> RepoResult<Service> {
            let sql = format!(
                "INSERT INTO services (title, description, icon, display_order, is_active) VALUES ($1,$2,$3,$4,$5) RETURNING {SERVICE_COLS}"
            );
            sqlx::query_as::<_, Service>(&sql)
                .bind(&new.title).bind(&new.description).bind(&new.icon).bind(new.order).bind(new.is_active)
                .fetch_one(&self.pool).await.map_err(db_err)
        }

        async fn list_faqs(&self, limit: Option<usize>) -> RepoResult<Vec<Faq>> {
            // LIMIT NULL means no limit in Postgres
            let sql = format!("SELECT {FAQ_COLS} FROM faqs WHERE is_active ORDER BY display_order, created_at, id LIMIT $1");
            sqlx::query_as::<_, Faq>(&sql).bind(sql_limit(limit)).fetch_all(&self.pool).await.map_err(db_err)
        }

        async fn create_faq(&self, new: NewFaq) -> RepoResult<Faq> {
            let sql = format!(
                "INSERT INTO faqs (question, answer, display_order, is_active) VALUES ($1,$2,$3,$4) RETURNING {FAQ_COLS}"
            );
            sqlx::query_as::<_, Faq>(&sql)
                .bind(&new.question).bind(&new.answer).bind(new.order).bind(new.is_active)
                .fetch_one(&self.pool).await.map_err(db_err)
        }

        async fn service_exists(&self, title: &str) -> RepoResult<bool> {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM services WHERE title = $1)")
                .bind(title).fetch_one(&self.pool).await.map_err(db_err)
        }

        async fn faq_exists(&self, question: &str) -> RepoResult<bool> {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM faqs WHERE question = $1)")
                .bind(question).fetch_one(&self.pool).await.map_err(db_err)
        }

        async fn list_site_content(&self) -> RepoResult<Vec<SiteContent>> {
            let sql = format!("SELECT {CONTENT_COLS} FROM site_contents WHERE is_active ORDER BY content_type");
            let rows = sqlx::query_as::<_, SiteContentRow>(&sql).fetch_all(&self.pool).await.map_err(db_err)?;
            convert(rows)
        }

        async fn upsert_site_content(&self, new: NewSiteContent) -> RepoResult<SiteContent> {
            let sql = format!(
                "INSERT INTO site_contents (content_type, content, is_active) VALUES ($1,$2,$3) \
                 ON CONFLICT (content_type) DO UPDATE SET content = EXCLUDED.content, is_active = EXCLUDED.is_active, updated_at = now() \
                 RETURNING {CONTENT_COLS}"
            );
            let row = sqlx::query_as::<_, SiteContentRow>(&sql)
                .bind(new.content_type.as_str()).bind(&new.content).bind(new.is_active)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
    }

    #[async_trait]
    impl ConsultationTypeRepo for PgRepo {
        async fn list_consultation_types(&self, kinds: Option<&[ConsultationKind]>) -> RepoResult<Vec<ConsultationType>> {
            let keys: Option<Vec<String>> = kinds.map(|k| k.iter().map(|k| k.as_str().to_string()).collect());
            let sql = format!(
                "SELECT {TYPE_COLS} FROM consultation_types \
                 WHERE is_active AND ($1::text[] IS NULL OR type_key = ANY($1)) \
                 ORDER BY display_order, created_at, id"
            );
            let rows = sqlx::query_as::<_, ConsultationTypeRow>(&sql).bind(keys).fetch_all(&self.pool).await.map_err(db_err)?;
            convert(rows)
        }

        async fn create_consultation_type(&self, new: NewConsultationType) -> RepoResult<ConsultationType> {
            let sql = format!(
                "INSERT INTO consultation_types (type_key, title, description, icon, features, button_text, button_url, button_color, display_order, is_active) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) RETURNING {TYPE_COLS}"
            );
            let row = sqlx::query_as::<_, ConsultationTypeRow>(&sql)
                .bind(new.type_key.as_str())
                .bind(&new.title)
                .bind(&new.description)
                .bind(&new.icon)
                .bind(&new.features)
                .bind(&new.button_text)
                .bind(&new.button_url)
                .bind(&new.button_color)
                .bind(new.order)
                .bind(new.is_active)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }
    }

    #[async_trait]
    impl QuestionRepo for PgRepo {
        async fn list_recent_questions(&self, limit: usize) -> RepoResult<Vec<RecentQuestion>> {
            let sql = format!(
                "SELECT {QUESTION_COLS} FROM recent_questions WHERE is_active \
                 ORDER BY display_order, created_at DESC, id DESC LIMIT $1"
            );
            let rows = sqlx::query_as::<_, QuestionRow>(&sql).bind(limit as i64).fetch_all(&self.pool).await.map_err(db_err)?;
            convert(rows)
        }

        async fn get_question(&self, id: Id) -> RepoResult<RecentQuestion> {
            let sql = format!("SELECT {QUESTION_COLS} FROM recent_questions WHERE id = $1");
            let row = sqlx::query_as::<_, QuestionRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }

        async fn filter_questions(&self, filter: &QuestionFilter, window: PageWindow) -> RepoResult<(Vec<RecentQuestion>, usize)> {
            let category = match filter.category {
                CategoryFilter::All => None,
                CategoryFilter::Only(c) => Some(c.as_str()),
                CategoryFilter::Unknown => return Ok((Vec::new(), 0)),
            };
            let order_by = match filter.order {
                QuestionOrder::Display => "display_order, created_at DESC, id DESC",
                QuestionOrder::Newest => "created_at DESC, id DESC",
                QuestionOrder::Oldest => "created_at, id",
            };
            let predicate = "is_active AND ($1::text IS NULL OR category = $1) AND ($2::bool IS NULL OR is_answered = $2)";

            let count_sql = format!("SELECT COUNT(*) FROM recent_questions WHERE {predicate}");
            let total: i64 = sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(category).bind(filter.answered)
                .fetch_one(&self.pool).await.map_err(db_err)?;

            let sql = format!(
                "SELECT {QUESTION_COLS} FROM recent_questions WHERE {predicate} ORDER BY {order_by} LIMIT $3 OFFSET $4"
            );
            let rows = sqlx::query_as::<_, QuestionRow>(&sql)
                .bind(category).bind(filter.answered)
                .bind(window.limit as i64).bind(window.offset as i64)
                .fetch_all(&self.pool).await.map_err(db_err)?;
            Ok((convert(rows)?, total as usize))
        }

        async fn question_stats(&self) -> RepoResult<QuestionStats> {
            let (total, answered, unanswered): (i64, i64, i64) = sqlx::query_as(
                "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_answered), COUNT(*) FILTER (WHERE NOT is_answered) \
                 FROM recent_questions WHERE is_active",
            )
            .fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(QuestionStats {
                total_questions: total as usize,
                answered_questions: answered as usize,
                unanswered_questions: unanswered as usize,
            })
        }

        async fn answer_counts(&self, question_ids: &[Id]) -> RepoResult<HashMap<Id, i64>> {
            if question_ids.is_empty() {
                return Ok(HashMap::new());
            }
            let rows: Vec<(Id, i64)> = sqlx::query_as(
                "SELECT question_id, COUNT(*) FROM lawyer_answers \
                 WHERE is_active AND question_id = ANY($1) GROUP BY question_id",
            )
            .bind(question_ids.to_vec())
            .fetch_all(&self.pool).await.map_err(db_err)?;
            Ok(rows.into_iter().collect())
        }

        async fn search_questions(&self, query: &str, limit: usize) -> RepoResult<Vec<RecentQuestion>> {
            // strpos avoids LIKE wildcard escaping of user input
            let sql = format!(
                "SELECT {QUESTION_COLS} FROM recent_questions \
                 WHERE is_active AND (strpos(lower(question), lower($1)) > 0 OR strpos(lower(description), lower($1)) > 0) \
                 ORDER BY created_at DESC, id DESC LIMIT $2"
            );
            let rows = sqlx::query_as::<_, QuestionRow>(&sql)
                .bind(query).bind(limit as i64)
                .fetch_all(&self.pool).await.map_err(db_err)?;
            convert(rows)
        }

        async fn question_exists(&self, text: &str) -> RepoResult<bool> {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM recent_questions WHERE question = $1)")
                .bind(text).fetch_one(&self.pool).await.map_err(db_err)
        }

        async fn create_question(&self, new: NewRecentQuestion) -> RepoResult<RecentQuestion> {
            let sql = format!(
                "INSERT INTO recent_questions (question, description, category, questioner_name, is_answered, display_order, is_active) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7) RETURNING {QUESTION_COLS}"
            );
            let row = sqlx::query_as::<_, QuestionRow>(&sql)
                .bind(&new.question)
                .bind(&new.description)
                .bind(new.category.as_str())
                .bind(&new.questioner_name)
                .bind(new.is_answered)
                .bind(new.order)
                .bind(new.is_active)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }

        async fn delete_question(&self, id: Id) -> RepoResult<()> {
            // answers go with the ON DELETE CASCADE foreign key
            let done = sqlx::query("DELETE FROM recent_questions WHERE id = $1")
                .bind(id).execute(&self.pool).await.map_err(db_err)?;
            if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }

        async fn list_answers(&self, question_id: Id) -> RepoResult<Vec<LawyerAnswer>> {
            let sql = format!(
                "SELECT {ANSWER_COLS} FROM lawyer_answers WHERE is_active AND question_id = $1 \
                 ORDER BY display_order, created_at DESC, id DESC"
            );
            sqlx::query_as::<_, LawyerAnswer>(&sql).bind(question_id).fetch_all(&self.pool).await.map_err(db_err)
        }

        async fn list_latest_answers(&self, limit: usize) -> RepoResult<Vec<(LawyerAnswer, RecentQuestion)>> {
            let sql = format!(
                "SELECT {ANSWER_COLS} FROM lawyer_answers \
                 WHERE is_active AND question_id IN (SELECT id FROM recent_questions WHERE is_active) \
                 ORDER BY display_order, created_at DESC, id DESC LIMIT $1"
            );
            let answers = sqlx::query_as::<_, LawyerAnswer>(&sql).bind(limit as i64).fetch_all(&self.pool).await.map_err(db_err)?;
            let ids: Vec<Id> = answers.iter().map(|a| a.question_id).collect();
            let sql = format!("SELECT {QUESTION_COLS} FROM recent_questions WHERE id = ANY($1)");
            let rows = sqlx::query_as::<_, QuestionRow>(&sql).bind(ids).fetch_all(&self.pool).await.map_err(db_err)?;
            let questions: HashMap<Id, RecentQuestion> = convert::<_, RecentQuestion>(rows)?
                .into_iter()
                .map(|q| (q.id, q))
                .collect();
            Ok(answers
                .into_iter()
                .filter_map(|a| questions.get(&a.question_id).cloned().map(|q| (a, q)))
                .collect())
        }

        async fn create_answer(&self, question_id: Id, lawyer: &str, new: NewLawyerAnswer) -> RepoResult<LawyerAnswer> {
            let sql = format!(
                "INSERT INTO lawyer_answers (question_id, lawyer, answer, short_answer, lawyer_title, icon, display_order, is_active) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8) RETURNING {ANSWER_COLS}"
            );
            sqlx::query_as::<_, LawyerAnswer>(&sql)
                .bind(question_id)
                .bind(lawyer)
                .bind(&new.answer)
                .bind(&new.short_answer)
                .bind(&new.lawyer_title)
                .bind(&new.icon)
                .bind(new.order)
                .bind(new.is_active)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl IntakeRepo for PgRepo {
        async fn create_request(&self, new: NewConsultationRequest) -> RepoResult<ConsultationRequest> {
            let sql = format!(
                "INSERT INTO consultation_requests (name, phone, email, consultation_type, subject, description, preferred_date, preferred_time) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8) RETURNING {REQUEST_COLS}"
            );
            let row = sqlx::query_as::<_, RequestRow>(&sql)
                .bind(&new.name)
                .bind(&new.phone)
                .bind(&new.email)
                .bind(new.consultation_type.as_str())
                .bind(&new.subject)
                .bind(&new.description)
                .bind(new.preferred_date)
                .bind(new.preferred_time)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }

        async fn list_requests(&self, window: PageWindow) -> RepoResult<(Vec<ConsultationRequest>, usize)> {
            let total: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM consultation_requests")
                .fetch_one(&self.pool).await.map_err(db_err)?;
            let sql = format!(
                "SELECT {REQUEST_COLS} FROM consultation_requests ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
            );
            let rows = sqlx::query_as::<_, RequestRow>(&sql)
                .bind(window.limit as i64).bind(window.offset as i64)
                .fetch_all(&self.pool).await.map_err(db_err)?;
            Ok((convert(rows)?, total as usize))
        }

        async fn get_request(&self, id: Id) -> RepoResult<ConsultationRequest> {
            let sql = format!("SELECT {REQUEST_COLS} FROM consultation_requests WHERE id = $1");
            let row = sqlx::query_as::<_, RequestRow>(&sql).bind(id).fetch_one(&self.pool).await.map_err(db_err)?;
            row.try_into()
        }

        async fn update_request_status(&self, id: Id, status: RequestStatus) -> RepoResult<ConsultationRequest> {
            // the transition guard lives in the WHERE clause so check-and-set is one statement
            let allowed: Vec<String> = status.predecessors().iter().map(|s| s.as_str().to_string()).collect();
            let sql = format!(
                "UPDATE consultation_requests SET status = $2, updated_at = now() \
                 WHERE id = $1 AND status = ANY($3) RETURNING {REQUEST_COLS}"
            );
            let row = sqlx::query_as::<_, RequestRow>(&sql)
                .bind(id).bind(status.as_str()).bind(allowed)
                .fetch_optional(&self.pool).await.map_err(db_err)?;
            match row {
                Some(row) => row.try_into(),
                None => {
                    self.get_request(id).await?;
                    Err(RepoError::Conflict)
                }
            }
        }

        async fn delete_request(&self, id: Id) -> RepoResult<()> {
            let done = sqlx::query("DELETE FROM consultation_requests WHERE id = $1")
                .bind(id).execute(&self.pool).await.map_err(db_err)?;
            if done.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }

        async fn list_responses(&self, request_id: Id) -> RepoResult<Vec<ConsultationResponse>> {
            let sql = format!(
                "SELECT {RESPONSE_COLS} FROM consultation_responses WHERE request_id = $1 ORDER BY response_date, id"
            );
            sqlx::query_as::<_, ConsultationResponse>(&sql).bind(request_id).fetch_all(&self.pool).await.map_err(db_err)
        }

        async fn create_response(&self, request_id: Id, responder: &str, new: NewConsultationResponse) -> RepoResult<ConsultationResponse> {
            // the partial unique index on (request_id) WHERE is_final rejects a second final answer
            let sql = format!(
                "INSERT INTO consultation_responses (request_id, responder, response_text, is_final) \
                 VALUES ($1,$2,$3,$4) RETURNING {RESPONSE_COLS}"
            );
            sqlx::query_as::<_, ConsultationResponse>(&sql)
                .bind(request_id).bind(responder).bind(&new.response_text).bind(new.is_final)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
    }
}

/// Opens the backend selected by the enabled features.
#[cfg(feature = "postgres-store")]
pub async fn from_config(cfg: &crate::config::Config) -> anyhow::Result<std::sync::Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;

    let db_url = cfg
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
    let pool = PgPoolOptions::new().max_connections(5).connect(db_url).await?;
    let repo = pg::PgRepo::new(pool);
    repo.migrate().await?;
    tracing::info!("Using Postgres repository backend");
    Ok(std::sync::Arc::new(repo))
}

/// Opens the backend selected by the enabled features.
#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
pub async fn from_config(cfg: &crate::config::Config) -> anyhow::Result<std::sync::Arc<dyn Repo>> {
    let repo = match cfg.snapshot_path() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using in-memory repository backend with snapshot");
            inmem::InMemRepo::with_snapshot(path)?
        }
        None => {
            tracing::info!("Using in-memory repository backend");
            inmem::InMemRepo::new()
        }
    };
    Ok(std::sync::Arc::new(repo))
}
