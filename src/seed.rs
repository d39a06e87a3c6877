//! Sample catalog content for fresh installs. Safe to run repeatedly: rows are
//! matched on their natural key and only missing ones are created.

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{NewConsultationType, NewFaq, NewLawyerAnswer, NewRecentQuestion, NewService};
use crate::repo::{Repo, RepoError};

pub const SAMPLE_DATA: &str = include_str!("../fixtures/sample_data.json");

#[derive(Debug, Deserialize)]
pub struct SampleQuestion {
    pub question: NewRecentQuestion,
    /// Staff identity recorded on the answer.
    pub lawyer: String,
    pub answer: NewLawyerAnswer,
}

#[derive(Debug, Deserialize)]
pub struct SampleData {
    pub consultation_types: Vec<NewConsultationType>,
    pub questions: Vec<SampleQuestion>,
    pub services: Vec<NewService>,
    pub faqs: Vec<NewFaq>,
}

impl SampleData {
    pub fn bundled() -> anyhow::Result<Self> {
        Ok(serde_json::from_str(SAMPLE_DATA)?)
    }
}

/// Where seeded rows are stored. The in-memory store without a snapshot
/// directory would drop everything on exit, so that is an error.
pub fn destination(cfg: &Config) -> anyhow::Result<String> {
    if cfg!(feature = "postgres-store") {
        return Ok("postgres".into());
    }
    match cfg.snapshot_path() {
        Some(path) => Ok(path.display().to_string()),
        None => anyhow::bail!("DADPARS_DATA_DIR is not set; seeding the in-memory store would save nothing"),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

pub async fn seed(repo: &dyn Repo, data: SampleData) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for new in data.consultation_types {
        let key = new.type_key;
        match repo.create_consultation_type(new).await {
            Ok(_) => {
                info!(type_key = key.as_str(), "created consultation type");
                report.created += 1;
            }
            Err(RepoError::Conflict) => {
                warn!(type_key = key.as_str(), "consultation type already exists");
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for sample in data.questions {
        if repo.question_exists(&sample.question.question).await? {
            report.skipped += 1;
            continue;
        }
        let question = repo.create_question(sample.question).await?;
        repo.create_answer(question.id, &sample.lawyer, sample.answer).await?;
        info!(id = question.id, "created question with answer");
        report.created += 1;
    }

    for new in data.services {
        if repo.service_exists(&new.title).await? {
            report.skipped += 1;
            continue;
        }
        repo.create_service(new).await?;
        report.created += 1;
    }

    for new in data.faqs {
        if repo.faq_exists(&new.question).await? {
            report.skipped += 1;
            continue;
        }
        repo.create_faq(new).await?;
        report.created += 1;
    }

    Ok(report)
}
