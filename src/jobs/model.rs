// src/jobs/model.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seniority buckets, in the order they are probed during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Fresher,
    Junior,
    Mid,
    Senior,
    Expert,
}

impl Seniority {
    pub const ALL: [Seniority; 5] = [
        Self::Fresher,
        Self::Junior,
        Self::Mid,
        Self::Senior,
        Self::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresher => "fresher",
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Seniority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown seniority level: {}", s))
    }
}

/// Normalized job posting, independent of the source schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub source: String,
    pub source_job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub apply_url: String,
    pub skills: Vec<String>,
    pub seniority: Option<Seniority>,
    pub experience_years: Option<u32>,
    pub remote: bool,
    pub employment_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A job as persisted in `jobs_clean`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredJob {
    pub id: String,
    #[serde(flatten)]
    pub job: Job,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) fn sample_job(title: &str, company: &str, location: &str) -> Job {
    Job {
        source: "jooble".to_string(),
        source_job_id: format!("{}-{}", company, title).to_lowercase(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        description: None,
        apply_url: "https://example.com/apply".to_string(),
        skills: vec!["python".to_string()],
        seniority: Some(Seniority::Fresher),
        experience_years: None,
        remote: false,
        employment_type: None,
        created_at: Utc::now(),
    }
}
