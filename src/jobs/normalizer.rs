// src/jobs/normalizer.rs
//! Maps raw aggregator payloads onto the common `Job` shape

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, warn};

use super::model::{Job, Seniority};

const ID_FIELDS: &[&str] = &["id", "job_id"];
const TITLE_FIELDS: &[&str] = &["title", "job_title", "position", "role"];
const COMPANY_FIELDS: &[&str] = &[
    "company",
    "company_name",
    "employer",
    "employer_name",
    "organization",
];
const LOCATION_FIELDS: &[&str] = &[
    "location",
    "job_city",
    "city",
    "place",
    "address",
    "job_country",
];
const DESCRIPTION_FIELDS: &[&str] = &[
    "description",
    "job_description",
    "summary",
    "snippet",
    "details",
    "requirements",
];
const APPLY_URL_FIELDS: &[&str] = &[
    "apply_url",
    "job_apply_link",
    "url",
    "link",
    "application_url",
    "apply_link",
];
const EMPLOYMENT_TYPE_FIELDS: &[&str] = &[
    "employment_type",
    "job_employment_type",
    "type",
    "contract_type",
    "work_type",
];
const DATE_FIELDS: &[&str] = &[
    "created_at",
    "posted_at",
    "job_posted_at_datetime_utc",
    "updated",
    "date",
    "timestamp",
];
const REMOTE_FLAG_FIELDS: &[&str] = &["job_is_remote", "is_remote", "remote"];

pub const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "python",
        &["python", "django", "flask", "fastapi", "pandas", "numpy"],
    ),
    (
        "machine_learning",
        &[
            "machine learning",
            "ml",
            "ai",
            "artificial intelligence",
            "deep learning",
        ],
    ),
    (
        "data_science",
        &["data science", "data scientist", "analytics", "statistics"],
    ),
    (
        "nlp",
        &[
            "nlp",
            "natural language processing",
            "text mining",
            "computational linguistics",
        ],
    ),
    (
        "web_development",
        &[
            "web development",
            "frontend",
            "backend",
            "full stack",
            "react",
            "angular",
            "vue",
        ],
    ),
    (
        "data_engineering",
        &[
            "data engineering",
            "etl",
            "data pipeline",
            "big data",
            "hadoop",
            "spark",
        ],
    ),
    (
        "software_engineering",
        &[
            "software engineering",
            "software development",
            "programming",
            "coding",
        ],
    ),
    (
        "cloud",
        &["aws", "azure", "gcp", "cloud computing", "docker", "kubernetes"],
    ),
    (
        "database",
        &["sql", "mysql", "postgresql", "mongodb", "redis", "database"],
    ),
    (
        "devops",
        &["devops", "ci/cd", "jenkins", "git", "terraform", "ansible"],
    ),
];

const SENIORITY_INDICATORS: &[(Seniority, &[&str])] = &[
    (
        Seniority::Fresher,
        &["fresher", "entry level", "junior", "0-1 years", "0-2 years"],
    ),
    (
        Seniority::Junior,
        &["junior", "1-3 years", "2-4 years", "associate"],
    ),
    (
        Seniority::Mid,
        &["mid level", "3-5 years", "4-6 years", "intermediate"],
    ),
    (
        Seniority::Senior,
        &["senior", "5+ years", "6+ years", "lead", "principal"],
    ),
    (
        Seniority::Expert,
        &["expert", "8+ years", "10+ years", "architect", "staff"],
    ),
];

const REMOTE_INDICATORS: &[&str] = &[
    "remote",
    "work from home",
    "wfh",
    "virtual",
    "telecommute",
    "distributed",
    "anywhere",
    "flexible location",
];

pub struct JobNormalizer {
    skill_patterns: Vec<(&'static str, Regex)>,
    experience_pattern: Regex,
}

impl JobNormalizer {
    pub fn new() -> Result<Self> {
        let skill_patterns = SKILL_KEYWORDS
            .iter()
            .map(|(category, keywords)| {
                let alternatives = keywords
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                let pattern = format!(r"(?i)\b({})\b", alternatives);
                Regex::new(&pattern)
                    .with_context(|| format!("Invalid skill pattern for {}", category))
                    .map(|re| (*category, re))
            })
            .collect::<Result<Vec<_>>>()?;

        // "0-2 years", "3+ years", "4 yrs", "2 to 4 years", "1.5 years"; group 1 is the
        // integer part of the lower bound
        let experience_pattern = Regex::new(
            r"(?i)\b(\d{1,2})(?:\.\d+)?\s*(?:(?:-|–|to)\s*\d{1,2}(?:\.\d+)?\s*)?\+?\s*(?:years?|yrs?)\b",
        )
        .context("Invalid experience pattern")?;

        Ok(Self {
            skill_patterns,
            experience_pattern,
        })
    }

    /// Normalize one raw record; `None` when a required field is missing
    pub fn normalize(&self, raw: &Value, source: &str) -> Option<Job> {
        let source_job_id = first_field(raw, ID_FIELDS).unwrap_or_default();
        let title = first_field(raw, TITLE_FIELDS).unwrap_or_default();
        let company = first_field(raw, COMPANY_FIELDS).unwrap_or_default();
        let apply_url = first_field(raw, APPLY_URL_FIELDS).unwrap_or_default();

        if source_job_id.is_empty() || title.is_empty() || company.is_empty() || apply_url.is_empty()
        {
            warn!(
                "Skipping {} job with missing required fields: {:?}",
                source, title
            );
            return None;
        }

        let location = first_field(raw, LOCATION_FIELDS).unwrap_or_default();
        let description = first_field(raw, DESCRIPTION_FIELDS)
            .map(|d| strip_html(&d))
            .filter(|d| !d.is_empty());
        let employment_type = first_field(raw, EMPLOYMENT_TYPE_FIELDS);

        let text = format!("{} {}", title, description.as_deref().unwrap_or("")).to_lowercase();

        let job = Job {
            source: source.to_string(),
            skills: self.extract_skills(&text),
            seniority: determine_seniority(&text),
            experience_years: self.extract_experience_years(&text),
            remote: is_remote(&text, &location) || remote_flag(raw),
            created_at: extract_created_at(raw),
            source_job_id,
            title,
            company,
            location,
            description,
            apply_url,
            employment_type,
        };

        debug!("Normalized {} job: {} at {}", source, job.title, job.company);
        Some(job)
    }

    /// Skill categories whose keywords appear as whole words, sorted
    pub fn extract_skills(&self, text: &str) -> Vec<String> {
        let mut skills: Vec<String> = self
            .skill_patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(category, _)| category.to_string())
            .collect();
        skills.sort();
        skills
    }

    /// Smallest lower bound of any "N years" style requirement
    pub fn extract_experience_years(&self, text: &str) -> Option<u32> {
        self.experience_pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .min()
    }
}

pub fn determine_seniority(text: &str) -> Option<Seniority> {
    let lowered = text.to_lowercase();
    SENIORITY_INDICATORS
        .iter()
        .find(|(_, indicators)| indicators.iter().any(|i| lowered.contains(i)))
        .map(|(level, _)| *level)
}

pub fn is_remote(text: &str, location: &str) -> bool {
    let lowered = format!("{} {}", text, location).to_lowercase();
    REMOTE_INDICATORS.iter().any(|i| lowered.contains(i))
}

fn remote_flag(raw: &Value) -> bool {
    REMOTE_FLAG_FIELDS
        .iter()
        .any(|field| raw.get(field).and_then(Value::as_bool).unwrap_or(false))
}

fn first_field(raw: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        let text = match raw.get(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

/// Strip markup from aggregator snippets and collapse whitespace
pub fn strip_html(text: &str) -> String {
    let plain = if text.contains('<') {
        Html::parse_fragment(text)
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.to_string()
    };
    plain.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_created_at(raw: &Value) -> DateTime<Utc> {
    DATE_FIELDS
        .iter()
        .filter_map(|field| raw.get(field))
        .find_map(parse_date_value)
        .unwrap_or_else(Utc::now)
}

fn parse_date_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn normalizer() -> JobNormalizer {
        JobNormalizer::new().unwrap()
    }

    #[test]
    fn test_normalize_jooble_payload() {
        let raw = json!({
            "id": 8812345,
            "title": "Junior Python Developer",
            "company": "Acme Labs",
            "location": "Bengaluru, Karnataka",
            "snippet": "<b>Django</b> and SQL experience, 0-2 years. Work from home possible.",
            "link": "https://jooble.org/desc/8812345",
            "type": "Full-time",
            "updated": "2024-05-01T10:30:00.0000000"
        });

        let job = normalizer().normalize(&raw, "jooble").unwrap();
        assert_eq!(job.source_job_id, "8812345");
        assert_eq!(job.company, "Acme Labs");
        assert_eq!(
            job.description.as_deref(),
            Some("Django and SQL experience, 0-2 years. Work from home possible.")
        );
        assert_eq!(job.skills, vec!["database", "python"]);
        assert_eq!(job.seniority, Some(Seniority::Fresher));
        assert_eq!(job.experience_years, Some(0));
        assert!(job.remote);
        assert_eq!(job.employment_type.as_deref(), Some("Full-time"));
        assert_eq!(job.created_at.year(), 2024);
        assert_eq!(job.created_at.hour(), 10);
    }

    #[test]
    fn test_normalize_jsearch_payload() {
        let raw = json!({
            "job_id": "abc123",
            "job_title": "Data Analyst",
            "employer_name": "Globex",
            "job_city": "Pune",
            "job_description": "Statistics and Excel",
            "job_apply_link": "https://globex.example/apply",
            "job_employment_type": "FULLTIME",
            "job_is_remote": true,
            "job_posted_at_datetime_utc": "2024-03-02T08:00:00.000Z"
        });

        let job = normalizer().normalize(&raw, "rapidapi").unwrap();
        assert_eq!(job.title, "Data Analyst");
        assert_eq!(job.company, "Globex");
        assert_eq!(job.location, "Pune");
        assert_eq!(job.skills, vec!["data_science"]);
        assert!(job.remote);
        assert_eq!(job.created_at.month(), 3);
    }

    #[test]
    fn test_missing_required_fields_are_rejected() {
        let raw = json!({ "id": "1", "title": "Engineer", "link": "https://x.example" });
        assert!(normalizer().normalize(&raw, "jooble").is_none());

        let blank_company = json!({
            "id": "1", "title": "Engineer", "company": "   ", "link": "https://x.example"
        });
        assert!(normalizer().normalize(&blank_company, "jooble").is_none());
    }

    #[test]
    fn test_skills_match_whole_words_only() {
        let n = normalizer();
        assert!(n.extract_skills("maintain html emails").is_empty());
        assert_eq!(n.extract_skills("mail and ai tooling"), vec!["machine_learning"]);
        assert_eq!(n.extract_skills("ci/cd with git"), vec!["devops"]);
    }

    #[test]
    fn test_seniority_priority_order() {
        assert_eq!(
            determine_seniority("Junior Backend Engineer"),
            Some(Seniority::Fresher)
        );
        assert_eq!(
            determine_seniority("Associate Consultant"),
            Some(Seniority::Junior)
        );
        assert_eq!(
            determine_seniority("Senior Staff Engineer"),
            Some(Seniority::Senior)
        );
        assert_eq!(determine_seniority("Software Engineer"), None);
    }

    #[test]
    fn test_experience_years_extraction() {
        let n = normalizer();
        assert_eq!(n.extract_experience_years("requires 3+ years of rust"), Some(3));
        assert_eq!(n.extract_experience_years("2 to 4 years experience"), Some(2));
        assert_eq!(
            n.extract_experience_years("5 yrs backend, 1-2 years cloud"),
            Some(1)
        );
        assert_eq!(n.extract_experience_years("freshers welcome"), None);
    }

    #[test]
    fn test_fractional_experience_keeps_integer_part() {
        let n = normalizer();
        assert_eq!(
            n.extract_experience_years("requires 1.5 years of python"),
            Some(1)
        );
        assert_eq!(n.extract_experience_years("1.5+ years with Django"), Some(1));
        assert_eq!(n.extract_experience_years("0.5-2.5 yrs"), Some(0));

        let job = n
            .normalize(
                &json!({
                    "id": "7",
                    "title": "Junior Developer",
                    "company": "Acme",
                    "link": "https://example.com/7",
                    "snippet": "1.5+ years experience with Django"
                }),
                "jooble",
            )
            .unwrap();
        assert_eq!(job.experience_years, Some(1));
    }

    #[test]
    fn test_created_at_formats() {
        let date_only = extract_created_at(&json!({ "date": "2023-12-25" }));
        assert_eq!((date_only.month(), date_only.day()), (12, 25));

        let unix = extract_created_at(&json!({ "timestamp": 1_700_000_000 }));
        assert_eq!(unix.timestamp(), 1_700_000_000);

        let before = Utc::now();
        let fallback = extract_created_at(&json!({ "date": "yesterday" }));
        assert!(fallback >= before);
    }
}
