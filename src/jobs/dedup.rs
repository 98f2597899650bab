// src/jobs/dedup.rs
//! Fuzzy duplicate detection over normalized jobs

use strsim::normalized_levenshtein;
use tracing::{debug, info};

use super::model::Job;

pub const DEFAULT_TITLE_THRESHOLD: f64 = 0.8;
const COMPANY_THRESHOLD: f64 = 0.7;
const LOCATION_THRESHOLD: f64 = 0.7;

/// Similarity in [0, 1] between two already-lowercased strings
pub fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

/// Similarity after sorting word tokens, so "Engineer Python" matches "python engineer"
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect();
    tokens.sort();
    tokens.join(" ")
}

/// Two postings are the same when company, title and location match exactly,
/// or the titles are near-identical and company and location are close.
pub fn is_duplicate(a: &Job, b: &Job, threshold: f64) -> bool {
    let (title_a, title_b) = (a.title.to_lowercase(), b.title.to_lowercase());
    let (company_a, company_b) = (a.company.to_lowercase(), b.company.to_lowercase());
    let (location_a, location_b) = (a.location.to_lowercase(), b.location.to_lowercase());

    if company_a == company_b && title_a == title_b && location_a == location_b {
        return true;
    }

    token_sort_ratio(&title_a, &title_b) > threshold
        && ratio(&company_a, &company_b) > COMPANY_THRESHOLD
        && ratio(&location_a, &location_b) > LOCATION_THRESHOLD
}

/// Keep the first occurrence of every posting, preserving input order
pub fn deduplicate(jobs: Vec<Job>, threshold: f64) -> Vec<Job> {
    let total = jobs.len();
    let mut unique: Vec<Job> = Vec::with_capacity(total);

    for job in jobs {
        match unique.iter().find(|kept| is_duplicate(&job, kept, threshold)) {
            Some(kept) => debug!(
                "Found duplicate: {} at {} (matches {} from {})",
                job.title, job.company, kept.source_job_id, kept.source
            ),
            None => unique.push(job),
        }
    }

    info!("Deduplicated {} jobs down to {}", total, unique.len());
    unique
}

/// Keep the `incoming` jobs that duplicate neither a known job nor an earlier incoming one
pub fn deduplicate_against(known: &[Job], incoming: Vec<Job>, threshold: f64) -> Vec<Job> {
    let total = incoming.len();
    let mut fresh: Vec<Job> = Vec::with_capacity(total);

    for job in incoming {
        let seen = known
            .iter()
            .chain(fresh.iter())
            .any(|kept| is_duplicate(&job, kept, threshold));
        if seen {
            debug!("Already known: {} at {}", job.title, job.company);
        } else {
            fresh.push(job);
        }
    }

    info!(
        "{} of {} incoming jobs are new against {} known",
        fresh.len(),
        total,
        known.len()
    );
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::sample_job;

    #[test]
    fn test_exact_match_ignores_case() {
        let a = sample_job("Python Developer", "Acme", "Pune");
        let b = sample_job("PYTHON developer", "ACME", "pune");
        assert!(is_duplicate(&a, &b, DEFAULT_TITLE_THRESHOLD));
    }

    #[test]
    fn test_reordered_title_is_duplicate() {
        let a = sample_job("Python Developer - Junior", "Acme Labs", "Bengaluru");
        let b = sample_job("Junior Python Developer", "Acme Labs", "Bengaluru");
        assert!(is_duplicate(&a, &b, DEFAULT_TITLE_THRESHOLD));
    }

    #[test]
    fn test_same_title_other_company_is_distinct() {
        let a = sample_job("Data Analyst", "Acme", "Pune");
        let b = sample_job("Data Analyst", "Initech", "Pune");
        assert!(!is_duplicate(&a, &b, DEFAULT_TITLE_THRESHOLD));
    }

    #[test]
    fn test_same_company_other_city_is_distinct() {
        let a = sample_job("Data Analyst", "Acme", "Pune");
        let b = sample_job("Data Analyst", "Acme", "Hyderabad");
        assert!(!is_duplicate(&a, &b, DEFAULT_TITLE_THRESHOLD));
    }

    #[test]
    fn test_token_sort_ratio() {
        assert_eq!(token_sort_ratio("b a", "a b"), 1.0);
        assert!(token_sort_ratio("frontend engineer", "data scientist") < 0.5);
    }

    #[test]
    fn test_deduplicate_keeps_first_and_order() {
        let jobs = vec![
            sample_job("ML Engineer", "Acme", "Pune"),
            sample_job("Web Developer", "Globex", "Delhi"),
            sample_job("ml engineer", "acme", "pune"),
            sample_job("Data Engineer", "Initech", "Chennai"),
        ];
        let unique = deduplicate(jobs, DEFAULT_TITLE_THRESHOLD);
        let titles: Vec<_> = unique.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["ML Engineer", "Web Developer", "Data Engineer"]);
    }

    #[test]
    fn test_deduplicate_against_known_jobs() {
        let known = vec![sample_job("ML Engineer", "Acme", "Pune")];
        let incoming = vec![
            sample_job("ml engineer", "ACME", "Pune"),
            sample_job("Web Developer", "Globex", "Delhi"),
            sample_job("Web Developer", "Globex", "Delhi"),
        ];
        let fresh = deduplicate_against(&known, incoming, DEFAULT_TITLE_THRESHOLD);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].title, "Web Developer");
    }

    #[test]
    fn test_deduplicate_empty() {
        assert!(deduplicate(Vec::new(), DEFAULT_TITLE_THRESHOLD).is_empty());
    }
}
