// src/jobs/filters.rs
//! Acceptance rules applied to normalized jobs

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::{Job, Seniority};

/// `job_filters` section of config.yaml; empty lists disable a rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFilters {
    pub allowed_locations: Vec<String>,
    pub required_skills: Vec<String>,
    pub excluded_seniority: Vec<String>,
    pub preferred_seniority: Vec<String>,
    pub max_experience_years: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Location,
    Skills,
    Seniority,
    Experience,
}

impl JobFilters {
    pub fn passes_location(&self, location: &str) -> bool {
        if self.allowed_locations.is_empty() {
            return true;
        }
        let location = location.to_lowercase();
        self.allowed_locations
            .iter()
            .any(|allowed| location.contains(&allowed.to_lowercase()))
    }

    pub fn passes_skills(&self, skills: &[String]) -> bool {
        if self.required_skills.is_empty() {
            return true;
        }
        self.required_skills.iter().any(|required| {
            skills
                .iter()
                .any(|skill| skill.eq_ignore_ascii_case(required))
        })
    }

    pub fn passes_seniority(&self, seniority: Option<Seniority>) -> bool {
        let Some(level) = seniority else {
            return true;
        };
        let matches = |list: &[String]| list.iter().any(|l| l.eq_ignore_ascii_case(level.as_str()));

        if matches(&self.excluded_seniority) {
            return false;
        }
        self.preferred_seniority.is_empty() || matches(&self.preferred_seniority)
    }

    pub fn passes_experience(&self, years: Option<u32>) -> bool {
        match (self.max_experience_years, years) {
            (Some(max), Some(years)) => years <= max,
            _ => true,
        }
    }

    /// First rule the job fails, if any
    pub fn rejection_reason(&self, job: &Job) -> Option<Rejection> {
        if !self.passes_location(&job.location) {
            Some(Rejection::Location)
        } else if !self.passes_skills(&job.skills) {
            Some(Rejection::Skills)
        } else if !self.passes_seniority(job.seniority) {
            Some(Rejection::Seniority)
        } else if !self.passes_experience(job.experience_years) {
            Some(Rejection::Experience)
        } else {
            None
        }
    }

    pub fn passes(&self, job: &Job) -> bool {
        self.rejection_reason(job).is_none()
    }

    pub fn filter(&self, jobs: Vec<Job>) -> Vec<Job> {
        let total = jobs.len();
        let kept: Vec<Job> = jobs
            .into_iter()
            .filter(|job| match self.rejection_reason(job) {
                Some(reason) => {
                    debug!("Rejected {} at {}: {:?}", job.title, job.company, reason);
                    false
                }
                None => true,
            })
            .collect();
        info!("Filtered {} jobs down to {}", total, kept.len());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::sample_job;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_filters_accept_everything() {
        let filters = JobFilters::default();
        let mut job = sample_job("Anything", "Anyone", "");
        job.skills.clear();
        job.seniority = Some(Seniority::Expert);
        job.experience_years = Some(15);
        assert!(filters.passes(&job));
    }

    #[test]
    fn test_location_substring_match() {
        let filters = JobFilters {
            allowed_locations: strings(&["india", "Remote"]),
            ..Default::default()
        };
        assert!(filters.passes_location("Bengaluru, Karnataka, India"));
        assert!(filters.passes_location("REMOTE"));
        assert!(!filters.passes_location("Berlin, Germany"));
        assert!(!filters.passes_location(""));
    }

    #[test]
    fn test_skills_require_one_match() {
        let filters = JobFilters {
            required_skills: strings(&["Python", "nlp"]),
            ..Default::default()
        };
        assert!(filters.passes_skills(&strings(&["cloud", "python"])));
        assert!(!filters.passes_skills(&strings(&["cloud"])));
        assert!(!filters.passes_skills(&[]));
    }

    #[test]
    fn test_seniority_rules() {
        let filters = JobFilters {
            excluded_seniority: strings(&["senior", "expert"]),
            preferred_seniority: strings(&["fresher", "junior"]),
            ..Default::default()
        };
        assert!(filters.passes_seniority(None));
        assert!(filters.passes_seniority(Some(Seniority::Fresher)));
        assert!(!filters.passes_seniority(Some(Seniority::Mid)));
        assert!(!filters.passes_seniority(Some(Seniority::Senior)));

        let exclude_only = JobFilters {
            excluded_seniority: strings(&["SENIOR"]),
            ..Default::default()
        };
        assert!(exclude_only.passes_seniority(Some(Seniority::Mid)));
        assert!(!exclude_only.passes_seniority(Some(Seniority::Senior)));
    }

    #[test]
    fn test_rejection_reason_and_filter() {
        let filters = JobFilters {
            allowed_locations: strings(&["pune"]),
            max_experience_years: Some(2),
            ..Default::default()
        };
        let ok = sample_job("Analyst", "Acme", "Pune");
        let elsewhere = sample_job("Analyst", "Acme", "Delhi");
        let mut too_senior = sample_job("Engineer", "Acme", "Pune");
        too_senior.experience_years = Some(5);

        assert_eq!(filters.rejection_reason(&ok), None);
        assert_eq!(
            filters.rejection_reason(&elsewhere),
            Some(Rejection::Location)
        );
        assert_eq!(
            filters.rejection_reason(&too_senior),
            Some(Rejection::Experience)
        );

        let kept = filters.filter(vec![ok.clone(), elsewhere, too_senior]);
        assert_eq!(kept, vec![ok]);
    }
}
