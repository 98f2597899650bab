// src/captions/generator.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::TextGenerator;
use crate::core::config_manager::{CaptionConfig, PostingConfig};
use crate::jobs::Job;
use crate::types::Platform;

const TITLE_EMOJI: &str = "🚀";
const LOCATION_EMOJI: &str = "📍";
const SKILLS_EMOJI: &str = "💼";
const APPLY_EMOJI: &str = "👉";

pub struct CaptionGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
    posting: PostingConfig,
}

impl CaptionGenerator {
    /// Without a text generator every caption comes from the fallback template
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, posting: &PostingConfig) -> Self {
        if generator.is_none() {
            warn!("No text generator configured, captions will use the fallback template");
        }
        Self {
            generator,
            posting: posting.clone(),
        }
    }

    fn config(&self, platform: Platform) -> CaptionConfig {
        self.posting.caption_config(platform)
    }

    /// Captions for every configured platform; platforms without a valid caption are left out
    pub async fn generate(&self, job: &Job) -> BTreeMap<Platform, String> {
        let mut captions = BTreeMap::new();
        for &platform in &self.posting.platforms {
            if let Some(caption) = self.generate_for(job, platform).await {
                info!("Generated {} caption for job: {}", platform, job.title);
                captions.insert(platform, caption);
            }
        }
        captions
    }

    pub async fn generate_for(&self, job: &Job, platform: Platform) -> Option<String> {
        let generated = match &self.generator {
            Some(generator) => match generator.generate_text(&self.build_prompt(job, platform)).await {
                Ok(text) => Some(clean_caption(&text)),
                Err(e) => {
                    error!("Error generating {} caption with Gemini: {:#}", platform, e);
                    None
                }
            },
            None => None,
        };

        if let Some(caption) = generated.map(|c| self.optimize(&c, platform)) {
            if self.validate(&caption, platform) {
                return Some(caption);
            }
            warn!("Generated {} caption for {} is invalid, using fallback", platform, job.title);
        }

        let fallback = self.optimize(&self.fallback_caption(job, platform), platform);
        if self.validate(&fallback, platform) {
            Some(fallback)
        } else {
            warn!("Fallback {} caption for {} is invalid, skipping", platform, job.title);
            None
        }
    }

    pub fn build_prompt(&self, job: &Job, platform: Platform) -> String {
        let config = self.config(platform);
        let skills = if job.skills.is_empty() {
            "N/A".to_string()
        } else {
            job.skills.join(", ")
        };
        let location = if job.location.is_empty() {
            "N/A"
        } else {
            &job.location
        };
        let remote = if job.remote { "Yes" } else { "No" };

        match platform {
            Platform::Linkedin => format!(
                r#"You are a concise social media assistant. Generate a professional LinkedIn post for this job:

Title: {title}
Company: {company}
Location: {location}
Skills: {skills}
Remote: {remote}
Link: {link}

Constraints:
- Maximum {max_length} characters
- {hashtags} relevant hashtags
- {tone} tone
- Target audience: {audience}
- Include the apply link
- Make it engaging but not overly promotional
- Focus on the opportunity and company

Format: Write the post content followed by hashtags on new lines."#,
                title = job.title,
                company = job.company,
                link = job.apply_url,
                max_length = config.max_length,
                hashtags = config.hashtag_count,
                tone = config.tone,
                audience = config.audience,
            ),
            Platform::X => format!(
                r#"Create a tweet (maximum {max_length} characters) about this job. Include {hashtags} hashtags and the link. Keep it readable and engaging.

Job details:
Title: {title}
Company: {company}
Location: {location}
Skills: {skills}
Remote: {remote}
Link: {link}

Tone: {tone}
Audience: {audience}

Requirements:
- Include the apply link
- Use {hashtags} relevant hashtags
- Make it engaging and shareable
- Stay within character limit"#,
                title = job.title,
                company = job.company,
                link = job.apply_url,
                max_length = config.max_length,
                hashtags = config.hashtag_count,
                tone = config.tone,
                audience = config.audience,
            ),
        }
    }

    /// Deterministic template used when generation fails
    pub fn fallback_caption(&self, job: &Job, platform: Platform) -> String {
        let location = if job.location.is_empty() {
            "India"
        } else {
            &job.location
        };

        match platform {
            Platform::Linkedin => {
                let skills = top_skills(&job.skills, 3);
                let remote = if job.remote { " 🌍 Remote" } else { "" };
                format!(
                    "{TITLE_EMOJI} Exciting opportunity alert!\n\n\
                     {} at {}\n\
                     {LOCATION_EMOJI} {}{}\n\n\
                     {SKILLS_EMOJI} Skills: {}\n\n\
                     Apply now: {}\n\n\
                     #JobOpportunity #TechJobs #CareerGrowth #Hiring",
                    job.title, job.company, location, remote, skills, job.apply_url
                )
            }
            Platform::X => {
                let skills = top_skills(&job.skills, 2);
                let remote = if job.remote { " (Remote)" } else { "" };
                format!(
                    "{TITLE_EMOJI} {} at {} - {}{}\n\n\
                     Skills: {}\n\n\
                     Apply: {}\n\n\
                     #TechJobs #Hiring",
                    job.title, job.company, location, remote, skills, job.apply_url
                )
            }
        }
    }

    /// Within the length limit and carrying at least the configured number of hashtags
    pub fn validate(&self, caption: &str, platform: Platform) -> bool {
        let config = self.config(platform);
        let length = caption.chars().count();

        if length > config.max_length {
            warn!(
                "{} caption exceeds {} characters: {}",
                platform, config.max_length, length
            );
            return false;
        }

        let hashtags = caption.matches('#').count();
        if hashtags < config.hashtag_count {
            warn!(
                "{} caption has {} hashtags, {} required",
                platform, hashtags, config.hashtag_count
            );
            return false;
        }

        true
    }

    /// Prefix the title, location, skills and apply lines with an emoji once
    pub fn optimize(&self, caption: &str, platform: Platform) -> String {
        let mut title_done = false;

        caption
            .lines()
            .map(|line| {
                if line.trim().is_empty() || line.trim_start().starts_with('#') {
                    return line.to_string();
                }
                let is_title = !title_done;
                title_done = true;
                if has_emoji_prefix(line) {
                    return line.to_string();
                }

                let lowered = line.to_lowercase();
                let emoji = if is_title {
                    Some(TITLE_EMOJI)
                } else if lowered.contains("location") {
                    Some(LOCATION_EMOJI)
                } else if lowered.contains("skills") {
                    Some(SKILLS_EMOJI)
                } else if lowered.contains("apply") && platform == Platform::Linkedin {
                    Some(APPLY_EMOJI)
                } else {
                    None
                };

                match emoji {
                    Some(emoji) => format!("{} {}", emoji, line),
                    None => line.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn top_skills(skills: &[String], count: usize) -> String {
    if skills.is_empty() {
        "Various".to_string()
    } else {
        skills
            .iter()
            .take(count)
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Line already starts with a pictograph (anything non-ASCII that is not a letter or digit)
fn has_emoji_prefix(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| !c.is_ascii() && !c.is_alphanumeric())
}

/// Strip markdown fences and bold markers, trim lines, collapse blank runs
pub fn clean_caption(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with("```") {
            continue;
        }
        let line = line.replace("**", "");
        let line = line.trim();
        if line.is_empty() && lines.last().is_none_or(|last| last.is_empty()) {
            continue;
        }
        lines.push(line.to_string());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
