// src/types/mod.rs
//! Shared enums used across storage, captioning and posting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Social platform a caption is written for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    X,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::X => "x",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linkedin" => Ok(Self::Linkedin),
            "x" | "twitter" => Ok(Self::X),
            other => anyhow::bail!("Unsupported platform: {}. Use linkedin or x", other),
        }
    }
}

/// Lifecycle of a pending post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Posted,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Posted => "posted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "posted" => Ok(Self::Posted),
            "failed" => Ok(Self::Failed),
            other => anyhow::bail!("Unknown post status: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("LinkedIn".parse::<Platform>().unwrap(), Platform::Linkedin);
        assert_eq!("twitter".parse::<Platform>().unwrap(), Platform::X);
        assert!("mastodon".parse::<Platform>().is_err());
    }

    #[test]
    fn test_status_display_roundtrip() {
        for status in [PostStatus::Pending, PostStatus::Posted, PostStatus::Failed] {
            assert_eq!(status.to_string().parse::<PostStatus>().unwrap(), status);
        }
    }
}
