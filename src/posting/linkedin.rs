// src/posting/linkedin.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::webdriver::WebDriverSession;
use super::{random_delay, PostOutcome, SocialPoster};
use crate::core::config_manager::{DelayRange, LinkedInSettings};
use crate::jobs::Job;
use crate::types::Platform;

const START_POST: &str = "button[aria-label='Start a post']";
const TEXT_EDITOR: &str = "div[aria-label='Text editor for creating content']";
const ADD_MEDIA: &str = "button[aria-label='Add media']";
const FILE_INPUT: &str = "input[type='file']";
const UPLOADED_IMAGE: &str = "img[alt*='uploaded']";
const POST_BUTTON: &str = "button[aria-label='Post']";
const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// Publishes to the LinkedIn feed by driving a Chrome session
pub struct LinkedInPoster {
    settings: LinkedInSettings,
    email: String,
    password: String,
    session: Mutex<Option<WebDriverSession>>,
}

impl LinkedInPoster {
    pub fn new(settings: &LinkedInSettings, email: String, password: String) -> Self {
        Self {
            settings: settings.clone(),
            email,
            password,
            session: Mutex::new(None),
        }
    }

    fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.wait_timeout_secs)
    }

    fn page(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn pause(&self) {
        sleep(random_delay(&self.settings.step_delay)).await;
    }

    async fn is_logged_in(&self, session: &WebDriverSession) -> Result<bool> {
        session.navigate(&self.page("/feed/")).await?;
        self.pause().await;
        Ok(session.find_element(START_POST).await?.is_some())
    }

    async fn login(&self, session: &WebDriverSession) -> Result<bool> {
        info!("Attempting to login to LinkedIn");
        session.navigate(&self.page("/login")).await?;
        self.pause().await;

        let email = session
            .wait_for_element("#username", self.wait_timeout())
            .await?;
        session.clear(&email).await?;
        session.send_keys(&email, &self.email).await?;
        self.pause().await;

        let password = session
            .find_element("#password")
            .await?
            .context("Password field not found")?;
        session.clear(&password).await?;
        session.send_keys(&password, &self.password).await?;
        self.pause().await;

        let submit = session
            .find_element("button[type='submit']")
            .await?
            .context("Sign in button not found")?;
        session.click(&submit).await?;
        self.pause().await;

        let url = session.current_url().await?;
        if url.contains("feed") || url.contains("mynetwork") {
            info!("LinkedIn login successful");
            Ok(true)
        } else {
            error!("LinkedIn login failed - unexpected redirect to {}", url);
            Ok(false)
        }
    }

    async fn attach_image(&self, session: &WebDriverSession, image: &Path) -> Result<()> {
        let absolute = tokio::fs::canonicalize(image)
            .await
            .with_context(|| format!("Image not found: {}", image.display()))?;

        let media = session.wait_for_element(ADD_MEDIA, self.wait_timeout()).await?;
        session.click(&media).await?;
        self.pause().await;

        let input = session
            .find_element(FILE_INPUT)
            .await?
            .context("File input not found")?;
        session
            .send_keys(&input, &absolute.to_string_lossy())
            .await?;
        session
            .wait_for_element(UPLOADED_IMAGE, self.wait_timeout())
            .await?;

        info!("Image added to LinkedIn post: {}", image.display());
        Ok(())
    }

    async fn publish(
        &self,
        session: &WebDriverSession,
        caption: &str,
        image: Option<&Path>,
    ) -> Result<PostOutcome> {
        if !self.is_logged_in(session).await? && !self.login(session).await? {
            return Ok(PostOutcome::failed("login_failed"));
        }

        session.navigate(&self.page("/feed/")).await?;
        self.pause().await;
        let start = session.wait_for_element(START_POST, self.wait_timeout()).await?;
        session.click(&start).await?;
        self.pause().await;

        let editor = session.wait_for_element(TEXT_EDITOR, self.wait_timeout()).await?;
        session.click(&editor).await?;
        session.send_keys(&editor, caption).await?;
        self.pause().await;

        if let Some(image) = image {
            if let Err(e) = self.attach_image(session, image).await {
                warn!("Failed to add image to LinkedIn post, posting text only: {:#}", e);
            }
        }

        let post = session.wait_for_element(POST_BUTTON, self.wait_timeout()).await?;
        session.click(&post).await?;
        self.pause().await;

        let url = session.current_url().await?;
        if url.contains("feed") {
            info!("LinkedIn post created successfully");
            Ok(PostOutcome::posted(None))
        } else {
            warn!("LinkedIn post status unclear, ended on {}", url);
            Ok(PostOutcome::failed("post_unconfirmed"))
        }
    }
}

#[async_trait]
impl SocialPoster for LinkedInPoster {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    async fn post(&self, caption: &str, job: &Job, image: Option<&Path>) -> Result<PostOutcome> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let session =
                WebDriverSession::start(&self.settings.webdriver_url, self.settings.headless)
                    .await?;
            if let Err(e) = session.execute_script(HIDE_WEBDRIVER).await {
                warn!("Could not mask webdriver flag: {:#}", e);
            }
            *guard = Some(session);
        }
        let session = guard.as_ref().context("WebDriver session unavailable")?;

        let outcome = self.publish(session, caption, image).await?;
        if outcome.success {
            info!("LinkedIn post created for job: {}", job.title);
        } else {
            error!("LinkedIn post failed for job: {}", job.title);
        }
        Ok(outcome)
    }

    async fn close(&self) -> Result<()> {
        if let Some(session) = self.session.lock().await.take() {
            session.quit().await?;
            info!("LinkedIn driver closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::sample_job;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> LinkedInSettings {
        LinkedInSettings {
            webdriver_url: server.uri(),
            base_url: "https://www.linkedin.com".to_string(),
            headless: true,
            wait_timeout_secs: 0,
            step_delay: DelayRange {
                min_secs: 0.0,
                max_secs: 0.0,
            },
        }
    }

    fn ok(value: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
    }

    async fn mount_session(server: &MockServer, current_url: &str) {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ok(json!({"sessionId": "s1"})))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/session/s1/(url|execute/sync|element/[^/]+/(click|clear|value))$"))
            .respond_with(ok(json!(null)))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/url"))
            .respond_with(ok(json!(current_url)))
            .mount(server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/session/s1"))
            .respond_with(ok(json!(null)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_post_when_logged_in() {
        let server = MockServer::start().await;
        mount_session(&server, "https://www.linkedin.com/feed/").await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ok(json!({"element-6066-11e4-a52e-4f735466cecf": "e-1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element/e-1/value"))
            .and(body_partial_json(json!({"text": "We are hiring #Jobs"})))
            .respond_with(ok(json!(null)))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        let poster = LinkedInPoster::new(&settings(&server), "a@b.c".into(), "pw".into());
        let outcome = poster
            .post("We are hiring #Jobs", &sample_job("Analyst", "Acme", "Pune"), None)
            .await
            .unwrap();
        assert!(outcome.success);
        poster.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_image_is_uploaded_by_absolute_path() {
        let server = MockServer::start().await;
        mount_session(&server, "https://www.linkedin.com/feed/").await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ok(json!({"element-6066-11e4-a52e-4f735466cecf": "e-1"})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("card.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();
        let absolute = std::fs::canonicalize(&image).unwrap();
        Mock::given(method("POST"))
            .and(path("/session/s1/element/e-1/value"))
            .and(body_partial_json(json!({"text": absolute.to_string_lossy()})))
            .respond_with(ok(json!(null)))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        let poster = LinkedInPoster::new(&settings(&server), "a@b.c".into(), "pw".into());
        let job = sample_job("Analyst", "Acme", "Pune");
        let outcome = poster.post("caption", &job, Some(&image)).await.unwrap();
        assert!(outcome.success);

        let missing = dir.path().join("missing.png");
        let outcome = poster.post("caption", &job, Some(&missing)).await.unwrap();
        assert!(outcome.success);
        poster.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_login_failure_is_reported() {
        let server = MockServer::start().await;
        mount_session(&server, "https://www.linkedin.com/checkpoint/challenge").await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .and(body_partial_json(json!({"value": START_POST})))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": {"error": "no such element", "message": "missing"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ok(json!({"element-6066-11e4-a52e-4f735466cecf": "e-2"})))
            .mount(&server)
            .await;

        let poster = LinkedInPoster::new(&settings(&server), "a@b.c".into(), "pw".into());
        let outcome = poster
            .post("caption", &sample_job("Analyst", "Acme", "Pune"), None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("login_failed"));
    }
}
