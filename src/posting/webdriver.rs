// src/posting/webdriver.rs
//! Minimal W3C WebDriver client (chromedriver) spoken over reqwest

use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Reference to an element inside a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Start a Chrome session on the WebDriver server at `base_url`
    pub async fn start(base_url: &str, headless: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create WebDriver HTTP client")?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
        ];
        if headless {
            args.push("--headless=new");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                        "useAutomationExtension": false
                    }
                }
            }
        });

        let (status, body) = send(&client, Method::POST, &format!("{}/session", base_url), Some(&capabilities))
            .await
            .with_context(|| format!("Failed to reach WebDriver at {}", base_url))?;
        let value = into_value(status, body)?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .context("WebDriver response has no sessionId")?
            .to_string();

        info!("WebDriver session started: {}", session_id);
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    async fn command(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let (status, response) = send(&self.client, method, &self.url(path), body).await?;
        into_value(status, response)
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(&json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .context("WebDriver returned a non-string URL")
    }

    /// First element matching the CSS selector, `None` when nothing matches
    pub async fn find_element(&self, css: &str) -> Result<Option<ElementId>> {
        let body = json!({ "using": "css selector", "value": css });
        let (status, response) =
            send(&self.client, Method::POST, &self.url("/element"), Some(&body)).await?;

        if is_no_such_element(status, &response) {
            return Ok(None);
        }
        let value = into_value(status, response)?;
        let id = value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .context("WebDriver element reference missing")?;
        Ok(Some(ElementId(id.to_string())))
    }

    /// Poll for an element until it appears or the timeout elapses
    pub async fn wait_for_element(&self, css: &str, timeout: Duration) -> Result<ElementId> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_element(css).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                anyhow::bail!("Timed out waiting for element: {}", css);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn click(&self, element: &ElementId) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.0),
            Some(&json!({})),
        )
        .await?;
        Ok(())
    }

    pub async fn clear(&self, element: &ElementId) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.0),
            Some(&json!({})),
        )
        .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(&json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    pub async fn execute_script(&self, script: &str) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(&json!({ "script": script, "args": [] })),
        )
        .await
    }

    /// End the session and close the browser
    pub async fn quit(self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        info!("WebDriver session closed: {}", self.session_id);
        Ok(())
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<(StatusCode, Value)> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }
    let response = request.send().await.context("WebDriver request failed")?;
    let status = response.status();
    let body = response
        .json::<Value>()
        .await
        .unwrap_or(Value::Null);
    Ok((status, body))
}

fn into_value(status: StatusCode, body: Value) -> Result<Value> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    anyhow::bail!("WebDriver error {} ({}): {}", error, status, message)
}

fn is_no_such_element(status: StatusCode, body: &Value) -> bool {
    status == StatusCode::NOT_FOUND
        && body
            .pointer("/value/error")
            .and_then(Value::as_str)
            .is_some_and(|e| e == "no such element")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn session(server: &MockServer) -> WebDriverSession {
        Mock::given(method("POST"))
            .and(path("/session"))
            .and(body_partial_json(json!({
                "capabilities": {"alwaysMatch": {"browserName": "chrome"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": {"sessionId": "s1", "capabilities": {}}
            })))
            .mount(server)
            .await;
        WebDriverSession::start(&server.uri(), true).await.unwrap()
    }

    #[tokio::test]
    async fn test_session_navigation_and_elements() {
        let server = MockServer::start().await;
        let session = session(&server).await;
        assert_eq!(session.session_id(), "s1");

        Mock::given(method("POST"))
            .and(path("/session/s1/url"))
            .and(body_partial_json(json!({"url": "https://www.linkedin.com/feed/"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/url"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": "https://www.linkedin.com/feed/"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .and(body_partial_json(json!({"value": "#present"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": {"element-6066-11e4-a52e-4f735466cecf": "e-1"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .and(body_partial_json(json!({"value": "#missing"})))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": {"error": "no such element", "message": "not found"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element/e-1/value"))
            .and(body_partial_json(json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .expect(1)
            .mount(&server)
            .await;

        session.navigate("https://www.linkedin.com/feed/").await.unwrap();
        assert_eq!(
            session.current_url().await.unwrap(),
            "https://www.linkedin.com/feed/"
        );

        let element = session.find_element("#present").await.unwrap().unwrap();
        assert_eq!(element, ElementId("e-1".to_string()));
        session.send_keys(&element, "hello").await.unwrap();

        assert!(session.find_element("#missing").await.unwrap().is_none());
        assert!(session
            .wait_for_element("#missing", Duration::ZERO)
            .await
            .is_err());

        session.quit().await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_carry_webdriver_message() {
        let server = MockServer::start().await;
        let session = session(&server).await;
        Mock::given(method("POST"))
            .and(path("/session/s1/url"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "value": {"error": "unknown error", "message": "chrome not reachable"}
            })))
            .mount(&server)
            .await;

        let err = session.navigate("https://example.com").await.unwrap_err();
        assert!(err.to_string().contains("chrome not reachable"));
    }
}
