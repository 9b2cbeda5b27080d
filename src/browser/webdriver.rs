//! W3C WebDriver session over HTTP, aimed at a local geckodriver.
//!
//! Only the handful of endpoints the executor needs are covered: session
//! lifecycle, navigation, element lookup, click, field text, page source,
//! screenshot and window handling. Element references use the W3C element
//! identifier key and errors decode the standard `{"value": {"error",
//! "message"}}` envelope.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};

use super::{BrowserError, BrowserSession, ElementHandle, Viewport};

/// W3C WebDriver element identifier key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const ELEMENT_FROM_POINT_SCRIPT: &str =
    "return document.elementFromPoint(arguments[0], arguments[1]);";
const VISIBLE_TEXT_SCRIPT: &str = "return document.body ? document.body.innerText : '';";
const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView({block: 'center'});";

pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    viewport: Viewport,
}

impl WebDriverSession {
    /// Establish a session against a running WebDriver endpoint.
    ///
    /// This is the run's resource acquisition: a failure here is fatal to the
    /// whole run, unlike any per-cycle browser error.
    pub async fn connect(base_url: &str) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(BrowserError::Transport)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let body = json!({
            "capabilities": { "alwaysMatch": { "browserName": "firefox" } }
        });
        let value = check(
            client
                .post(format!("{base_url}/session"))
                .json(&body)
                .send()
                .await?,
        )
        .await?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("missing sessionId in new-session reply".into()))?
            .to_string();

        let mut session = Self {
            client,
            base_url,
            session_id,
            viewport: Viewport {
                width: 0,
                height: 0,
            },
        };
        let rect = session.get("window/rect").await?;
        session.viewport = Viewport {
            width: rect["width"].as_i64().unwrap_or(0),
            height: rect["height"].as_i64().unwrap_or(0),
        };
        Ok(session)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}/{path}", self.base_url, self.session_id)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, BrowserError> {
        check(self.client.post(self.url(path)).json(&body).send().await?).await
    }

    async fn get(&self, path: &str) -> Result<Value, BrowserError> {
        check(self.client.get(self.url(path)).send().await?).await
    }

    async fn execute(&self, script: &str, args: Value) -> Result<Value, BrowserError> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    fn element_ref(element: &ElementHandle) -> Value {
        json!({ ELEMENT_KEY: element.0 })
    }

    fn decode_element(value: &Value) -> Option<ElementHandle> {
        value[ELEMENT_KEY]
            .as_str()
            .map(|id| ElementHandle(id.to_string()))
    }
}

/// Decode a WebDriver reply, mapping error envelopes to [`BrowserError::Driver`].
async fn check(response: reqwest::Response) -> Result<Value, BrowserError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::Protocol(format!("non-JSON driver reply: {e}")))?;
    if !status.is_success() {
        let error = body["value"]["error"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        let message = body["value"]["message"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        return Err(BrowserError::Driver { error, message });
    }
    Ok(body["value"].clone())
}

/// Pick the WebDriver locator strategy for a locator string.
fn strategy_for(locator: &str) -> &'static str {
    if locator.starts_with("//") || locator.starts_with('(') {
        "xpath"
    } else {
        "css selector"
    }
}

impl BrowserSession for WebDriverSession {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.post("url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn open_isolated_tab(&mut self, url: &str) -> Result<(), BrowserError> {
        let value = self.post("window/new", json!({ "type": "tab" })).await?;
        let handle = value["handle"]
            .as_str()
            .ok_or_else(|| BrowserError::Protocol("missing handle in window/new reply".into()))?
            .to_string();
        self.post("window", json!({ "handle": handle })).await?;
        self.navigate(url).await
    }

    async fn element_at_point(
        &mut self,
        x: i64,
        y: i64,
    ) -> Result<Option<ElementHandle>, BrowserError> {
        let value = self
            .execute(ELEMENT_FROM_POINT_SCRIPT, json!([x, y]))
            .await?;
        Ok(Self::decode_element(&value))
    }

    async fn find_by_locator(
        &mut self,
        locator: &str,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let value = self
            .post(
                "elements",
                json!({ "using": strategy_for(locator), "value": locator }),
            )
            .await?;
        let list = value
            .as_array()
            .ok_or_else(|| BrowserError::Protocol("elements reply is not a list".into()))?;
        Ok(list.iter().filter_map(Self::decode_element).collect())
    }

    async fn focused_element(&mut self) -> Result<Option<ElementHandle>, BrowserError> {
        match self.get("element/active").await {
            Ok(value) => Ok(Self::decode_element(&value)),
            Err(BrowserError::Driver { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.execute(SCROLL_INTO_VIEW_SCRIPT, json!([Self::element_ref(element)]))
            .await?;
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.post(&format!("element/{}/click", element.0), json!({}))
            .await?;
        Ok(())
    }

    async fn set_field_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
        clear_first: bool,
    ) -> Result<(), BrowserError> {
        if clear_first {
            self.post(&format!("element/{}/clear", element.0), json!({}))
                .await?;
        }
        self.post(
            &format!("element/{}/value", element.0),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn visible_text(&mut self) -> Result<String, BrowserError> {
        let value = self.execute(VISIBLE_TEXT_SCRIPT, json!([])).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn page_markup(&mut self) -> Result<String, BrowserError> {
        let value = self.get("source").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&mut self) -> Result<String, BrowserError> {
        let value = self.get("screenshot").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol("screenshot reply is not a string".into()))
    }

    async fn upload_file(&mut self, path: &Path) -> Result<(), BrowserError> {
        let inputs = self.find_by_locator("input[type='file']").await?;
        let input = inputs.first().ok_or_else(|| BrowserError::Driver {
            error: "no such element".into(),
            message: "page has no file input".into(),
        })?;
        self.post(
            &format!("element/{}/value", input.0),
            json!({ "text": path.display().to_string() }),
        )
        .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        check(
            self.client
                .delete(format!("{}/session/{}", self.base_url, self.session_id))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_driver() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "abc123", "capabilities": {} }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/abc123/window/rect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "x": 0, "y": 0, "width": 1280, "height": 800 }
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn connect_reads_session_and_viewport() {
        let server = mock_driver().await;
        let session = WebDriverSession::connect(&server.uri()).await.unwrap();
        assert_eq!(session.session_id, "abc123");
        assert_eq!(
            session.viewport(),
            Viewport {
                width: 1280,
                height: 800
            }
        );
    }

    #[tokio::test]
    async fn navigate_posts_url() {
        let server = mock_driver().await;
        Mock::given(method("POST"))
            .and(path("/session/abc123/url"))
            .and(body_partial_json(json!({ "url": "https://example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = WebDriverSession::connect(&server.uri()).await.unwrap();
        session.navigate("https://example.com").await.unwrap();
    }

    #[tokio::test]
    async fn find_by_locator_decodes_element_refs() {
        let server = mock_driver().await;
        Mock::given(method("POST"))
            .and(path("/session/abc123/elements"))
            .and(body_partial_json(
                json!({ "using": "css selector", "value": "input[type='file']" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { ELEMENT_KEY: "el-1" },
                    { ELEMENT_KEY: "el-2" }
                ]
            })))
            .mount(&server)
            .await;

        let mut session = WebDriverSession::connect(&server.uri()).await.unwrap();
        let found = session.find_by_locator("input[type='file']").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], ElementHandle("el-1".into()));
    }

    #[test]
    fn xpath_locators_use_xpath_strategy() {
        assert_eq!(strategy_for("//button"), "xpath");
        assert_eq!(strategy_for("(//a)[1]"), "xpath");
        assert_eq!(strategy_for("button.apply"), "css selector");
    }

    #[tokio::test]
    async fn driver_error_envelope_maps_to_driver_error() {
        let server = mock_driver().await;
        Mock::given(method("POST"))
            .and(path("/session/abc123/element/dead/click"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "stale element reference", "message": "gone" }
            })))
            .mount(&server)
            .await;

        let mut session = WebDriverSession::connect(&server.uri()).await.unwrap();
        let err = session
            .click(&ElementHandle("dead".into()))
            .await
            .unwrap_err();
        match err {
            BrowserError::Driver { error, message } => {
                assert_eq!(error, "stale element reference");
                assert_eq!(message, "gone");
            }
            other => panic!("expected driver error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn screenshot_passes_base64_through() {
        let server = mock_driver().await;
        Mock::given(method("GET"))
            .and(path("/session/abc123/screenshot"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "value": "aVZCT1J3MEtH" })),
            )
            .mount(&server)
            .await;

        let mut session = WebDriverSession::connect(&server.uri()).await.unwrap();
        assert_eq!(session.screenshot().await.unwrap(), "aVZCT1J3MEtH");
    }

    #[tokio::test]
    async fn focused_element_absent_is_none() {
        let server = mock_driver().await;
        Mock::given(method("GET"))
            .and(path("/session/abc123/element/active"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "no such element", "message": "nothing focused" }
            })))
            .mount(&server)
            .await;

        let mut session = WebDriverSession::connect(&server.uri()).await.unwrap();
        assert!(session.focused_element().await.unwrap().is_none());
    }
}
