//! Browser driver boundary.
//!
//! The core never talks to a browser directly; it drives a [`BrowserSession`],
//! the one shared mutable resource of a run. Exactly one flow controller owns
//! the session at a time, with ownership handed off only at target boundaries.
//! [`WebDriverSession`](webdriver::WebDriverSession) implements the trait over
//! the W3C wire protocol against a local geckodriver.

pub mod webdriver;

use std::path::Path;

use thiserror::Error;

/// Errors surfaced by a browser driver.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The driver returned a WebDriver error envelope.
    #[error("driver error {error}: {message}")]
    Driver { error: String, message: String },

    /// Underlying transport failure (connection refused, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The driver answered with something outside the wire protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Current viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: i64,
    pub height: i64,
}

impl Viewport {
    /// Whether a point lies inside the viewport.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }
}

/// Opaque reference to an element held by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

/// A live browser session.
///
/// Every method is a single atomic browser operation; the executor and the
/// flow controller never issue a second operation before the first resolves.
pub trait BrowserSession {
    /// Viewport bounds captured when the session was established.
    fn viewport(&self) -> Viewport;

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Open `url` in a fresh tab and switch to it.
    async fn open_isolated_tab(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Topmost element at a viewport point, if any.
    async fn element_at_point(&mut self, x: i64, y: i64)
    -> Result<Option<ElementHandle>, BrowserError>;

    /// All elements matching a locator (CSS selector, or XPath when the
    /// locator starts with `//` or `(`).
    async fn find_by_locator(&mut self, locator: &str)
    -> Result<Vec<ElementHandle>, BrowserError>;

    /// The currently focused element, if any.
    async fn focused_element(&mut self) -> Result<Option<ElementHandle>, BrowserError>;

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BrowserError>;

    /// Set a field's text, optionally clearing existing content first.
    async fn set_field_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
        clear_first: bool,
    ) -> Result<(), BrowserError>;

    async fn visible_text(&mut self) -> Result<String, BrowserError>;

    async fn page_markup(&mut self) -> Result<String, BrowserError>;

    /// Screenshot of the current page as base64 PNG.
    async fn screenshot(&mut self) -> Result<String, BrowserError>;

    /// Attach a file to the page's file input.
    async fn upload_file(&mut self, path: &Path) -> Result<(), BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}
