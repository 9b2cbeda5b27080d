//! Bounded page-state capture.
//!
//! A [`PageSnapshot`] is an immutable observation of the page at one instant:
//! visible text, trimmed markup, and an optional screenshot. Both text fields
//! are truncated to fixed character budgets so the downstream plan request
//! stays cheap and within service limits. Capture degrades instead of
//! failing: a snapshot is always produced, never an error.

use crate::browser::BrowserSession;

/// Character budget for visible text.
pub const TEXT_BUDGET: usize = 8_000;
/// Character budget for page markup.
pub const MARKUP_BUDGET: usize = 12_000;

/// One observation of the page. Superseded by a fresh capture every cycle.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub visible_text: String,
    pub markup: String,
    /// Base64 PNG, absent when the screenshot read failed.
    pub screenshot_b64: Option<String>,
    /// True when any part of the capture failed and was replaced with a
    /// reduced-quality substitute.
    pub degraded: bool,
}

/// Capture the current page state. Never aborts the cycle: read failures
/// produce empty fields and set the `degraded` flag.
pub async fn capture<S: BrowserSession>(session: &mut S) -> PageSnapshot {
    let mut degraded = false;

    let visible_text = match session.visible_text().await {
        Ok(text) => truncate_chars(text, TEXT_BUDGET),
        Err(_) => {
            degraded = true;
            String::new()
        }
    };

    let markup = match session.page_markup().await {
        Ok(html) => truncate_chars(html, MARKUP_BUDGET),
        Err(_) => {
            degraded = true;
            String::new()
        }
    };

    let screenshot_b64 = match session.screenshot().await {
        Ok(b64) => Some(b64),
        Err(_) => {
            degraded = true;
            None
        }
    };

    PageSnapshot {
        visible_text,
        markup,
        screenshot_b64,
        degraded,
    }
}

/// Truncate to a character budget without splitting a code point.
fn truncate_chars(s: String, budget: usize) -> String {
    if s.len() <= budget {
        return s;
    }
    match s.char_indices().nth(budget) {
        Some((byte_idx, _)) => {
            let mut out = s;
            out.truncate(byte_idx);
            out
        }
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeSession;

    #[tokio::test]
    async fn capture_reads_text_markup_and_screenshot() {
        let mut session = FakeSession::new(&["hello world"]);
        let snap = capture(&mut session).await;
        assert_eq!(snap.visible_text, "hello world");
        assert_eq!(snap.markup, "<body></body>");
        assert!(snap.screenshot_b64.is_some());
        assert!(!snap.degraded);
    }

    #[tokio::test]
    async fn screenshot_failure_degrades_without_aborting() {
        let mut session = FakeSession::new(&["page"]);
        session.screenshot_fails = true;
        let snap = capture(&mut session).await;
        assert_eq!(snap.visible_text, "page");
        assert!(snap.screenshot_b64.is_none());
        assert!(snap.degraded);
    }

    #[tokio::test]
    async fn text_is_truncated_to_budget() {
        let long = "x".repeat(TEXT_BUDGET + 500);
        let mut session = FakeSession::new(&[long.as_str()]);
        let snap = capture(&mut session).await;
        assert_eq!(snap.visible_text.chars().count(), TEXT_BUDGET);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(10);
        let out = truncate_chars(s, 4);
        assert_eq!(out.chars().count(), 4);
        assert_eq!(out, "éééé");
    }
}
