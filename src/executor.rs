//! Deterministic single-action execution.
//!
//! Applies one validated action against the browser session and reports the
//! outcome. The executor never retries: retry policy belongs to the flow
//! controller so failure counts stay visible at the state-machine level.

use std::time::Duration;

use tokio::time::sleep;

use crate::browser::{BrowserSession, ElementHandle};
use crate::plan::Action;

/// Execute one action. The error string is the `ExecutionFailed` reason
/// recorded by the flow controller.
pub async fn execute<S: BrowserSession>(session: &mut S, action: &Action) -> Result<(), String> {
    match action {
        Action::Click { x, y } => click(session, *x, *y).await,
        Action::Type {
            locator,
            text,
            clear_first,
        } => type_text(session, locator.as_deref(), text, *clear_first).await,
        Action::Wait { seconds } => {
            sleep(Duration::from_secs_f64(*seconds)).await;
            Ok(())
        }
    }
}

async fn click<S: BrowserSession>(session: &mut S, x: i64, y: i64) -> Result<(), String> {
    let element = session
        .element_at_point(x, y)
        .await
        .map_err(|e| format!("element-at-point:{e}"))?;
    let element = match element {
        Some(el) => el,
        None => return Err("no-element-at-point".to_string()),
    };
    session
        .scroll_into_view(&element)
        .await
        .map_err(|e| format!("scroll-into-view:{e}"))?;
    session.click(&element).await.map_err(|e| format!("click:{e}"))
}

async fn type_text<S: BrowserSession>(
    session: &mut S,
    locator: Option<&str>,
    text: &str,
    clear_first: bool,
) -> Result<(), String> {
    let element: ElementHandle = match locator {
        Some(loc) => {
            let matches = session
                .find_by_locator(loc)
                .await
                .map_err(|e| format!("find-by-locator:{e}"))?;
            match matches.len() {
                0 => return Err(format!("locator-no-match:{loc}")),
                1 => matches.into_iter().next().expect("len checked"),
                n => return Err(format!("locator-ambiguous:{loc}:{n}")),
            }
        }
        None => session
            .focused_element()
            .await
            .map_err(|e| format!("focused-element:{e}"))?
            .ok_or("no-focused-element")?,
    };
    session
        .set_field_text(&element, text, clear_first)
        .await
        .map_err(|e| format!("set-field-text:{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeSession;

    #[tokio::test]
    async fn click_dispatches_at_point() {
        let mut session = FakeSession::new(&["page"]);
        execute(&mut session, &Action::Click { x: 40, y: 60 })
            .await
            .unwrap();
        assert_eq!(session.action_log(), vec!["click:pt-40-60"]);
    }

    #[tokio::test]
    async fn click_with_no_element_fails() {
        let mut session = FakeSession::new(&["page"]);
        session.dead_points.insert((5, 5));
        let err = execute(&mut session, &Action::Click { x: 5, y: 5 })
            .await
            .unwrap_err();
        assert_eq!(err, "no-element-at-point");
        assert!(session.action_log().is_empty());
    }

    #[tokio::test]
    async fn type_by_locator_sets_field_text() {
        let mut session = FakeSession::new(&["page"]);
        session.locator_counts.insert("#email".into(), 1);
        execute(
            &mut session,
            &Action::Type {
                locator: Some("#email".into()),
                text: "ada@example.com".into(),
                clear_first: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            session.action_log(),
            vec!["type:loc-#email-0:ada@example.com:true"]
        );
    }

    #[tokio::test]
    async fn type_with_unmatched_locator_fails() {
        let mut session = FakeSession::new(&["page"]);
        let err = execute(
            &mut session,
            &Action::Type {
                locator: Some("#missing".into()),
                text: "x".into(),
                clear_first: false,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, "locator-no-match:#missing");
    }

    #[tokio::test]
    async fn type_with_ambiguous_locator_fails() {
        let mut session = FakeSession::new(&["page"]);
        session.locator_counts.insert("input".into(), 3);
        let err = execute(
            &mut session,
            &Action::Type {
                locator: Some("input".into()),
                text: "x".into(),
                clear_first: false,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, "locator-ambiguous:input:3");
        assert!(session.action_log().is_empty());
    }

    #[tokio::test]
    async fn type_without_locator_uses_focused_element() {
        let mut session = FakeSession::new(&["page"]);
        session.focused = Some("active-1".into());
        execute(
            &mut session,
            &Action::Type {
                locator: None,
                text: "hello".into(),
                clear_first: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(session.action_log(), vec!["type:active-1:hello:false"]);
    }

    #[tokio::test]
    async fn type_without_focus_or_locator_fails() {
        let mut session = FakeSession::new(&["page"]);
        let err = execute(
            &mut session,
            &Action::Type {
                locator: None,
                text: "hello".into(),
                clear_first: false,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, "no-focused-element");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_suspends_for_duration() {
        let mut session = FakeSession::new(&["page"]);
        let before = tokio::time::Instant::now();
        execute(&mut session, &Action::Wait { seconds: 3.0 })
            .await
            .unwrap();
        assert!(before.elapsed() >= Duration::from_secs(3));
        assert!(session.action_log().is_empty());
    }
}
