//! Wire types and response decoding for the plan request.
//!
//! The request side follows the Gemini `generateContent` REST shape. The
//! response side is deliberately forgiving about *packaging* — models wrap
//! JSON in code fences, prose, or smart quotes — but strict about *shape*:
//! once a candidate JSON object is isolated it must decode to [`RawPlan`]
//! exactly, or the whole reply counts as unparseable.

use serde::{Deserialize, Serialize};

use crate::snapshot::PageSnapshot;

/// How much of the screenshot base64 is quoted in the prompt.
const SCREENSHOT_PROMPT_CHARS: usize = 400;

/// Everything the planner needs to propose one cycle's actions.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Apply-flow stage ("easy-apply" or "external").
    pub stage: String,
    /// Whether tailored documents are available for upload this run.
    pub uploads_available: bool,
    /// Free-text applicant profile given to the model as context.
    pub profile: Option<String>,
    pub snapshot: PageSnapshot,
}

/// Decoded plan as received from the service, before validation.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawPlan {
    #[serde(default, rename = "uploadChoice")]
    pub upload_choice: Option<String>,
    pub actions: Vec<RawAction>,
    /// Diagnostic rationale. Never executed.
    #[serde(default)]
    pub comment: Option<String>,
}

/// One action as received from the service. Field presence and the action
/// vocabulary are checked by the validator, not here.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub x: Option<i64>,
    #[serde(default)]
    pub y: Option<i64>,
    #[serde(default)]
    pub locator: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "clearFirst")]
    pub clear_first: Option<bool>,
    #[serde(default)]
    pub seconds: Option<f64>,
}

// --- Gemini generateContent wire shapes ---

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Build the single prompt for one plan request: the allowed action
/// vocabulary, the task context, and the bounded snapshot.
pub fn build_prompt(req: &PlanRequest) -> String {
    let uploads = if req.uploads_available {
        "resume (merged resume + cover letter) and cover_letter are available for upload"
    } else {
        "no documents are available for upload; uploadChoice must be \"none\""
    };
    let profile = req.profile.as_deref().unwrap_or("(not provided)");
    let screenshot = match &req.snapshot.screenshot_b64 {
        Some(b64) => {
            let truncated: String = b64.chars().take(SCREENSHOT_PROMPT_CHARS).collect();
            format!("\"{truncated}... (truncated)\"")
        }
        None => "(unavailable)".to_string(),
    };

    format!(
        "You are an assistant that must RETURN EXACTLY one JSON object and NOTHING ELSE.\n\
         The JSON MUST have keys:\n\
         \x20 - \"actions\": a list of action objects in sequence\n\
         \x20 - \"uploadChoice\": optional, one of \"resume\" | \"cover_letter\" | \"none\"\n\
         \x20 - \"comment\": optional short explanation (1-2 sentences)\n\
         \n\
         Action object shapes (the ONLY allowed types):\n\
         \x20 - Click: {{ \"type\": \"click\", \"x\": <int>, \"y\": <int> }} — viewport pixel coordinates of the element centroid\n\
         \x20 - Type:  {{ \"type\": \"type\", \"locator\": \"<css selector>\", \"text\": \"...\", \"clearFirst\": true|false }}\n\
         \x20 - Wait:  {{ \"type\": \"wait\", \"seconds\": <float> }}\n\
         \n\
         Rules:\n\
         - Coordinates must be viewport integers.\n\
         - Do NOT use scroll, keyboard, or script actions; they will be rejected.\n\
         - Waits longer than 30 seconds will be rejected.\n\
         - Do NOT include any extra keys.\n\
         - If unsure, return {{\"actions\": [], \"comment\": \"I am unsure; manual intervention needed.\"}}\n\
         \n\
         Task: complete the current step of a job application ({stage} flow). {uploads}.\n\
         Applicant profile:\n{profile}\n\
         \n\
         SCREENSHOT (base64, truncated): {screenshot}\n\
         VISIBLE TEXT:\n<<<TEXT>>>\n{text}\n<<<END>>>\n\
         PAGE MARKUP (DOM snapshot):\n<<<HTML>>>\n{markup}\n<<<END>>>\n",
        stage = req.stage,
        text = req.snapshot.visible_text,
        markup = req.snapshot.markup,
    )
}

/// Remove ``` fences if present and return the inner content.
pub fn strip_code_fences(text: &str) -> String {
    let s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        let inner = match rest.find("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        let inner = inner.trim_start();
        let inner = inner
            .strip_prefix("json")
            .or_else(|| inner.strip_prefix("JSON"))
            .unwrap_or(inner);
        return inner.trim().to_string();
    }
    s.to_string()
}

/// Decode raw model output into a [`RawPlan`].
///
/// Strips code fences, isolates the first `{...}` block, and retries once
/// with typographic quotes normalized. Anything that still fails to decode
/// is an error — never an empty plan.
pub fn parse_plan_text(text: &str) -> Result<RawPlan, String> {
    let stripped = strip_code_fences(text);
    let candidate = match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if end >= start => &stripped[start..=end],
        _ => return Err("no JSON object found in response".to_string()),
    };

    serde_json::from_str::<RawPlan>(candidate)
        .or_else(|_| {
            let normalized = candidate
                .replace('\u{201c}', "\"")
                .replace('\u{201d}', "\"")
                .replace('\u{2018}', "'")
                .replace('\u{2019}', "'");
            serde_json::from_str::<RawPlan>(&normalized)
        })
        .map_err(|e| format!("response is not a valid plan object: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str) -> PageSnapshot {
        PageSnapshot {
            visible_text: text.to_string(),
            markup: "<form></form>".to_string(),
            screenshot_b64: Some("QUJD".to_string()),
            degraded: false,
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            stage: "easy-apply".to_string(),
            uploads_available: true,
            profile: Some("Backend engineer, 4 years Rust".to_string()),
            snapshot: snapshot("Apply now"),
        }
    }

    #[test]
    fn prompt_contains_vocabulary_context_and_snapshot() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("\"type\": \"click\""));
        assert!(prompt.contains("\"type\": \"wait\""));
        assert!(prompt.contains("Do NOT use scroll"));
        assert!(prompt.contains("easy-apply"));
        assert!(prompt.contains("Backend engineer"));
        assert!(prompt.contains("Apply now"));
        assert!(prompt.contains("<form></form>"));
    }

    #[test]
    fn prompt_marks_missing_screenshot() {
        let mut req = request();
        req.snapshot.screenshot_b64 = None;
        req.snapshot.degraded = true;
        let prompt = build_prompt(&req);
        assert!(prompt.contains("SCREENSHOT (base64, truncated): (unavailable)"));
    }

    #[test]
    fn strip_fences_plain_text_passthrough() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn strip_fences_removes_json_fence() {
        let fenced = "```json\n{\"actions\": []}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"actions\": []}");
    }

    #[test]
    fn parse_plain_plan() {
        let plan = parse_plan_text(r#"{"actions":[{"type":"wait","seconds":1.5}]}"#).unwrap();
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind, "wait");
        assert_eq!(plan.actions[0].seconds, Some(1.5));
    }

    #[test]
    fn parse_plan_wrapped_in_prose() {
        let text = "Here is the plan you asked for:\n\
                    {\"uploadChoice\": \"resume\", \"actions\": [{\"type\": \"click\", \"x\": 10, \"y\": 20}], \"comment\": \"submit\"}\n\
                    Good luck!";
        let plan = parse_plan_text(text).unwrap();
        assert_eq!(plan.upload_choice.as_deref(), Some("resume"));
        assert_eq!(plan.actions[0].x, Some(10));
        assert_eq!(plan.comment.as_deref(), Some("submit"));
    }

    #[test]
    fn parse_plan_with_smart_quotes() {
        let text = "{\u{201c}actions\u{201d}: []}";
        let plan = parse_plan_text(text).unwrap();
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(parse_plan_text("I cannot help with that.").is_err());
    }

    #[test]
    fn parse_rejects_missing_actions_key() {
        // A JSON object of the wrong shape is a parse failure, not an empty plan.
        assert!(parse_plan_text(r#"{"explain": "done"}"#).is_err());
    }

    #[test]
    fn raw_action_decodes_camel_case_clear_first() {
        let action: RawAction = serde_json::from_str(
            r##"{"type":"type","locator":"#name","text":"Ada","clearFirst":true}"##,
        )
        .unwrap();
        assert_eq!(action.kind, "type");
        assert_eq!(action.clear_first, Some(true));
    }
}
