//! Response parsing at the boundary with the generation backend.
//!
//! Backend output is expected, but not guaranteed, to carry a JSON payload.
//! Nothing in here returns an error: a turn decision that cannot be parsed
//! becomes the fallback decision, and an unparseable assessment becomes
//! `None` for the caller to substitute.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use mockloop_types::interview::FinalAssessment;

pub const FALLBACK_QUESTION: &str = "Could you describe your experience in this area in more detail?";
pub const FALLBACK_EVALUATION: &str = "Still analyzing your answer...";

/// Structured decision extracted from one backend reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub evaluation: String,
    pub next_question: String,
    pub need_followup: bool,
    pub need_end: bool,
    /// Stored verbatim as the InterviewQuestion context.
    pub context: Value,
    /// `false` when this is the fallback decision.
    pub parsed: bool,
}

impl Decision {
    /// The safe decision used when the reply cannot be parsed.
    pub fn fallback(raw_text: &str) -> Self {
        Self {
            evaluation: FALLBACK_EVALUATION.to_string(),
            next_question: FALLBACK_QUESTION.to_string(),
            need_followup: true,
            need_end: false,
            context: json!({
                "error": "failed_to_parse",
                "raw_text": raw_text,
            }),
            parsed: false,
        }
    }
}

#[derive(Deserialize)]
struct RawDecision {
    evaluation: String,
    next_question: String,
    #[serde(default)]
    need_followup: bool,
    #[serde(default)]
    need_end: bool,
}

#[derive(Deserialize)]
struct RawAssessment {
    final_score: f64,
    feedback_summary: String,
}

/// Locate the body of the first fenced block (```json or plain ```).
pub fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    let body = match after.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => after,
    };
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn payload(raw: &str) -> Option<Value> {
    let candidate = fenced_block(raw).unwrap_or_else(|| raw.trim());
    serde_json::from_str::<Value>(candidate).ok()
}

fn preview(raw: &str) -> String {
    raw.chars().take(120).collect()
}

/// Parse a turn decision. Never fails.
pub fn parse_decision(raw: &str, at: DateTime<Utc>) -> Decision {
    let Some(value) = payload(raw) else {
        warn!(raw = %preview(raw), "backend reply is not JSON; using fallback decision");
        return Decision::fallback(raw);
    };
    match serde_json::from_value::<RawDecision>(value.clone()) {
        Ok(d) if !d.next_question.trim().is_empty() => Decision {
            evaluation: d.evaluation,
            next_question: d.next_question.trim().to_string(),
            need_followup: d.need_followup,
            need_end: d.need_end,
            context: json!({
                "parsed_data": value,
                "timestamp": at.to_rfc3339(),
            }),
            parsed: true,
        },
        Ok(_) => {
            warn!(raw = %preview(raw), "backend reply has an empty next_question; using fallback decision");
            Decision::fallback(raw)
        }
        Err(e) => {
            warn!(error = %e, raw = %preview(raw), "backend reply is missing decision fields; using fallback decision");
            Decision::fallback(raw)
        }
    }
}

/// Parse the final assessment, clamping the score to 1..=100.
pub fn parse_assessment(raw: &str) -> Option<FinalAssessment> {
    let value = payload(raw)?;
    let parsed: RawAssessment = serde_json::from_value(value).ok()?;
    let feedback = parsed.feedback_summary.trim();
    if feedback.is_empty() || !parsed.final_score.is_finite() {
        return None;
    }
    Some(FinalAssessment {
        final_score: parsed.final_score.round().clamp(1.0, 100.0) as i32,
        feedback: feedback.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fenced_json() {
        let raw = "Sure!\n```json\n{\"evaluation\": \"Good grasp of basics\", \"next_question\": \"Explain TCP handshake\", \"need_followup\": true, \"need_end\": false}\n```\nThanks";
        let d = parse_decision(raw, Utc::now());
        assert!(d.parsed);
        assert_eq!(d.next_question, "Explain TCP handshake");
        assert_eq!(d.evaluation, "Good grasp of basics");
        assert!(d.need_followup);
        assert!(!d.need_end);
        assert_eq!(d.context["parsed_data"]["next_question"], "Explain TCP handshake");
        assert!(d.context["timestamp"].is_string());
    }

    #[test]
    fn test_parses_plain_fence_and_bare_json() {
        let fenced = "```\n{\"evaluation\": \"ok\", \"next_question\": \"Q1\"}\n```";
        assert_eq!(parse_decision(fenced, Utc::now()).next_question, "Q1");

        let bare = "  {\"evaluation\": \"ok\", \"next_question\": \"Q2\", \"need_end\": true} ";
        let d = parse_decision(bare, Utc::now());
        assert_eq!(d.next_question, "Q2");
        assert!(d.need_end);
        assert!(!d.need_followup);
    }

    #[test]
    fn test_inline_fence() {
        let raw = "```{\"evaluation\": \"ok\", \"next_question\": \"Q3\"}```";
        assert_eq!(parse_decision(raw, Utc::now()).next_question, "Q3");
    }

    #[test]
    fn test_non_json_falls_back() {
        let d = parse_decision("I think the candidate is great.", Utc::now());
        assert!(!d.parsed);
        assert_eq!(d.next_question, FALLBACK_QUESTION);
        assert_eq!(d.evaluation, FALLBACK_EVALUATION);
        assert!(d.need_followup);
        assert_eq!(d.context["error"], "failed_to_parse");
        assert_eq!(d.context["raw_text"], "I think the candidate is great.");
    }

    #[test]
    fn test_missing_next_question_falls_back() {
        let d = parse_decision("{\"evaluation\": \"fine\", \"need_followup\": false}", Utc::now());
        assert_eq!(d, Decision::fallback("{\"evaluation\": \"fine\", \"need_followup\": false}"));

        let blank = parse_decision("{\"evaluation\": \"fine\", \"next_question\": \"  \"}", Utc::now());
        assert!(!blank.parsed);
    }

    #[test]
    fn test_wrong_types_fall_back() {
        let d = parse_decision(
            "{\"evaluation\": \"fine\", \"next_question\": \"Q\", \"need_followup\": \"yes\"}",
            Utc::now(),
        );
        assert!(!d.parsed);
    }

    #[test]
    fn test_parse_assessment() {
        let raw = "```json\n{\"final_score\": 86, \"feedback_summary\": \"Strong on design.\"}\n```";
        let a = parse_assessment(raw).unwrap();
        assert_eq!(a.final_score, 86);
        assert_eq!(a.feedback, "Strong on design.");
    }

    #[test]
    fn test_parse_assessment_clamps() {
        let high = parse_assessment("{\"final_score\": 140, \"feedback_summary\": \"x\"}").unwrap();
        assert_eq!(high.final_score, 100);
        let low = parse_assessment("{\"final_score\": -3, \"feedback_summary\": \"x\"}").unwrap();
        assert_eq!(low.final_score, 1);
        let frac = parse_assessment("{\"final_score\": 72.6, \"feedback_summary\": \"x\"}").unwrap();
        assert_eq!(frac.final_score, 73);
    }

    #[test]
    fn test_parse_assessment_rejects_garbage() {
        assert!(parse_assessment("no json here").is_none());
        assert!(parse_assessment("{\"final_score\": 80}").is_none());
        assert!(parse_assessment("{\"final_score\": 80, \"feedback_summary\": \"\"}").is_none());
    }
}
