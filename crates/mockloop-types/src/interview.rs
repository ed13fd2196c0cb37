//! Interview, question, and answer types for Mockloop.
//!
//! These types model the durable record of an interview: the session row,
//! de-duplicated canonical questions, their per-interview occurrences, and
//! the candidate's answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an interview, derived from the durable row.
///
/// `Created` has no questions yet, `Active` has at least one, and `Ended`
/// has its final score, feedback and end timestamp set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewStatus {
    Created,
    Active,
    Ended,
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewStatus::Created => write!(f, "created"),
            InterviewStatus::Active => write!(f, "active"),
            InterviewStatus::Ended => write!(f, "ended"),
        }
    }
}

/// One interview session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: i64,
    pub user_id: i64,
    pub position: String,
    /// Name of the generation backend provider driving this interview.
    pub provider: String,
    pub name: String,
    pub resume: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub final_score: Option<i32>,
    pub feedback: Option<String>,
}

impl Interview {
    /// Whether the interview has reached its terminal state.
    ///
    /// Either marker is sufficient: both score and feedback present, or an
    /// end timestamp.
    pub fn is_ended(&self) -> bool {
        (self.final_score.is_some() && self.feedback.is_some()) || self.ended_at.is_some()
    }

    /// Derive the lifecycle status given the number of questions asked so far.
    pub fn status(&self, question_count: u32) -> InterviewStatus {
        if self.is_ended() {
            InterviewStatus::Ended
        } else if question_count == 0 {
            InterviewStatus::Created
        } else {
            InterviewStatus::Active
        }
    }

    /// Deterministic working-history session id for this interview.
    pub fn session_id(&self) -> String {
        session_id_for(self.id)
    }
}

/// Session id used for the in-process working history of an interview.
///
/// Recomputed identically on every recovery, never randomly generated.
pub fn session_id_for(interview_id: i64) -> String {
    format!("interview_{interview_id}")
}

/// Fields required to insert a new interview row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInterview {
    pub user_id: i64,
    pub position: String,
    pub provider: String,
    pub name: String,
    pub resume: String,
    pub started_at: DateTime<Utc>,
}

/// Request to start an interview, as received from the request layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartInterviewRequest {
    pub user_id: i64,
    pub position: String,
    /// Generation backend provider; the configured default is used when absent.
    #[serde(default)]
    pub provider: Option<String>,
    pub interview_name: String,
    pub resume: String,
}

/// Coarse phase label used to steer question generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitialScreening,
    TechnicalBasic,
    ProjectExperience,
    SystemDesign,
    General,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::InitialScreening => write!(f, "initial_screening"),
            Stage::TechnicalBasic => write!(f, "technical_basic"),
            Stage::ProjectExperience => write!(f, "project_experience"),
            Stage::SystemDesign => write!(f, "system_design"),
            Stage::General => write!(f, "general"),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial_screening" => Ok(Stage::InitialScreening),
            "technical_basic" => Ok(Stage::TechnicalBasic),
            "project_experience" => Ok(Stage::ProjectExperience),
            "system_design" => Ok(Stage::SystemDesign),
            "general" => Ok(Stage::General),
            other => Err(format!("invalid stage: '{other}'")),
        }
    }
}

/// Topic bucket of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    Technical,
    Project,
    SystemDesign,
    Behavioral,
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionCategory::Technical => write!(f, "technical"),
            QuestionCategory::Project => write!(f, "project"),
            QuestionCategory::SystemDesign => write!(f, "system_design"),
            QuestionCategory::Behavioral => write!(f, "behavioral"),
        }
    }
}

impl FromStr for QuestionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technical" => Ok(QuestionCategory::Technical),
            "project" => Ok(QuestionCategory::Project),
            "system_design" => Ok(QuestionCategory::SystemDesign),
            "behavioral" => Ok(QuestionCategory::Behavioral),
            other => Err(format!("invalid question category: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("invalid difficulty: '{other}'")),
        }
    }
}

/// Classification metadata stored with a canonical question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMeta {
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    /// Provider that first produced this question text.
    pub provider: String,
}

/// The occurrence of a question inside one interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: i64,
    pub interview_id: i64,
    pub question_id: i64,
    pub stage: Stage,
    pub is_followup: bool,
    pub evaluation: String,
    /// 1-based, contiguous per interview.
    pub order: u32,
    /// Opaque payload from the parse step.
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The candidate's reply to an interview question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub interview_question_id: i64,
    pub text: String,
    pub evaluation: String,
}

/// Answer to persist alongside a turn.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub interview_question_id: i64,
    pub text: String,
    /// Falls back to the answered question's evaluation when `None`.
    pub evaluation: Option<String>,
}

/// Everything one turn writes to the record store, committed atomically.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub interview_id: i64,
    /// `None` when the turn only records a final answer (cap reached).
    pub question: Option<NewQuestionOccurrence>,
    pub answer: Option<NewAnswer>,
    pub created_at: DateTime<Utc>,
}

/// A generated question to record for an interview.
#[derive(Debug, Clone)]
pub struct NewQuestionOccurrence {
    pub text: String,
    pub text_hash: String,
    pub meta: QuestionMeta,
    pub stage: Stage,
    pub is_followup: bool,
    pub evaluation: String,
    pub context: serde_json::Value,
}

/// Result of committing a turn.
#[derive(Debug, Clone)]
pub struct CommittedTurn {
    pub interview_question: Option<InterviewQuestion>,
    pub answer: Option<Answer>,
}

/// Progress through the question cap, displayed as `"N/cap"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub asked: u32,
    pub cap: u32,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.asked >= self.cap
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asked, self.cap)
    }
}

/// Input of one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnInput {
    /// The candidate's answer to the open question, if any.
    #[serde(default)]
    pub answer: Option<String>,
    /// InterviewQuestion being answered; defaults to the latest one.
    #[serde(default)]
    pub question_id: Option<i64>,
}

impl TurnInput {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
            question_id: None,
        }
    }
}

/// What a turn returns to the request layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Id of the newly asked question; the next answer attaches to it.
    pub interview_question_id: Option<i64>,
    pub next_question: Option<String>,
    /// Stage the conversation is in.
    pub current_stage: Stage,
    /// Stage label recorded with the new question.
    pub question_stage: Option<Stage>,
    pub evaluation: String,
    pub need_followup: bool,
    /// Backend's suggestion to end; the engine never ends on its own.
    pub need_end: bool,
    pub progress: String,
}

/// Result of `start_interview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedInterview {
    pub interview_id: i64,
    pub first_question: TurnOutcome,
    pub started_at: DateTime<Utc>,
}

/// Final score and narrative feedback produced by `end_interview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAssessment {
    pub final_score: i32,
    pub feedback: String,
}

/// Row of `list_interviews`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewListing {
    pub id: i64,
    pub position: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&Interview> for InterviewListing {
    fn from(interview: &Interview) -> Self {
        Self {
            id: interview.id,
            position: interview.position.clone(),
            started_at: interview.started_at,
            ended_at: interview.ended_at,
        }
    }
}

/// Full summary returned by `get_interview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSummary {
    #[serde(flatten)]
    pub interview: Interview,
    pub status: InterviewStatus,
    pub question_count: u32,
    pub progress: String,
}

/// One question/answer pair of an interview transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub interview_question_id: i64,
    pub question_id: i64,
    pub order: u32,
    pub question_text: String,
    pub answer_text: Option<String>,
    pub evaluation: String,
    pub stage: Stage,
}

/// Trailing summary record of `get_interview_questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub interview_id: i64,
    pub final_score: Option<i32>,
    pub feedback: Option<String>,
}

/// Transcript of an interview in question order plus its summary record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewTranscript {
    pub entries: Vec<TranscriptEntry>,
    pub summary: TranscriptSummary,
}

/// Flat element of the serialized transcript sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TranscriptItem<'a> {
    Entry(&'a TranscriptEntry),
    Summary(&'a TranscriptSummary),
}

impl InterviewTranscript {
    /// Entries followed by the trailing summary record.
    pub fn items(&self) -> Vec<TranscriptItem<'_>> {
        let mut items: Vec<TranscriptItem<'_>> =
            self.entries.iter().map(TranscriptItem::Entry).collect();
        items.push(TranscriptItem::Summary(&self.summary));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interview() -> Interview {
        Interview {
            id: 7,
            user_id: 1,
            position: "Backend Engineer".to_string(),
            provider: "deepseek".to_string(),
            name: "mock1".to_string(),
            resume: "5 years Java".to_string(),
            started_at: Utc::now(),
            ended_at: None,
            final_score: None,
            feedback: None,
        }
    }

    #[test]
    fn test_status_transitions() {
        let mut iv = interview();
        assert_eq!(iv.status(0), InterviewStatus::Created);
        assert_eq!(iv.status(3), InterviewStatus::Active);

        iv.final_score = Some(80);
        iv.feedback = Some("solid".to_string());
        assert_eq!(iv.status(3), InterviewStatus::Ended);
    }

    #[test]
    fn test_ended_at_alone_marks_ended() {
        let mut iv = interview();
        iv.ended_at = Some(Utc::now());
        assert!(iv.is_ended());
    }

    #[test]
    fn test_session_id_is_deterministic() {
        let iv = interview();
        assert_eq!(iv.session_id(), "interview_7");
        assert_eq!(session_id_for(7), iv.session_id());
    }

    #[test]
    fn test_stage_roundtrip() {
        for stage in [
            Stage::InitialScreening,
            Stage::TechnicalBasic,
            Stage::ProjectExperience,
            Stage::SystemDesign,
            Stage::General,
        ] {
            let parsed: Stage = stage.to_string().parse().unwrap();
            assert_eq!(stage, parsed);
        }
        assert!("lunch".parse::<Stage>().is_err());
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&QuestionCategory::SystemDesign).unwrap();
        assert_eq!(json, "\"system_design\"");
        let parsed: QuestionCategory = "system_design".parse().unwrap();
        assert_eq!(parsed, QuestionCategory::SystemDesign);
    }

    #[test]
    fn test_progress_display() {
        let progress = Progress { asked: 3, cap: 15 };
        assert_eq!(progress.to_string(), "3/15");
        assert!(!progress.is_complete());
        assert!(Progress { asked: 15, cap: 15 }.is_complete());
    }

    #[test]
    fn test_transcript_items_end_with_summary() {
        let transcript = InterviewTranscript {
            entries: vec![TranscriptEntry {
                interview_question_id: 1,
                question_id: 1,
                order: 1,
                question_text: "Tell me about yourself".to_string(),
                answer_text: None,
                evaluation: "Starting".to_string(),
                stage: Stage::General,
            }],
            summary: TranscriptSummary {
                interview_id: 7,
                final_score: None,
                feedback: None,
            },
        };
        let json = serde_json::to_value(transcript.items()).unwrap();
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0]["answer_text"].is_null());
        assert_eq!(items[1]["interview_id"], 7);
    }
}
