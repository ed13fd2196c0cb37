//! Interview record store trait definition.

use chrono::{DateTime, Utc};

use mockloop_types::error::RepositoryError;
use mockloop_types::interview::{
    Answer, CommittedTurn, FinalAssessment, Interview, InterviewQuestion, NewInterview,
    QuestionCategory, TranscriptEntry, TurnRecord,
};

/// Repository trait for the durable interview record.
///
/// Holds Interview, Question, InterviewQuestion and Answer rows. Only the
/// orchestrator mutates it; nothing here ever expires or is deleted.
///
/// Implementations live in mockloop-infra (e.g., SqliteInterviewRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait InterviewRepository: Send + Sync {
    /// Insert a new interview. Returns the created row with its assigned id.
    fn create_interview(
        &self,
        interview: &NewInterview,
    ) -> impl std::future::Future<Output = Result<Interview, RepositoryError>> + Send;

    fn get_interview(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Interview>, RepositoryError>> + Send;

    /// List a user's interviews, most recently started first.
    fn list_interviews(
        &self,
        user_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Interview>, RepositoryError>> + Send;

    /// Number of InterviewQuestion rows recorded for an interview.
    fn count_questions(
        &self,
        interview_id: i64,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;

    /// The InterviewQuestion with the highest order, if any.
    fn latest_question(
        &self,
        interview_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<InterviewQuestion>, RepositoryError>> + Send;

    fn get_interview_question(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<InterviewQuestion>, RepositoryError>> + Send;

    /// The answer recorded for an InterviewQuestion, if any.
    fn find_answer(
        &self,
        interview_question_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Answer>, RepositoryError>> + Send;

    /// Categories of the most recent questions of an interview, newest first.
    fn recent_question_categories(
        &self,
        interview_id: i64,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<QuestionCategory>, RepositoryError>> + Send;

    /// Commit one turn atomically.
    ///
    /// Resolves or creates the canonical Question by hash, inserts the
    /// InterviewQuestion with `order = max(order) + 1`, and inserts the
    /// Answer. Either everything is written or nothing is. Answering an
    /// already-answered question yields `RepositoryError::Conflict`.
    fn record_turn(
        &self,
        turn: &TurnRecord,
    ) -> impl std::future::Future<Output = Result<CommittedTurn, RepositoryError>> + Send;

    /// Set final score, feedback and end timestamp together.
    ///
    /// Returns `RepositoryError::Conflict` if the interview was already ended.
    fn finish_interview(
        &self,
        interview_id: i64,
        assessment: &FinalAssessment,
        ended_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Interview, RepositoryError>> + Send;

    /// Questions of an interview in order, each with its answer if present.
    fn transcript(
        &self,
        interview_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<TranscriptEntry>, RepositoryError>> + Send;
}
