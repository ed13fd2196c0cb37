//! SQLite interview repository implementation.
//!
//! Implements `InterviewRepository` from `mockloop-core` using sqlx with
//! split read/write pools. Each turn is committed in one writer transaction.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use mockloop_core::repository::interview::InterviewRepository;
use mockloop_types::error::RepositoryError;
use mockloop_types::interview::{
    Answer, CommittedTurn, FinalAssessment, Interview, InterviewQuestion, NewInterview,
    QuestionCategory, QuestionMeta, Stage, TranscriptEntry, TurnRecord,
};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `InterviewRepository`.
pub struct SqliteInterviewRepository {
    pool: DatabasePool,
}

impl SqliteInterviewRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct InterviewRow {
    id: i64,
    user_id: i64,
    position: String,
    provider: String,
    name: String,
    resume: String,
    started_at: String,
    ended_at: Option<String>,
    final_score: Option<i32>,
    feedback: Option<String>,
}

impl InterviewRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            position: row.try_get("position")?,
            provider: row.try_get("provider")?,
            name: row.try_get("name")?,
            resume: row.try_get("resume")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            final_score: row.try_get("final_score")?,
            feedback: row.try_get("feedback")?,
        })
    }

    fn into_interview(self) -> Result<Interview, RepositoryError> {
        Ok(Interview {
            id: self.id,
            user_id: self.user_id,
            position: self.position,
            provider: self.provider,
            name: self.name,
            resume: self.resume,
            started_at: parse_datetime(&self.started_at)?,
            ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
            final_score: self.final_score,
            feedback: self.feedback,
        })
    }
}

struct InterviewQuestionRow {
    id: i64,
    interview_id: i64,
    question_id: i64,
    stage: String,
    is_followup: bool,
    evaluation: String,
    seq_order: i64,
    context: String,
    created_at: String,
}

impl InterviewQuestionRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            interview_id: row.try_get("interview_id")?,
            question_id: row.try_get("question_id")?,
            stage: row.try_get("stage")?,
            is_followup: row.try_get("is_followup")?,
            evaluation: row.try_get("evaluation")?,
            seq_order: row.try_get("seq_order")?,
            context: row.try_get("context")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_interview_question(self) -> Result<InterviewQuestion, RepositoryError> {
        let context: serde_json::Value = serde_json::from_str(&self.context)
            .map_err(|e| RepositoryError::Query(format!("invalid context JSON: {e}")))?;
        Ok(InterviewQuestion {
            id: self.id,
            interview_id: self.interview_id,
            question_id: self.question_id,
            stage: parse_stage(&self.stage)?,
            is_followup: self.is_followup,
            evaluation: self.evaluation,
            order: parse_order(self.seq_order)?,
            context,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn row_to_answer(row: &SqliteRow) -> Result<Answer, sqlx::Error> {
    Ok(Answer {
        id: row.try_get("id")?,
        interview_question_id: row.try_get("interview_question_id")?,
        text: row.try_get("text")?,
        evaluation: row.try_get("evaluation")?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_stage(s: &str) -> Result<Stage, RepositoryError> {
    s.parse()
        .map_err(|e: String| RepositoryError::Query(format!("invalid stage: {e}")))
}

fn parse_order(seq_order: i64) -> Result<u32, RepositoryError> {
    u32::try_from(seq_order)
        .map_err(|_| RepositoryError::Query(format!("invalid question order: {seq_order}")))
}

fn parse_meta(s: &str) -> Result<QuestionMeta, RepositoryError> {
    serde_json::from_str(s)
        .map_err(|e| RepositoryError::Query(format!("invalid question meta: {e}")))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE"))
}

// ---------------------------------------------------------------------------
// InterviewRepository implementation
// ---------------------------------------------------------------------------

impl InterviewRepository for SqliteInterviewRepository {
    async fn create_interview(
        &self,
        interview: &NewInterview,
    ) -> Result<Interview, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO interviews (user_id, position, provider, name, resume, started_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(interview.user_id)
        .bind(&interview.position)
        .bind(&interview.provider)
        .bind(&interview.name)
        .bind(&interview.resume)
        .bind(format_datetime(&interview.started_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(Interview {
            id: result.last_insert_rowid(),
            user_id: interview.user_id,
            position: interview.position.clone(),
            provider: interview.provider.clone(),
            name: interview.name.clone(),
            resume: interview.resume.clone(),
            started_at: interview.started_at,
            ended_at: None,
            final_score: None,
            feedback: None,
        })
    }

    async fn get_interview(&self, id: i64) -> Result<Option<Interview>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM interviews WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let interview_row = InterviewRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(interview_row.into_interview()?))
            }
            None => Ok(None),
        }
    }

    async fn list_interviews(&self, user_id: i64) -> Result<Vec<Interview>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM interviews WHERE user_id = ? ORDER BY started_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut interviews = Vec::with_capacity(rows.len());
        for row in &rows {
            let interview_row =
                InterviewRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            interviews.push(interview_row.into_interview()?);
        }
        Ok(interviews)
    }

    async fn count_questions(&self, interview_id: i64) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM interview_questions WHERE interview_id = ?",
        )
        .bind(interview_id)
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        parse_order(count)
    }

    async fn latest_question(
        &self,
        interview_id: i64,
    ) -> Result<Option<InterviewQuestion>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM interview_questions WHERE interview_id = ? ORDER BY seq_order DESC LIMIT 1",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let iq_row = InterviewQuestionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(iq_row.into_interview_question()?))
            }
            None => Ok(None),
        }
    }

    async fn get_interview_question(
        &self,
        id: i64,
    ) -> Result<Option<InterviewQuestion>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM interview_questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let iq_row = InterviewQuestionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(iq_row.into_interview_question()?))
            }
            None => Ok(None),
        }
    }

    async fn find_answer(
        &self,
        interview_question_id: i64,
    ) -> Result<Option<Answer>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM answers WHERE interview_question_id = ?")
            .bind(interview_question_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref()
            .map(row_to_answer)
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    async fn recent_question_categories(
        &self,
        interview_id: i64,
        limit: u32,
    ) -> Result<Vec<QuestionCategory>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT q.meta AS meta FROM interview_questions iq
             JOIN questions q ON q.id = iq.question_id
             WHERE iq.interview_id = ?
             ORDER BY iq.seq_order DESC LIMIT ?",
        )
        .bind(interview_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut categories = Vec::with_capacity(rows.len());
        for row in &rows {
            let meta: String = row
                .try_get("meta")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            categories.push(parse_meta(&meta)?.category);
        }
        Ok(categories)
    }

    async fn record_turn(&self, turn: &TurnRecord) -> Result<CommittedTurn, RepositoryError> {
        let created_at = format_datetime(&turn.created_at);
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let answer = match &turn.answer {
            Some(answer) => {
                let evaluation = match &answer.evaluation {
                    Some(evaluation) => evaluation.clone(),
                    None => {
                        let row = sqlx::query(
                            "SELECT evaluation FROM interview_questions WHERE id = ? AND interview_id = ?",
                        )
                        .bind(answer.interview_question_id)
                        .bind(turn.interview_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| RepositoryError::Query(e.to_string()))?
                        .ok_or(RepositoryError::NotFound)?;
                        row.try_get("evaluation")
                            .map_err(|e| RepositoryError::Query(e.to_string()))?
                    }
                };

                let result = sqlx::query(
                    "INSERT INTO answers (interview_question_id, text, evaluation, created_at)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(answer.interview_question_id)
                .bind(&answer.text)
                .bind(&evaluation)
                .bind(&created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        return RepositoryError::Conflict(format!(
                            "interview question {} is already answered",
                            answer.interview_question_id
                        ));
                    }
                    RepositoryError::Query(e.to_string())
                })?;

                Some(Answer {
                    id: result.last_insert_rowid(),
                    interview_question_id: answer.interview_question_id,
                    text: answer.text.clone(),
                    evaluation,
                })
            }
            None => None,
        };

        let interview_question = match &turn.question {
            Some(question) => {
                let meta = serde_json::to_string(&question.meta)
                    .map_err(|e| RepositoryError::Query(format!("failed to serialize meta: {e}")))?;
                sqlx::query(
                    "INSERT INTO questions (text, text_hash, meta, created_at) VALUES (?, ?, ?, ?)
                     ON CONFLICT (text_hash) DO NOTHING",
                )
                .bind(&question.text)
                .bind(&question.text_hash)
                .bind(&meta)
                .bind(&created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

                let question_id: i64 = sqlx::query("SELECT id FROM questions WHERE text_hash = ?")
                    .bind(&question.text_hash)
                    .fetch_one(&mut *tx)
                    .await
                    .and_then(|row| row.try_get("id"))
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;

                let next_order: i64 = sqlx::query(
                    "SELECT COALESCE(MAX(seq_order), 0) + 1 AS next_order
                     FROM interview_questions WHERE interview_id = ?",
                )
                .bind(turn.interview_id)
                .fetch_one(&mut *tx)
                .await
                .and_then(|row| row.try_get("next_order"))
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

                let context = serde_json::to_string(&question.context).map_err(|e| {
                    RepositoryError::Query(format!("failed to serialize context: {e}"))
                })?;

                let result = sqlx::query(
                    "INSERT INTO interview_questions
                        (interview_id, question_id, stage, is_followup, evaluation, seq_order, context, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(turn.interview_id)
                .bind(question_id)
                .bind(question.stage.to_string())
                .bind(question.is_followup)
                .bind(&question.evaluation)
                .bind(next_order)
                .bind(&context)
                .bind(&created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        return RepositoryError::Conflict(format!(
                            "order {next_order} already taken in interview {}",
                            turn.interview_id
                        ));
                    }
                    RepositoryError::Query(e.to_string())
                })?;

                Some(InterviewQuestion {
                    id: result.last_insert_rowid(),
                    interview_id: turn.interview_id,
                    question_id,
                    stage: question.stage,
                    is_followup: question.is_followup,
                    evaluation: question.evaluation.clone(),
                    order: parse_order(next_order)?,
                    context: question.context.clone(),
                    created_at: turn.created_at,
                })
            }
            None => None,
        };

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(CommittedTurn {
            interview_question,
            answer,
        })
    }

    async fn finish_interview(
        &self,
        interview_id: i64,
        assessment: &FinalAssessment,
        ended_at: DateTime<Utc>,
    ) -> Result<Interview, RepositoryError> {
        let result = sqlx::query(
            "UPDATE interviews SET ended_at = ?, final_score = ?, feedback = ?
             WHERE id = ? AND ended_at IS NULL",
        )
        .bind(format_datetime(&ended_at))
        .bind(assessment.final_score)
        .bind(&assessment.feedback)
        .bind(interview_id)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM interviews WHERE id = ?")
            .bind(interview_id)
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "interview {interview_id} has already ended"
            )));
        }

        InterviewRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_interview()
    }

    async fn transcript(&self, interview_id: i64) -> Result<Vec<TranscriptEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT iq.id AS interview_question_id, iq.question_id, iq.seq_order, iq.evaluation,
                    iq.stage, q.text AS question_text, a.text AS answer_text
             FROM interview_questions iq
             JOIN questions q ON q.id = iq.question_id
             LEFT JOIN answers a ON a.interview_question_id = iq.id
             WHERE iq.interview_id = ?
             ORDER BY iq.seq_order",
        )
        .bind(interview_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let read = |e: sqlx::Error| RepositoryError::Query(e.to_string());
            let seq_order: i64 = row.try_get("seq_order").map_err(read)?;
            let stage: String = row.try_get("stage").map_err(read)?;
            entries.push(TranscriptEntry {
                interview_question_id: row.try_get("interview_question_id").map_err(read)?,
                question_id: row.try_get("question_id").map_err(read)?,
                order: parse_order(seq_order)?,
                question_text: row.try_get("question_text").map_err(read)?,
                answer_text: row.try_get("answer_text").map_err(read)?,
                evaluation: row.try_get("evaluation").map_err(read)?,
                stage: parse_stage(&stage)?,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockloop_types::interview::{
        Difficulty, NewAnswer, NewQuestionOccurrence, QuestionCategory,
    };

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn new_interview(user_id: i64) -> NewInterview {
        NewInterview {
            user_id,
            position: "Backend Engineer".to_string(),
            provider: "scripted".to_string(),
            name: "mock1".to_string(),
            resume: "5 years Java".to_string(),
            started_at: Utc::now(),
        }
    }

    fn occurrence(text: &str, category: QuestionCategory) -> NewQuestionOccurrence {
        NewQuestionOccurrence {
            text: text.to_string(),
            text_hash: format!("hash-{text}"),
            meta: QuestionMeta {
                category,
                difficulty: Difficulty::Easy,
                provider: "scripted".to_string(),
            },
            stage: Stage::General,
            is_followup: false,
            evaluation: format!("eval for {text}"),
            context: serde_json::json!({"parsed_data": {}}),
        }
    }

    fn question_turn(interview_id: i64, text: &str) -> TurnRecord {
        TurnRecord {
            interview_id,
            question: Some(occurrence(text, QuestionCategory::Technical)),
            answer: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_interview() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let created = repo.create_interview(&new_interview(1)).await.unwrap();
        assert!(created.id > 0);

        let loaded = repo.get_interview(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.position, "Backend Engineer");
        assert_eq!(loaded.resume, "5 years Java");
        assert!(loaded.ended_at.is_none());
        assert!(!loaded.is_ended());

        assert!(repo.get_interview(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_interviews_newest_first() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let mut older = new_interview(7);
        older.started_at = Utc::now() - chrono::Duration::hours(1);
        let a = repo.create_interview(&older).await.unwrap();
        let b = repo.create_interview(&new_interview(7)).await.unwrap();
        repo.create_interview(&new_interview(8)).await.unwrap();

        let listed = repo.list_interviews(7).await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_order_is_contiguous_from_one() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let interview = repo.create_interview(&new_interview(1)).await.unwrap();

        for (i, text) in ["q1", "q2", "q3"].iter().enumerate() {
            let committed = repo
                .record_turn(&question_turn(interview.id, text))
                .await
                .unwrap();
            assert_eq!(committed.interview_question.unwrap().order, i as u32 + 1);
        }
        assert_eq!(repo.count_questions(interview.id).await.unwrap(), 3);

        let latest = repo.latest_question(interview.id).await.unwrap().unwrap();
        assert_eq!(latest.order, 3);
        assert_eq!(latest.context["parsed_data"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_same_text_shares_question_row() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let first = repo.create_interview(&new_interview(1)).await.unwrap();
        let second = repo.create_interview(&new_interview(2)).await.unwrap();

        let a = repo
            .record_turn(&question_turn(first.id, "What is MVCC?"))
            .await
            .unwrap()
            .interview_question
            .unwrap();
        let b = repo
            .record_turn(&question_turn(second.id, "What is MVCC?"))
            .await
            .unwrap()
            .interview_question
            .unwrap();

        assert_eq!(a.question_id, b.question_id);
        assert_ne!(a.id, b.id);
        assert_eq!(a.order, 1);
        assert_eq!(b.order, 1);

        let (count, meta): (i64, String) =
            sqlx::query_as("SELECT COUNT(*), MAX(meta) FROM questions WHERE text_hash = ?")
                .bind("hash-What is MVCC?")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(parse_meta(&meta).unwrap().category, QuestionCategory::Technical);
    }

    #[tokio::test]
    async fn test_answer_defaults_to_question_evaluation() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let interview = repo.create_interview(&new_interview(1)).await.unwrap();
        let iq = repo
            .record_turn(&question_turn(interview.id, "q1"))
            .await
            .unwrap()
            .interview_question
            .unwrap();

        let committed = repo
            .record_turn(&TurnRecord {
                interview_id: interview.id,
                question: None,
                answer: Some(NewAnswer {
                    interview_question_id: iq.id,
                    text: "an answer".to_string(),
                    evaluation: None,
                }),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(committed.interview_question.is_none());
        assert_eq!(committed.answer.unwrap().evaluation, "eval for q1");
        let stored = repo.find_answer(iq.id).await.unwrap().unwrap();
        assert_eq!(stored.text, "an answer");
    }

    #[tokio::test]
    async fn test_second_answer_conflicts_and_rolls_back() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let interview = repo.create_interview(&new_interview(1)).await.unwrap();
        let iq = repo
            .record_turn(&question_turn(interview.id, "q1"))
            .await
            .unwrap()
            .interview_question
            .unwrap();

        let answer = NewAnswer {
            interview_question_id: iq.id,
            text: "first".to_string(),
            evaluation: Some("ok".to_string()),
        };
        let mut turn = question_turn(interview.id, "q2");
        turn.answer = Some(answer.clone());
        repo.record_turn(&turn).await.unwrap();

        let mut again = question_turn(interview.id, "q3");
        again.answer = Some(NewAnswer {
            text: "second".to_string(),
            ..answer
        });
        let err = repo.record_turn(&again).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // The rejected turn left nothing behind.
        assert_eq!(repo.count_questions(interview.id).await.unwrap(), 2);
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE text_hash = ?")
            .bind("hash-q3")
            .fetch_one(&repo.pool.reader)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_recent_categories_newest_first() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let interview = repo.create_interview(&new_interview(1)).await.unwrap();
        for (text, category) in [
            ("q1", QuestionCategory::Behavioral),
            ("q2", QuestionCategory::Project),
            ("q3", QuestionCategory::SystemDesign),
        ] {
            repo.record_turn(&TurnRecord {
                interview_id: interview.id,
                question: Some(occurrence(text, category)),
                answer: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let recent = repo
            .recent_question_categories(interview.id, 2)
            .await
            .unwrap();
        assert_eq!(
            recent,
            vec![QuestionCategory::SystemDesign, QuestionCategory::Project]
        );
    }

    #[tokio::test]
    async fn test_finish_interview_once() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let interview = repo.create_interview(&new_interview(1)).await.unwrap();
        let assessment = FinalAssessment {
            final_score: 82,
            feedback: "Solid fundamentals.".to_string(),
        };

        let ended = repo
            .finish_interview(interview.id, &assessment, Utc::now())
            .await
            .unwrap();
        assert_eq!(ended.final_score, Some(82));
        assert!(ended.ended_at.is_some());
        assert!(ended.is_ended());

        let err = repo
            .finish_interview(interview.id, &assessment, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = repo
            .finish_interview(interview.id + 50, &assessment, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_transcript_includes_unanswered_questions() {
        let repo = SqliteInterviewRepository::new(test_pool().await);
        let interview = repo.create_interview(&new_interview(1)).await.unwrap();
        let iq = repo
            .record_turn(&question_turn(interview.id, "q1"))
            .await
            .unwrap()
            .interview_question
            .unwrap();
        let mut turn = question_turn(interview.id, "q2");
        turn.answer = Some(NewAnswer {
            interview_question_id: iq.id,
            text: "because".to_string(),
            evaluation: None,
        });
        repo.record_turn(&turn).await.unwrap();

        let entries = repo.transcript(interview.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question_text, "q1");
        assert_eq!(entries[0].answer_text.as_deref(), Some("because"));
        assert_eq!(entries[0].evaluation, "eval for q1");
        assert_eq!(entries[1].order, 2);
        assert!(entries[1].answer_text.is_none());
    }
}
