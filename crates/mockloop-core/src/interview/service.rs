//! Interview service: the session orchestrator.
//!
//! InterviewService is the single point of mutation for interview state. It
//! composes the record store, the session cache, the working history, the
//! provider registry and the parser to advance an interview one turn at a
//! time, then scores it when the caller ends it.
//!
//! Every mutating operation holds the interview's lock for its whole
//! duration. Backend calls inside the lock are bounded by the configured
//! generation timeout.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{Instrument, debug, info, info_span, warn};

use mockloop_types::config::EngineConfig;
use mockloop_types::error::{InterviewError, RepositoryError};
use mockloop_types::interview::{
    FinalAssessment, Interview, InterviewListing, InterviewQuestion, InterviewSummary,
    InterviewTranscript, NewAnswer, NewInterview, NewQuestionOccurrence, Progress, QuestionMeta,
    Stage, StartInterviewRequest, StartedInterview, TranscriptSummary, TurnInput, TurnOutcome,
    TurnRecord, session_id_for,
};
use mockloop_types::llm::{CompletionRequest, LlmError, Message, StreamEvent};
use mockloop_types::session::{HistoryMessage, SessionMetadata, SessionSnapshot};

use super::classify::{Classifier, KeywordClassifier};
use super::history::HistoryStore;
use super::lock::InterviewLocks;
use super::parser::{parse_assessment, parse_decision};
use super::prompt::{
    FIRST_QUESTION_INPUT, TurnPrompt, history_messages, saturated_topic, scoring_prompt,
    seed_history, system_instruction,
};
use super::recovery::{RecoverySource, recover};
use super::refresh::{CacheRefresher, RefreshPolicy};
use super::stream::{TurnFragment, TurnStream};
use crate::cache::{SessionCache, user_index_key};
use crate::clock::{Clock, SystemClock};
use crate::hash::ContentHasher;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::registry::ProviderRegistry;
use crate::repository::interview::InterviewRepository;

/// Input sent in place of an answer when the caller skips one mid-interview.
const NEXT_QUESTION_INPUT: &str = "Please continue with the next question.";

const FALLBACK_FEEDBACK: &str =
    "The interview went smoothly, but some topics need to be explored in more depth.";

/// A backend call to make for this turn.
struct Generation {
    provider: Arc<BoxLlmProvider>,
    request: CompletionRequest,
}

/// Everything a turn needs, resolved while holding the interview lock.
struct TurnPlan {
    interview: Interview,
    /// Questions recorded before this turn.
    asked: u32,
    answer: Option<String>,
    target: Option<InterviewQuestion>,
    history: Vec<HistoryMessage>,
    stage: Stage,
    /// `None` when the question cap is reached and the turn only records
    /// the final answer.
    generation: Option<Generation>,
}

/// Orchestrates the interview lifecycle.
///
/// Generic over the record store, the session cache and the content hasher
/// so mockloop-core never depends on mockloop-infra. Cheap to clone; clones
/// share all state.
pub struct InterviewService<R, C, H>
where
    R: InterviewRepository,
    C: SessionCache,
    H: ContentHasher,
{
    repo: Arc<R>,
    cache: Arc<C>,
    hasher: Arc<H>,
    providers: Arc<ProviderRegistry>,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    history: HistoryStore,
    locks: InterviewLocks,
    refresher: CacheRefresher,
    config: Arc<EngineConfig>,
}

impl<R, C, H> Clone for InterviewService<R, C, H>
where
    R: InterviewRepository,
    C: SessionCache,
    H: ContentHasher,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            cache: self.cache.clone(),
            hasher: self.hasher.clone(),
            providers: self.providers.clone(),
            classifier: self.classifier.clone(),
            clock: self.clock.clone(),
            history: self.history.clone(),
            locks: self.locks.clone(),
            refresher: self.refresher.clone(),
            config: self.config.clone(),
        }
    }
}

fn commit_error(err: RepositoryError) -> InterviewError {
    match err {
        RepositoryError::Conflict(msg) => InterviewError::InvalidState(msg),
        other => InterviewError::Storage(other.to_string()),
    }
}

impl<R, C, H> InterviewService<R, C, H>
where
    R: InterviewRepository + 'static,
    C: SessionCache + 'static,
    H: ContentHasher + 'static,
{
    /// Create a new interview service.
    ///
    /// Spawns the cache refresh worker, so this must run inside a Tokio
    /// runtime. Timestamps come from the system clock unless replaced with
    /// [`with_clock`].
    ///
    /// [`with_clock`]: InterviewService::with_clock
    pub fn new(
        repo: Arc<R>,
        cache: Arc<C>,
        hasher: Arc<H>,
        providers: Arc<ProviderRegistry>,
        config: EngineConfig,
    ) -> Self {
        let refresher = CacheRefresher::spawn(
            cache.clone(),
            RefreshPolicy {
                history_ttl: Duration::from_secs(config.history_ttl_secs),
                user_index_ttl: Duration::from_secs(config.user_index_ttl_secs),
                attempts: config.cache_refresh_attempts,
            },
        );
        Self {
            repo,
            cache,
            hasher,
            providers,
            classifier: Arc::new(KeywordClassifier),
            clock: Arc::new(SystemClock),
            history: HistoryStore::new(),
            locks: InterviewLocks::new(),
            refresher,
            config: Arc::new(config),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Access the record store.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Lifecycle ---

    /// Create an interview and ask its first question.
    ///
    /// If the first question cannot be generated, the interview row stays
    /// in the created state and the error is returned; a later
    /// `submit_turn` without an answer asks the first question.
    pub async fn start_interview(
        &self,
        request: StartInterviewRequest,
    ) -> Result<StartedInterview, InterviewError> {
        let position = required("position", &request.position)?;
        let name = required("interview_name", &request.interview_name)?;
        let resume = required("resume", &request.resume)?;
        if request.user_id <= 0 {
            return Err(InterviewError::Validation(
                "user_id must be a positive integer".to_string(),
            ));
        }
        let provider = request
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.config.default_provider)
            .to_string();
        if !self.providers.contains(&provider) {
            return Err(LlmError::UnknownProvider(provider).into());
        }

        let now = self.clock.now();
        let interview = self
            .repo
            .create_interview(&NewInterview {
                user_id: request.user_id,
                position,
                provider,
                name,
                resume,
                started_at: now,
            })
            .await?;
        info!(
            interview_id = interview.id,
            user_id = interview.user_id,
            provider = %interview.provider,
            "interview created"
        );

        self.history
            .put(&interview.session_id(), seed_history(&interview.resume, now));

        let first_question = {
            let _guard = self.locks.acquire(interview.id).await;
            self.run_turn(interview.id, TurnInput::default()).await?
        };

        Ok(StartedInterview {
            interview_id: interview.id,
            first_question,
            started_at: interview.started_at,
        })
    }

    /// Advance an interview by one turn.
    pub async fn submit_turn(
        &self,
        interview_id: i64,
        input: TurnInput,
    ) -> Result<TurnOutcome, InterviewError> {
        let _guard = self.locks.acquire(interview_id).await;
        self.run_turn(interview_id, input).await
    }

    /// Advance an interview by one turn, streaming the backend output.
    ///
    /// The returned stream owns the interview lock until it finishes or is
    /// dropped. It yields `Delta`s, then `Completed` and `End`, or a single
    /// `Error`. Once generation is done the commit runs on its own task, so
    /// dropping the stream cannot leave a committed turn out of the working
    /// history.
    pub fn submit_turn_stream(&self, interview_id: i64, input: TurnInput) -> TurnStream {
        let service = self.clone();
        Box::pin(async_stream::stream! {
            let guard = service.locks.acquire(interview_id).await;

            let mut plan = match service.plan_turn(interview_id, input).await {
                Ok(plan) => plan,
                Err(e) => {
                    yield TurnFragment::Error(e.to_string());
                    return;
                }
            };

            let raw = match plan.generation.take() {
                None => None,
                Some(generation) => {
                    let span = info_span!(
                        "gen_ai.stream",
                        gen_ai.system = generation.provider.name(),
                        gen_ai.request.model = %generation.request.model,
                        gen_ai.request.max_tokens = generation.request.max_tokens,
                        gen_ai.request.stream = true,
                        interview_id,
                    );
                    span.in_scope(|| debug!("streaming turn"));

                    let mut events = generation
                        .provider
                        .stream_within(generation.request, service.generation_timeout());
                    let mut text = String::new();
                    let mut failure: Option<InterviewError> = None;
                    while let Some(event) = events.next().await {
                        match event {
                            Ok(StreamEvent::TextDelta { text: delta }) => {
                                text.push_str(&delta);
                                yield TurnFragment::Delta(delta);
                            }
                            Ok(_) => {}
                            Err(e) => {
                                failure = Some(e.into());
                                break;
                            }
                        }
                    }
                    if let Some(e) = failure {
                        span.in_scope(|| warn!(error = %e, "turn stream failed"));
                        yield TurnFragment::Error(e.to_string());
                        return;
                    }
                    span.in_scope(|| debug!(chars = text.len(), "turn stream finished"));
                    Some(text)
                }
            };

            let committer = service.clone();
            let commit = tokio::spawn(async move {
                let _guard = guard;
                committer.finish_turn(plan, raw).await
            });
            match commit.await {
                Ok(Ok(outcome)) => {
                    yield TurnFragment::Completed(outcome);
                    yield TurnFragment::End;
                }
                Ok(Err(e)) => yield TurnFragment::Error(e.to_string()),
                Err(e) => {
                    warn!(interview_id, error = %e, "turn commit task failed");
                    yield TurnFragment::Error(format!("turn commit failed: {e}"));
                }
            }
        })
    }

    /// Score an interview and mark it ended.
    pub async fn end_interview(&self, interview_id: i64) -> Result<FinalAssessment, InterviewError> {
        let _guard = self.locks.acquire(interview_id).await;

        let interview = self.load_interview(interview_id).await?;
        if interview.is_ended() {
            return Err(InterviewError::InvalidState(format!(
                "interview {interview_id} has already ended"
            )));
        }
        let asked = self.repo.count_questions(interview_id).await?;
        if asked == 0 {
            return Err(InterviewError::InvalidState(format!(
                "interview {interview_id} has no questions yet"
            )));
        }

        let history = self.working_history(&interview).await;
        let provider = self.providers.get(&interview.provider)?;
        let request = CompletionRequest {
            model: provider.model().to_string(),
            messages: vec![Message::user(scoring_prompt(&interview.position, &history))],
            system: None,
            max_tokens: provider.max_tokens(),
            temperature: None,
            stream: false,
        };
        let raw = self
            .generate(&Generation { provider, request }, interview_id)
            .await?;

        let assessment = parse_assessment(&raw).unwrap_or_else(|| {
            warn!(
                interview_id,
                fallback_score = self.config.fallback_score,
                "could not parse final assessment; using fallback"
            );
            FinalAssessment {
                final_score: self.config.fallback_score,
                feedback: FALLBACK_FEEDBACK.to_string(),
            }
        });

        let now = self.clock.now();
        self.repo
            .finish_interview(interview_id, &assessment, now)
            .await
            .map_err(commit_error)?;
        info!(
            interview_id,
            final_score = assessment.final_score,
            questions = asked,
            "interview ended"
        );

        // No turn can follow, so the session state is released.
        self.history.evict(&interview.session_id());
        self.refresher.discard(interview_id);

        Ok(assessment)
    }

    // --- Queries ---

    /// A user's interviews, most recently started first.
    pub async fn list_interviews(
        &self,
        user_id: i64,
    ) -> Result<Vec<InterviewListing>, InterviewError> {
        let interviews = self.repo.list_interviews(user_id).await?;
        Ok(interviews.iter().map(InterviewListing::from).collect())
    }

    pub async fn get_interview(&self, interview_id: i64) -> Result<InterviewSummary, InterviewError> {
        let interview = self.load_interview(interview_id).await?;
        let question_count = self.repo.count_questions(interview_id).await?;
        Ok(InterviewSummary {
            status: interview.status(question_count),
            progress: self.progress(question_count).to_string(),
            question_count,
            interview,
        })
    }

    /// The interview's questions in order, each with its answer, plus a
    /// trailing summary record.
    pub async fn get_interview_questions(
        &self,
        interview_id: i64,
    ) -> Result<InterviewTranscript, InterviewError> {
        let interview = self.load_interview(interview_id).await?;
        let entries = self.repo.transcript(interview_id).await?;
        Ok(InterviewTranscript {
            entries,
            summary: TranscriptSummary {
                interview_id,
                final_score: interview.final_score,
                feedback: interview.feedback,
            },
        })
    }

    /// Interview ids currently indexed in the session cache for a user.
    ///
    /// Cache failures read as an empty index.
    pub async fn cached_sessions(&self, user_id: i64) -> Vec<i64> {
        match self.cache.set_members(&user_index_key(user_id)).await {
            Ok(members) => {
                let mut ids: Vec<i64> = members.iter().filter_map(|m| m.parse().ok()).collect();
                ids.sort_unstable();
                ids
            }
            Err(e) => {
                warn!(user_id, error = %e, "session index read failed");
                Vec::new()
            }
        }
    }

    /// Wait for queued cache refreshes to be written.
    pub async fn flush_cache(&self) {
        self.refresher.flush().await;
    }

    /// Drop an interview's working history so its next turn recovers.
    pub fn evict_working_history(&self, interview_id: i64) -> bool {
        self.history.evict(&session_id_for(interview_id))
    }

    // --- Turn internals (caller holds the interview lock) ---

    async fn run_turn(
        &self,
        interview_id: i64,
        input: TurnInput,
    ) -> Result<TurnOutcome, InterviewError> {
        let mut plan = self.plan_turn(interview_id, input).await?;
        let raw = match plan.generation.take() {
            Some(generation) => Some(self.generate(&generation, interview_id).await?),
            None => None,
        };
        self.finish_turn(plan, raw).await
    }

    async fn plan_turn(
        &self,
        interview_id: i64,
        input: TurnInput,
    ) -> Result<TurnPlan, InterviewError> {
        let interview = self.load_interview(interview_id).await?;
        if interview.is_ended() {
            return Err(InterviewError::InvalidState(format!(
                "interview {interview_id} has already ended"
            )));
        }

        let answer = match input.answer {
            Some(text) if text.trim().is_empty() => {
                return Err(InterviewError::Validation(
                    "answer must not be empty".to_string(),
                ));
            }
            Some(text) => Some(text.trim().to_string()),
            None => None,
        };
        if answer.is_none() && input.question_id.is_some() {
            return Err(InterviewError::Validation(
                "question_id requires an answer".to_string(),
            ));
        }

        let asked = self.repo.count_questions(interview_id).await?;
        let target = if answer.is_some() {
            Some(self.answer_target(&interview, asked, input.question_id).await?)
        } else {
            None
        };

        let cap = self.config.question_cap;
        let at_cap = asked >= cap;
        if at_cap {
            match &target {
                Some(t) if t.order == asked => {}
                Some(_) => {
                    return Err(InterviewError::InvalidState(format!(
                        "question cap of {cap} reached; only the final question can be answered"
                    )));
                }
                None => {
                    return Err(InterviewError::InvalidState(format!(
                        "question cap of {cap} reached"
                    )));
                }
            }
        }

        let history = self.working_history(&interview).await;
        let stage = self.classifier.conversation_stage(&history);

        let generation = if at_cap {
            None
        } else {
            let limit = self.config.topic_repeat_limit;
            let recent = self
                .repo
                .recent_question_categories(interview_id, limit)
                .await?;
            let system = system_instruction(&TurnPrompt {
                position: &interview.position,
                stage,
                question_cap: cap,
                questions_asked: asked,
                topic_repeat_limit: limit,
                saturated_topic: saturated_topic(&recent, limit),
            });

            let input_text = match &answer {
                Some(text) => text.clone(),
                None if asked == 0 => FIRST_QUESTION_INPUT.to_string(),
                None => NEXT_QUESTION_INPUT.to_string(),
            };
            let mut messages = history_messages(&history);
            messages.push(Message::user(input_text));

            let provider = self.providers.get(&interview.provider)?;
            Some(Generation {
                request: CompletionRequest {
                    model: provider.model().to_string(),
                    messages,
                    system: Some(system),
                    max_tokens: provider.max_tokens(),
                    temperature: None,
                    stream: false,
                },
                provider,
            })
        };

        Ok(TurnPlan {
            interview,
            asked,
            answer,
            target,
            history,
            stage,
            generation,
        })
    }

    /// Resolve which question an answer belongs to.
    async fn answer_target(
        &self,
        interview: &Interview,
        asked: u32,
        question_id: Option<i64>,
    ) -> Result<InterviewQuestion, InterviewError> {
        if asked == 0 {
            return Err(InterviewError::InvalidState(format!(
                "interview {} has no question to answer yet",
                interview.id
            )));
        }
        let question = match question_id {
            Some(id) => self
                .repo
                .get_interview_question(id)
                .await?
                .filter(|q| q.interview_id == interview.id)
                .ok_or_else(|| {
                    InterviewError::Validation(format!(
                        "question {id} does not belong to interview {}",
                        interview.id
                    ))
                })?,
            None => self.repo.latest_question(interview.id).await?.ok_or_else(|| {
                InterviewError::InvalidState(format!(
                    "interview {} has no question to answer yet",
                    interview.id
                ))
            })?,
        };
        if self.repo.find_answer(question.id).await?.is_some() {
            return Err(InterviewError::InvalidState(format!(
                "question {} has already been answered",
                question.id
            )));
        }
        Ok(question)
    }

    async fn generate(
        &self,
        generation: &Generation,
        interview_id: i64,
    ) -> Result<String, InterviewError> {
        let request = &generation.request;
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = generation.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.stream = false,
            interview_id,
        );

        let response = generation
            .provider
            .complete_within(request, self.generation_timeout())
            .instrument(span)
            .await?;

        debug!(
            interview_id,
            output_tokens = response.usage.output_tokens,
            "generation finished"
        );
        Ok(response.content)
    }

    /// Parse, classify and commit the turn, then refresh history and cache.
    async fn finish_turn(
        &self,
        plan: TurnPlan,
        raw: Option<String>,
    ) -> Result<TurnOutcome, InterviewError> {
        let TurnPlan {
            interview,
            asked,
            answer,
            target,
            mut history,
            stage,
            ..
        } = plan;
        let now = self.clock.now();

        let Some(raw) = raw else {
            return self
                .record_final_answer(interview, asked, answer, target, history, stage)
                .await;
        };

        let decision = parse_decision(&raw, now);
        let question_stage = self.classifier.evaluation_stage(&decision.evaluation);
        let occurrence = NewQuestionOccurrence {
            text_hash: self.hasher.compute_hash(&decision.next_question),
            meta: QuestionMeta {
                category: self.classifier.category(&decision.next_question),
                difficulty: self.classifier.difficulty(&decision.next_question),
                provider: interview.provider.clone(),
            },
            text: decision.next_question.clone(),
            stage: question_stage,
            is_followup: decision.need_followup,
            evaluation: decision.evaluation.clone(),
            context: decision.context.clone(),
        };
        let new_answer = match (&answer, &target) {
            (Some(text), Some(t)) => Some(NewAnswer {
                interview_question_id: t.id,
                text: text.clone(),
                evaluation: Some(decision.evaluation.clone()),
            }),
            _ => None,
        };

        let committed = self
            .repo
            .record_turn(&TurnRecord {
                interview_id: interview.id,
                question: Some(occurrence),
                answer: new_answer,
                created_at: now,
            })
            .await
            .map_err(commit_error)?;
        let question = committed.interview_question.ok_or_else(|| {
            InterviewError::Storage("turn commit returned no question".to_string())
        })?;
        info!(
            interview_id = interview.id,
            order = question.order,
            stage = %question_stage,
            parsed = decision.parsed,
            "turn committed"
        );

        if let Some(text) = answer {
            history.push(HistoryMessage::candidate(text, now));
        }
        history.push(HistoryMessage::interviewer(decision.next_question.clone(), now));

        let asked = question.order;
        self.history.put(&interview.session_id(), history.clone());
        self.enqueue_snapshot(&interview, history, stage, asked);

        Ok(TurnOutcome {
            interview_question_id: Some(question.id),
            next_question: Some(decision.next_question),
            current_stage: stage,
            question_stage: Some(question_stage),
            evaluation: decision.evaluation,
            need_followup: decision.need_followup,
            need_end: decision.need_end,
            progress: self.progress(asked).to_string(),
        })
    }

    /// Record the answer to the last question once the cap is reached.
    async fn record_final_answer(
        &self,
        interview: Interview,
        asked: u32,
        answer: Option<String>,
        target: Option<InterviewQuestion>,
        mut history: Vec<HistoryMessage>,
        stage: Stage,
    ) -> Result<TurnOutcome, InterviewError> {
        let (Some(text), Some(target)) = (answer, target) else {
            return Err(InterviewError::InvalidState(format!(
                "question cap of {} reached",
                self.config.question_cap
            )));
        };
        let now = self.clock.now();

        self.repo
            .record_turn(&TurnRecord {
                interview_id: interview.id,
                question: None,
                answer: Some(NewAnswer {
                    interview_question_id: target.id,
                    text: text.clone(),
                    evaluation: None,
                }),
                created_at: now,
            })
            .await
            .map_err(commit_error)?;
        info!(
            interview_id = interview.id,
            order = target.order,
            "final answer recorded; question cap reached"
        );

        history.push(HistoryMessage::candidate(text, now));
        self.history.put(&interview.session_id(), history.clone());
        self.enqueue_snapshot(&interview, history, stage, asked);

        Ok(TurnOutcome {
            interview_question_id: None,
            next_question: None,
            current_stage: stage,
            question_stage: None,
            evaluation: target.evaluation,
            need_followup: false,
            need_end: true,
            progress: self.progress(asked).to_string(),
        })
    }

    // --- Helpers ---

    async fn load_interview(&self, interview_id: i64) -> Result<Interview, InterviewError> {
        self.repo
            .get_interview(interview_id)
            .await?
            .ok_or(InterviewError::NotFound(interview_id))
    }

    /// The in-process working history, recovered from the cache if cold.
    async fn working_history(&self, interview: &Interview) -> Vec<HistoryMessage> {
        let session_id = interview.session_id();
        if let Some(history) = self.history.get(&session_id) {
            return history;
        }
        let recovered = recover(self.cache.as_ref(), interview, self.clock.now()).await;
        if recovered.source == RecoverySource::Seeded {
            debug!(
                interview_id = interview.id,
                "working history restarts from the resume seed"
            );
        }
        self.history.put(&session_id, recovered.messages.clone());
        recovered.messages
    }

    fn enqueue_snapshot(
        &self,
        interview: &Interview,
        messages: Vec<HistoryMessage>,
        stage: Stage,
        question_count: u32,
    ) {
        self.refresher.enqueue(SessionSnapshot {
            interview_id: interview.id,
            user_id: interview.user_id,
            messages,
            metadata: SessionMetadata {
                position: interview.position.clone(),
                user_id: interview.user_id,
                provider: interview.provider.clone(),
                current_stage: stage,
                question_count,
                last_updated: self.clock.now(),
            },
        });
    }

    fn progress(&self, asked: u32) -> Progress {
        Progress {
            asked,
            cap: self.config.question_cap,
        }
    }

    fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.generation_timeout_secs)
    }
}

fn required(field: &str, value: &str) -> Result<String, InterviewError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InterviewError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}
