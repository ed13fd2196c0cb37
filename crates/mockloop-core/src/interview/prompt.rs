//! Prompt construction for interview turns and final scoring.

use chrono::{DateTime, Utc};

use mockloop_types::interview::{QuestionCategory, Stage};
use mockloop_types::llm::{Message, MessageRole};
use mockloop_types::session::HistoryMessage;

/// Input sent in place of an answer when asking the opening question.
pub const FIRST_QUESTION_INPUT: &str = "Please ask the first question.";

/// Interviewer line that opens every working history.
pub const RESUME_REQUEST: &str = "Could you share your resume with me?";

/// Inputs to the per-turn system instruction.
#[derive(Debug, Clone)]
pub struct TurnPrompt<'a> {
    pub position: &'a str,
    pub stage: Stage,
    pub question_cap: u32,
    pub questions_asked: u32,
    pub topic_repeat_limit: u32,
    /// Set when the last `topic_repeat_limit` questions share one category.
    pub saturated_topic: Option<QuestionCategory>,
}

/// Seed a fresh working history with the resume exchange.
///
/// Resume text lives on the durable interview row, so the same seed is
/// rebuilt when the cached history has expired.
pub fn seed_history(resume: &str, at: DateTime<Utc>) -> Vec<HistoryMessage> {
    vec![
        HistoryMessage::interviewer(RESUME_REQUEST, at),
        HistoryMessage::candidate(resume, at),
    ]
}

/// System instruction for one interview turn.
pub fn system_instruction(prompt: &TurnPrompt<'_>) -> String {
    let mut text = format!(
        "You are interviewing a candidate for the {position} position. Current stage: {stage}.\n\
         Questions asked so far: {asked} of at most {cap}.\n\
         Rules:\n\
         1. Give a professional evaluation of the latest answer in at most 100 characters. \
            Stay friendly and pay attention to how the candidate is doing.\n\
         2. Ask questions that target what the candidate's resume describes.\n\
         3. Decide whether the latest answer needs a follow-up question.\n\
         4. Ask at most {cap} questions in total. When the limit is reached, set need_end to true.\n\
         5. The conversation so far is provided as history; answer in context.\n\
         6. Do not ask more than {limit} consecutive questions about the same topic; \
            change direction after {limit}.\n\
         Example questions: \"What are the main features of Java?\", \
         \"Walk me through the TCP three-way handshake.\", \
         \"Your resume mentions X; can you explain how you used it?\"\n\
         Reply with JSON only:\n\
         {{\"evaluation\": \"...\", \"next_question\": \"...\", \"need_followup\": bool, \"need_end\": bool}}",
        position = prompt.position,
        stage = prompt.stage,
        asked = prompt.questions_asked,
        cap = prompt.question_cap,
        limit = prompt.topic_repeat_limit,
    );
    if let Some(topic) = prompt.saturated_topic {
        text.push_str(&format!(
            "\nThe last {} questions were all {topic} questions. Ask about a different topic next.",
            prompt.topic_repeat_limit
        ));
    }
    text
}

/// Convert the working history into backend messages.
pub fn history_messages(history: &[HistoryMessage]) -> Vec<Message> {
    history
        .iter()
        .map(|m| Message {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}

/// Prompt asking for the final score and feedback over the whole transcript.
pub fn scoring_prompt(position: &str, history: &[HistoryMessage]) -> String {
    let transcript = history
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::Assistant => "interviewer",
                MessageRole::User => "candidate",
                MessageRole::System => "system",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You have finished interviewing a candidate for the {position} position. \
         Here is the conversation:\n\
         {transcript}\n\n\
         Based on the conversation, give a final score from 1 to 100 and a feedback summary \
         of at most 200 words. Be objective and professional.\n\
         Reply with JSON only:\n\
         {{\"final_score\": int, \"feedback_summary\": \"...\"}}"
    )
}

/// The category repeated by the newest `limit` questions, if they all match.
///
/// `recent` is ordered newest first.
pub fn saturated_topic(recent: &[QuestionCategory], limit: u32) -> Option<QuestionCategory> {
    let limit = limit as usize;
    if limit == 0 || recent.len() < limit {
        return None;
    }
    let first = recent[0];
    recent[..limit].iter().all(|c| *c == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_prompt(saturated: Option<QuestionCategory>) -> TurnPrompt<'static> {
        TurnPrompt {
            position: "Backend Engineer",
            stage: Stage::InitialScreening,
            question_cap: 15,
            questions_asked: 4,
            topic_repeat_limit: 3,
            saturated_topic: saturated,
        }
    }

    #[test]
    fn test_system_instruction_embeds_rules() {
        let text = system_instruction(&turn_prompt(None));
        assert!(text.contains("Backend Engineer"));
        assert!(text.contains("initial_screening"));
        assert!(text.contains("at most 15 questions"));
        assert!(text.contains("more than 3 consecutive"));
        assert!(text.contains("\"need_followup\""));
        assert!(text.contains("\"need_end\""));
        assert!(!text.contains("different topic next"));
    }

    #[test]
    fn test_system_instruction_topic_hint() {
        let text = system_instruction(&turn_prompt(Some(QuestionCategory::Technical)));
        assert!(text.contains("all technical questions"));
    }

    #[test]
    fn test_seed_history_carries_resume() {
        let seed = seed_history("5 years Java", Utc::now());
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].role, MessageRole::Assistant);
        assert_eq!(seed[1].role, MessageRole::User);
        assert_eq!(seed[1].content, "5 years Java");
    }

    #[test]
    fn test_scoring_prompt_includes_transcript() {
        let now = Utc::now();
        let history = vec![
            HistoryMessage::interviewer("What is a mutex?", now),
            HistoryMessage::candidate("A lock.", now),
        ];
        let text = scoring_prompt("Backend Engineer", &history);
        assert!(text.contains("interviewer: What is a mutex?"));
        assert!(text.contains("candidate: A lock."));
        assert!(text.contains("final_score"));
    }

    #[test]
    fn test_saturated_topic() {
        use QuestionCategory::*;
        assert_eq!(
            saturated_topic(&[Technical, Technical, Technical, Project], 3),
            Some(Technical)
        );
        assert_eq!(saturated_topic(&[Technical, Project, Technical], 3), None);
        assert_eq!(saturated_topic(&[Technical, Technical], 3), None);
        assert_eq!(saturated_topic(&[Technical], 0), None);
    }
}
