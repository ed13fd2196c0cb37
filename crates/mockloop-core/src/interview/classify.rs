//! Stage, category and difficulty heuristics.
//!
//! Every function here is a pure `text -> label` mapping so it can be tested
//! on its own and swapped for a trained classifier without touching the
//! orchestrator.

use mockloop_types::interview::{Difficulty, QuestionCategory, Stage};
use mockloop_types::session::HistoryMessage;

/// Labels questions and conversations for the orchestrator.
pub trait Classifier: Send + Sync {
    /// Stage the conversation is in, used to steer the next question.
    fn conversation_stage(&self, history: &[HistoryMessage]) -> Stage;

    /// Stage label recorded with a question, derived from its evaluation.
    fn evaluation_stage(&self, evaluation: &str) -> Stage;

    fn category(&self, question: &str) -> QuestionCategory;

    fn difficulty(&self, question: &str) -> Difficulty;
}

// The default backends answer in Chinese, so every list carries both.
const BASIC_KEYWORDS: &[&str] = &["基础", "basic", "fundamental"];
const PROJECT_KEYWORDS: &[&str] = &["项目", "project", "experience"];
const DESIGN_KEYWORDS: &[&str] = &["设计", "架构", "design", "architecture"];

const TECHNICAL_QUESTION_KEYWORDS: &[&str] =
    &["怎么实现", "算法", "优化", "implement", "algorithm", "optimi"];
const PROJECT_QUESTION_KEYWORDS: &[&str] =
    &["项目", "经验", "案例", "project", "experience", "case"];
const DESIGN_QUESTION_KEYWORDS: &[&str] =
    &["设计", "架构", "扩展", "design", "architecture", "scal"];

/// Questions longer than this many characters are hard.
const HARD_LENGTH: usize = 150;
/// Questions longer than this many characters are medium.
const MEDIUM_LENGTH: usize = 80;

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Keyword and length heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn conversation_stage(&self, _history: &[HistoryMessage]) -> Stage {
        Stage::InitialScreening
    }

    fn evaluation_stage(&self, evaluation: &str) -> Stage {
        let text = evaluation.to_lowercase();
        if contains_any(&text, BASIC_KEYWORDS) {
            Stage::TechnicalBasic
        } else if contains_any(&text, PROJECT_KEYWORDS) {
            Stage::ProjectExperience
        } else if contains_any(&text, DESIGN_KEYWORDS) {
            Stage::SystemDesign
        } else {
            Stage::General
        }
    }

    fn category(&self, question: &str) -> QuestionCategory {
        let text = question.to_lowercase();
        if contains_any(&text, TECHNICAL_QUESTION_KEYWORDS) {
            QuestionCategory::Technical
        } else if contains_any(&text, PROJECT_QUESTION_KEYWORDS) {
            QuestionCategory::Project
        } else if contains_any(&text, DESIGN_QUESTION_KEYWORDS) {
            QuestionCategory::SystemDesign
        } else {
            QuestionCategory::Behavioral
        }
    }

    fn difficulty(&self, question: &str) -> Difficulty {
        let length = question.chars().count();
        if length > HARD_LENGTH {
            Difficulty::Hard
        } else if length > MEDIUM_LENGTH {
            Difficulty::Medium
        } else {
            Difficulty::Easy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_stage() {
        let c = KeywordClassifier;
        assert_eq!(c.evaluation_stage("Solid Basic knowledge"), Stage::TechnicalBasic);
        assert_eq!(c.evaluation_stage("Relevant project work"), Stage::ProjectExperience);
        assert_eq!(c.evaluation_stage("Good architecture sense"), Stage::SystemDesign);
        assert_eq!(c.evaluation_stage("Nice"), Stage::General);
        // earlier buckets win
        assert_eq!(
            c.evaluation_stage("fundamental design skills"),
            Stage::TechnicalBasic
        );
    }

    #[test]
    fn test_category() {
        let c = KeywordClassifier;
        assert_eq!(
            c.category("How would you implement an LRU cache?"),
            QuestionCategory::Technical
        );
        assert_eq!(
            c.category("Tell me about your last project."),
            QuestionCategory::Project
        );
        assert_eq!(
            c.category("How would you scale a chat service?"),
            QuestionCategory::SystemDesign
        );
        assert_eq!(
            c.category("How do you handle disagreement?"),
            QuestionCategory::Behavioral
        );
    }

    #[test]
    fn test_chinese_evaluation_stage() {
        let c = KeywordClassifier;
        assert_eq!(c.evaluation_stage("基础知识扎实"), Stage::TechnicalBasic);
        assert_eq!(c.evaluation_stage("项目经历丰富"), Stage::ProjectExperience);
        assert_eq!(c.evaluation_stage("对架构有一定理解"), Stage::SystemDesign);
        assert_eq!(c.evaluation_stage("回答清晰"), Stage::General);
    }

    #[test]
    fn test_chinese_category() {
        let c = KeywordClassifier;
        assert_eq!(
            c.category("请问LRU缓存怎么实现？"),
            QuestionCategory::Technical
        );
        assert_eq!(
            c.category("请介绍一下你做过的项目经验"),
            QuestionCategory::Project
        );
        assert_eq!(
            c.category("如何设计一个可扩展的聊天服务？"),
            QuestionCategory::SystemDesign
        );
        assert_eq!(
            c.category("你如何处理团队分歧？"),
            QuestionCategory::Behavioral
        );
    }

    #[test]
    fn test_difficulty_thresholds() {
        let c = KeywordClassifier;
        assert_eq!(c.difficulty(&"a".repeat(80)), Difficulty::Easy);
        assert_eq!(c.difficulty(&"a".repeat(81)), Difficulty::Medium);
        assert_eq!(c.difficulty(&"a".repeat(150)), Difficulty::Medium);
        assert_eq!(c.difficulty(&"a".repeat(151)), Difficulty::Hard);
        // counted in characters, not bytes
        assert_eq!(c.difficulty(&"问".repeat(60)), Difficulty::Easy);
    }

    #[test]
    fn test_conversation_stage_is_stable() {
        let c = KeywordClassifier;
        assert_eq!(c.conversation_stage(&[]), Stage::InitialScreening);
    }
}
