use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A multiple-choice question.
///
/// Only `question` and `options` are needed to render a video, so `answer`
/// and `explanations` default to empty when a caller omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub explanations: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("question {question:?} has {count} option(s), at least 2 are required")]
    TooFewOptions { question: String, count: usize },

    #[error("answer {answer:?} is not one of the options of {question:?}")]
    AnswerNotInOptions { question: String, answer: String },

    #[error("option {option:?} of {question:?} has no explanation")]
    MissingExplanation { question: String, option: String },
}

impl QuizQuestion {
    pub fn new(question: impl Into<String>, options: &[&str]) -> Self {
        Self {
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer: String::new(),
            explanations: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), QuizError> {
        if self.options.len() < 2 {
            return Err(QuizError::TooFewOptions {
                question: self.question.clone(),
                count: self.options.len(),
            });
        }
        if !self.options.contains(&self.answer) {
            return Err(QuizError::AnswerNotInOptions {
                question: self.question.clone(),
                answer: self.answer.clone(),
            });
        }
        if let Some(option) = self
            .options
            .iter()
            .find(|o| !self.explanations.contains_key(*o))
        {
            return Err(QuizError::MissingExplanation {
                question: self.question.clone(),
                option: option.clone(),
            });
        }
        Ok(())
    }

    /// The sentence read aloud for this question.
    pub fn narration_line(&self) -> String {
        format!("{} {}", self.question, self.options.join(", "))
    }

    /// The question followed by one bulleted option per line.
    pub fn display_block(&self) -> String {
        let mut block = self.question.clone();
        for option in &self.options {
            block.push_str("\n- ");
            block.push_str(option);
        }
        block
    }
}

/// Validate every item of a generated quiz payload.
///
/// Returns `None` when the payload is not a question list at all (e.g. a
/// degraded error record).
pub fn check_quiz_payload(payload: &serde_json::Value) -> Option<Vec<QuizError>> {
    let questions: Vec<QuizQuestion> = serde_json::from_value(payload.clone()).ok()?;
    Some(
        questions
            .iter()
            .filter_map(|q| q.validate().err())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> QuizQuestion {
        serde_json::from_value(json!({
            "question": "Python est-il typé dynamiquement ?",
            "options": ["Oui", "Non"],
            "answer": "Oui",
            "explanations": {"Oui": "Correct.", "Non": "Incorrect."}
        }))
        .unwrap()
    }

    #[test]
    fn accepts_well_formed_question() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn rejects_answer_outside_options() {
        let mut q = valid();
        q.answer = "Peut-être".to_string();
        assert!(matches!(
            q.validate(),
            Err(QuizError::AnswerNotInOptions { .. })
        ));
    }

    #[test]
    fn rejects_missing_explanation() {
        let mut q = valid();
        q.explanations.remove("Non");
        assert_eq!(
            q.validate(),
            Err(QuizError::MissingExplanation {
                question: q.question.clone(),
                option: "Non".to_string(),
            })
        );
    }

    #[test]
    fn rejects_single_option() {
        let mut q = valid();
        q.options.truncate(1);
        assert!(matches!(q.validate(), Err(QuizError::TooFewOptions { count: 1, .. })));
    }

    #[test]
    fn formats_narration_and_display() {
        let q = QuizQuestion::new("Quelle syntaxe ?", &["print()", "echo()"]);
        assert_eq!(q.narration_line(), "Quelle syntaxe ? print(), echo()");
        assert_eq!(q.display_block(), "Quelle syntaxe ?\n- print()\n- echo()");
    }

    #[test]
    fn payload_check_skips_error_records() {
        let record = json!({"error": "LLM JSON non valide", "raw": "x"});
        assert!(check_quiz_payload(&record).is_none());

        let list = json!([{"question": "Q", "options": ["a", "b"], "answer": "c"}]);
        let issues = check_quiz_payload(&list).unwrap();
        assert_eq!(issues.len(), 1);
    }
}
