use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of a training-plan request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub subject: String,
    pub level: String,
    pub focus_points: Vec<String>,
    pub time_per_day: String,
    pub duration: String,
}

/// A chapter as it appears in a plan: just enough to prompt for content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterRef {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanModule {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<ChapterRef>,
}

/// A training plan, usually produced by `generate_plan` and edited by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub modules: Vec<PlanModule>,
    #[serde(default)]
    pub planning: Vec<Value>,
    #[serde(default)]
    pub resources: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRequest {
    pub plan: Plan,
    #[serde(default = "default_generate_all")]
    pub generate_all: bool,
}

fn default_generate_all() -> bool {
    true
}

/// A fully generated chapter.
///
/// `content_json` and `quiz` hold whatever the normalizer produced, which is
/// either the parsed payload or the inline error record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseModule {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub subject: String,
    pub modules: Vec<CourseModule>,
    pub planning: Vec<Value>,
    pub resources: Vec<Value>,
}

impl Course {
    pub fn chapter_count(&self) -> usize {
        self.modules.iter().map(|m| m.chapters.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CourseOutcome {
    Skipped { message: String },
    Generated(Course),
}

/// Lesson content for a single chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonContent {
    pub html: String,
    pub json: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSet {
    pub questions: Value,
}
