//! Eduflex Core Library
//!
//! Generates course material (plans, lessons, quizzes) with an LLM and
//! renders narrated chapter videos with ffmpeg.

pub mod course;
pub mod error;
pub mod format;
pub mod llm;
pub mod narration;
pub mod normalize;
pub mod prompts;
pub mod provider;
pub mod quiz;
pub mod render;
pub mod timeline;
pub mod types;
pub mod video;

// Re-export commonly used items at crate root
pub use course::{
    CourseOptions, generate_course, generate_lessons, generate_plan, generate_quiz, validate_plan,
};
pub use error::{EduflexError, Result};
pub use format::{format_course_readable, format_rendered_video, format_timestamp};
pub use llm::{ChatClient, ContentRequester};
pub use narration::{CommandNarrator, NarrationTrack, Narrator, assemble_script};
pub use normalize::{Normalized, normalize, strip_fences};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use quiz::{QuizError, QuizQuestion};
pub use render::{FfmpegRenderer, RenderConfig, Renderer};
pub use timeline::{LayoutConfig, Overlay, OverlayKind, Timeline, TimelineInput};
pub use types::{
    Chapter, ChapterRef, Course, CourseModule, CourseOutcome, CourseRequest, LessonContent, Plan,
    PlanModule, PlanRequest, QuizSet,
};
pub use video::{
    DEFAULT_OUTPUT_DIR, RenderedVideo, VIDEO_FILE_MODE, VideoCompositor, VideoRequest, video_path_for,
};
