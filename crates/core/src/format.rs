use crate::{types::Course, video::RenderedVideo};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Markdown outline of a generated course, flagging chapters whose content
/// came back degraded.
pub fn format_course_readable(course: &Course) -> String {
    let mut output = String::new();

    if course.subject.is_empty() {
        output.push_str("# Course\n\n");
    } else {
        output.push_str(&format!("# {}\n\n", course.subject));
    }

    for (m, module) in course.modules.iter().enumerate() {
        output.push_str(&format!("## {}. {}\n\n", m + 1, module.title));
        for chapter in &module.chapters {
            let questions = chapter
                .quiz
                .as_ref()
                .and_then(|q| q.as_array())
                .map(|q| q.len());
            let degraded = [chapter.content_json.as_ref(), chapter.quiz.as_ref()]
                .into_iter()
                .flatten()
                .any(|v| v.get("error").is_some());

            output.push_str(&format!("• {}", chapter.title));
            if let Some(n) = questions {
                output.push_str(&format!(" ({} questions)", n));
            }
            if degraded {
                output.push_str(" [malformed LLM output]");
            }
            output.push('\n');
        }
        output.push('\n');
    }

    output
}

pub fn format_rendered_video(video: &RenderedVideo) -> String {
    format!(
        "{} [{} @ {} fps]",
        video.path.display(),
        format_timestamp(video.duration),
        video.fps
    )
}
