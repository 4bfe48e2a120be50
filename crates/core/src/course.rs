use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::{
    error::{EduflexError, Result},
    llm::ContentRequester,
    normalize::{normalize, parse_strict, strip_fences},
    prompts::{ChapterPrompt, plan_prompt},
    quiz::check_quiz_payload,
    types::{
        Chapter, ChapterRef, Course, CourseModule, CourseOutcome, CourseRequest, LessonContent,
        Plan, PlanRequest, QuizSet,
    },
};

pub const SKIPPED_MESSAGE: &str = "generate_all=false, aucune génération effectuée.";

#[derive(Debug, Clone)]
pub struct CourseOptions {
    /// Chapters generated at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,
}

impl Default for CourseOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Generate a training plan. Malformed model output is an error here.
#[instrument(skip_all, fields(subject = %req.subject))]
pub async fn generate_plan(
    requester: &dyn ContentRequester,
    req: &PlanRequest,
) -> Result<serde_json::Value> {
    if req.subject.trim().is_empty() {
        return Err(EduflexError::invalid_request("subject must not be empty"));
    }
    let raw = requester.complete(&plan_prompt(req)).await?;
    parse_strict(&raw)
}

/// Generate the HTML and structured lesson for one chapter.
#[instrument(skip_all, fields(chapter = %chapter.title))]
pub async fn generate_lessons(
    requester: &dyn ContentRequester,
    chapter: &ChapterRef,
) -> Result<LessonContent> {
    validate_chapter(chapter)?;
    let html = requester.complete(&ChapterPrompt::LessonHtml.render(chapter)).await?;
    let json = requester.complete(&ChapterPrompt::LessonJson.render(chapter)).await?;

    Ok(LessonContent {
        html: strip_fences(&html).to_string(),
        json: normalize_logged(&json, ChapterPrompt::LessonJson, chapter),
    })
}

/// Generate the quiz for one chapter. Malformed model output is an error here.
#[instrument(skip_all, fields(chapter = %chapter.title))]
pub async fn generate_quiz(
    requester: &dyn ContentRequester,
    chapter: &ChapterRef,
) -> Result<QuizSet> {
    validate_chapter(chapter)?;
    let raw = requester.complete(&ChapterPrompt::Quiz.render(chapter)).await?;
    let questions = parse_strict(&raw)?;
    report_quiz_issues(&questions, chapter);
    Ok(QuizSet { questions })
}

/// Expand every chapter of a plan into lesson HTML, lesson JSON and a quiz.
///
/// Output order always mirrors the plan. Malformed model output degrades the
/// affected field; a failed request aborts the whole run.
#[instrument(skip_all, fields(modules = request.plan.modules.len(), concurrency = options.concurrency))]
pub async fn generate_course(
    requester: Arc<dyn ContentRequester>,
    request: &CourseRequest,
    options: &CourseOptions,
) -> Result<CourseOutcome> {
    if !request.generate_all {
        return Ok(CourseOutcome::Skipped {
            message: SKIPPED_MESSAGE.to_string(),
        });
    }

    let plan = &request.plan;
    validate_plan(plan)?;

    let refs: Vec<ChapterRef> = plan
        .modules
        .iter()
        .flat_map(|m| m.chapters.iter().cloned())
        .collect();

    let generated = if options.concurrency <= 1 {
        let mut chapters = Vec::with_capacity(refs.len());
        for chapter in &refs {
            chapters.push(generate_chapter(requester.as_ref(), chapter).await?);
        }
        chapters
    } else {
        generate_chapters_pooled(requester, refs, options.concurrency).await?
    };

    let mut generated = generated.into_iter();
    let modules = plan
        .modules
        .iter()
        .map(|module| CourseModule {
            title: module.title.clone(),
            chapters: generated.by_ref().take(module.chapters.len()).collect(),
        })
        .collect();

    let course = Course {
        subject: plan.subject.clone(),
        modules,
        planning: plan.planning.clone(),
        resources: plan.resources.clone(),
    };
    info!(chapters = course.chapter_count(), "course generated");

    Ok(CourseOutcome::Generated(course))
}

async fn generate_chapters_pooled(
    requester: Arc<dyn ContentRequester>,
    refs: Vec<ChapterRef>,
    concurrency: usize,
) -> Result<Vec<Chapter>> {
    let mut slots: Vec<Option<Chapter>> = vec![None; refs.len()];
    let mut tasks: JoinSet<(usize, Result<Chapter>)> = JoinSet::new();

    for (idx, chapter) in refs.into_iter().enumerate() {
        if tasks.len() >= concurrency {
            collect_one(&mut tasks, &mut slots).await?;
        }
        let requester = Arc::clone(&requester);
        tasks.spawn(async move { (idx, generate_chapter(requester.as_ref(), &chapter).await) });
    }
    while !tasks.is_empty() {
        collect_one(&mut tasks, &mut slots).await?;
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| EduflexError::TaskFailed {
                reason: "chapter task finished without a result".to_string(),
            })
        })
        .collect()
}

async fn collect_one(
    tasks: &mut JoinSet<(usize, Result<Chapter>)>,
    slots: &mut [Option<Chapter>],
) -> Result<()> {
    if let Some(joined) = tasks.join_next().await {
        let (idx, chapter) = joined.map_err(|e| EduflexError::TaskFailed {
            reason: e.to_string(),
        })?;
        slots[idx] = Some(chapter?);
    }
    Ok(())
}

async fn generate_chapter(
    requester: &dyn ContentRequester,
    chapter: &ChapterRef,
) -> Result<Chapter> {
    let html = requester.complete(&ChapterPrompt::LessonHtml.render(chapter)).await?;
    let json = requester.complete(&ChapterPrompt::LessonJson.render(chapter)).await?;
    let quiz = requester.complete(&ChapterPrompt::Quiz.render(chapter)).await?;

    let quiz = normalize_logged(&quiz, ChapterPrompt::Quiz, chapter);
    report_quiz_issues(&quiz, chapter);

    Ok(Chapter {
        title: chapter.title.clone(),
        summary: chapter.summary.clone(),
        content_html: Some(strip_fences(&html).to_string()),
        content_json: Some(normalize_logged(&json, ChapterPrompt::LessonJson, chapter)),
        quiz: Some(quiz),
    })
}

fn normalize_logged(raw: &str, kind: ChapterPrompt, chapter: &ChapterRef) -> serde_json::Value {
    let normalized = normalize(raw);
    if normalized.is_degraded() {
        warn!(chapter = %chapter.title, content = kind.name(), "model returned malformed JSON");
    }
    normalized.into_value()
}

fn report_quiz_issues(quiz: &serde_json::Value, chapter: &ChapterRef) {
    if let Some(issues) = check_quiz_payload(quiz) {
        for issue in issues {
            warn!(chapter = %chapter.title, %issue, "invalid quiz question");
        }
    }
}

fn validate_chapter(chapter: &ChapterRef) -> Result<()> {
    if chapter.title.trim().is_empty() {
        return Err(EduflexError::invalid_request("chapter title must not be empty"));
    }
    Ok(())
}

/// Check the whole plan before any request goes out.
pub fn validate_plan(plan: &Plan) -> Result<()> {
    for (m, module) in plan.modules.iter().enumerate() {
        if module.title.trim().is_empty() {
            return Err(EduflexError::invalid_request(format!(
                "module #{} has no title",
                m + 1
            )));
        }
        for (c, chapter) in module.chapters.iter().enumerate() {
            if chapter.title.trim().is_empty() {
                return Err(EduflexError::invalid_request(format!(
                    "chapter #{} of module {:?} has no title",
                    c + 1,
                    module.title
                )));
            }
        }
    }
    Ok(())
}
