use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    error::{EduflexError, Result},
    narration::{NARRATION_LANGUAGE, Narrator, assemble_script},
    quiz::QuizQuestion,
    render::Renderer,
    timeline::{LayoutConfig, Timeline, TimelineInput},
};

/// Where chapter videos go unless told otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "videos";

/// Mode of a rendered video on unix.
pub const VIDEO_FILE_MODE: u32 = 0o644;

/// Everything needed to render one chapter video.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub chapter_title: String,
    pub chapter_text: String,
    pub quiz: Vec<QuizQuestion>,
    pub background_image: Option<PathBuf>,
    pub logo_path: Option<PathBuf>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedVideo {
    pub path: PathBuf,
    /// Seconds; always the narration length.
    pub duration: f64,
    pub fps: u32,
}

/// Turns chapter text and quiz questions into a narrated video.
///
/// Scratch files (narration audio, overlay text) live in a temporary
/// directory removed on every exit path. The video is rendered next to its
/// destination and only renamed into place once ffmpeg succeeded, so a
/// failed render never leaves a partial file behind.
pub struct VideoCompositor<'a> {
    narrator: &'a dyn Narrator,
    renderer: &'a dyn Renderer,
    layout: LayoutConfig,
}

impl<'a> VideoCompositor<'a> {
    pub fn new(narrator: &'a dyn Narrator, renderer: &'a dyn Renderer) -> Self {
        Self {
            narrator,
            renderer,
            layout: LayoutConfig::default(),
        }
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    #[instrument(skip_all, fields(chapter = %req.chapter_title, output = %req.output_path.display()))]
    pub async fn compose(&self, req: &VideoRequest) -> Result<RenderedVideo> {
        validate(req)?;

        let work_dir = tempfile::Builder::new().prefix("eduflex-").tempdir()?;

        let script = assemble_script(&req.chapter_title, &req.chapter_text, &req.quiz);
        let audio_path = work_dir.path().join("narration.mp3");
        let track = self
            .narrator
            .synthesize(&script, NARRATION_LANGUAGE, &audio_path)
            .await?;
        if !(track.duration.is_finite() && track.duration > 0.0) {
            return Err(EduflexError::NarrationFailed {
                audio_path: track.path,
                reason: format!("narration has no usable duration ({})", track.duration),
            });
        }
        info!(duration = track.duration, "narration ready");

        let timeline = Timeline::layout(
            &TimelineInput {
                title: &req.chapter_title,
                text: &req.chapter_text,
                quiz: &req.quiz,
                background: req.background_image.as_deref(),
                logo: req.logo_path.as_deref(),
            },
            track.duration,
            &self.layout,
        );

        let output_dir = match req.output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&output_dir).await?;
        let staging = tempfile::Builder::new()
            .prefix(".eduflex-render-")
            .suffix(".mp4")
            .tempfile_in(&output_dir)?;

        self.renderer
            .render(&timeline, &track.path, work_dir.path(), staging.path())
            .await?;
        publish_permissions(staging.path()).await?;

        staging
            .persist(&req.output_path)
            .map_err(|e| EduflexError::IoError(e.error))?;
        info!("video rendered");

        Ok(RenderedVideo {
            path: req.output_path.clone(),
            duration: track.duration,
            fps: self.renderer.fps(),
        })
    }
}

/// Staging files are created owner-only; a published video is world-readable.
#[cfg(unix)]
async fn publish_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(VIDEO_FILE_MODE)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn publish_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

fn validate(req: &VideoRequest) -> Result<()> {
    if req.chapter_title.trim().is_empty() {
        return Err(EduflexError::invalid_request("chapter title must not be empty"));
    }
    for (label, path) in [
        ("background image", &req.background_image),
        ("logo", &req.logo_path),
    ] {
        if let Some(path) = path
            && !path.is_file()
        {
            return Err(EduflexError::invalid_request(format!(
                "{label} {} does not exist",
                path.display()
            )));
        }
    }
    if req.output_path.file_name().is_none() {
        return Err(EduflexError::invalid_request(format!(
            "output path {} has no file name",
            req.output_path.display()
        )));
    }
    Ok(())
}

/// Default destination of a chapter video: `<dir>/<Title_With_Underscores>.mp4`.
pub fn video_path_for(output_dir: &Path, chapter_title: &str) -> PathBuf {
    let stem: String = chapter_title
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    output_dir.join(format!("{stem}.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_path_replaces_spaces() {
        assert_eq!(
            video_path_for(Path::new("videos"), "Les Bases du Python"),
            PathBuf::from("videos/Les_Bases_du_Python.mp4")
        );
    }

    #[test]
    fn video_path_never_escapes_the_directory() {
        let path = video_path_for(Path::new("videos"), "E/S: entrées?");
        assert_eq!(path, PathBuf::from("videos/E-S-_entrées-.mp4"));
    }
}
