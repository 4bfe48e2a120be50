use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, instrument};

use crate::{
    error::{EduflexError, Result},
    quiz::QuizQuestion,
};

/// Narration is always French.
pub const NARRATION_LANGUAGE: &str = "fr";

/// A synthesized speech track on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationTrack {
    pub path: PathBuf,
    /// Seconds.
    pub duration: f64,
}

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Speak `script` into `audio_path`.
    async fn synthesize(
        &self,
        script: &str,
        language: &str,
        audio_path: &Path,
    ) -> Result<NarrationTrack>;
}

/// Build the text read aloud over a chapter video.
///
/// The body comes first, then one line per question with its options. A
/// chapter with nothing to read falls back to its title so the track is
/// never silent.
pub fn assemble_script(title: &str, text: &str, quiz: &[QuizQuestion]) -> String {
    let body = text.trim();
    let questions = quiz
        .iter()
        .map(QuizQuestion::narration_line)
        .collect::<Vec<_>>()
        .join("\n");

    let script = match (body.is_empty(), questions.is_empty()) {
        (false, false) => format!("{body}\n\n{questions}"),
        (false, true) => body.to_string(),
        (true, false) => questions,
        (true, true) => String::new(),
    };

    if script.trim().is_empty() {
        title.trim().to_string()
    } else {
        script
    }
}

/// Narrator backed by the `gtts-cli` command, with `ffprobe` for the length.
pub struct CommandNarrator {
    program: String,
    ffprobe: String,
}

impl Default for CommandNarrator {
    fn default() -> Self {
        Self {
            program: "gtts-cli".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl CommandNarrator {
    pub fn new(program: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    #[instrument(skip(self, script), fields(chars = script.len()))]
    async fn synthesize(
        &self,
        script: &str,
        language: &str,
        audio_path: &Path,
    ) -> Result<NarrationTrack> {
        let script_path = audio_path.with_extension("txt");
        fs::write(&script_path, script).await?;

        let output = Command::new(&self.program)
            .arg("--lang")
            .arg(language)
            .arg("--file")
            .arg(&script_path)
            .arg("--output")
            .arg(audio_path)
            .output()
            .await
            .map_err(|e| EduflexError::NarrationFailed {
                audio_path: audio_path.to_path_buf(),
                reason: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(EduflexError::NarrationFailed {
                audio_path: audio_path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let duration = probe_duration(&self.ffprobe, audio_path).await?;
        debug!(duration, "narration synthesized");

        Ok(NarrationTrack {
            path: audio_path.to_path_buf(),
            duration,
        })
    }
}

/// Length of a media file in seconds.
pub async fn probe_duration(ffprobe: &str, path: &Path) -> Result<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| EduflexError::ProbeFailed {
            path: path.to_path_buf(),
            reason: format!("failed to run {}: {}", ffprobe, e),
        })?;

    if !output.status.success() {
        return Err(EduflexError::ProbeFailed {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        EduflexError::ProbeFailed {
            path: path.to_path_buf(),
            reason: "ffprobe did not report a positive duration".to_string(),
        }
    })
}

fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_reads_body_then_questions() {
        let quiz = vec![
            QuizQuestion::new("Quelle syntaxe ?", &["print()", "echo()"]),
            QuizQuestion::new("Typé dynamiquement ?", &["Oui", "Non"]),
        ];
        let script = assemble_script("Titre", "Ligne 1\nLigne 2", &quiz);
        assert_eq!(
            script,
            "Ligne 1\nLigne 2\n\nQuelle syntaxe ? print(), echo()\nTypé dynamiquement ? Oui, Non"
        );
    }

    #[test]
    fn script_without_quiz_is_the_body() {
        assert_eq!(assemble_script("Titre", "Ligne 1\n", &[]), "Ligne 1");
    }

    #[test]
    fn empty_chapter_narrates_its_title() {
        assert_eq!(assemble_script("Les Bases", "  \n", &[]), "Les Bases");
    }

    #[tokio::test]
    async fn missing_tts_command_is_a_narration_failure() {
        let work_dir = tempfile::TempDir::new().unwrap();
        let audio = work_dir.path().join("narration.mp3");
        let narrator = CommandNarrator::new("/nonexistent/gtts-cli", "ffprobe");

        let result = narrator.synthesize("Bonjour", NARRATION_LANGUAGE, &audio).await;

        match result {
            Err(EduflexError::NarrationFailed { audio_path, reason }) => {
                assert_eq!(audio_path, audio);
                assert!(reason.contains("/nonexistent/gtts-cli"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_ffprobe_is_a_probe_failure() {
        let work_dir = tempfile::TempDir::new().unwrap();
        let audio = work_dir.path().join("narration.mp3");
        std::fs::write(&audio, b"ID3").unwrap();

        let result = probe_duration("/nonexistent/ffprobe", &audio).await;

        assert!(matches!(result, Err(EduflexError::ProbeFailed { path, .. }) if path == audio));
    }

    #[test]
    fn parses_ffprobe_duration() {
        assert_eq!(parse_duration("12.345000\n"), Some(12.345));
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration("0.000"), None);
    }
}
