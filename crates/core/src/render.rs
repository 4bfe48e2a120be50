use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, instrument};

use crate::{
    error::{EduflexError, Result},
    timeline::{Canvas, Overlay, OverlayContent, Position, TextStyle, Timeline},
};

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub ffmpeg: String,
    pub fps: u32,
    /// Font for every text overlay; fontconfig's default when unset.
    pub font_file: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            fps: 24,
            font_file: None,
        }
    }
}

/// Composites a timeline and its narration into a video file.
#[async_trait]
pub trait Renderer: Send + Sync {
    fn fps(&self) -> u32;

    /// `work_dir` is scratch space owned by the caller for the duration of
    /// the call.
    async fn render(
        &self,
        timeline: &Timeline,
        audio_path: &Path,
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<()>;
}

/// Renders with a single `ffmpeg` invocation: one `-filter_complex` graph
/// layers the canvas, images and `drawtext` overlays, and the narration is
/// muxed in as the audio stream.
pub struct FfmpegRenderer {
    config: RenderConfig,
}

impl FfmpegRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Where the text of overlay `idx` is written before rendering.
    pub fn text_file_path(work_dir: &Path, idx: usize) -> PathBuf {
        work_dir.join(format!("overlay_{idx:03}.txt"))
    }

    pub fn build_args(
        &self,
        timeline: &Timeline,
        audio_path: &Path,
        work_dir: &Path,
        output_path: &Path,
    ) -> Vec<String> {
        let fps = self.config.fps.to_string();
        let mut args: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];

        match &timeline.canvas {
            Canvas::Image(path) => {
                args.extend(["-loop".into(), "1".into(), "-framerate".into(), fps.clone()]);
                args.push("-i".into());
                args.push(path.to_string_lossy().into_owned());
            }
            Canvas::Solid { color } => {
                args.extend(["-f".into(), "lavfi".into(), "-i".into()]);
                args.push(format!(
                    "color=c={color}:s={w}x{h}:r={fps}",
                    w = timeline.width,
                    h = timeline.height,
                ));
            }
        }

        let mut image_inputs = vec![None; timeline.overlays.len()];
        let mut next_index = 1usize;
        for (idx, overlay) in timeline.overlays.iter().enumerate() {
            if let OverlayContent::Image { path, .. } = &overlay.content {
                args.extend(["-loop".into(), "1".into(), "-framerate".into(), fps.clone()]);
                args.push("-i".into());
                args.push(path.to_string_lossy().into_owned());
                image_inputs[idx] = Some(next_index);
                next_index += 1;
            }
        }

        let audio_index = next_index;
        args.push("-i".into());
        args.push(audio_path.to_string_lossy().into_owned());

        args.push("-filter_complex".into());
        args.push(self.build_filter_complex(timeline, &image_inputs, work_dir));
        args.extend([
            "-map".into(),
            "[outv]".into(),
            "-map".into(),
            format!("{audio_index}:a"),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-r".into(),
            fps,
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-t".into(),
            format_time(timeline.duration),
            "-movflags".into(),
            "+faststart".into(),
        ]);
        args.push(output_path.to_string_lossy().into_owned());
        args
    }

    /// `image_inputs[i]` is the ffmpeg input index of overlay `i` when it is
    /// an image.
    pub fn build_filter_complex(
        &self,
        timeline: &Timeline,
        image_inputs: &[Option<usize>],
        work_dir: &Path,
    ) -> String {
        let mut filters: Vec<String> = Vec::new();
        filters.push(format!(
            "[0:v]scale={w}:{h},setsar=1[v0]",
            w = timeline.width,
            h = timeline.height,
        ));

        let mut current = "v0".to_string();
        for (idx, overlay) in timeline.overlays.iter().enumerate() {
            let next = format!("v{}", idx + 1);
            match &overlay.content {
                OverlayContent::Image { height, .. } => {
                    let Some(input) = image_inputs.get(idx).copied().flatten() else {
                        continue;
                    };
                    let image = format!("img{idx}");
                    let fade = overlay
                        .fade_in
                        .map(|f| {
                            format!(
                                ",format=rgba,fade=t=in:st={}:d={}:alpha=1",
                                format_time(overlay.start),
                                format_time(f)
                            )
                        })
                        .unwrap_or_default();
                    filters.push(format!("[{input}:v]scale=-1:{height}{fade}[{image}]"));
                    let (x, y) = anchor(overlay.position, "W", "w");
                    filters.push(format!(
                        "[{current}][{image}]overlay=x={x}:y={y}:enable='{enable}'[{next}]",
                        enable = enable_expr(overlay),
                    ));
                }
                OverlayContent::Text { style, .. } => {
                    let text_file = Self::text_file_path(work_dir, idx);
                    filters.push(format!(
                        "[{current}]{drawtext}[{next}]",
                        drawtext = self.drawtext(overlay, style, &text_file),
                    ));
                }
            }
            current = next;
        }

        filters.push(format!("[{current}]format=yuv420p[outv]"));
        filters.join(";")
    }

    fn drawtext(&self, overlay: &Overlay, style: &TextStyle, text_file: &Path) -> String {
        let mut filter = format!(
            "drawtext=textfile={}:expansion=none",
            quote_path(text_file)
        );
        if let Some(font) = &self.config.font_file {
            filter.push_str(&format!(":fontfile={}", quote_path(font)));
        }
        filter.push_str(&format!(
            ":fontsize={}:fontcolor={}",
            style.font_size, style.color
        ));
        if let Some(box_color) = style.box_color {
            filter.push_str(&format!(":box=1:boxcolor={box_color}:boxborderw=8"));
        }
        let (x, y) = anchor(overlay.position, "w", "text_w");
        filter.push_str(&format!(":x={x}:y={y}:enable='{}'", enable_expr(overlay)));
        if let Some(fade) = overlay.fade_in.filter(|f| *f > 0.0) {
            filter.push_str(&format!(
                ":alpha='if(lt(t,{s}+{f}),(t-{s})/{f},1)'",
                s = format_time(overlay.start),
                f = format_time(fade),
            ));
        }
        filter
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    fn fps(&self) -> u32 {
        self.config.fps
    }

    #[instrument(skip(self, timeline), fields(overlays = timeline.overlays.len(), duration = timeline.duration))]
    async fn render(
        &self,
        timeline: &Timeline,
        audio_path: &Path,
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<()> {
        for (idx, overlay) in timeline.overlays.iter().enumerate() {
            if let Some(text) = overlay.text() {
                fs::write(Self::text_file_path(work_dir, idx), text).await?;
            }
        }

        let args = self.build_args(timeline, audio_path, work_dir, output_path);
        debug!(args = ?args, "running ffmpeg");

        let output = Command::new(&self.config.ffmpeg)
            .args(&args)
            .output()
            .await
            .map_err(|e| EduflexError::RenderFailed {
                output_path: output_path.to_path_buf(),
                reason: format!("failed to run {}: {}", self.config.ffmpeg, e),
            })?;

        if !output.status.success() {
            return Err(EduflexError::RenderFailed {
                output_path: output_path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }
}

/// Half-open visibility window, so consecutive slices never overlap.
fn enable_expr(overlay: &Overlay) -> String {
    format!(
        "gte(t,{})*lt(t,{})",
        format_time(overlay.start),
        format_time(overlay.end())
    )
}

/// ffmpeg `x`/`y` expressions placing an item of width `item_w` inside a
/// frame of width `frame_w`.
fn anchor(position: Position, frame_w: &str, item_w: &str) -> (String, String) {
    match position {
        Position::CenteredAt { y } => (format!("({frame_w}-{item_w})/2"), y.to_string()),
        Position::TopRight => (format!("{frame_w}-{item_w}"), "0".to_string()),
    }
}

fn quote_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

fn format_time(value: f64) -> String {
    format!("{value:.3}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        quiz::QuizQuestion,
        timeline::{LayoutConfig, TimelineInput},
    };

    fn timeline(text: &str, quiz: &[QuizQuestion], logo: Option<&Path>) -> Timeline {
        Timeline::layout(
            &TimelineInput {
                title: "Titre",
                text,
                quiz,
                background: None,
                logo,
            },
            10.0,
            &LayoutConfig::default(),
        )
    }

    fn renderer() -> FfmpegRenderer {
        FfmpegRenderer::new(RenderConfig::default())
    }

    #[test]
    fn solid_canvas_uses_lavfi_color_source() {
        let tl = timeline("Line1\nLine2", &[], None);
        let args = renderer().build_args(&tl, Path::new("/w/narration.mp3"), Path::new("/w"), Path::new("out.mp4"));

        assert!(args.contains(&"color=c=white:s=1280x720:r=24".to_string()));
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-t") + 1], "10.000");
        assert_eq!(args[pos("-r") + 1], "24");
        assert_eq!(args[pos("-map") + 3], "1:a");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn highlights_get_disjoint_windows() {
        let tl = timeline("Line1\nLine2", &[], None);
        let graph = renderer().build_filter_complex(&tl, &vec![None; tl.overlays.len()], Path::new("/w"));

        assert_eq!(graph.matches("drawtext=").count(), 5);
        assert_eq!(graph.matches("boxcolor=orange").count(), 2);
        assert!(graph.contains("enable='gte(t,0.000)*lt(t,5.000)'"));
        assert!(graph.contains("enable='gte(t,5.000)*lt(t,10.000)'"));
        assert!(graph.contains("textfile='/w/overlay_001.txt'"));
        assert!(graph.starts_with("[0:v]scale=1280:720,setsar=1[v0]"));
        assert!(graph.ends_with("[v5]format=yuv420p[outv]"));
    }

    #[test]
    fn title_fades_in() {
        let tl = timeline("", &[], None);
        let graph = renderer().build_filter_complex(&tl, &[None], Path::new("/w"));
        assert!(graph.contains("fontsize=60:fontcolor=black"));
        assert!(graph.contains(":alpha='if(lt(t,0.000+0.800),(t-0.000)/0.800,1)'"));
    }

    #[test]
    fn logo_becomes_an_extra_input() {
        let tl = timeline("x", &[], Some(Path::new("static/logo.png")));
        let args = renderer().build_args(&tl, Path::new("a.mp3"), Path::new("/w"), Path::new("o.mp4"));

        let logo = args.iter().position(|a| a == "static/logo.png").unwrap();
        assert_eq!(&args[logo - 5..logo], ["-loop", "1", "-framerate", "24", "-i"]);
        assert!(args.contains(&"2:a".to_string()));

        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.contains("[1:v]scale=-1:80[img0]"));
        assert!(graph.contains("[v0][img0]overlay=x=W-w:y=0"));
    }

    #[test]
    fn quiz_blocks_are_dark_blue() {
        let quiz = vec![QuizQuestion::new("Q ?", &["a", "b"])];
        let tl = timeline("x", &quiz, None);
        let graph = renderer().build_filter_complex(&tl, &vec![None; tl.overlays.len()], Path::new("/w"));
        assert!(graph.contains("fontsize=35:fontcolor=darkblue"));
        assert!(graph.contains("enable='gte(t,5.000)*lt(t,10.000)'"));
    }

    #[test]
    fn anchors_differ_between_text_and_images() {
        let centered = Position::CenteredAt { y: 150 };
        assert_eq!(
            anchor(centered, "w", "text_w"),
            ("(w-text_w)/2".to_string(), "150".to_string())
        );
        assert_eq!(
            anchor(Position::TopRight, "W", "w"),
            ("W-w".to_string(), "0".to_string())
        );
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_a_render_failure() {
        let work_dir = tempfile::TempDir::new().unwrap();
        let output = work_dir.path().join("out.mp4");
        let r = FfmpegRenderer::new(RenderConfig {
            ffmpeg: "/nonexistent/ffmpeg".to_string(),
            ..RenderConfig::default()
        });
        let tl = timeline("Line1", &[], None);

        let result = r
            .render(&tl, &work_dir.path().join("a.mp3"), work_dir.path(), &output)
            .await;

        match result {
            Err(EduflexError::RenderFailed { output_path, reason }) => {
                assert_eq!(output_path, output);
                assert!(reason.contains("/nonexistent/ffmpeg"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(FfmpegRenderer::text_file_path(work_dir.path(), 1).exists());
    }

    #[test]
    fn font_file_is_applied_when_configured() {
        let r = FfmpegRenderer::new(RenderConfig {
            font_file: Some(PathBuf::from("/fonts/Arial.ttf")),
            ..RenderConfig::default()
        });
        let tl = timeline("", &[], None);
        let graph = r.build_filter_complex(&tl, &[None], Path::new("/w"));
        assert!(graph.contains(":fontfile='/fonts/Arial.ttf'"));
    }
}
