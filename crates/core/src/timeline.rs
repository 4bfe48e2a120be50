//! Timed layout of a chapter video.
//!
//! Every overlay is scheduled against a single narration track. The track is
//! cut into equal slices, one per body line and one per quiz question; body
//! lines get a highlighted copy during their slice and quiz blocks appear
//! during theirs, lingering for a couple of slices.
//!
//! Quiz dwell is not accounted for when slicing, so the last question can
//! nominally run past the end of the track. Such overlays are clamped to the
//! track, everything else keeps its nominal schedule.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::quiz::QuizQuestion;

/// Geometry, typography and timing constants of the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    pub canvas_color: &'static str,
    pub text_color: &'static str,

    pub title_y: u32,
    pub title_font_size: u32,
    pub title_fade_in: f64,

    pub body_y_start: u32,
    pub line_height: u32,
    pub body_font_size: u32,
    pub highlight_color: &'static str,
    pub highlight_box_color: &'static str,

    pub quiz_gap: u32,
    pub quiz_block_height: u32,
    pub quiz_font_size: u32,
    pub quiz_color: &'static str,
    pub quiz_fade_in: f64,
    /// How many slices a quiz block stays on screen.
    pub quiz_dwell_slices: f64,

    pub logo_height: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            canvas_color: "white",
            text_color: "black",
            title_y: 50,
            title_font_size: 60,
            title_fade_in: 0.8,
            body_y_start: 150,
            line_height: 50,
            body_font_size: 40,
            highlight_color: "white",
            highlight_box_color: "orange",
            quiz_gap: 50,
            quiz_block_height: 200,
            quiz_font_size: 35,
            quiz_color: "darkblue",
            quiz_fade_in: 0.5,
            quiz_dwell_slices: 2.0,
            logo_height: 80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Logo,
    Title,
    BodyLine,
    Highlight,
    QuizBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: u32,
    pub color: &'static str,
    pub box_color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    Text { text: String, style: TextStyle },
    Image { path: PathBuf, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Horizontally centered, top edge at `y`.
    CenteredAt { y: u32 },
    TopRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub content: OverlayContent,
    pub position: Position,
    /// Seconds into the track.
    pub start: f64,
    pub duration: f64,
    pub fade_in: Option<f64>,
}

impl Overlay {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Visible over `[start, end)`.
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            OverlayContent::Text { text, .. } => Some(text),
            OverlayContent::Image { .. } => None,
        }
    }
}

/// Bottom layer of the composite.
#[derive(Debug, Clone, PartialEq)]
pub enum Canvas {
    Image(PathBuf),
    Solid { color: &'static str },
}

/// What a chapter video shows, before any timing is known.
#[derive(Debug, Clone, Copy)]
pub struct TimelineInput<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub quiz: &'a [QuizQuestion],
    pub background: Option<&'a Path>,
    pub logo: Option<&'a Path>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub canvas: Canvas,
    pub width: u32,
    pub height: u32,
    /// Narration length; the length of the whole video.
    pub duration: f64,
    pub line_duration: f64,
    /// Compositing order, bottom to top.
    pub overlays: Vec<Overlay>,
}

/// Non-blank lines of the chapter body, in order.
pub fn body_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Equal share of the track given to each body line and quiz question.
pub fn line_duration(track_duration: f64, lines: usize, questions: usize) -> f64 {
    track_duration / (lines + questions).max(1) as f64
}

impl Timeline {
    pub fn layout(input: &TimelineInput<'_>, track_duration: f64, cfg: &LayoutConfig) -> Self {
        let lines = body_lines(input.text);
        let slice = line_duration(track_duration, lines.len(), input.quiz.len());

        let mut builder = Builder {
            overlays: Vec::new(),
            total: track_duration,
        };

        if let Some(logo) = input.logo {
            builder.push(Overlay {
                kind: OverlayKind::Logo,
                content: OverlayContent::Image {
                    path: logo.to_path_buf(),
                    height: cfg.logo_height,
                },
                position: Position::TopRight,
                start: 0.0,
                duration: track_duration,
                fade_in: None,
            });
        }

        builder.push(Overlay {
            kind: OverlayKind::Title,
            content: OverlayContent::Text {
                text: input.title.to_string(),
                style: TextStyle {
                    font_size: cfg.title_font_size,
                    color: cfg.text_color,
                    box_color: None,
                },
            },
            position: Position::CenteredAt { y: cfg.title_y },
            start: 0.0,
            duration: track_duration,
            fade_in: Some(cfg.title_fade_in),
        });

        for (i, line) in lines.iter().enumerate() {
            let position = Position::CenteredAt {
                y: cfg.body_y_start + i as u32 * cfg.line_height,
            };
            builder.push(Overlay {
                kind: OverlayKind::BodyLine,
                content: OverlayContent::Text {
                    text: line.to_string(),
                    style: TextStyle {
                        font_size: cfg.body_font_size,
                        color: cfg.text_color,
                        box_color: None,
                    },
                },
                position,
                start: 0.0,
                duration: track_duration,
                fade_in: None,
            });
            builder.push(Overlay {
                kind: OverlayKind::Highlight,
                content: OverlayContent::Text {
                    text: line.to_string(),
                    style: TextStyle {
                        font_size: cfg.body_font_size,
                        color: cfg.highlight_color,
                        box_color: Some(cfg.highlight_box_color),
                    },
                },
                position,
                start: i as f64 * slice,
                duration: slice,
                fade_in: None,
            });
        }

        let mut quiz_y = cfg.body_y_start + lines.len() as u32 * cfg.line_height + cfg.quiz_gap;
        for (j, question) in input.quiz.iter().enumerate() {
            builder.push(Overlay {
                kind: OverlayKind::QuizBlock,
                content: OverlayContent::Text {
                    text: question.display_block(),
                    style: TextStyle {
                        font_size: cfg.quiz_font_size,
                        color: cfg.quiz_color,
                        box_color: None,
                    },
                },
                position: Position::CenteredAt { y: quiz_y },
                start: (lines.len() + j) as f64 * slice,
                duration: slice * cfg.quiz_dwell_slices,
                fade_in: Some(cfg.quiz_fade_in),
            });
            quiz_y += cfg.quiz_block_height;
        }

        let canvas = match input.background {
            Some(path) => Canvas::Image(path.to_path_buf()),
            None => Canvas::Solid {
                color: cfg.canvas_color,
            },
        };

        debug!(
            lines = lines.len(),
            questions = input.quiz.len(),
            track_duration,
            line_duration = slice,
            overlays = builder.overlays.len(),
            "timeline laid out"
        );

        Timeline {
            canvas,
            width: cfg.width,
            height: cfg.height,
            duration: track_duration,
            line_duration: slice,
            overlays: builder.overlays,
        }
    }

    pub fn overlays_of(&self, kind: OverlayKind) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter().filter(move |o| o.kind == kind)
    }
}

struct Builder {
    overlays: Vec<Overlay>,
    total: f64,
}

impl Builder {
    fn push(&mut self, mut overlay: Overlay) {
        let available = (self.total - overlay.start).max(0.0);
        if overlay.duration > available {
            debug!(
                kind = ?overlay.kind,
                start = overlay.start,
                trimmed = overlay.duration - available,
                "overlay clamped to track end"
            );
            overlay.duration = available;
        }
        self.overlays.push(overlay);
    }
}
