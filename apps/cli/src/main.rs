use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use eduflex_core::{
    ChapterRef, ChatClient, CommandNarrator, ContentRequester, CourseOptions, CourseOutcome,
    CourseRequest, DEFAULT_OUTPUT_DIR, EduflexError, FfmpegRenderer, Plan, PlanRequest, Provider,
    QuizQuestion, RenderConfig, VideoCompositor, VideoRequest, format_course_readable,
    format_rendered_video, generate_course, generate_lessons, generate_plan, generate_quiz,
    video_path_for,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::fs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Groq,
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Groq => Provider::Groq,
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "eduflex")]
#[command(about = "Generate courses, lessons and quizzes with an LLM and render chapter videos")]
struct Cli {
    /// AI provider for content generation
    #[arg(short, long, global = true, default_value = "groq")]
    provider: CliProvider,

    /// Override the provider's default model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Show debug logs (RUST_LOG is honoured otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ChapterArgs {
    /// Chapter title
    #[arg(short, long)]
    title: String,

    /// Chapter summary
    #[arg(short, long, default_value = "")]
    summary: String,

    /// Write the JSON result here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a training plan
    Plan {
        /// Subject of the training
        #[arg(short, long)]
        subject: String,

        /// Learner level (e.g. "débutant")
        #[arg(short, long, default_value = "débutant")]
        level: String,

        /// Point to focus on; repeat or separate with commas
        #[arg(short, long = "focus", value_delimiter = ',')]
        focus_points: Vec<String>,

        /// Time available per day (e.g. "1h")
        #[arg(long, default_value = "1h")]
        time_per_day: String,

        /// Total duration (e.g. "4 semaines")
        #[arg(short, long, default_value = "4 semaines")]
        duration: String,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Generate the HTML and structured lesson for one chapter
    Lesson(ChapterArgs),
    /// Generate the quiz for one chapter
    Quiz(ChapterArgs),
    /// Expand every chapter of a plan into lessons and quizzes
    Course {
        /// Plan JSON file
        plan: PathBuf,

        /// Acknowledge the plan without generating anything
        #[arg(long)]
        no_generate: bool,

        /// Chapters generated at once
        #[arg(short, long, default_value_t = 1)]
        concurrency: usize,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Render a narrated video for one chapter
    Video {
        /// Chapter title
        #[arg(short, long)]
        title: String,

        /// File holding the chapter text, one displayed line per line
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Quiz JSON file (a list of questions or {"questions": [...]})
        #[arg(long)]
        quiz_file: Option<PathBuf>,

        /// Background image scaled to the canvas
        #[arg(long)]
        background: Option<PathBuf>,

        /// Logo shown in the top-right corner
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Output video path; defaults to videos/<Title>.mp4
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Font file for every text overlay
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn finish(spinner: &ProgressBar, what: impl std::fmt::Display, started: Instant) {
    spinner.finish_with_message(format!(
        "{} {} {}",
        style("✓").green().bold(),
        what,
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    ));
}

async fn emit<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, json)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} {}", style("Saved:").dim(), style(path.display()).cyan());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn chat_client(provider: Provider, model: Option<String>) -> ChatClient {
    let client = match ChatClient::new(provider) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let client = match model {
        Some(model) => client.with_model(model),
        None => client,
    };
    debug!(provider = provider.name(), model = client.model(), "chat client ready");
    client
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn read_quiz(path: &Path) -> Result<Vec<QuizQuestion>> {
    let value: serde_json::Value = read_json(path).await?;
    let list = match value {
        serde_json::Value::Object(mut map) => map
            .remove("questions")
            .context("quiz object has no \"questions\" field")?,
        other => other,
    };
    serde_json::from_value(list).with_context(|| format!("parsing quiz in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let provider: Provider = cli.provider.into();

    eprintln!(
        "\n{}  {}\n",
        style("eduflex").cyan().bold(),
        style("Course Studio").dim()
    );
    let total_start = Instant::now();

    match cli.command {
        Command::Plan {
            subject,
            level,
            focus_points,
            time_per_day,
            duration,
            out,
        } => {
            let client = chat_client(provider, cli.model);
            let req = PlanRequest {
                subject,
                level,
                focus_points,
                time_per_day,
                duration,
            };
            let started = Instant::now();
            let spinner = create_spinner(&format!(
                "Generating plan for {} with {}...",
                req.subject,
                provider.name()
            ));
            let plan = generate_plan(&client, &req).await?;
            finish(&spinner, "Plan generated", started);
            emit(&plan, out.as_deref()).await?;
        }
        Command::Lesson(args) => {
            let client = chat_client(provider, cli.model);
            let chapter = ChapterRef {
                title: args.title,
                summary: args.summary,
            };
            let started = Instant::now();
            let spinner = create_spinner(&format!("Writing lesson {}...", chapter.title));
            let lesson = generate_lessons(&client, &chapter).await?;
            finish(&spinner, "Lesson generated", started);
            emit(&lesson, args.out.as_deref()).await?;
        }
        Command::Quiz(args) => {
            let client = chat_client(provider, cli.model);
            let chapter = ChapterRef {
                title: args.title,
                summary: args.summary,
            };
            let started = Instant::now();
            let spinner = create_spinner(&format!("Writing quiz for {}...", chapter.title));
            let quiz = generate_quiz(&client, &chapter).await?;
            finish(&spinner, "Quiz generated", started);
            emit(&quiz, args.out.as_deref()).await?;
        }
        Command::Course {
            plan,
            no_generate,
            concurrency,
            out,
        } => {
            let plan: Plan = read_json(&plan).await?;
            let request = CourseRequest {
                plan,
                generate_all: !no_generate,
            };
            let options = CourseOptions {
                concurrency: concurrency.max(1),
            };

            let outcome = if request.generate_all {
                let client = Arc::new(chat_client(provider, cli.model));
                let chapters: usize = request.plan.modules.iter().map(|m| m.chapters.len()).sum();
                let started = Instant::now();
                let spinner = create_spinner(&format!(
                    "Generating {} chapters with {}...",
                    chapters,
                    provider.name()
                ));
                let outcome = generate_course(client, &request, &options).await?;
                finish(&spinner, format!("{} chapters generated", chapters), started);
                outcome
            } else {
                generate_course(Arc::new(NoRequests), &request, &options).await?
            };

            emit(&outcome, out.as_deref()).await?;
            if let (CourseOutcome::Generated(course), Some(_)) = (&outcome, &out) {
                println!("{}", style("─".repeat(60)).dim());
                println!("{}", format_course_readable(course));
            }
        }
        Command::Video {
            title,
            text_file,
            quiz_file,
            background,
            logo,
            output,
            font,
        } => {
            let chapter_text = match text_file {
                Some(path) => fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                None => String::new(),
            };
            let quiz = match quiz_file {
                Some(path) => read_quiz(&path).await?,
                None => Vec::new(),
            };
            let output_path =
                output.unwrap_or_else(|| video_path_for(Path::new(DEFAULT_OUTPUT_DIR), &title));

            let narrator = CommandNarrator::default();
            let renderer = FfmpegRenderer::new(RenderConfig {
                font_file: font,
                ..RenderConfig::default()
            });
            let req = VideoRequest {
                chapter_title: title,
                chapter_text,
                quiz,
                background_image: background,
                logo_path: logo,
                output_path,
            };

            let started = Instant::now();
            let spinner = create_spinner(&format!("Rendering {}...", req.chapter_title));
            let video = VideoCompositor::new(&narrator, &renderer)
                .compose(&req)
                .await?;
            finish(
                &spinner,
                format!("Rendered: {}", style(format_rendered_video(&video)).dim()),
                started,
            );
        }
    }

    eprintln!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}

/// Stands in for the model when a course is only acknowledged.
struct NoRequests;

#[async_trait]
impl ContentRequester for NoRequests {
    async fn complete(&self, _prompt: &str) -> eduflex_core::Result<String> {
        Err(EduflexError::invalid_request(
            "no model configured for an acknowledgment-only run",
        ))
    }
}
