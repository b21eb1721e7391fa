// Amour command line front-end
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amour_lib::audio::PlaybackEnd;
use amour_lib::commands::{self, CourseSession};
use amour_lib::course::{QuizAction, QuizOutcome, QuizRunner, QuizState, SectionStatus, SectionView};
use amour_lib::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "amour")]
#[command(about = "Narration playback and course progression for the Amour content directory")]
#[command(version)]
struct Args {
    /// Directory holding settings.json and the library database
    #[arg(long, env = "AMOUR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a directory of post JSON files
    Scan {
        directory: PathBuf,
        /// Clear the indexed library before scanning
        #[arg(long)]
        rebuild: bool,
    },
    /// List indexed posts
    Posts,
    /// Play a narration block with its background track
    Play {
        post_id: String,
        /// Which audio block of the post to play
        #[arg(long, default_value_t = 0)]
        block: usize,
    },
    /// Show the visible sections of a course
    Course {
        post_id: String,
        /// Treat the post as unlocked for this call only
        #[arg(long)]
        access: bool,
    },
    /// Work through the active section of a course, quiz included
    Study {
        post_id: String,
        #[arg(long)]
        access: bool,
    },
    /// Grant access to a premium post
    Unlock { post_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amour=info,amour_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow!("No data directory available, pass --data-dir"))?
            .join("amour"),
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let state = amour_lib::init(data_dir)?;

    match args.command {
        Command::Scan { directory, rebuild } => {
            let result = commands::scan_library(directory.to_string_lossy().to_string(), rebuild, &state)
                .await
                .map_err(|e| anyhow!(e))?;
            println!(
                "{} file(s): {} updated, {} unchanged, {} failed, {} post(s) written, {} removed",
                result.total_files, result.updated, result.skipped, result.failed, result.posts, result.removed
            );
            for error in &result.errors {
                println!("  {}", error);
            }
        }
        Command::Posts => {
            let posts = commands::get_all_posts(&state).map_err(|e| anyhow!(e))?;
            for post in posts {
                let premium = if post.is_premium { " [premium]" } else { "" };
                println!("{:<24} {:<8} {}{}", post.id, post.kind, post.title, premium);
            }
        }
        Command::Play { post_id, block } => play(&state, &post_id, block).await?,
        Command::Course { post_id, access } => {
            let view = commands::get_course_view(&state, &post_id, access).map_err(|e| anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Study { post_id, access } => {
            let mut session = commands::open_course(&state, &post_id, access).map_err(|e| anyhow!(e))?;
            study(&state, &mut session)?;
        }
        Command::Unlock { post_id } => {
            commands::unlock_post(&state, &post_id).map_err(|e| anyhow!(e))?;
            println!("Unlocked {}", post_id);
        }
    }

    Ok(())
}

async fn play(state: &AppState, post_id: &str, block: usize) -> Result<()> {
    let handle = commands::play_narration(state, post_id, block)
        .await
        .map_err(|e| anyhow!(e))?;
    info!(
        session = handle.session,
        sample_rate = handle.sample_rate,
        with_music = handle.with_music,
        "Playing, Ctrl+C to stop"
    );

    tokio::select! {
        end = handle.finished() => {
            if end == PlaybackEnd::Stopped {
                warn!("Playback ended early");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping playback");
        }
    }

    commands::stop_playback(state).await;
    Ok(())
}

fn study(state: &AppState, session: &mut CourseSession) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let active = session.view().into_iter().find_map(|view| match view {
        SectionView::Content { index, status, .. } if status == SectionStatus::Active => Some(index),
        _ => None,
    });

    let Some(index) = active else {
        if session.progress.is_finished() {
            println!("Course complete.");
        } else {
            println!("The rest of this course requires access. Run `amour unlock {}`.", session.post.id);
        }
        return Ok(());
    };

    let sections = session.sections();
    let section = sections
        .get(index)
        .ok_or_else(|| anyhow!("Section {} missing", index))?;

    println!("Section {} of {}", index + 1, sections.len());
    for block in section.blocks {
        println!("{}", commands::describe_block(block));
    }

    let questions = section
        .gating_quiz()
        .map(|quiz| quiz.quiz_questions().to_vec())
        .unwrap_or_default();
    drop(sections);

    if !questions.is_empty() {
        let outcome = run_quiz(&questions, &mut lines)?;
        if !commands::record_quiz_result(session, index, outcome) {
            println!("Pass the quiz to continue.");
            return Ok(());
        }
    }

    match commands::complete_section(state, session, index).map_err(|e| anyhow!(e))? {
        Some(advance) => match advance.revealed {
            Some(next) => println!("Section complete. Section {} unlocked.", next + 1),
            None => println!("Course complete."),
        },
        None => println!("This section cannot be completed yet."),
    }

    Ok(())
}

fn run_quiz<I>(questions: &[amour_lib::content::QuizQuestion], lines: &mut I) -> Result<QuizOutcome>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut runner = QuizRunner::new(questions);

    loop {
        if let QuizState::Finished { correct, total } = *runner.state() {
            println!("Score: {}/{}", correct, total);
            if runner.outcome() == Some(QuizOutcome::Passed) {
                return Ok(QuizOutcome::Passed);
            }
            if !prompt_yes(lines, "Retake? [y/N] ")? {
                return Ok(QuizOutcome::Failed);
            }
            runner.apply(QuizAction::Retake);
            continue;
        }

        let Some(question) = runner.current_question() else {
            bail!("Quiz has no current question");
        };
        println!("{}", question.question);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }

        let answer = prompt(lines, "> ")?;
        let selected = answer
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1));
        match selected {
            Some(option) if runner.apply(QuizAction::Select(option)) => {
                runner.apply(QuizAction::Confirm);
            }
            _ => println!("Pick a number between 1 and {}", question.options.len()),
        }
    }
}

fn prompt<I>(lines: &mut I, label: &str) -> Result<String>
where
    I: Iterator<Item = io::Result<String>>,
{
    print!("{}", label);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(line?),
        None => bail!("Input closed"),
    }
}

fn prompt_yes<I>(lines: &mut I, label: &str) -> Result<bool>
where
    I: Iterator<Item = io::Result<String>>,
{
    let answer = prompt(lines, label)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
