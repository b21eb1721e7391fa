// Command handlers
// Every user-facing surface goes through these; errors come back as display strings
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::audio::player::{MusicRequest, PlaybackHandle};
use crate::content::models::{ContentBlock, Post};
use crate::content::sections::{CourseSection, SectionSplitter};
use crate::course::progress::{CourseProgress, SectionAdvance, SectionStatus, SectionView};
use crate::course::quiz::QuizOutcome;
use crate::db::models::PostSummary;
use crate::db::operations::DbOperations;
use crate::library::indexer::{IndexingResult, LibraryIndexer};
use crate::library::scanner::DirectoryScanner;
use crate::settings::PlaybackSettings;
use crate::state::AppState;

// ===== Library Commands =====

/// Index a directory of post files. With `rebuild`, the library is cleared first;
/// progress and access grants survive either way.
pub async fn scan_library(
    directory: String,
    rebuild: bool,
    state: &AppState,
) -> Result<IndexingResult, String> {
    // Clone what we need for the blocking task
    let db = state.db.clone();

    let result = tokio::task::spawn_blocking(move || {
        // Stored file paths are absolute so roots compare reliably between scans
        let root = std::fs::canonicalize(&directory)
            .map_err(|e| format!("Failed to resolve {}: {}", directory, e))?;

        if rebuild {
            DbOperations::clear_library(&db).map_err(|e| format!("Failed to clear library: {}", e))?;
            info!("Library cleared for rebuild");
        }

        let post_files = DirectoryScanner::scan(&root)
            .map_err(|e| format!("Failed to scan directory: {}", e))?;

        LibraryIndexer::index_files_with_progress(&root, &post_files, &db, |progress| {
            tracing::debug!(
                current = progress.current,
                total = progress.total,
                file = %progress.current_file,
                "Indexing"
            );
        })
        .map_err(|e| format!("Failed to index files: {}", e))
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))??;

    info!(
        posts = result.posts,
        failed = result.failed,
        removed = result.removed,
        "Library scan finished"
    );
    Ok(result)
}

pub fn get_all_posts(state: &AppState) -> Result<Vec<PostSummary>, String> {
    DbOperations::get_all_posts(&state.db)
        .map_err(|e| format!("Failed to get posts: {}", e))
}

pub fn get_post(state: &AppState, post_id: &str) -> Result<Post, String> {
    DbOperations::get_post(&state.db, post_id)
        .map_err(|e| format!("Failed to get post: {}", e))?
        .ok_or_else(|| format!("No post with id '{}'", post_id))
}

/// Record that a premium post was unlocked on this device
pub fn unlock_post(state: &AppState, post_id: &str) -> Result<(), String> {
    get_post(state, post_id)?;
    DbOperations::grant_access(&state.db, post_id)
        .map_err(|e| format!("Failed to unlock post: {}", e))
}

// ===== Playback Commands =====

/// Music bed for a narration block, resolved against the track catalog
pub fn music_request(
    playback: &PlaybackSettings,
    block: &crate::content::models::AudioNarrationBlock,
) -> Option<MusicRequest> {
    let reference = block.meta.bg_music_track.as_deref()?;
    match playback.resolve_track(reference) {
        Some(url) => Some(MusicRequest {
            url,
            volume: playback.music_volume(block.meta.bg_music_volume),
        }),
        None => {
            tracing::warn!(track = reference, "Unknown background track, playing narration only");
            None
        }
    }
}

/// Play the `block_index`-th audio block of a post
pub async fn play_narration(
    state: &AppState,
    post_id: &str,
    block_index: usize,
) -> Result<PlaybackHandle, String> {
    let post = get_post(state, post_id)?;
    let block = post
        .audio_blocks()
        .nth(block_index)
        .ok_or_else(|| format!("Post '{}' has no audio block {}", post_id, block_index))?;

    // Never let two sessions overlap
    state.player.stop_async().await;

    let music = music_request(&state.settings.playback, block);
    state.player.play(block, music).await.map_err(|e| {
        if e.is_fatal() {
            error!("Narration playback failed: {}", e);
        } else {
            debug!("Narration playback did not start: {}", e);
        }
        e.user_message()
    })
}

pub async fn stop_playback(state: &AppState) {
    state.player.stop_async().await;
}

#[derive(Debug, Serialize)]
pub struct PlayerStateResponse {
    pub is_playing: bool,
    pub cached_tracks: usize,
}

pub fn get_player_state(state: &AppState) -> PlayerStateResponse {
    PlayerStateResponse {
        is_playing: state.player.is_playing(),
        cached_tracks: state.player.cache().len(),
    }
}

// ===== Course Commands =====

/// A post opened for study: persisted progress plus this session's quiz passes
pub struct CourseSession {
    pub post: Post,
    pub progress: CourseProgress,
    splitter: Arc<SectionSplitter>,
}

impl CourseSession {
    pub fn sections(&self) -> Vec<CourseSection<'_>> {
        self.splitter.split(&self.post)
    }

    pub fn view(&self) -> Vec<SectionView<'_>> {
        self.progress.view(&self.sections())
    }
}

pub fn open_course(state: &AppState, post_id: &str, force_access: bool) -> Result<CourseSession, String> {
    let post = get_post(state, post_id)?;
    let has_access = force_access
        || DbOperations::has_access(&state.db, post_id)
            .map_err(|e| format!("Failed to read access: {}", e))?;

    let sections = state.splitter.split(&post);
    let progress = CourseProgress::load(&state.db, &post, &sections, has_access)
        .map_err(|e| format!("Failed to load progress: {}", e))?;
    drop(sections);

    Ok(CourseSession {
        post,
        progress,
        splitter: state.splitter.clone(),
    })
}

pub fn complete_section(
    state: &AppState,
    session: &mut CourseSession,
    section: usize,
) -> Result<Option<SectionAdvance>, String> {
    session
        .progress
        .complete_section(&state.db, section)
        .map_err(|e| format!("Failed to save progress: {}", e))
}

/// Feed a finished quiz back into the session. Returns whether the section can now be completed.
pub fn record_quiz_result(session: &mut CourseSession, section: usize, outcome: QuizOutcome) -> bool {
    if outcome == QuizOutcome::Passed {
        session.progress.record_quiz_pass(section);
    }
    session.progress.advance_available(section)
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SectionSummary {
    Content {
        index: usize,
        title: Option<String>,
        status: SectionStatus,
        blocks: usize,
        quiz_pending: bool,
        can_advance: bool,
    },
    Paywall {
        from_section: usize,
    },
}

#[derive(Debug, Serialize)]
pub struct CourseViewResponse {
    pub post_id: String,
    pub title: String,
    pub completed_sections: usize,
    pub total_sections: usize,
    pub sections: Vec<SectionSummary>,
}

pub fn summarize(session: &CourseSession) -> CourseViewResponse {
    let sections = session
        .view()
        .into_iter()
        .map(|view| match view {
            SectionView::Content {
                index,
                title,
                status,
                blocks,
                quiz_pending,
                can_advance,
            } => SectionSummary::Content {
                index,
                title: title.map(|t| t.to_string()),
                status,
                blocks: blocks.len(),
                quiz_pending,
                can_advance,
            },
            SectionView::Paywall { from_section } => SectionSummary::Paywall { from_section },
        })
        .collect();

    CourseViewResponse {
        post_id: session.post.id.clone(),
        title: session.post.title.clone(),
        completed_sections: session.progress.completed_sections(),
        total_sections: session.progress.total_sections(),
        sections,
    }
}

pub fn get_course_view(
    state: &AppState,
    post_id: &str,
    force_access: bool,
) -> Result<CourseViewResponse, String> {
    open_course(state, post_id, force_access).map(|session| summarize(&session))
}

/// One-line rendering of a block for plain-text surfaces
pub fn describe_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Header(header) => format!("## {}", header.content),
        ContentBlock::Text(text) => text.content.clone(),
        ContentBlock::Quiz(quiz) => format!("[quiz: {} question(s)]", quiz.meta.questions.len()),
        ContentBlock::Audio(audio) => format!(
            "[audio: {}]",
            audio.meta.audio_title.as_deref().unwrap_or("narration")
        ),
        ContentBlock::Other => "[unsupported block]".to_string(),
    }
}
