// Course progress state machine
// Sequential section reveal, quiz gating and paywall precedence

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::content::models::{ContentBlock, Post};
use crate::content::sections::CourseSection;
use crate::db::connection::DatabaseConnection;
use crate::db::operations::DbOperations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Locked,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseEvent {
    QuizPassed { section: usize },
    CompleteSection { section: usize },
}

/// Result of a successful "complete section" action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionAdvance {
    pub completed_sections: usize,
    /// Section to scroll to, `None` once the whole course is done
    pub revealed: Option<usize>,
}

/// What a viewer sees for one position of the course
#[derive(Debug, Clone)]
pub enum SectionView<'a> {
    Content {
        index: usize,
        title: Option<&'a str>,
        status: SectionStatus,
        blocks: &'a [ContentBlock],
        /// Gating quiz present and not yet passed this session
        quiz_pending: bool,
        /// The "advance" affordance is offered
        can_advance: bool,
    },
    /// Replaces every section from `from_section` on
    Paywall { from_section: usize },
}

/// Per-post progress: persisted `completed_sections` plus session-only quiz passes
#[derive(Debug, Clone)]
pub struct CourseProgress {
    post_id: String,
    completed_sections: usize,
    gated: Vec<bool>,
    quiz_passed: HashMap<usize, bool>,
    premium_locked: bool,
}

impl CourseProgress {
    /// Build progress for `sections` from a stored counter, clamped into `[0, N]`
    pub fn new(post: &Post, sections: &[CourseSection], stored: Option<i64>, has_access: bool) -> Self {
        let total = sections.len();
        let completed_sections = stored.unwrap_or(0).clamp(0, total as i64) as usize;

        Self {
            post_id: post.id.clone(),
            completed_sections,
            gated: sections.iter().map(|s| s.has_gating_quiz()).collect(),
            quiz_passed: HashMap::new(),
            premium_locked: post.is_premium && !has_access,
        }
    }

    /// Load the stored counter for `post` and build its progress
    pub fn load(
        db: &DatabaseConnection,
        post: &Post,
        sections: &[CourseSection],
        has_access: bool,
    ) -> Result<Self> {
        let stored = DbOperations::get_progress(db, &post.id)?;
        debug!(post_id = %post.id, ?stored, "Loaded course progress");
        Ok(Self::new(post, sections, stored, has_access))
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn completed_sections(&self) -> usize {
        self.completed_sections
    }

    pub fn total_sections(&self) -> usize {
        self.gated.len()
    }

    pub fn is_finished(&self) -> bool {
        self.completed_sections == self.total_sections()
    }

    pub fn status(&self, section: usize) -> SectionStatus {
        if section > self.completed_sections {
            SectionStatus::Locked
        } else if section == self.completed_sections {
            SectionStatus::Active
        } else {
            SectionStatus::Completed
        }
    }

    /// Sections past the first are behind the paywall for viewers without access
    pub fn is_paywalled(&self, section: usize) -> bool {
        self.premium_locked && section > 0
    }

    pub fn quiz_passed(&self, section: usize) -> bool {
        self.quiz_passed.get(&section).copied().unwrap_or(false)
    }

    /// No gating quiz, or the gating quiz has been passed this session
    pub fn can_advance(&self, section: usize) -> bool {
        match self.gated.get(section) {
            Some(true) => self.quiz_passed(section),
            Some(false) => true,
            None => false,
        }
    }

    /// Whether the "complete section" affordance is offered for `section`
    pub fn advance_available(&self, section: usize) -> bool {
        section < self.total_sections()
            && self.status(section) == SectionStatus::Active
            && !self.is_paywalled(section)
            && self.can_advance(section)
    }

    /// Apply an event without persisting. Returns the advance, if one happened.
    pub fn apply(&mut self, event: CourseEvent) -> Option<SectionAdvance> {
        match event {
            CourseEvent::QuizPassed { section } => {
                if section < self.total_sections() && self.status(section) != SectionStatus::Locked {
                    self.quiz_passed.insert(section, true);
                }
                None
            }
            CourseEvent::CompleteSection { section } => {
                if !self.advance_available(section) {
                    return None;
                }
                self.completed_sections = section + 1;
                let revealed = (self.completed_sections < self.total_sections())
                    .then_some(self.completed_sections);
                Some(SectionAdvance {
                    completed_sections: self.completed_sections,
                    revealed,
                })
            }
        }
    }

    /// Record a passed quiz for `section` (session only)
    pub fn record_quiz_pass(&mut self, section: usize) {
        self.apply(CourseEvent::QuizPassed { section });
    }

    /// Complete the active section and persist the new counter immediately.
    /// Returns `Ok(None)` when the affordance is not available.
    pub fn complete_section(
        &mut self,
        db: &DatabaseConnection,
        section: usize,
    ) -> Result<Option<SectionAdvance>> {
        if !self.advance_available(section) {
            debug!(post_id = %self.post_id, section, "Complete section not available");
            return Ok(None);
        }

        DbOperations::set_progress(db, &self.post_id, (section + 1) as i64)?;
        let advance = self.apply(CourseEvent::CompleteSection { section });

        if let Some(advance) = advance {
            info!(
                post_id = %self.post_id,
                completed = advance.completed_sections,
                total = self.total_sections(),
                "Section completed"
            );
        }

        Ok(advance)
    }

    /// Visible sections in order: locked sections are absent, and a single
    /// paywall prompt stands in for everything past section 0 when locked out
    pub fn view<'a>(&self, sections: &[CourseSection<'a>]) -> Vec<SectionView<'a>> {
        let mut views = Vec::new();

        for section in sections {
            if self.is_paywalled(section.index) {
                views.push(SectionView::Paywall {
                    from_section: section.index,
                });
                break;
            }

            let status = self.status(section.index);
            if status == SectionStatus::Locked {
                break;
            }

            views.push(SectionView::Content {
                index: section.index,
                title: section.title(),
                status,
                blocks: section.blocks,
                quiz_pending: section.has_gating_quiz() && !self.quiz_passed(section.index),
                can_advance: self.advance_available(section.index),
            });
        }

        views
    }
}
