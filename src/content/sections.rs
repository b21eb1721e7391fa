// Course section derivation
// Splits a course post's blocks into sections at marker headers

use regex::Regex;

use super::models::{ContentBlock, Post, PostKind};

/// Header substrings that open a new course section
pub const DEFAULT_SECTION_MARKERS: &[&str] = &["Week", "Module", "Conclusion", "Introduction"];

/// A run of consecutive blocks between marker headers. Never persisted.
#[derive(Debug, Clone)]
pub struct CourseSection<'a> {
    pub index: usize,
    pub blocks: &'a [ContentBlock],
}

impl<'a> CourseSection<'a> {
    /// Title taken from the leading header, if the section starts with one
    pub fn title(&self) -> Option<&'a str> {
        self.blocks.first().and_then(|b| b.header_text())
    }

    /// Total number of quiz questions in this section
    pub fn quiz_question_count(&self) -> usize {
        self.blocks.iter().map(|b| b.quiz_questions().len()).sum()
    }

    /// Whether this section holds a quiz that gates advancement
    pub fn has_gating_quiz(&self) -> bool {
        self.quiz_question_count() > 0
    }

    /// The first quiz block with at least one question
    pub fn gating_quiz(&self) -> Option<&'a ContentBlock> {
        self.blocks.iter().find(|b| !b.quiz_questions().is_empty())
    }
}

pub struct SectionSplitter {
    markers: Option<Regex>,
}

impl SectionSplitter {
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = markers
            .iter()
            .map(|m| m.as_ref())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect();

        // An empty alternation would match every header
        let markers = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&alternatives.join("|"))?)
        };

        Ok(Self { markers })
    }

    pub fn is_marker(&self, block: &ContentBlock) -> bool {
        match (&self.markers, block.header_text()) {
            (Some(re), Some(text)) => re.is_match(text),
            _ => false,
        }
    }

    /// Derive the sections of a post. Non-course posts are one section.
    pub fn split<'a>(&self, post: &'a Post) -> Vec<CourseSection<'a>> {
        let blocks = post.blocks.as_slice();
        if blocks.is_empty() {
            return Vec::new();
        }
        if post.kind != PostKind::Course {
            return vec![CourseSection { index: 0, blocks }];
        }

        let mut sections = Vec::new();
        let mut start = 0;

        for (i, block) in blocks.iter().enumerate() {
            if i > start && self.is_marker(block) {
                sections.push(CourseSection {
                    index: sections.len(),
                    blocks: &blocks[start..i],
                });
                start = i;
            }
        }

        sections.push(CourseSection {
            index: sections.len(),
            blocks: &blocks[start..],
        });

        sections
    }
}

impl Default for SectionSplitter {
    fn default() -> Self {
        let markers = DEFAULT_SECTION_MARKERS
            .iter()
            .map(|m| regex::escape(m))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            markers: Regex::new(&markers).ok(),
        }
    }
}
