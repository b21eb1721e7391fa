// Content data models
use serde::{Deserialize, Serialize};

/// Kind of post in the content directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Article,
    Course,
    Podcast,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Article => "article",
            PostKind::Course => "course",
            PostKind::Podcast => "podcast",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: PostKind,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl Post {
    /// Check every quiz in the post for well-formed questions
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Post id is empty".to_string());
        }

        for (index, block) in self.blocks.iter().enumerate() {
            if let ContentBlock::Quiz(quiz) = block {
                for (q, question) in quiz.meta.questions.iter().enumerate() {
                    question
                        .validate()
                        .map_err(|e| format!("Block {} question {}: {}", index, q, e))?;
                }
            }
        }

        Ok(())
    }

    /// Audio blocks in document order
    pub fn audio_blocks(&self) -> impl Iterator<Item = &AudioNarrationBlock> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::Audio(audio) => Some(audio),
            _ => None,
        })
    }
}

/// A single block of post content, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Header(TextBlock),
    Text(TextBlock),
    Quiz(QuizBlock),
    Audio(AudioNarrationBlock),
    /// Block types this crate does not interpret (images, videos, ...)
    #[serde(other)]
    Other,
}

impl ContentBlock {
    /// Text of a header block, if this is one
    pub fn header_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Header(header) => Some(header.content.as_str()),
            _ => None,
        }
    }

    /// Questions of a quiz block, empty for every other block
    pub fn quiz_questions(&self) -> &[QuizQuestion] {
        match self {
            ContentBlock::Quiz(quiz) => &quiz.meta.questions,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizBlock {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub meta: QuizMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizMeta {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
}

impl QuizQuestion {
    pub fn validate(&self) -> Result<(), String> {
        if self.options.len() < 2 {
            return Err(format!(
                "needs at least 2 options, found {}",
                self.options.len()
            ));
        }
        if self.correct_answer_index >= self.options.len() {
            return Err(format!(
                "correct answer index {} out of range for {} options",
                self.correct_answer_index,
                self.options.len()
            ));
        }
        Ok(())
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer_index
    }
}

/// Synthesized narration embedded in a post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioNarrationBlock {
    #[serde(default)]
    pub id: String,
    /// Base64 of 16-bit little-endian mono PCM at 24kHz
    pub base64_pcm: String,
    #[serde(default)]
    pub meta: AudioMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMeta {
    pub audio_title: Option<String>,
    pub voice_name: Option<String>,
    /// Catalog id or URL of the background track
    pub bg_music_track: Option<String>,
    pub bg_music_volume: Option<f32>,
}
