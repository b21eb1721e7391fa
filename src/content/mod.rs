// Content module
// Post and content block models, plus course section derivation

pub mod models;
pub mod sections;

pub use models::{AudioNarrationBlock, ContentBlock, Post, PostKind, QuizQuestion};
pub use sections::{CourseSection, SectionSplitter};
