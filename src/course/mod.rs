// Course module
// Section-by-section progression with quiz gating

pub mod progress;
pub mod quiz;

pub use progress::{CourseEvent, CourseProgress, SectionAdvance, SectionStatus, SectionView};
pub use quiz::{QuizAction, QuizOutcome, QuizRunner, QuizState};
