// Quiz runner state machine
// One instance per quiz block, reset each time the quiz is entered

use crate::content::models::QuizQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    /// Waiting for an answer to `index`; `answers` holds correctness of earlier questions
    Asking {
        index: usize,
        selected: Option<usize>,
        answers: Vec<bool>,
    },
    Finished {
        correct: usize,
        total: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAction {
    Select(usize),
    Confirm,
    Retake,
}

impl QuizState {
    pub fn outcome(&self) -> Option<QuizOutcome> {
        match self {
            QuizState::Asking { .. } => None,
            // Strict 100%, no partial pass
            QuizState::Finished { correct, total } if correct == total => Some(QuizOutcome::Passed),
            QuizState::Finished { .. } => Some(QuizOutcome::Failed),
        }
    }
}

/// Drives a quiz over a fixed question list
#[derive(Debug, Clone)]
pub struct QuizRunner<'a> {
    questions: &'a [QuizQuestion],
    state: QuizState,
}

impl<'a> QuizRunner<'a> {
    pub fn new(questions: &'a [QuizQuestion]) -> Self {
        Self {
            questions,
            state: Self::initial(questions),
        }
    }

    fn initial(questions: &[QuizQuestion]) -> QuizState {
        if questions.is_empty() {
            QuizState::Finished { correct: 0, total: 0 }
        } else {
            QuizState::Asking {
                index: 0,
                selected: None,
                answers: Vec::new(),
            }
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.state.outcome()
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// The question awaiting an answer
    pub fn current_question(&self) -> Option<&'a QuizQuestion> {
        match &self.state {
            QuizState::Asking { index, .. } => self.questions.get(*index),
            QuizState::Finished { .. } => None,
        }
    }

    /// Apply an action; returns true when it changed the state
    pub fn apply(&mut self, action: QuizAction) -> bool {
        match transition(self.questions, &self.state, action) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }
}

/// Pure transition function. `None` means the action is not available in `state`.
pub fn transition(questions: &[QuizQuestion], state: &QuizState, action: QuizAction) -> Option<QuizState> {
    match (state, action) {
        (QuizState::Asking { index, answers, .. }, QuizAction::Select(option)) => {
            let question = questions.get(*index)?;
            if option >= question.options.len() {
                return None;
            }
            Some(QuizState::Asking {
                index: *index,
                selected: Some(option),
                answers: answers.clone(),
            })
        }
        (QuizState::Asking { index, selected, answers }, QuizAction::Confirm) => {
            let option = (*selected)?;
            let question = questions.get(*index)?;

            let mut answers = answers.clone();
            answers.push(question.is_correct(option));

            if index + 1 < questions.len() {
                Some(QuizState::Asking {
                    index: index + 1,
                    selected: None,
                    answers,
                })
            } else {
                Some(QuizState::Finished {
                    correct: answers.iter().filter(|&&ok| ok).count(),
                    total: questions.len(),
                })
            }
        }
        (QuizState::Finished { correct, total }, QuizAction::Retake) if correct != total => {
            Some(QuizRunner::initial(questions))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<QuizQuestion> {
        (0..n)
            .map(|i| QuizQuestion {
                question: format!("Question {}", i),
                options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                correct_answer_index: i % 3,
            })
            .collect()
    }

    fn answer(runner: &mut QuizRunner, option: usize) {
        assert!(runner.apply(QuizAction::Select(option)));
        assert!(runner.apply(QuizAction::Confirm));
    }

    #[test]
    fn test_all_correct_passes() {
        let qs = questions(4);
        let mut runner = QuizRunner::new(&qs);
        for i in 0..4 {
            assert_eq!(runner.outcome(), None);
            answer(&mut runner, i % 3);
        }
        assert_eq!(runner.state(), &QuizState::Finished { correct: 4, total: 4 });
        assert_eq!(runner.outcome(), Some(QuizOutcome::Passed));
    }

    #[test]
    fn test_single_wrong_answer_fails() {
        for n in 1..6 {
            let qs = questions(n);
            let mut runner = QuizRunner::new(&qs);
            for i in 0..n {
                let option = if i == n - 1 { (i + 1) % 3 } else { i % 3 };
                answer(&mut runner, option);
            }
            assert_eq!(runner.outcome(), Some(QuizOutcome::Failed), "n = {}", n);
        }
    }

    #[test]
    fn test_retake_resets_answers() {
        let qs = questions(2);
        let mut runner = QuizRunner::new(&qs);
        answer(&mut runner, 2);
        answer(&mut runner, 1);
        assert_eq!(runner.outcome(), Some(QuizOutcome::Failed));

        assert!(runner.apply(QuizAction::Retake));
        assert_eq!(
            runner.state(),
            &QuizState::Asking {
                index: 0,
                selected: None,
                answers: vec![],
            }
        );
    }

    #[test]
    fn test_retake_unavailable_after_pass() {
        let qs = questions(1);
        let mut runner = QuizRunner::new(&qs);
        answer(&mut runner, 0);
        assert!(!runner.apply(QuizAction::Retake));
        assert_eq!(runner.outcome(), Some(QuizOutcome::Passed));
    }

    #[test]
    fn test_confirm_requires_selection() {
        let qs = questions(2);
        let mut runner = QuizRunner::new(&qs);
        assert!(!runner.apply(QuizAction::Confirm));
        assert!(!runner.apply(QuizAction::Select(7)));
        assert!(runner.apply(QuizAction::Select(1)));
        assert!(runner.apply(QuizAction::Select(0)));
        assert!(runner.apply(QuizAction::Confirm));
        assert_eq!(runner.current_question().map(|q| q.question.as_str()), Some("Question 1"));
    }

    #[test]
    fn test_empty_quiz_is_passed() {
        let runner = QuizRunner::new(&[]);
        assert_eq!(runner.outcome(), Some(QuizOutcome::Passed));
        assert!(runner.current_question().is_none());
    }
}
