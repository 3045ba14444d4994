//! Completion and correctness checks that run after every move, and the
//! lesson-level side effects they trigger.

use serde::{Deserialize, Serialize};

use crate::quiz::engine::{InteractionMode, MoveOutcome, Phase, QuestionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Correct,
    Incorrect,
    QuestionComplete,
}

/// Callbacks into whatever hosts the lesson. Everything defaults to doing
/// nothing.
pub trait LessonHooks {
    fn advance_question(&mut self, _furthest_reached: usize) {}
    fn lesson_completed(&mut self) {}
    fn reveal_question_selector(&mut self) {}
    fn sound_cue(&mut self, _cue: SoundCue) {}
}

#[cfg(test)]
pub struct NoHooks;

#[cfg(test)]
impl LessonHooks for NoHooks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPosition {
    pub index: usize,
    pub total: usize,
}

impl QuestionPosition {
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    /// 1-based count of unlocked questions.
    furthest_reached: usize,
    completed: bool,
    selector_revealed: bool,
}

impl Default for LessonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl LessonProgress {
    pub fn new() -> Self {
        Self {
            furthest_reached: 1,
            completed: false,
            selector_revealed: false,
        }
    }

    pub fn furthest_reached(&self) -> usize {
        self.furthest_reached
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn selector_revealed(&self) -> bool {
        self.selector_revealed
    }

    pub fn is_unlocked(&self, index: usize) -> bool {
        self.selector_revealed || index < self.furthest_reached
    }

    /// Marks a finished lesson (e.g. a submitted quiz) without going
    /// through the pointer.
    pub(crate) fn finish(&mut self, total: usize) {
        self.furthest_reached = self.furthest_reached.max(total);
        self.completed = true;
        self.selector_revealed = true;
    }

    /// Unlocks the question after `position`. The pointer never moves back.
    pub fn record_completion(&mut self, position: QuestionPosition, hooks: &mut dyn LessonHooks) {
        let next = (position.index + 2).min(position.total.max(1));
        if next > self.furthest_reached {
            self.furthest_reached = next;
            hooks.advance_question(next);
        }
        if position.is_last() && !self.completed {
            self.completed = true;
            self.selector_revealed = true;
            log::info!("Lesson completed after question {}", position.index + 1);
            hooks.lesson_completed();
            hooks.reveal_question_selector();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub all_filled: bool,
    /// Only computed where correctness is shown, and only once filled.
    pub all_correct: Option<bool>,
    pub newly_completed: bool,
}

/// Per-move correct/incorrect cue.
pub fn signal_move(outcome: &MoveOutcome, hooks: &mut dyn LessonHooks) {
    match outcome.correctness() {
        Some(true) => hooks.sound_cue(SoundCue::Correct),
        Some(false) => hooks.sound_cue(SoundCue::Incorrect),
        None => {}
    }
}

pub fn evaluate(
    state: &mut QuestionState,
    position: QuestionPosition,
    progress: &mut LessonProgress,
    hooks: &mut dyn LessonHooks,
) -> Evaluation {
    let all_filled = state.all_filled();
    let mut evaluation = Evaluation {
        all_filled,
        all_correct: None,
        newly_completed: false,
    };

    match state.mode() {
        // Graded on submission, only fill state matters here
        InteractionMode::Quiz | InteractionMode::Review => {}
        InteractionMode::Revisit => {
            evaluation.all_correct = all_filled.then(|| state.all_correct());
        }
        InteractionMode::Practice => {
            let all_correct = all_filled && state.all_correct();
            evaluation.all_correct = all_filled.then_some(all_correct);

            // Restored answers alone never complete a question, and a
            // question completes once per identity
            if all_correct && state.has_interacted && !state.completion_fired {
                state.completion_fired = true;
                state.enter_phase(Phase::Complete);
                log::debug!("Question {} completed", state.question_id());
                hooks.sound_cue(SoundCue::QuestionComplete);
                progress.record_completion(position, hooks);
                evaluation.newly_completed = true;
            }
        }
    }

    evaluation
}
