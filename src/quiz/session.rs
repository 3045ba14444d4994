//! One learner working through one lesson: which question is open, what
//! has been answered so far, and how far the learner may navigate.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::quiz::engine::{InteractionMode, Move, MoveOutcome, Phase, QuestionState};
use crate::quiz::error::SessionError;
use crate::quiz::evaluator::{self, LessonHooks, LessonProgress, QuestionPosition};
use crate::quiz::record::AnswerKey;
use crate::quiz::slots::PlacedAnswer;
use crate::quiz::{Lesson, LessonType};

/// Answers per question id, kept across navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSheet {
    answers: BTreeMap<String, Vec<PlacedAnswer>>,
}

impl AnswerSheet {
    pub fn get(&self, question_id: &str) -> &[PlacedAnswer] {
        self.answers.get(question_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn write(&mut self, question_id: &str, answers: Vec<PlacedAnswer>) {
        if answers.is_empty() {
            self.answers.remove(question_id);
        } else {
            self.answers.insert(question_id.to_string(), answers);
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub lesson_id: String,
    pub answers: AnswerSheet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSession {
    lesson: Lesson,
    progress: LessonProgress,
    sheet: AnswerSheet,
    submission: Option<Submission>,
    current_index: usize,
    current: Option<QuestionState>,
    /// Decoys drawn per question id, reused whenever a question is rebuilt.
    #[serde(default)]
    decoys: BTreeMap<String, Vec<String>>,
}

impl LessonSession {
    pub fn new(lesson: Lesson) -> Self {
        Self {
            lesson,
            progress: LessonProgress::new(),
            sheet: AnswerSheet::default(),
            submission: None,
            current_index: 0,
            current: None,
            decoys: BTreeMap::new(),
        }
    }

    /// Opens a persisted submission read-only, starting at the first question.
    pub fn review<R: Rng + ?Sized>(lesson: Lesson, submission: Submission, rng: &mut R) -> Result<Self, SessionError> {
        let mut session = Self::new(lesson);
        session.sheet = submission.answers.clone();
        session.submission = Some(submission);
        session.progress.finish(session.lesson.len());
        session.open_question(0, rng)?;
        Ok(session)
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn progress(&self) -> &LessonProgress {
        &self.progress
    }

    pub fn sheet(&self) -> &AnswerSheet {
        &self.sheet
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&QuestionState> {
        self.current.as_ref()
    }

    pub fn position(&self) -> QuestionPosition {
        QuestionPosition {
            index: self.current_index,
            total: self.lesson.len(),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        match (self.lesson.lesson_type, self.progress.completed()) {
            (LessonType::Practice, false) => InteractionMode::Practice,
            (LessonType::Practice, true) => InteractionMode::Revisit,
            (LessonType::Quiz, false) => InteractionMode::Quiz,
            (LessonType::Quiz, true) => InteractionMode::Review,
        }
    }

    /// Shows question `index`. Slots and pool are only rebuilt when the
    /// question or the lesson-completed state changed, so reopening the same
    /// question keeps its pool order.
    pub fn open_question<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> Result<&QuestionState, SessionError> {
        let total = self.lesson.len();
        let record = self
            .lesson
            .questions
            .get(index)
            .ok_or(SessionError::NoSuchQuestion { index, total })?;
        let mode = self.mode();

        let up_to_date = matches!(
            &self.current,
            Some(current) if current.question_id() == record.id && current.mode() == mode
        );
        if !up_to_date {
            let restored = match (&self.submission, mode) {
                (Some(submission), InteractionMode::Review) => submission.answers.get(&record.id),
                _ => self.sheet.get(&record.id),
            };
            log::debug!("Opening question {} ({:?})", record.id, mode);
            let state = match self.decoys.get(&record.id) {
                Some(decoys) => QuestionState::rebuild(record, mode, decoys.clone(), restored, rng),
                None => QuestionState::build(
                    record,
                    mode,
                    self.lesson.lesson_type.distractor_count(),
                    restored,
                    rng,
                ),
            };
            self.decoys.insert(record.id.clone(), state.decoys().to_vec());
            self.current = Some(state);
        }
        self.current_index = index;
        self.current.as_ref().ok_or(SessionError::NoQuestionOpen)
    }

    fn is_answered(&self, index: usize) -> bool {
        if index == self.current_index {
            if let Some(current) = &self.current {
                return current.all_filled();
            }
        }
        self.lesson.questions.get(index).map_or(false, |record| {
            let key = AnswerKey::load(record);
            let answers = self.sheet.get(&record.id);
            key.slots()
                .iter()
                .all(|slot| answers.iter().any(|a| a.slot_id == slot.id))
        })
    }

    /// Navigates to `index` if the lesson allows it. Practice lessons only
    /// reach unlocked questions; quizzes can't skip past an unanswered one.
    pub fn go_to<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> Result<&QuestionState, SessionError> {
        let total = self.lesson.len();
        if index >= total {
            return Err(SessionError::NoSuchQuestion { index, total });
        }
        match self.mode() {
            InteractionMode::Practice if !self.progress.is_unlocked(index) => {
                return Err(SessionError::Locked(index));
            }
            InteractionMode::Quiz if index > self.current_index => {
                if !(self.current_index..index).all(|i| self.is_answered(i)) {
                    return Err(SessionError::Unanswered);
                }
            }
            _ => {}
        }
        self.open_question(index, rng)
    }

    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&QuestionState, SessionError> {
        self.go_to(self.current_index + 1, rng)
    }

    pub fn prev<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&QuestionState, SessionError> {
        let index = self.current_index.checked_sub(1).ok_or(SessionError::NoSuchQuestion {
            index: 0,
            total: self.lesson.len(),
        })?;
        self.go_to(index, rng)
    }

    pub fn handle_move<R: Rng + ?Sized>(
        &mut self,
        mv: Move,
        hooks: &mut dyn LessonHooks,
        rng: &mut R,
    ) -> Result<MoveOutcome, SessionError> {
        let state = self.current.as_mut().ok_or(SessionError::NoQuestionOpen)?;
        let outcome = state.handle_move(mv);
        self.after_change(&outcome, hooks, rng)?;
        Ok(outcome)
    }

    pub fn type_answer<R: Rng + ?Sized>(
        &mut self,
        slot_id: &str,
        text: &str,
        hooks: &mut dyn LessonHooks,
        rng: &mut R,
    ) -> Result<MoveOutcome, SessionError> {
        let state = self.current.as_mut().ok_or(SessionError::NoQuestionOpen)?;
        let outcome = state.type_answer(slot_id, text);
        self.after_change(&outcome, hooks, rng)?;
        Ok(outcome)
    }

    fn after_change<R: Rng + ?Sized>(
        &mut self,
        outcome: &MoveOutcome,
        hooks: &mut dyn LessonHooks,
        rng: &mut R,
    ) -> Result<(), SessionError> {
        if !outcome.changes_answers() {
            return Ok(());
        }
        let position = self.position();
        let state = self.current.as_mut().ok_or(SessionError::NoQuestionOpen)?;
        self.sheet.write(state.question_id(), state.answers());
        evaluator::signal_move(outcome, hooks);

        let was_completed = self.progress.completed();
        evaluator::evaluate(state, position, &mut self.progress, hooks);
        if self.progress.completed() != was_completed {
            // Completing the lesson switches every question to revisit mode
            self.open_question(self.current_index, rng)?;
        }
        Ok(())
    }

    /// Hands in a quiz. The result is what gets persisted and graded; the
    /// session itself switches to read-only review.
    pub fn submit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Submission, SessionError> {
        if self.lesson.lesson_type != LessonType::Quiz {
            return Err(SessionError::NotAQuiz);
        }
        if self.submission.is_some() {
            return Err(SessionError::AlreadySubmitted);
        }
        if self.current.is_none() {
            return Err(SessionError::NoQuestionOpen);
        }
        if !(0..self.lesson.len()).all(|i| self.is_answered(i)) {
            return Err(SessionError::Unanswered);
        }
        let state = self.current.as_mut().ok_or(SessionError::NoQuestionOpen)?;
        state.enter_phase(Phase::Submitted);

        let submission = Submission {
            lesson_id: self.lesson.id.clone(),
            answers: self.sheet.clone(),
        };
        log::info!(
            "Lesson {} submitted with {} answered questions",
            self.lesson.id,
            submission.answers.len()
        );
        self.submission = Some(submission.clone());
        self.progress.finish(self.lesson.len());
        self.open_question(self.current_index, rng)?;
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::engine::{Location, RejectReason};
    use crate::quiz::evaluator::NoHooks;
    use crate::quiz::record::{BlankPair, QuestionKind, QuestionRecord};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn drag(id: &str, values: &[&str]) -> QuestionRecord {
        let text = (1..=values.len()).map(|i| format!("___{i}___")).collect::<Vec<_>>().join(" ");
        QuestionRecord {
            id: id.into(),
            question_text: text,
            kind: QuestionKind::FillBlankDrag {
                blanks: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| BlankPair { id: (i + 1).to_string(), correct_value: v.to_string() })
                    .collect(),
            },
        }
    }

    fn lesson(lesson_type: LessonType) -> Lesson {
        Lesson::new(
            "bio".into(),
            "Biology".into(),
            lesson_type,
            vec![drag("q1", &["sun", "water", "glucose"]), drag("q2", &["leaf", "root"])],
        )
    }

    fn place(session: &mut LessonSession, value: &str, slot: &str, rng: &mut StdRng) -> MoveOutcome {
        let index = session.current().unwrap().pool().values().iter().position(|v| *v == value).unwrap();
        session
            .handle_move(Move::new(Location::Pool(index), Location::Slot(slot.into())), &mut NoHooks, rng)
            .unwrap()
    }

    #[test]
    fn test_first_placement() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        assert_eq!(session.open_question(0, &mut rng).unwrap().pool().len(), 8);

        place(&mut session, "sun", "1", &mut rng);
        let state = session.current().unwrap();
        assert_eq!(state.store().get("1"), Some("sun"));
        assert_eq!(state.pool().len(), 7);
        assert!(!state.all_filled());
        assert_eq!(session.sheet().get("q1"), &[PlacedAnswer::new("1", "sun")]);
    }

    #[test]
    fn test_completing_question_unlocks_next_once() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        session.open_question(0, &mut rng).unwrap();
        assert_eq!(session.go_to(1, &mut rng).unwrap_err(), SessionError::Locked(1));

        place(&mut session, "sun", "1", &mut rng);
        place(&mut session, "water", "2", &mut rng);
        place(&mut session, "glucose", "3", &mut rng);
        assert!(session.current().unwrap().all_correct());
        assert_eq!(session.progress().furthest_reached(), 2);

        session
            .handle_move(Move::new(Location::Slot("1".into()), Location::Pool(0)), &mut NoHooks, &mut rng)
            .unwrap();
        place(&mut session, "sun", "1", &mut rng);
        assert!(session.current().unwrap().completion_fired);
        assert_eq!(session.progress().furthest_reached(), 2);
        assert!(session.go_to(1, &mut rng).is_ok());
    }

    #[test]
    fn test_reopening_keeps_pool_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        let pool = session.open_question(0, &mut rng).unwrap().pool().clone();
        let again = session.open_question(0, &mut rng).unwrap().pool().clone();
        assert_eq!(pool, again);
    }

    #[test]
    fn test_answers_survive_navigation() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut session = LessonSession::new(lesson(LessonType::Quiz));
        session.open_question(0, &mut rng).unwrap();
        place(&mut session, "water", "1", &mut rng);
        assert_eq!(session.next(&mut rng).unwrap_err(), SessionError::Unanswered);

        place(&mut session, "sun", "2", &mut rng);
        place(&mut session, "glucose", "3", &mut rng);
        session.next(&mut rng).unwrap();
        place(&mut session, "root", "1", &mut rng);

        let back = session.prev(&mut rng).unwrap();
        assert_eq!(back.store().get("1"), Some("water"));
        assert_eq!(back.pool().len(), 15);

        let forward = session.next(&mut rng).unwrap();
        assert_eq!(forward.answers(), vec![PlacedAnswer::new("1", "root")]);
        assert_eq!(forward.token_count(), 17);
    }

    #[test]
    fn test_reopened_question_keeps_its_decoys() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut session = LessonSession::new(lesson(LessonType::Quiz));
        let state = session.open_question(0, &mut rng).unwrap();
        let initial = state.token_count();
        let decoys: Vec<String> = state
            .pool()
            .items()
            .iter()
            .filter(|item| item.origin_slot_id.is_none())
            .take(3)
            .map(|item| item.value.clone())
            .collect();
        for (value, slot) in decoys.iter().zip(["1", "2", "3"]) {
            place(&mut session, value, slot, &mut rng);
        }

        session.next(&mut rng).unwrap();
        let back = session.prev(&mut rng).unwrap();
        assert_eq!(back.token_count(), initial);
        assert_eq!(back.store().get("2"), Some(decoys[1].as_str()));

        for slot in ["1", "2", "3"] {
            session
                .handle_move(Move::new(Location::Slot(slot.into()), Location::Pool(0)), &mut NoHooks, &mut rng)
                .unwrap();
        }
        let state = session.current().unwrap();
        assert_eq!(state.pool().len(), initial);
        assert_eq!(state.pool().items().iter().filter(|item| item.origin_slot_id.is_none()).count(), 15);
        assert!(state.pool().items().iter().all(|item| !item.id.starts_with("restored-")));
    }

    #[test]
    fn test_submit_requires_every_question() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut session = LessonSession::new(lesson(LessonType::Quiz));
        session.open_question(0, &mut rng).unwrap();
        place(&mut session, "sun", "1", &mut rng);
        place(&mut session, "water", "2", &mut rng);
        place(&mut session, "glucose", "3", &mut rng);

        assert_eq!(session.submit(&mut rng).unwrap_err(), SessionError::Unanswered);
        assert!(session.submission().is_none());
        assert_eq!(session.mode(), InteractionMode::Quiz);
    }

    #[test]
    fn test_quiz_submit_switches_to_review() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = LessonSession::new(lesson(LessonType::Quiz));
        session.open_question(0, &mut rng).unwrap();
        place(&mut session, "sun", "1", &mut rng);
        place(&mut session, "water", "2", &mut rng);
        place(&mut session, "glucose", "3", &mut rng);
        session.next(&mut rng).unwrap();
        place(&mut session, "root", "1", &mut rng);
        assert_eq!(session.submit(&mut rng).unwrap_err(), SessionError::Unanswered);
        place(&mut session, "leaf", "2", &mut rng);

        let submission = session.submit(&mut rng).unwrap();
        assert_eq!(submission.lesson_id, "bio");
        assert_eq!(submission.answers.get("q2"), &[PlacedAnswer::new("1", "root"), PlacedAnswer::new("2", "leaf")]);
        assert_eq!(session.mode(), InteractionMode::Review);
        assert_eq!(session.current().unwrap().phase(), Phase::Review);
        assert_eq!(session.current().unwrap().store().get("2"), Some("leaf"));

        let outcome = session
            .handle_move(Move::new(Location::Slot("1".into()), Location::Pool(0)), &mut NoHooks, &mut rng)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Rejected(RejectReason::ReadOnly));
        assert_eq!(session.submit(&mut rng).unwrap_err(), SessionError::AlreadySubmitted);
        assert!(session.go_to(0, &mut rng).is_ok());
    }

    #[test]
    fn test_practice_cannot_be_submitted() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        session.open_question(0, &mut rng).unwrap();
        assert_eq!(session.submit(&mut rng).unwrap_err(), SessionError::NotAQuiz);
    }

    #[test]
    fn test_finishing_practice_switches_to_revisit() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        session.open_question(0, &mut rng).unwrap();
        for (value, slot) in [("sun", "1"), ("water", "2"), ("glucose", "3")] {
            place(&mut session, value, slot, &mut rng);
        }
        session.go_to(1, &mut rng).unwrap();
        place(&mut session, "leaf", "1", &mut rng);
        place(&mut session, "root", "2", &mut rng);

        assert!(session.progress().completed());
        assert!(session.progress().selector_revealed());
        let state = session.current().unwrap();
        assert_eq!(state.mode(), InteractionMode::Revisit);
        assert_eq!(state.store().get("2"), Some("root"));
        assert_eq!(state.pool().len(), 5);

        let outcome = session
            .handle_move(Move::new(Location::Slot("1".into()), Location::Slot("2".into())), &mut NoHooks, &mut rng)
            .unwrap();
        assert!(matches!(outcome, MoveOutcome::Swapped { .. }));
        assert_eq!(session.sheet().get("q2"), &[PlacedAnswer::new("1", "root"), PlacedAnswer::new("2", "leaf")]);
    }

    #[test]
    fn test_review_of_incomplete_submission() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut answers = AnswerSheet::default();
        answers.write("q1", vec![PlacedAnswer::new("1", "sun"), PlacedAnswer::new("3", "glucose")]);
        let submission = Submission { lesson_id: "bio".into(), answers };

        let mut session = LessonSession::review(lesson(LessonType::Quiz), submission, &mut rng).unwrap();
        let state = session.current().unwrap();
        assert_eq!(state.mode(), InteractionMode::Review);
        assert_eq!(state.store().get("2"), None);
        assert_eq!(state.store().get("3"), Some("glucose"));

        let q2 = session.go_to(1, &mut rng).unwrap();
        assert!(q2.answers().is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        assert_eq!(
            session.open_question(5, &mut rng).unwrap_err(),
            SessionError::NoSuchQuestion { index: 5, total: 2 }
        );
        assert!(session.current().is_none());
        assert_eq!(
            session.handle_move(Move::cancelled(Location::Pool(0)), &mut NoHooks, &mut rng).unwrap_err(),
            SessionError::NoQuestionOpen
        );
    }
}
