//! Moves tokens between the pool and the slots of one displayed question.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::quiz::pool::{DistractorPool, PoolItem, DISTRACTOR_WORDS};
use crate::quiz::record::{AnswerKey, QuestionRecord, QuestionVariant};
use crate::quiz::slots::{PlacedAnswer, Placement, SlotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionMode {
    /// Self-paced practice, answers are checked as they are placed.
    Practice,
    /// Graded quiz, answers are only checked after submission.
    Quiz,
    /// Practice lesson that has already been completed.
    Revisit,
    /// Read-only view of a persisted submission.
    Review,
}

impl InteractionMode {
    pub fn accepts_moves(&self) -> bool {
        !matches!(self, InteractionMode::Review)
    }

    pub fn allows_swap(&self) -> bool {
        matches!(self, InteractionMode::Revisit)
    }

    pub fn signals_correctness(&self) -> bool {
        matches!(self, InteractionMode::Practice | InteractionMode::Revisit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loaded,
    InProgress,
    Complete,
    Submitted,
    Review,
}

impl Phase {
    /// Forward-only transitions. Returns false when `next` is not reachable.
    pub fn enter(&mut self, next: Phase) -> bool {
        use Phase::*;
        let allowed = matches!(
            (*self, next),
            (Uninitialized, Loaded)
                | (Uninitialized, Review)
                | (Loaded, InProgress)
                | (Loaded, Submitted)
                | (InProgress, Complete)
                | (InProgress, Submitted)
        );
        if allowed {
            *self = next;
        }
        allowed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Pool(usize),
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub source: Location,
    /// `None` when the drag was dropped outside any target.
    pub destination: Option<Location>,
}

impl Move {
    pub fn new(source: Location, destination: Location) -> Self {
        Self {
            source,
            destination: Some(destination),
        }
    }

    pub fn cancelled(source: Location) -> Self {
        Self {
            source,
            destination: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ReadOnly,
    SlotOccupied,
    SlotEmpty,
    NoSuchSlot,
    NoSuchPoolItem,
    NotDraggable,
    NotTypable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// `correct` is `None` where correctness isn't shown live.
    Placed { slot_id: String, correct: Option<bool> },
    Returned { slot_id: String },
    Relocated { from: String, to: String },
    Swapped { first: String, second: String },
    Typed { slot_id: String, correct: Option<bool> },
    Cleared { slot_id: String },
    Reordered,
    Rejected(RejectReason),
    Cancelled,
}

impl MoveOutcome {
    /// Whether the slot contents changed, i.e. the answer sheet needs writing.
    pub fn changes_answers(&self) -> bool {
        matches!(
            self,
            MoveOutcome::Placed { .. }
                | MoveOutcome::Returned { .. }
                | MoveOutcome::Relocated { .. }
                | MoveOutcome::Swapped { .. }
                | MoveOutcome::Typed { .. }
                | MoveOutcome::Cleared { .. }
        )
    }

    pub fn correctness(&self) -> Option<bool> {
        match self {
            MoveOutcome::Placed { correct, .. } | MoveOutcome::Typed { correct, .. } => *correct,
            _ => None,
        }
    }
}

/// Everything about the question currently on screen: its key, what the
/// user has placed, and what is left in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionState {
    question_id: String,
    variant: QuestionVariant,
    key: AnswerKey,
    store: SlotStore,
    pool: DistractorPool,
    /// Decoy values drawn for this question, wherever they sit now.
    decoys: Vec<String>,
    mode: InteractionMode,
    phase: Phase,
    pub(crate) has_interacted: bool,
    pub(crate) completion_fired: bool,
}

impl QuestionState {
    /// Builds slots and pool for `record`, then moves `restored` answers out
    /// of the pool into their slots.
    pub fn build<R: Rng + ?Sized>(
        record: &QuestionRecord,
        mode: InteractionMode,
        distractor_count: usize,
        restored: &[PlacedAnswer],
        rng: &mut R,
    ) -> Self {
        let key = AnswerKey::load(record);
        // Matching questions use the answer column as the pool, no decoys
        let decoys = match record.variant() {
            QuestionVariant::DragBlanks => {
                DistractorPool::sample_decoys(key.slots(), distractor_count, DISTRACTOR_WORDS, rng)
            }
            QuestionVariant::Matching | QuestionVariant::TypedBlanks => Vec::new(),
        };
        Self::assemble(record, key, mode, decoys, restored, rng)
    }

    /// Like [`QuestionState::build`], but reuses the decoys an earlier build
    /// of the same question drew, so reopening it keeps the token set.
    pub fn rebuild<R: Rng + ?Sized>(
        record: &QuestionRecord,
        mode: InteractionMode,
        decoys: Vec<String>,
        restored: &[PlacedAnswer],
        rng: &mut R,
    ) -> Self {
        Self::assemble(record, AnswerKey::load(record), mode, decoys, restored, rng)
    }

    fn assemble<R: Rng + ?Sized>(
        record: &QuestionRecord,
        key: AnswerKey,
        mode: InteractionMode,
        decoys: Vec<String>,
        restored: &[PlacedAnswer],
        rng: &mut R,
    ) -> Self {
        let variant = record.variant();
        for marker in record.unresolved_markers() {
            log::warn!(
                "Question {} has blank ___{}___ with no answer, it will stay empty",
                record.id,
                marker
            );
        }

        let pool = if variant.uses_pool() {
            DistractorPool::from_decoys(key.slots(), &decoys, rng)
        } else {
            DistractorPool::default()
        };

        let mut phase = Phase::Uninitialized;
        phase.enter(if mode == InteractionMode::Review {
            Phase::Review
        } else {
            Phase::Loaded
        });

        let mut state = Self {
            question_id: record.id.clone(),
            variant,
            store: SlotStore::new(&key),
            key,
            pool,
            decoys,
            mode,
            phase,
            has_interacted: false,
            completion_fired: false,
        };
        state.restore(restored);
        state
    }

    fn restore(&mut self, restored: &[PlacedAnswer]) {
        for answer in restored {
            if !self.store.contains(&answer.slot_id) {
                log::warn!(
                    "Question {} has no slot {}, dropping restored answer",
                    self.question_id,
                    answer.slot_id
                );
                continue;
            }
            let placement = match self.pool.take_value(&answer.value, &answer.slot_id) {
                Some(token) => Placement::from(token),
                None => Placement::typed(answer.value.clone()),
            };
            if let Err(refused) = self.store.put(&answer.slot_id, placement, false) {
                log::warn!(
                    "Slot {} of question {} restored twice, keeping the first value",
                    answer.slot_id,
                    self.question_id
                );
                if let Some(token) = refused.token {
                    let end = self.pool.len();
                    self.pool.insert(token, end);
                }
            }
        }
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn variant(&self) -> QuestionVariant {
        self.variant
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn enter_phase(&mut self, next: Phase) -> bool {
        self.phase.enter(next)
    }

    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    pub fn pool(&self) -> &DistractorPool {
        &self.pool
    }

    pub fn decoys(&self) -> &[String] {
        &self.decoys
    }

    pub fn all_filled(&self) -> bool {
        self.store.all_filled()
    }

    pub fn all_correct(&self) -> bool {
        self.store.all_correct(&self.key)
    }

    pub fn answers(&self) -> Vec<PlacedAnswer> {
        self.store.answers()
    }

    /// Tokens in slots plus tokens in the pool. Constant across moves.
    pub fn token_count(&self) -> usize {
        self.store.filled_count() + self.pool.len()
    }

    pub fn handle_move(&mut self, mv: Move) -> MoveOutcome {
        let tokens = self.token_count();
        let Some(destination) = mv.destination else {
            return MoveOutcome::Cancelled;
        };
        if !self.mode().accepts_moves() {
            return MoveOutcome::Rejected(RejectReason::ReadOnly);
        }
        if !self.variant().uses_pool() {
            return MoveOutcome::Rejected(RejectReason::NotDraggable);
        }

        let outcome = match (mv.source, destination) {
            (Location::Pool(from), Location::Pool(to)) => {
                if self.pool.reorder(from, to) {
                    MoveOutcome::Reordered
                } else {
                    MoveOutcome::Rejected(RejectReason::NoSuchPoolItem)
                }
            }
            (Location::Pool(index), Location::Slot(slot_id)) => self.place_from_pool(index, slot_id),
            (Location::Slot(slot_id), Location::Pool(index)) => self.return_to_pool(slot_id, index),
            (Location::Slot(from), Location::Slot(to)) => self.move_between_slots(from, to),
        };

        log::debug!("Question {}: {:?}", self.question_id, outcome);
        debug_assert_eq!(self.token_count(), tokens, "move {outcome:?} changed the token count");
        self.note_interaction(&outcome);
        outcome
    }

    /// Typed questions: replaces the slot's text, empty text clears it.
    pub fn type_answer(&mut self, slot_id: &str, text: &str) -> MoveOutcome {
        if !self.mode().accepts_moves() {
            return MoveOutcome::Rejected(RejectReason::ReadOnly);
        }
        if self.variant() != QuestionVariant::TypedBlanks {
            return MoveOutcome::Rejected(RejectReason::NotTypable);
        }
        if !self.store.contains(slot_id) {
            return MoveOutcome::Rejected(RejectReason::NoSuchSlot);
        }

        let outcome = if text.is_empty() {
            match self.store.clear(slot_id) {
                Some(_) => MoveOutcome::Cleared {
                    slot_id: slot_id.to_string(),
                },
                None => MoveOutcome::Rejected(RejectReason::SlotEmpty),
            }
        } else {
            self.store.set(slot_id, text, true);
            MoveOutcome::Typed {
                slot_id: slot_id.to_string(),
                correct: self.live_correctness(slot_id, text),
            }
        };

        self.note_interaction(&outcome);
        outcome
    }

    fn note_interaction(&mut self, outcome: &MoveOutcome) {
        if outcome.changes_answers() {
            self.has_interacted = true;
            if self.phase == Phase::Loaded {
                self.phase.enter(Phase::InProgress);
            }
        }
    }

    fn live_correctness(&self, slot_id: &str, value: &str) -> Option<bool> {
        self.mode()
            .signals_correctness()
            .then(|| self.key.is_correct(slot_id, value))
    }

    fn place_from_pool(&mut self, index: usize, slot_id: String) -> MoveOutcome {
        if !self.store.contains(&slot_id) {
            return MoveOutcome::Rejected(RejectReason::NoSuchSlot);
        }
        if self.store.is_filled(&slot_id) {
            return MoveOutcome::Rejected(RejectReason::SlotOccupied);
        }
        let Some(token) = self.pool.remove_at(index) else {
            return MoveOutcome::Rejected(RejectReason::NoSuchPoolItem);
        };

        let value = token.value.clone();
        match self.store.put(&slot_id, Placement::from(token), false) {
            Ok(_) => MoveOutcome::Placed {
                correct: self.live_correctness(&slot_id, &value),
                slot_id,
            },
            Err(refused) => {
                if let Some(token) = refused.token {
                    self.pool.insert(token, index);
                }
                MoveOutcome::Rejected(RejectReason::SlotOccupied)
            }
        }
    }

    fn return_to_pool(&mut self, slot_id: String, index: usize) -> MoveOutcome {
        if !self.store.contains(&slot_id) {
            return MoveOutcome::Rejected(RejectReason::NoSuchSlot);
        }
        let Some(placement) = self.store.clear(&slot_id) else {
            return MoveOutcome::Rejected(RejectReason::SlotEmpty);
        };

        // Answers restored from a record may not have come from this pool
        let token = placement.token.unwrap_or_else(|| PoolItem {
            id: format!("restored-{slot_id}"),
            origin_slot_id: self
                .key
                .slots()
                .iter()
                .find(|slot| slot.correct_value == placement.value)
                .map(|slot| slot.id.clone()),
            value: placement.value,
        });
        self.pool.insert(token, index);
        MoveOutcome::Returned { slot_id }
    }

    fn move_between_slots(&mut self, from: String, to: String) -> MoveOutcome {
        if from == to {
            return MoveOutcome::Cancelled;
        }
        if !self.store.contains(&from) || !self.store.contains(&to) {
            return MoveOutcome::Rejected(RejectReason::NoSuchSlot);
        }
        let Some(placement) = self.store.clear(&from) else {
            return MoveOutcome::Rejected(RejectReason::SlotEmpty);
        };

        match self.store.put(&to, placement, false) {
            Ok(_) => MoveOutcome::Relocated { from, to },
            Err(placement) if self.mode().allows_swap() => {
                // `to` is occupied, so the overwrite hands back its old value
                if let Ok(Some(displaced)) = self.store.put(&to, placement, true) {
                    let _ = self.store.put(&from, displaced, false);
                }
                MoveOutcome::Swapped {
                    first: from,
                    second: to,
                }
            }
            Err(placement) => {
                let _ = self.store.put(&from, placement, false);
                MoveOutcome::Rejected(RejectReason::SlotOccupied)
            }
        }
    }
}
