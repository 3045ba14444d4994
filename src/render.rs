//! Chat presentation of a lesson session. Output is Telegram HTML.

use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::commands::LABEL_SEPARATOR;
use crate::quiz::engine::{InteractionMode, MoveOutcome, QuestionState, RejectReason};
use crate::quiz::evaluator::{LessonHooks, SoundCue};
use crate::quiz::grading::GradeReport;
use crate::quiz::record::{segments, QuestionVariant, Segment};
use crate::quiz::session::LessonSession;

pub const HELP_TEXT: &str = "How to answer:
p3 s1 - put pool item 3 into blank 1
p3 - put pool item 3 into the first empty blank
s1 - send blank 1 back to the pool
s1 s2 - move blank 1 into blank 2
p4 p1 - move pool item 4 to the front
1=word - type an answer into blank 1 (1= clears it)
/next, /prev, /go N - navigate
/submit - hand in a quiz
/menu - pick another lesson";

const POOL_BUTTONS_PER_ROW: usize = 3;

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Tick or cross after a filled value, only where correctness is shown.
fn mark(state: &QuestionState, slot_id: &str, value: &str) -> &'static str {
    match state.mode() {
        InteractionMode::Revisit | InteractionMode::Review => {
            if state.key().is_correct(slot_id, value) {
                " ✓"
            } else {
                " ✗"
            }
        }
        InteractionMode::Practice | InteractionMode::Quiz => "",
    }
}

fn render_slot(state: &QuestionState, slot_id: &str) -> String {
    if !state.store().contains(slot_id) {
        return "[____]".to_string();
    }
    match state.store().get(slot_id) {
        Some(value) => format!(
            "<b>[{}]</b>{}",
            escape(value),
            mark(state, slot_id, value)
        ),
        None => format!("[s{} ____]", escape(slot_id)),
    }
}

pub fn pool_labels(state: &QuestionState) -> Vec<String> {
    state
        .pool()
        .values()
        .iter()
        .enumerate()
        .map(|(i, value)| format!("p{} {} {}", i + 1, LABEL_SEPARATOR, value))
        .collect()
}

pub fn render_question(session: &LessonSession) -> String {
    let Some(state) = session.current() else {
        return "No question is open.".to_string();
    };
    let lesson = session.lesson();
    let position = session.position();
    let question_text = lesson
        .questions
        .get(position.index)
        .map(|record| record.question_text.as_str())
        .unwrap_or_default();

    let mut out = format!(
        "<b>{}</b> · question {} of {}\n",
        escape(&lesson.title),
        position.index + 1,
        position.total
    );
    match state.mode() {
        InteractionMode::Revisit => out.push_str("<i>Lesson completed, rearrange freely.</i>\n"),
        InteractionMode::Review => out.push_str("<i>Submitted answers, read-only.</i>\n"),
        InteractionMode::Practice | InteractionMode::Quiz => {}
    }
    out.push('\n');

    match state.variant() {
        QuestionVariant::Matching => {
            if !question_text.is_empty() {
                out.push_str(&escape(question_text));
                out.push_str("\n\n");
            }
            for slot in state.key().slots() {
                out.push_str(&format!(
                    "s{}. {} → {}\n",
                    escape(&slot.id),
                    escape(slot.prompt.as_deref().unwrap_or_default()),
                    render_slot(state, &slot.id)
                ));
            }
        }
        QuestionVariant::DragBlanks | QuestionVariant::TypedBlanks => {
            for segment in segments(question_text) {
                match segment {
                    Segment::Text(text) => out.push_str(&escape(text)),
                    Segment::Blank(id) => out.push_str(&render_slot(state, id)),
                }
            }
            out.push('\n');
        }
    }

    if state.variant().uses_pool() {
        out.push_str("\nPool: ");
        if state.pool().is_empty() {
            out.push_str("(empty)");
        } else {
            out.push_str(&escape(&pool_labels(state).join(", ")));
        }
    } else if state.mode().accepts_moves() {
        out.push_str("\nType answers as <code>1=word</code>.");
    }
    out
}

pub fn keyboard(session: &LessonSession) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = Vec::new();
    if let Some(state) = session.current() {
        if state.mode().accepts_moves() {
            let labels = pool_labels(state);
            for chunk in labels.chunks(POOL_BUTTONS_PER_ROW) {
                rows.push(chunk.iter().map(KeyboardButton::new).collect());
            }
        }
    }
    rows.push(vec![KeyboardButton::new("/prev"), KeyboardButton::new("/next")]);
    if session.mode() == InteractionMode::Quiz {
        rows.push(vec![KeyboardButton::new("/submit")]);
    }
    rows.push(vec![KeyboardButton::new("/menu")]);
    KeyboardMarkup::new(rows)
}

/// Why a move did nothing, if the user should be told.
pub fn describe_outcome(outcome: &MoveOutcome) -> Option<&'static str> {
    let reason = match outcome {
        MoveOutcome::Rejected(reason) => reason,
        MoveOutcome::Cancelled => return Some("Nothing moved."),
        _ => return None,
    };
    Some(match reason {
        RejectReason::ReadOnly => "These answers were submitted and can't be changed.",
        RejectReason::SlotOccupied => "That blank is already filled, empty it first.",
        RejectReason::SlotEmpty => "That blank is empty.",
        RejectReason::NoSuchSlot => "There is no such blank.",
        RejectReason::NoSuchPoolItem => "There is no such pool item.",
        RejectReason::NotDraggable => "This question is answered by typing, e.g. 1=word.",
        RejectReason::NotTypable => "This question is answered by moving pool items, e.g. p1 s1.",
    })
}

pub fn render_grade(report: &GradeReport) -> String {
    let mut out = format!(
        "Quiz submitted! You answered {} of {} questions correctly.\n",
        report.score(),
        report.total()
    );
    for (i, grade) in report.grades.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} {}/{}",
            i + 1,
            if grade.correct { "✅" } else { "❌" },
            grade.correct_slots,
            grade.total_slots
        ));
    }
    out
}

/// Collects what the lesson wants to tell the user during one update.
#[derive(Debug, Default)]
pub struct ChatCues {
    notes: Vec<String>,
}

impl ChatCues {
    pub fn note(&mut self, text: impl Into<String>) {
        self.notes.push(text.into());
    }

    pub fn into_notes(self) -> Vec<String> {
        self.notes
    }
}

impl LessonHooks for ChatCues {
    fn advance_question(&mut self, furthest_reached: usize) {
        self.note(format!("Question {furthest_reached} unlocked, /next to continue."));
    }

    fn lesson_completed(&mut self) {
        self.note("Lesson completed!");
    }

    fn reveal_question_selector(&mut self) {
        self.note("You can now jump to any question with /go N.");
    }

    fn sound_cue(&mut self, cue: SoundCue) {
        self.note(match cue {
            SoundCue::Correct => "✅ Correct!",
            SoundCue::Incorrect => "❌ Not quite.",
            SoundCue::QuestionComplete => "🎉 Every blank is right!",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::engine::{Location, Move};
    use crate::quiz::evaluator::NoHooks;
    use crate::quiz::record::{BlankPair, MatchingPair, QuestionKind, QuestionRecord};
    use crate::quiz::session::{AnswerSheet, Submission};
    use crate::quiz::slots::PlacedAnswer;
    use crate::quiz::{Lesson, LessonType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lesson(lesson_type: LessonType) -> Lesson {
        Lesson::new(
            "bio".into(),
            "Biology".into(),
            lesson_type,
            vec![
                QuestionRecord {
                    id: "q1".into(),
                    question_text: "Plants need ___1___ & ___2___.".into(),
                    kind: QuestionKind::FillBlankDrag {
                        blanks: vec![
                            BlankPair { id: "1".into(), correct_value: "sun".into() },
                            BlankPair { id: "2".into(), correct_value: "water".into() },
                        ],
                    },
                },
                QuestionRecord {
                    id: "q2".into(),
                    question_text: "Match.".into(),
                    kind: QuestionKind::Matching {
                        pairs: vec![MatchingPair { id: "1".into(), prompt: "H2O".into(), answer: "water".into() }],
                    },
                },
            ],
        )
    }

    #[test]
    fn test_render_blanks_and_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = LessonSession::new(lesson(LessonType::Practice));
        session.open_question(0, &mut rng).unwrap();
        let index = session.current().unwrap().pool().values().iter().position(|v| *v == "sun").unwrap();
        session
            .handle_move(Move::new(Location::Pool(index), Location::Slot("1".into())), &mut NoHooks, &mut rng)
            .unwrap();

        let text = render_question(&session);
        assert!(text.contains("question 1 of 2"));
        assert!(text.contains("Plants need <b>[sun]</b> &amp; [s2 ____]."));
        assert!(!text.contains("✓"));
        assert_eq!(pool_labels(session.current().unwrap()).len(), 6);
        assert!(text.contains("p1 · "));
    }

    #[test]
    fn test_render_review_marks_answers() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut answers = AnswerSheet::default();
        answers.write("q1", vec![PlacedAnswer::new("1", "water")]);
        let session = LessonSession::review(
            lesson(LessonType::Quiz),
            Submission { lesson_id: "bio".into(), answers },
            &mut rng,
        )
        .unwrap();
        let text = render_question(&session);
        assert!(text.contains("read-only"));
        assert!(text.contains("<b>[water]</b> ✗"));
        assert!(text.contains("[s2 ____]"));
        // read-only: only navigation buttons
        assert_eq!(keyboard(&session).keyboard.len(), 2);
    }

    #[test]
    fn test_render_matching() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = LessonSession::new(lesson(LessonType::Quiz));
        session.open_question(1, &mut rng).unwrap();
        let text = render_question(&session);
        assert!(text.contains("s1. H2O → [s1 ____]"));
        assert!(text.contains("Pool: p1 · water"));
        // pool row, navigation, submit, menu
        assert_eq!(keyboard(&session).keyboard.len(), 4);
    }

    #[test]
    fn test_describe_outcome() {
        assert_eq!(describe_outcome(&MoveOutcome::Reordered), None);
        assert!(describe_outcome(&MoveOutcome::Rejected(RejectReason::SlotOccupied)).is_some());
        assert_eq!(describe_outcome(&MoveOutcome::Cancelled), Some("Nothing moved."));
    }

    #[test]
    fn test_chat_cues() {
        let mut cues = ChatCues::default();
        cues.sound_cue(SoundCue::Correct);
        cues.advance_question(2);
        assert_eq!(
            cues.into_notes(),
            vec!["✅ Correct!".to_string(), "Question 2 unlocked, /next to continue.".to_string()]
        );
    }
}
