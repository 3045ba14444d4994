//! Chat text to lesson commands.
//!
//! Pool items are `p1`, `p2`, ... (1-based, as rendered), slots are `s`
//! followed by the slot id. `p3 s1` drags, `p3` alone drops into the first
//! empty slot, `s1` alone sends the slot back to the end of the pool.
//! Typed blanks use `1=answer`.

use rand::Rng;

use crate::quiz::engine::{Location, Move, MoveOutcome};
use crate::quiz::error::SessionError;
use crate::quiz::evaluator::LessonHooks;
use crate::quiz::session::{LessonSession, Submission};

/// Everything after this on a keyboard button is just a label.
pub const LABEL_SEPARATOR: &str = "·";

/// Pool index meaning "after the last item".
const POOL_END: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonCommand {
    Move(Move),
    PlaceFirstEmpty(usize),
    Type { slot_id: String, text: String },
    Next,
    Prev,
    GoTo(usize),
    Submit,
    Menu,
    Help,
}

fn parse_location(token: &str) -> Option<Location> {
    if let Some(rest) = token.strip_prefix('p') {
        if rest.is_empty() {
            return Some(Location::Pool(POOL_END));
        }
        let n: usize = rest.parse().ok()?;
        return n.checked_sub(1).map(Location::Pool);
    }
    let slot = token.strip_prefix('s')?;
    if slot.is_empty() {
        return None;
    }
    Some(Location::Slot(slot.to_string()))
}

fn parse_slash_command(command: &str) -> Option<LessonCommand> {
    let mut parts = command.split_whitespace();
    // Group chats append the bot name: /next@some_bot
    let name = parts.next()?.split('@').next()?;
    let command = match name {
        "next" => LessonCommand::Next,
        "prev" => LessonCommand::Prev,
        "submit" => LessonCommand::Submit,
        "menu" | "start" => LessonCommand::Menu,
        "help" => LessonCommand::Help,
        "go" => {
            let n: usize = parts.next()?.parse().ok()?;
            LessonCommand::GoTo(n.checked_sub(1)?)
        }
        _ => return None,
    };
    Some(command)
}

pub fn parse(text: &str) -> Option<LessonCommand> {
    let trimmed = text.trim_start();
    if let Some(command) = trimmed.strip_prefix('/') {
        return parse_slash_command(command);
    }

    // Only a bare slot id may come before `=`, so pool button labels such
    // as `p2 · E=mc2` still parse as moves. The typed value is kept exactly
    // as sent.
    if let Some((slot, value)) = trimmed.split_once('=') {
        let slot = slot.trim();
        if !slot.contains(char::is_whitespace) && !slot.contains(LABEL_SEPARATOR) {
            let slot = slot.strip_prefix('s').unwrap_or(slot);
            if slot.is_empty() {
                return None;
            }
            return Some(LessonCommand::Type {
                slot_id: slot.to_string(),
                text: value.to_string(),
            });
        }
    }

    let command = trimmed.split(LABEL_SEPARATOR).next()?;
    let mut tokens = command.split_whitespace();
    let source = parse_location(tokens.next()?)?;
    let Some(second) = tokens.next() else {
        return match source {
            Location::Pool(POOL_END) => None,
            Location::Pool(index) => Some(LessonCommand::PlaceFirstEmpty(index)),
            Location::Slot(slot_id) => Some(LessonCommand::Move(Move::new(
                Location::Slot(slot_id),
                Location::Pool(POOL_END),
            ))),
        };
    };
    let destination = parse_location(second)?;
    if tokens.next().is_some() {
        return None;
    }
    Some(LessonCommand::Move(Move::new(source, destination)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Moved(MoveOutcome),
    Navigated,
    Submitted(Submission),
    Menu,
    Help,
}

pub fn apply<R: Rng + ?Sized>(
    session: &mut LessonSession,
    command: LessonCommand,
    hooks: &mut dyn LessonHooks,
    rng: &mut R,
) -> Result<Applied, SessionError> {
    match command {
        LessonCommand::Move(mv) => session.handle_move(mv, hooks, rng).map(Applied::Moved),
        LessonCommand::PlaceFirstEmpty(index) => {
            let first_empty = session
                .current()
                .and_then(|state| state.store().first_empty())
                .map(str::to_string);
            let mv = match first_empty {
                Some(slot_id) => Move::new(Location::Pool(index), Location::Slot(slot_id)),
                None => Move::cancelled(Location::Pool(index)),
            };
            session.handle_move(mv, hooks, rng).map(Applied::Moved)
        }
        LessonCommand::Type { slot_id, text } => session
            .type_answer(&slot_id, &text, hooks, rng)
            .map(Applied::Moved),
        LessonCommand::Next => session.next(rng).map(|_| Applied::Navigated),
        LessonCommand::Prev => session.prev(rng).map(|_| Applied::Navigated),
        LessonCommand::GoTo(index) => session.go_to(index, rng).map(|_| Applied::Navigated),
        LessonCommand::Submit => session.submit(rng).map(Applied::Submitted),
        LessonCommand::Menu => Ok(Applied::Menu),
        LessonCommand::Help => Ok(Applied::Help),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::evaluator::NoHooks;
    use crate::quiz::record::{BlankPair, QuestionKind, QuestionRecord};
    use crate::quiz::{Lesson, LessonType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mv(source: Location, destination: Location) -> Option<LessonCommand> {
        Some(LessonCommand::Move(Move::new(source, destination)))
    }

    #[test]
    fn test_parse_moves() {
        assert_eq!(parse("p3 s1"), mv(Location::Pool(2), Location::Slot("1".into())));
        assert_eq!(parse("s1 p1"), mv(Location::Slot("1".into()), Location::Pool(0)));
        assert_eq!(parse("s1 p"), mv(Location::Slot("1".into()), Location::Pool(POOL_END)));
        assert_eq!(parse("s1"), mv(Location::Slot("1".into()), Location::Pool(POOL_END)));
        assert_eq!(parse("s1 s2"), mv(Location::Slot("1".into()), Location::Slot("2".into())));
        assert_eq!(parse("p4 p1"), mv(Location::Pool(3), Location::Pool(0)));
        assert_eq!(parse("p2"), Some(LessonCommand::PlaceFirstEmpty(1)));
        assert_eq!(parse("p2 · glucose"), Some(LessonCommand::PlaceFirstEmpty(1)));
        assert_eq!(parse("p2 · E=mc2"), Some(LessonCommand::PlaceFirstEmpty(1)));
        assert_eq!(parse("p2 s1 · E=mc2"), mv(Location::Pool(1), Location::Slot("1".into())));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("p0 s1"), None);
        assert_eq!(parse("p"), None);
        assert_eq!(parse("p1 s1 s2"), None);
        assert_eq!(parse("/dance"), None);
        assert_eq!(parse("=x"), None);
    }

    #[test]
    fn test_parse_typed_keeps_value() {
        assert_eq!(
            parse("1= Paris "),
            Some(LessonCommand::Type { slot_id: "1".into(), text: " Paris ".into() })
        );
        assert_eq!(parse("s2="), Some(LessonCommand::Type { slot_id: "2".into(), text: String::new() }));
    }

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(parse("/next"), Some(LessonCommand::Next));
        assert_eq!(parse("/next@gapfill_bot"), Some(LessonCommand::Next));
        assert_eq!(parse("/go 3"), Some(LessonCommand::GoTo(2)));
        assert_eq!(parse("/go 0"), None);
        assert_eq!(parse("/submit"), Some(LessonCommand::Submit));
        assert_eq!(parse("/start"), Some(LessonCommand::Menu));
    }

    #[test]
    fn test_place_first_empty() {
        let lesson = Lesson::new(
            "l".into(),
            "L".into(),
            LessonType::Practice,
            vec![QuestionRecord {
                id: "q".into(),
                question_text: "___1___ ___2___".into(),
                kind: QuestionKind::FillBlankDrag {
                    blanks: vec![
                        BlankPair { id: "1".into(), correct_value: "a".into() },
                        BlankPair { id: "2".into(), correct_value: "b".into() },
                    ],
                },
            }],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = LessonSession::new(lesson);
        session.open_question(0, &mut rng).unwrap();

        let applied = apply(&mut session, LessonCommand::PlaceFirstEmpty(0), &mut NoHooks, &mut rng).unwrap();
        assert!(matches!(applied, Applied::Moved(MoveOutcome::Placed { ref slot_id, .. }) if slot_id == "1"));
        apply(&mut session, LessonCommand::PlaceFirstEmpty(0), &mut NoHooks, &mut rng).unwrap();
        let applied = apply(&mut session, LessonCommand::PlaceFirstEmpty(0), &mut NoHooks, &mut rng).unwrap();
        assert_eq!(applied, Applied::Moved(MoveOutcome::Cancelled));
    }
}
