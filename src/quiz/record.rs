//! Question records as they come out of a lesson file, and the answer key
//! derived from them.

use serde::{Deserialize, Serialize};

/// Blanks are written into question text as `___N___`.
const MARKER: &str = "___";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    FillBlankDrag { blanks: Vec<BlankPair> },
    FillBlankTyped { blanks: Vec<BlankPair> },
    Matching { pairs: Vec<MatchingPair> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankPair {
    pub id: String,
    pub correct_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub id: String,
    pub prompt: String,
    pub answer: String,
}

/// Which interaction a question uses. Carried around instead of the full
/// record once the answer key has been built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionVariant {
    DragBlanks,
    TypedBlanks,
    Matching,
}

impl QuestionVariant {
    /// Typed questions have nothing to drag, so they never get a pool.
    pub fn uses_pool(&self) -> bool {
        !matches!(self, QuestionVariant::TypedBlanks)
    }
}

impl QuestionRecord {
    pub fn variant(&self) -> QuestionVariant {
        match self.kind {
            QuestionKind::FillBlankDrag { .. } => QuestionVariant::DragBlanks,
            QuestionKind::FillBlankTyped { .. } => QuestionVariant::TypedBlanks,
            QuestionKind::Matching { .. } => QuestionVariant::Matching,
        }
    }

    /// Blank markers in the text that have no entry in the answer list.
    /// They render as empty blanks that can never be filled.
    pub fn unresolved_markers(&self) -> Vec<String> {
        let key = AnswerKey::load(self);
        blank_markers(&self.question_text)
            .into_iter()
            .filter(|id| key.get(id).is_none())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    /// Left-hand side of a matching pair; `None` for blanks.
    pub prompt: Option<String>,
    pub correct_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerKey {
    slots: Vec<Slot>,
}

impl AnswerKey {
    pub fn load(record: &QuestionRecord) -> Self {
        let slots = match &record.kind {
            QuestionKind::FillBlankDrag { blanks } | QuestionKind::FillBlankTyped { blanks } => blanks
                .iter()
                .map(|blank| Slot {
                    id: blank.id.clone(),
                    prompt: None,
                    correct_value: blank.correct_value.clone(),
                })
                .collect(),
            QuestionKind::Matching { pairs } => pairs
                .iter()
                .map(|pair| Slot {
                    id: pair.id.clone(),
                    prompt: Some(pair.prompt.clone()),
                    correct_value: pair.answer.clone(),
                })
                .collect(),
        };
        Self { slots }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Exact comparison, no trimming and no case folding.
    pub fn is_correct(&self, slot_id: &str, value: &str) -> bool {
        self.get(slot_id).map_or(false, |s| s.correct_value == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Blank(&'a str),
}

/// Splits question text into literal text and blank markers, in order.
/// Runs of underscores that are not a well-formed `___N___` stay text.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(MARKER) {
        let after = &rest[start + MARKER.len()..];
        let digits = after.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 && after[digits..].starts_with(MARKER) {
            if start > 0 {
                out.push(Segment::Text(&rest[..start]));
            }
            out.push(Segment::Blank(&after[..digits]));
            rest = &after[digits + MARKER.len()..];
        } else {
            out.push(Segment::Text(&rest[..start + MARKER.len()]));
            rest = after;
        }
    }
    if !rest.is_empty() {
        out.push(Segment::Text(rest));
    }
    out
}

pub fn blank_markers(text: &str) -> Vec<&str> {
    segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Blank(id) => Some(id),
            Segment::Text(_) => None,
        })
        .collect()
}

pub fn blank_marker(id: &str) -> String {
    format!("{MARKER}{id}{MARKER}")
}
