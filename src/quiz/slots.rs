use serde::{Deserialize, Serialize};

use crate::quiz::pool::PoolItem;
use crate::quiz::record::AnswerKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedAnswer {
    pub slot_id: String,
    pub value: String,
}

impl PlacedAnswer {
    pub fn new(slot_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            value: value.into(),
        }
    }
}

/// What a slot currently holds. `token` is the pool item the value came
/// from; typed answers have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub value: String,
    pub token: Option<PoolItem>,
}

impl Placement {
    pub fn typed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token: None,
        }
    }
}

impl From<PoolItem> for Placement {
    fn from(token: PoolItem) -> Self {
        Self {
            value: token.value.clone(),
            token: Some(token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    Placed,
    /// Only in relocation mode: the slot was overwritten.
    Replaced(String),
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SlotEntry {
    slot_id: String,
    placement: Option<Placement>,
}

/// Current user answers for one displayed question, one entry per slot of
/// the answer key, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStore {
    entries: Vec<SlotEntry>,
}

impl SlotStore {
    pub fn new(key: &AnswerKey) -> Self {
        Self {
            entries: key
                .slots()
                .iter()
                .map(|slot| SlotEntry {
                    slot_id: slot.id.clone(),
                    placement: None,
                })
                .collect(),
        }
    }

    fn entry(&self, slot_id: &str) -> Option<&SlotEntry> {
        self.entries.iter().find(|e| e.slot_id == slot_id)
    }

    fn entry_mut(&mut self, slot_id: &str) -> Option<&mut SlotEntry> {
        self.entries.iter_mut().find(|e| e.slot_id == slot_id)
    }

    pub fn contains(&self, slot_id: &str) -> bool {
        self.entry(slot_id).is_some()
    }

    pub fn get(&self, slot_id: &str) -> Option<&str> {
        self.entry(slot_id)?
            .placement
            .as_ref()
            .map(|p| p.value.as_str())
    }

    pub fn is_filled(&self, slot_id: &str) -> bool {
        self.get(slot_id).is_some()
    }

    /// Puts `placement` into the slot. An occupied slot is only overwritten
    /// with `relocation`, and the displaced placement is handed back in
    /// `Ok`. A refused placement comes back in `Err` untouched.
    pub fn put(
        &mut self,
        slot_id: &str,
        placement: Placement,
        relocation: bool,
    ) -> Result<Option<Placement>, Placement> {
        let Some(entry) = self.entry_mut(slot_id) else {
            return Err(placement);
        };
        if entry.placement.is_some() && !relocation {
            return Err(placement);
        }
        Ok(entry.placement.replace(placement))
    }

    pub fn set(&mut self, slot_id: &str, value: impl Into<String>, relocation: bool) -> SetOutcome {
        match self.put(slot_id, Placement::typed(value), relocation) {
            Ok(None) => SetOutcome::Placed,
            Ok(Some(previous)) => SetOutcome::Replaced(previous.value),
            Err(_) => SetOutcome::Rejected,
        }
    }

    /// Empties the slot and returns what it held.
    pub fn clear(&mut self, slot_id: &str) -> Option<Placement> {
        self.entry_mut(slot_id)?.placement.take()
    }

    pub fn first_empty(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.placement.is_none())
            .map(|e| e.slot_id.as_str())
    }

    pub fn filled_count(&self) -> usize {
        self.entries.iter().filter(|e| e.placement.is_some()).count()
    }

    pub fn all_filled(&self) -> bool {
        self.entries.iter().all(|e| e.placement.is_some())
    }

    pub fn all_correct(&self, key: &AnswerKey) -> bool {
        key.slots()
            .iter()
            .all(|slot| self.get(&slot.id) == Some(slot.correct_value.as_str()))
    }

    /// Filled slots only, in answer-key order.
    pub fn answers(&self) -> Vec<PlacedAnswer> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.placement
                    .as_ref()
                    .map(|p| PlacedAnswer::new(e.slot_id.clone(), p.value.clone()))
            })
            .collect()
    }
}
