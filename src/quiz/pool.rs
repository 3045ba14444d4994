use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::quiz::record::Slot;

/// Decoys mixed into the pool so the correct answers can't be read off the
/// pool itself.
pub const DISTRACTOR_WORDS: &[&str] = &[
    "apple", "river", "mountain", "cloud", "energy", "oxygen", "carbon", "planet", "forest",
    "ocean", "stone", "light", "shadow", "protein", "nitrogen", "salt", "engine", "crystal",
    "seed", "storm", "metal", "sugar", "magnet", "desert", "island", "volcano", "fossil",
    "battery", "gravity", "pressure", "molecule", "atom", "season", "harvest", "signal",
    "bridge", "market", "window", "feather", "thunder",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolItem {
    pub id: String,
    pub value: String,
    /// Slot this token is the correct answer for; `None` for decoys.
    pub origin_slot_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractorPool {
    items: Vec<PoolItem>,
}

impl DistractorPool {
    /// Draws `distractor_count` distinct words that are not a correct value.
    pub fn sample_decoys<R: Rng + ?Sized>(
        slots: &[Slot],
        distractor_count: usize,
        words: &[&str],
        rng: &mut R,
    ) -> Vec<String> {
        // A decoy equal to a correct value would make two tokens
        // indistinguishable, so those words are never drawn
        let mut candidates: Vec<&str> = words
            .iter()
            .copied()
            .filter(|word| !slots.iter().any(|slot| slot.correct_value == *word))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        if candidates.len() < distractor_count {
            log::warn!(
                "Only {} distractor words available, {} requested",
                candidates.len(),
                distractor_count
            );
        }
        candidates
            .choose_multiple(rng, distractor_count)
            .map(|word| word.to_string())
            .collect()
    }

    /// One token per correct value plus one per decoy, shuffled.
    pub fn from_decoys<R: Rng + ?Sized>(slots: &[Slot], decoys: &[String], rng: &mut R) -> Self {
        let correct = slots.iter().map(|slot| PoolItem {
            id: format!("slot-{}", slot.id),
            value: slot.correct_value.clone(),
            origin_slot_id: Some(slot.id.clone()),
        });
        let distractors = decoys.iter().enumerate().map(|(i, word)| PoolItem {
            id: format!("decoy-{i}"),
            value: word.clone(),
            origin_slot_id: None,
        });

        let mut items: Vec<PoolItem> = correct.chain(distractors).collect();
        // We shuffle so the correct tokens don't come first
        items.shuffle(rng);

        log::debug!("Initialized pool with {} items", items.len());
        Self { items }
    }

    pub fn items(&self) -> &[PoolItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PoolItem> {
        self.items.get(index)
    }

    pub fn remove(&mut self, item_id: &str) -> Option<PoolItem> {
        let index = self.items.iter().position(|item| item.id == item_id)?;
        Some(self.items.remove(index))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<PoolItem> {
        if index >= self.items.len() {
            return None;
        }
        Some(self.items.remove(index))
    }

    /// Inserts at `index`, or at the end when `index` is past it.
    pub fn insert(&mut self, item: PoolItem, index: usize) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Moves the item at `from` to `to`. Membership never changes.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        match self.remove_at(from) {
            Some(item) => {
                self.insert(item, to);
                true
            }
            None => false,
        }
    }

    /// Pulls the first token carrying `value`, preferring the token that
    /// belongs to `slot_id`. Used when answers are restored into slots.
    pub fn take_value(&mut self, value: &str, slot_id: &str) -> Option<PoolItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.value == value && item.origin_slot_id.as_deref() == Some(slot_id))
            .or_else(|| self.items.iter().position(|item| item.value == value))?;
        Some(self.items.remove(index))
    }

    pub fn values(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.value.as_str()).collect()
    }
}
