//! Fill-in-the-blank questions cut out of treebank sentences.

use std::fs::File;

use rand::seq::SliceRandom;
use rand::Rng;
use rs_conllu::{Sentence, UPOS};

use crate::quiz::record::{blank_marker, BlankPair, QuestionKind, QuestionRecord};
use crate::quiz::{Lesson, LessonType};

pub struct TreebankSentences {
    sentences: Vec<Sentence>,
}

impl TreebankSentences {
    pub fn new(file: File) -> Self {
        let sentences: Vec<Sentence> = rs_conllu::parse_file(file)
            .filter_map(|sentence| sentence.ok())
            .collect();
        log::info!("Loaded {} treebank sentences", sentences.len());
        Self { sentences }
    }

    pub fn get_random_sentence<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Sentence> {
        self.sentences.choose(rng)
    }

    /// A practice lesson of `amount` questions. Sentences without content
    /// words are skipped, so the lesson can come out shorter.
    pub fn generate_lesson<R: Rng + ?Sized>(
        &self,
        id: &str,
        title: &str,
        amount: usize,
        max_blanks: usize,
        rng: &mut R,
    ) -> Option<Lesson> {
        let questions: Vec<QuestionRecord> = (0..amount)
            .filter_map(|n| {
                let sentence = self.get_random_sentence(rng)?;
                generate_question(sentence, format!("{id}-{}", n + 1), max_blanks, rng)
            })
            .collect();
        if questions.is_empty() {
            return None;
        }
        Some(Lesson::new(
            id.to_string(),
            title.to_string(),
            LessonType::Practice,
            questions,
        ))
    }
}

fn is_content_word(upos: &Option<UPOS>, form: &str) -> bool {
    matches!(
        upos,
        Some(UPOS::NOUN) | Some(UPOS::VERB) | Some(UPOS::ADJ) | Some(UPOS::ADV)
    ) && form.chars().any(char::is_alphanumeric)
}

/// Blanks out up to `max_blanks` content words of the sentence, numbered in
/// reading order.
pub fn generate_question<R: Rng + ?Sized>(
    sentence: &Sentence,
    id: String,
    max_blanks: usize,
    rng: &mut R,
) -> Option<QuestionRecord> {
    let candidates: Vec<usize> = sentence
        .tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| is_content_word(&token.upos, &token.form))
        .map(|(i, _)| i)
        .collect();
    if candidates.is_empty() || max_blanks == 0 {
        return None;
    }

    let mut chosen: Vec<usize> = candidates.choose_multiple(rng, max_blanks).copied().collect();
    chosen.sort_unstable();

    let mut text = String::new();
    let mut blanks = Vec::new();
    for (i, token) in sentence.tokens.iter().enumerate() {
        // Punctuation sticks to the previous word
        if !text.is_empty() && token.upos != Some(UPOS::PUNCT) {
            text.push(' ');
        }
        if chosen.contains(&i) {
            let blank_id = (blanks.len() + 1).to_string();
            text.push_str(&blank_marker(&blank_id));
            blanks.push(BlankPair {
                id: blank_id,
                correct_value: token.form.clone(),
            });
        } else {
            text.push_str(&token.form);
        }
    }

    Some(QuestionRecord {
        id,
        question_text: text,
        kind: QuestionKind::FillBlankDrag { blanks },
    })
}
