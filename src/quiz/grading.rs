use serde::{Deserialize, Serialize};

use crate::quiz::record::AnswerKey;
use crate::quiz::session::Submission;
use crate::quiz::Lesson;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionGrade {
    pub question_id: String,
    pub correct: bool,
    pub correct_slots: usize,
    pub total_slots: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeReport {
    pub grades: Vec<QuestionGrade>,
}

impl GradeReport {
    pub fn score(&self) -> usize {
        self.grades.iter().filter(|g| g.correct).count()
    }

    pub fn total(&self) -> usize {
        self.grades.len()
    }
}

/// A question counts only when every slot holds exactly its correct value.
pub fn grade(lesson: &Lesson, submission: &Submission) -> GradeReport {
    if lesson.id != submission.lesson_id {
        log::warn!(
            "Grading submission for {} against lesson {}",
            submission.lesson_id,
            lesson.id
        );
    }

    let grades = lesson
        .questions
        .iter()
        .map(|record| {
            let key = AnswerKey::load(record);
            let answers = submission.answers.get(&record.id);
            let correct_slots = key
                .slots()
                .iter()
                .filter(|slot| {
                    answers
                        .iter()
                        .any(|a| a.slot_id == slot.id && a.value == slot.correct_value)
                })
                .count();
            QuestionGrade {
                question_id: record.id.clone(),
                correct: correct_slots == key.len(),
                correct_slots,
                total_slots: key.len(),
            }
        })
        .collect();

    GradeReport { grades }
}
