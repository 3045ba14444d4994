pub mod cloze;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod grading;
pub mod pool;
pub mod record;
pub mod session;
pub mod slots;

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use error::LessonError;
use record::QuestionRecord;

/// Decoys per drag question in self-paced practice.
pub const PRACTICE_DISTRACTORS: usize = 5;
/// Decoys per drag question in a graded quiz.
pub const QUIZ_DISTRACTORS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Practice,
    Quiz,
}

impl LessonType {
    pub fn distractor_count(&self) -> usize {
        match self {
            LessonType::Practice => PRACTICE_DISTRACTORS,
            LessonType::Quiz => QUIZ_DISTRACTORS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub lesson_type: LessonType,
    pub questions: Vec<QuestionRecord>,
}

impl Lesson {
    pub fn new(id: String, title: String, lesson_type: LessonType, questions: Vec<QuestionRecord>) -> Self {
        Self {
            id,
            title,
            lesson_type,
            questions,
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Vec<Lesson>, LessonError> {
        Self::load_all(File::open(path)?)
    }

    /// Reads a JSON array of lessons.
    pub fn load_all(file: File) -> Result<Vec<Lesson>, LessonError> {
        let lessons: Vec<Lesson> = serde_json::from_reader(file)?;
        for lesson in &lessons {
            if lesson.questions.is_empty() {
                return Err(LessonError::Empty(lesson.id.clone()));
            }
            for question in &lesson.questions {
                let unresolved = question.unresolved_markers();
                if !unresolved.is_empty() {
                    log::warn!(
                        "Lesson {} question {} has blanks without answers: {:?}",
                        lesson.id,
                        question.id,
                        unresolved
                    );
                }
            }
        }
        Ok(lessons)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom, Write};

    fn lessons_file(contents: &str) -> File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file
    }

    #[test]
    fn test_distractor_policy() {
        assert_eq!(LessonType::Practice.distractor_count(), 5);
        assert_eq!(LessonType::Quiz.distractor_count(), 15);
    }

    #[test]
    fn test_load_all() {
        let file = lessons_file(
            r#"[{
                "id": "bio-1",
                "title": "Photosynthesis",
                "lesson_type": "practice",
                "questions": [{
                    "id": "q1",
                    "question_text": "Plants need ___1___.",
                    "type": "fill_blank_drag",
                    "blanks": [{ "id": "1", "correct_value": "sun" }]
                }]
            }]"#,
        );
        let lessons = Lesson::load_all(file).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].lesson_type, LessonType::Practice);
        assert_eq!(lessons[0].len(), 1);
    }

    #[test]
    fn test_load_all_rejects_empty_lesson() {
        let file = lessons_file(r#"[{ "id": "x", "title": "X", "lesson_type": "quiz", "questions": [] }]"#);
        assert!(matches!(Lesson::load_all(file), Err(LessonError::Empty(id)) if id == "x"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.json");
        assert!(matches!(Lesson::load_from_path(&path), Err(LessonError::Io(_))));
    }
}
