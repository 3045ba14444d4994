use thiserror::Error;

#[derive(Debug, Error)]
pub enum LessonError {
    #[error("failed to read lesson file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse lesson file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("lesson '{0}' has no questions")]
    Empty(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("question {index} does not exist (lesson has {total})")]
    NoSuchQuestion { index: usize, total: usize },
    #[error("question {0} is not unlocked yet")]
    Locked(usize),
    #[error("the current question must be answered before moving on")]
    Unanswered,
    #[error("only quiz lessons can be submitted")]
    NotAQuiz,
    #[error("the lesson has already been submitted")]
    AlreadySubmitted,
    #[error("no question is open")]
    NoQuestionOpen,
}
