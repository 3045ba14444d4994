use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "db.sqlite";
const DEFAULT_LESSONS_PATH: &str = "lessons.json";
const DEFAULT_SUBMISSIONS_DIR: &str = "submissions";
const DEFAULT_TREEBANK_QUESTIONS: usize = 5;

/// Settings read from the environment (after `.env` has been loaded).
/// The bot token itself is read by teloxide from `TELOXIDE_TOKEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    pub lessons_path: PathBuf,
    pub treebank_path: Option<PathBuf>,
    pub treebank_questions: usize,
    pub submissions_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let treebank_questions = match lookup("GAPFILL_TREEBANK_QUESTIONS") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!(
                    "GAPFILL_TREEBANK_QUESTIONS={} is not a number, using {}",
                    raw,
                    DEFAULT_TREEBANK_QUESTIONS
                );
                DEFAULT_TREEBANK_QUESTIONS
            }),
            None => DEFAULT_TREEBANK_QUESTIONS,
        };
        Self {
            db_path: lookup("GAPFILL_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            lessons_path: lookup("GAPFILL_LESSONS_PATH")
                .unwrap_or_else(|| DEFAULT_LESSONS_PATH.to_string())
                .into(),
            treebank_path: lookup("GAPFILL_TREEBANK_PATH").map(PathBuf::from),
            treebank_questions,
            submissions_dir: lookup("GAPFILL_SUBMISSIONS_DIR")
                .unwrap_or_else(|| DEFAULT_SUBMISSIONS_DIR.to_string())
                .into(),
        }
    }
}
