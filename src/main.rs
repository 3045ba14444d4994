mod commands;
mod config;
mod quiz;
mod render;

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use commands::Applied;
use config::Config;
use dotenv::dotenv;
use quiz::{
    cloze::TreebankSentences,
    error::SessionError,
    grading,
    session::{LessonSession, Submission},
    Lesson, LessonType,
};
use render::ChatCues;
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, ParseMode},
};

type LessonDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveLessonChoice,
    InLesson {
        session: LessonSession,
    },
}

type LessonStorage = std::sync::Arc<ErasedStorage<State>>;

const TREEBANK_LESSON_ID: &str = "treebank";
const TREEBANK_LESSON_TITLE: &str = "Sentences from the treebank";
const TREEBANK_MAX_BLANKS: usize = 3;

#[tokio::main]
async fn main() {
    let found_dotenv = dotenv().is_ok();
    pretty_env_logger::init();
    if !found_dotenv {
        log::warn!("No .env file found, reading settings from the environment");
    }
    log::info!("Starting gap-fill bot...");

    let config = Arc::new(Config::from_env());
    let bot = Bot::from_env();

    log::info!("Opening dialogue storage at {}", config.db_path);
    let storage: LessonStorage = SqliteStorage::open(&config.db_path, Json)
        .await
        .expect("Failed to open the dialogue storage")
        .erase();

    let lessons = Arc::new(load_lessons(&config));
    if lessons.is_empty() {
        log::error!("No lessons to offer, check {}", config.lessons_path.display());
        return;
    }
    log::info!("{} lessons ready", lessons.len());

    let lessons_for_start = lessons.clone();
    let lessons_for_choice = lessons.clone();
    let config_for_choice = config.clone();
    let lessons_for_lesson = lessons.clone();
    let config_for_lesson = config.clone();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(
                move |bot: Bot, dialogue: LessonDialogue, msg: Message| {
                    start(lessons_for_start.clone(), bot, dialogue, msg)
                },
            ))
            .branch(dptree::case![State::ReceiveLessonChoice].endpoint(
                move |bot: Bot, dialogue: LessonDialogue, msg: Message| {
                    receive_lesson_choice(
                        lessons_for_choice.clone(),
                        config_for_choice.clone(),
                        bot,
                        dialogue,
                        msg,
                    )
                },
            ))
            .branch(dptree::case![State::InLesson { session }].endpoint(
                move |bot: Bot, dialogue: LessonDialogue, session: LessonSession, msg: Message| {
                    in_lesson(
                        lessons_for_lesson.clone(),
                        config_for_lesson.clone(),
                        bot,
                        dialogue,
                        session,
                        msg,
                    )
                },
            )),
    )
    .dependencies(dptree::deps![storage])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

/// Lessons from the JSON file plus, when a treebank is configured, one
/// generated practice lesson.
fn load_lessons(config: &Config) -> Vec<Lesson> {
    let mut lessons = match Lesson::load_from_path(&config.lessons_path) {
        Ok(lessons) => lessons,
        Err(err) => {
            log::error!(
                "Failed to load lessons from {}: {}",
                config.lessons_path.display(),
                err
            );
            Vec::new()
        }
    };

    if let Some(path) = &config.treebank_path {
        match File::open(path) {
            Ok(file) => {
                let treebank = TreebankSentences::new(file);
                match treebank.generate_lesson(
                    TREEBANK_LESSON_ID,
                    TREEBANK_LESSON_TITLE,
                    config.treebank_questions,
                    TREEBANK_MAX_BLANKS,
                    &mut rand::thread_rng(),
                ) {
                    Some(lesson) => lessons.push(lesson),
                    None => log::warn!("No usable sentences in {}", path.display()),
                }
            }
            Err(err) => log::error!("Failed to open treebank {}: {}", path.display(), err),
        }
    }
    lessons
}

fn lesson_keyboard(lessons: &[Lesson]) -> KeyboardMarkup {
    KeyboardMarkup::new(
        lessons
            .iter()
            .map(|lesson| vec![KeyboardButton::new(lesson.title.clone())])
            .collect::<Vec<_>>(),
    )
}

fn submission_path(dir: &Path, chat_id: ChatId, lesson_id: &str) -> PathBuf {
    dir.join(format!("{}-{}.json", chat_id.0, lesson_id))
}

/// A quiz this chat already handed in, if any.
async fn load_submission(dir: &Path, chat_id: ChatId, lesson_id: &str) -> Option<Submission> {
    let path = submission_path(dir, chat_id, lesson_id);
    // Missing file: never submitted
    let bytes = tokio::fs::read(&path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(submission) => Some(submission),
        Err(err) => {
            log::warn!("Ignoring unreadable submission {}: {}", path.display(), err);
            None
        }
    }
}

/// Writes the submission in the background. The chat does not wait for it.
fn persist_submission(dir: PathBuf, chat_id: ChatId, submission: Submission) {
    tokio::spawn(async move {
        let path = submission_path(&dir, chat_id, &submission.lesson_id);
        let json = match serde_json::to_vec_pretty(&submission) {
            Ok(json) => json,
            Err(err) => {
                log::error!("Failed to serialize submission for {}: {}", chat_id.0, err);
                return;
            }
        };
        if let Err(err) = tokio::fs::create_dir_all(&dir).await {
            log::error!("Failed to create {}: {}", dir.display(), err);
            return;
        }
        match tokio::fs::write(&path, json).await {
            Ok(()) => log::info!("Saved submission to {}", path.display()),
            Err(err) => log::error!("Failed to save submission to {}: {}", path.display(), err),
        }
    });
}

fn open_session(lesson: Lesson, submission: Option<Submission>) -> Result<LessonSession, SessionError> {
    let mut rng = rand::thread_rng();
    match submission {
        Some(submission) => LessonSession::review(lesson, submission, &mut rng),
        None => {
            let mut session = LessonSession::new(lesson);
            session.open_question(0, &mut rng)?;
            Ok(session)
        }
    }
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &LessonSession) -> HandlerResult {
    bot.send_message(chat_id, render::render_question(session))
        .parse_mode(ParseMode::Html)
        .reply_markup(render::keyboard(session))
        .await?;
    Ok(())
}

const GREETING_TEXT: &str = "Hi! I'm a fill-in-the-blank bot. Pick a lesson to start.";
async fn start(
    lessons: Arc<Vec<Lesson>>,
    bot: Bot,
    dialogue: LessonDialogue,
    msg: Message,
) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(lesson_keyboard(&lessons))
        .await?;

    dialogue.update(State::ReceiveLessonChoice).await?;
    Ok(())
}

async fn receive_lesson_choice(
    lessons: Arc<Vec<Lesson>>,
    config: Arc<Config>,
    bot: Bot,
    dialogue: LessonDialogue,
    msg: Message,
) -> HandlerResult {
    let Some(lesson) = msg
        .text()
        .and_then(|choice| lessons.iter().find(|lesson| lesson.title == choice))
    else {
        bot.send_message(msg.chat.id, "Please pick one of the lessons")
            .reply_markup(lesson_keyboard(&lessons))
            .await?;
        return Ok(());
    };

    let submission = match lesson.lesson_type {
        LessonType::Quiz => load_submission(&config.submissions_dir, msg.chat.id, &lesson.id).await,
        LessonType::Practice => None,
    };
    if submission.is_some() {
        bot.send_message(
            msg.chat.id,
            "You already handed this quiz in. Here are your answers.",
        )
        .await?;
    }

    let session = open_session(lesson.clone(), submission)?;
    log::debug!("Chat {} opened lesson {}", msg.chat.id.0, lesson.id);
    send_question(&bot, msg.chat.id, &session).await?;

    dialogue.update(State::InLesson { session }).await?;
    Ok(())
}

async fn in_lesson(
    lessons: Arc<Vec<Lesson>>,
    config: Arc<Config>,
    bot: Bot,
    dialogue: LessonDialogue,
    mut session: LessonSession,
    msg: Message,
) -> HandlerResult {
    let Some(command) = msg.text().and_then(commands::parse) else {
        bot.send_message(msg.chat.id, render::HELP_TEXT).await?;
        return Ok(());
    };

    let mut cues = ChatCues::default();
    let applied = {
        let mut rng = rand::thread_rng();
        commands::apply(&mut session, command, &mut cues, &mut rng)
    };

    match applied {
        Ok(Applied::Menu) => {
            bot.send_message(msg.chat.id, "Pick a lesson")
                .reply_markup(lesson_keyboard(&lessons))
                .await?;
            dialogue.update(State::ReceiveLessonChoice).await?;
            return Ok(());
        }
        Ok(Applied::Help) => cues.note(render::HELP_TEXT),
        Ok(Applied::Moved(outcome)) => {
            if let Some(reason) = render::describe_outcome(&outcome) {
                cues.note(reason);
            }
        }
        Ok(Applied::Navigated) => {}
        Ok(Applied::Submitted(submission)) => {
            let report = grading::grade(session.lesson(), &submission);
            log::info!(
                "Chat {} scored {}/{} on {}",
                msg.chat.id.0,
                report.score(),
                report.total(),
                submission.lesson_id
            );
            cues.note(render::render_grade(&report));
            persist_submission(config.submissions_dir.clone(), msg.chat.id, submission);
        }
        Err(err) => cues.note(err.to_string()),
    }

    for note in cues.into_notes() {
        bot.send_message(msg.chat.id, note).await?;
    }
    send_question(&bot, msg.chat.id, &session).await?;

    dialogue.update(State::InLesson { session }).await?;
    Ok(())
}
