use std::fs;
use std::path::Path;

use grammaticus::corpus::library::TextLibrary;
use grammaticus::corpus::{Category, Corpus};
use grammaticus::engine::scoring::{self, Completion};
use grammaticus::session::progress::Grade;
use grammaticus::session::{Session, SessionEvent};
use grammaticus::store::json_store::JsonStore;
use tempfile::TempDir;

const STORY: &str = r#"[
    {"word": "Puella", "pos": "Noun"},
    {"word": "bona", "pos": ["Adjective"], "feedback": {"Noun": "<i>bona</i> describes puella."}},
    {"word": "vocata", "pos": "Verb", "compositeVerb": 1},
    {"word": "est", "pos": "Verb", "compositeVerb": 1},
    {"word": ".", "pos": "Punctuation"},
    {"type": "break"},
    {"word": "Nauta", "pos": "Noun"},
    {"word": "saepe", "pos": "Adverb"},
    {"word": "cantat", "pos": "Verb"},
    {"word": "."}
]"#;

fn open(dir: &Path, category: Category) -> Session {
    let store = JsonStore::with_base_dir(dir.to_path_buf()).unwrap();
    let corpus = Corpus::from_json(STORY).unwrap();
    let mut session = Session::new("story", corpus, Box::new(store), category);
    session.drain_events();
    session
}

fn progress_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.join("progress"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_progress_survives_restart() {
    let dir = TempDir::new().unwrap();

    {
        let mut session = open(dir.path(), Category::Noun);
        assert!(session.toggle_selection(0));
        assert!(session.toggle_selection(1));
        assert!(session.submit_for_grading());

        let feedback: Vec<_> = session
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::FeedbackRevealed { index, message } => Some((index, message)),
                _ => None,
            })
            .collect();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].0, 1);
    }

    let session = open(dir.path(), Category::Noun);
    let progress = session.active_progress();
    assert_eq!(progress.attempts, 1);
    assert!(progress.is_graded);
    assert_eq!(progress.token_statuses[0].status, Grade::Correct);
    assert_eq!(progress.token_statuses[1].status, Grade::Incorrect);
    assert!(progress.token_statuses[1].feedback_shown);
    assert_eq!(progress.total_possible, 2);
}

#[test]
fn test_full_round_through_every_category() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path(), Category::Noun);

    for i in [0, 6] {
        session.toggle_selection(i);
    }
    session.submit_for_grading();
    assert!(session.active_progress().is_complete);
    session.drain_events();

    session.switch_category(Category::Verb);
    // One click selects the whole composite verb.
    session.toggle_selection(3);
    session.toggle_selection(8);
    session.submit_for_grading();
    assert!(session.active_progress().is_complete);
    let done = session
        .drain_events()
        .into_iter()
        .find_map(|e| match e {
            SessionEvent::CompletionReached(summary) => Some(summary),
            _ => None,
        })
        .unwrap();
    assert_eq!(done.category, Category::Verb);
    assert_eq!(done.completion, Completion::Excellent);

    session.switch_category(Category::Adjective);
    assert!(!session.active_progress().is_complete);
    // Adjective has not been touched, so only two records exist.
    assert_eq!(progress_files(dir.path()).len(), 2);

    let reopened = open(dir.path(), Category::Adjective);
    assert!(reopened.progress(Category::Noun).is_complete);
    assert!(reopened.progress(Category::Verb).is_complete);
}

#[test]
fn test_reset_all_clears_every_text() {
    let dir = TempDir::new().unwrap();
    let mut session = open(dir.path(), Category::Noun);
    session.toggle_selection(0);
    session.submit_for_grading();
    assert!(!progress_files(dir.path()).is_empty());

    session.reset_all().unwrap();
    assert!(session.counters().is_none());

    let reopened = open(dir.path(), Category::Noun);
    assert_eq!(reopened.active_progress().attempts, 0);
    assert!(
        reopened
            .active_progress()
            .token_statuses
            .iter()
            .all(|s| !s.selected)
    );
}

#[test]
fn test_corrupt_file_falls_back_to_fresh_progress() {
    let dir = TempDir::new().unwrap();
    {
        let mut session = open(dir.path(), Category::Noun);
        session.toggle_selection(0);
        session.submit_for_grading();
    }
    for name in progress_files(dir.path()) {
        fs::write(dir.path().join("progress").join(name), "{ not json").unwrap();
    }

    let session = open(dir.path(), Category::Noun);
    assert_eq!(session.active_progress().attempts, 0);
    assert_eq!(session.active_progress().total_possible, 2);
}

#[test]
fn test_bundled_texts_have_something_to_find() {
    let library = TextLibrary::new(None);
    for id in library.available_texts() {
        let text = library.load(Some(&id)).unwrap();
        for category in Category::ALL {
            assert!(
                scoring::compute_total_possible(&text.corpus, category) > 0,
                "{id} has no {category}s"
            );
        }
    }
}
