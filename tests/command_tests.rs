use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use taskcal::auth::{is_valid_username, Authenticator, UserDirectory};
use taskcal::commands::*;
use taskcal::error::AuthError;
use taskcal::models::{DayKey, Priority};
use taskcal::session::Session;
use taskcal::storage::{JsonDirStore, Persistence};
use tempfile::tempdir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn date(s: &str) -> NaiveDate {
    parse_date(s, today()).unwrap()
}

fn with_test_session<F>(f: F)
where
    F: FnOnce(&mut Session<JsonDirStore>, &Path),
{
    let dir = tempdir().unwrap();
    let mut session = Session::boot("tester", JsonDirStore::new(dir.path()), today());
    f(&mut session, dir.path());
}

#[test]
fn test_add_and_list() {
    with_test_session(|session, dir| {
        let id = cmd_add(session, date("2025-12-01"), "Test Task", Priority::High, Some("09:30".into()), false, true)
            .unwrap();

        let key = DayKey::new(2025, 11, 1);
        let tasks = session.day_tasks(key);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].text, "Test Task");
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[0].time.as_deref(), Some("09:30"));

        let stored = JsonDirStore::new(dir).load("tester");
        assert_eq!(stored.task_count(), 1);
    });
}

#[test]
fn test_add_rejects_blank_text_and_bad_time() {
    with_test_session(|session, _| {
        assert!(cmd_add(session, today(), "   ", Priority::Medium, None, false, true).is_none());
        assert!(cmd_add(session, today(), "Lunch", Priority::Medium, Some("25:00".into()), false, true).is_none());
        assert!(session.store().is_empty());
    });
}

#[test]
fn test_add_trims_text() {
    with_test_session(|session, _| {
        cmd_add(session, today(), "  Buy milk  ", Priority::Low, None, false, true).unwrap();
        assert_eq!(session.day_tasks(DayKey::from_date(today()))[0].text, "Buy milk");
    });
}

#[test]
fn test_complete_task_by_prefix() {
    with_test_session(|session, _| {
        let id = cmd_add(session, today(), "Task to complete", Priority::Medium, None, false, true).unwrap();
        let key = DayKey::from_date(today());

        assert!(cmd_set_done(session, today(), short_id(&id), true, true));
        assert!(session.store().find(key, &id).unwrap().completed);

        assert!(cmd_set_done(session, today(), &id, false, true));
        assert!(!session.store().find(key, &id).unwrap().completed);
    });
}

#[test]
fn test_commands_need_the_right_day() {
    with_test_session(|session, _| {
        let id = cmd_add(session, today(), "Pinned", Priority::Medium, None, false, true).unwrap();
        let tomorrow = date("2025-06-02");

        assert!(!cmd_set_done(session, tomorrow, &id, true, true));
        assert!(!cmd_remove(session, tomorrow, &id, true));
        assert!(!cmd_remove(session, today(), "", true));
        assert_eq!(session.store().len(), 1);
    });
}

#[test]
fn test_remove_task() {
    with_test_session(|session, _| {
        let id = cmd_add(session, today(), "Task to remove", Priority::Medium, None, false, true).unwrap();

        assert!(cmd_remove(session, today(), &id, true));
        assert!(session.store().is_empty());
        assert!(!cmd_remove(session, today(), &id, true));
    });
}

#[test]
fn test_edit_task() {
    with_test_session(|session, _| {
        let id = cmd_add(session, today(), "Original", Priority::Low, Some("08:00".into()), false, true).unwrap();
        let key = DayKey::from_date(today());

        assert!(cmd_edit(
            session,
            today(),
            &id,
            Some("Updated".into()),
            Some(Priority::High),
            None,
            true,
            Some(true),
            true
        ));

        let task = session.store().find(key, &id).unwrap();
        assert_eq!(task.text, "Updated");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.time, None);
        assert!(task.recurring);
    });
}

#[test]
fn test_edit_rejects_empty_changes() {
    with_test_session(|session, _| {
        let id = cmd_add(session, today(), "Keep", Priority::Low, None, false, true).unwrap();

        assert!(!cmd_edit(session, today(), &id, None, None, None, false, None, true));
        assert!(!cmd_edit(session, today(), &id, Some(" ".into()), None, None, false, None, true));
        assert!(!cmd_edit(session, today(), &id, None, None, Some("noon".into()), false, None, true));
        assert_eq!(session.day_tasks(DayKey::from_date(today()))[0].text, "Keep");
    });
}

#[test]
fn test_move_task() {
    with_test_session(|session, _| {
        let id = cmd_add(session, today(), "Dentist", Priority::High, None, false, true).unwrap();
        let to = date("2025-06-20");

        assert!(cmd_move(session, today(), &id, to, true));
        assert!(session.day_tasks(DayKey::from_date(today())).is_empty());
        assert_eq!(session.day_tasks(DayKey::from_date(to))[0].id, id);
    });
}

#[test]
fn test_export_and_import() {
    with_test_session(|session, dir| {
        let id = cmd_add(session, today(), "Backed up", Priority::Medium, None, true, true).unwrap();
        let path = cmd_export(session, &dir.join("backups"), true).unwrap();
        assert!(path.ends_with("tester_calendar.json"));

        assert!(cmd_remove(session, today(), &id, true));
        assert!(session.store().is_empty());

        assert!(cmd_import(session, &path, true));
        let restored = session.store().find(DayKey::from_date(today()), &id).unwrap();
        assert_eq!(restored.text, "Backed up");
        assert!(restored.recurring);
    });
}

#[test]
fn test_import_rejects_invalid_backup() {
    with_test_session(|session, dir| {
        cmd_add(session, today(), "Survivor", Priority::Medium, None, false, true).unwrap();
        let bad = dir.join("bad.json");
        fs::write(&bad, r#"{"foo": 1}"#).unwrap();

        assert!(!cmd_import(session, &bad, true));
        assert!(!cmd_import(session, &dir.join("missing.json"), true));
        assert_eq!(session.store().len(), 1);
    });
}

#[test]
fn test_parse_helpers() {
    assert_eq!(parse_date("today", today()).unwrap(), today());
    assert_eq!(parse_date("2025-02-28", today()).unwrap(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    assert!(parse_date("2025-02-30", today()).is_err());
    assert_eq!(parse_time("07:05").unwrap(), "07:05");
    assert!(parse_time("7pm").is_err());
    assert_eq!(parse_month("2025-06").unwrap(), (2025, 5));
    assert!(parse_month("2025-00").is_err());
    assert_eq!(month_name(11), "December");
}

#[test]
fn test_register_and_login() {
    let dir = tempdir().unwrap();
    let mut users = UserDirectory::open(dir.path()).unwrap();

    assert!(cmd_register(&mut users, "alice", "s3cret", true));
    assert!(!cmd_register(&mut users, " alice ", "other", true));
    assert!(!cmd_register(&mut users, "   ", "pw", true));

    let wrong = Session::login(&users, JsonDirStore::new(dir.path()), "alice", "nope", today());
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    let unknown = Session::login(&users, JsonDirStore::new(dir.path()), "mallory", "s3cret", today());
    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

    let session = Session::login(&users, JsonDirStore::new(dir.path()), "alice", "s3cret", today()).unwrap();
    assert_eq!(session.username(), "alice");

    let reopened = UserDirectory::open(dir.path()).unwrap();
    assert!(reopened.verify("alice", "s3cret"));
    assert!(reopened.contains("alice"));
}

#[test]
fn test_register_rejects_names_unfit_for_files() {
    let dir = tempdir().unwrap();
    let mut users = UserDirectory::open(dir.path()).unwrap();

    for name in ["team/alice", "..", "../alice", "a\\b", "c:drive", "what?", "tab\tname", "."] {
        assert!(
            matches!(users.register(name, "pw"), Err(AuthError::InvalidUsername)),
            "{name:?} should be rejected"
        );
        assert!(!users.contains(name));
    }
    assert!(!dir.path().join("users.json").exists());

    assert!(cmd_register(&mut users, "alice.smith", "pw", true));
    assert!(cmd_register(&mut users, "bob_2", "pw", true));
    assert!(is_valid_username(" carol "));
}

#[test]
fn test_registered_user_keeps_data_across_logins() {
    let dir = tempdir().unwrap();
    let mut users = UserDirectory::open(dir.path()).unwrap();
    assert!(cmd_register(&mut users, "alice", "pw", true));

    let mut session = Session::login(&users, JsonDirStore::new(dir.path()), "alice", "pw", today()).unwrap();
    cmd_add(&mut session, today(), "Persisted", Priority::Medium, None, false, true).unwrap();
    session.logout();

    let session = Session::login(&users, JsonDirStore::new(dir.path()), "alice", "pw", today()).unwrap();
    assert_eq!(session.store().len(), 1);
}

#[test]
fn test_in_memory_directory() {
    let mut users = UserDirectory::in_memory();
    users.register("bob", "pw").unwrap();
    assert!(matches!(users.register("bob", "pw"), Err(AuthError::AlreadyExists(_))));
    assert!(users.verify("bob", "pw"));
    assert!(!users.verify("bob", "PW"));
}
