use parlance::conversation::Conversation;
use parlance::storage::{persist_best_effort, ConversationStore, SqliteStore};
use tempfile::tempdir;

fn store_in(dir: &tempfile::TempDir) -> SqliteStore {
    SqliteStore::new_with_path(dir.path().join("history.db")).expect("failed to create store")
}

#[test]
fn test_attachments_survive_roundtrip() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);

    let mut conversation = Conversation::new("conv-att");
    conversation.append_user_message(
        "look at these",
        vec![
            "file:///tmp/photo.jpg".to_string(),
            "file:///tmp/doc.pdf".to_string(),
        ],
    );
    persist_best_effort(&store, &mut conversation);

    let loaded = store.load().unwrap();
    assert_eq!(loaded[0].messages()[0].attachments.len(), 2);
    assert_eq!(loaded[0].messages()[0].attachments[0], "file:///tmp/photo.jpg");
}

#[test]
fn test_reopening_database_keeps_history() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");

    {
        let store = SqliteStore::new_with_path(&db_path).unwrap();
        let mut conversation = Conversation::new("conv-persist");
        conversation.append_user_message("remember me", Vec::new());
        persist_best_effort(&store, &mut conversation);
    }

    // A fresh store over the same file sees the prior session
    let store = SqliteStore::new_with_path(&db_path).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].title, "remember me");
}

#[test]
fn test_unicode_content_survives_roundtrip() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);

    let mut conversation = Conversation::new("conv-unicode");
    conversation.append_user_message("\u{1F50D} 東京の天気は?", Vec::new());
    conversation.append_completed_assistant_message("晴れです \u{2600}\u{FE0F}");
    persist_best_effort(&store, &mut conversation);

    let loaded = store.load().unwrap();
    assert_eq!(loaded[0].messages()[0].content, "\u{1F50D} 東京の天気は?");
    assert_eq!(loaded[0].messages()[1].content, "晴れです \u{2600}\u{FE0F}");
    // Title derivation strips the search marker from the stored text
    assert_eq!(loaded[0].title, "東京の天気は?");
}

#[test]
fn test_delete_by_prefix_through_trait() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);

    let id = store.create_id();
    let mut conversation = Conversation::new(id.clone());
    conversation.append_user_message("short lived", Vec::new());
    persist_best_effort(&store, &mut conversation);

    let prefix = &id[..8];
    assert!(store.delete(prefix).unwrap());
    assert!(store.load().unwrap().is_empty());
}
