use swatch_viewer::{
    config::ViewerConfig,
    data_structures::material::Tint,
    error::ViewerError,
    session::{FileStore, MemoryStore, SelectionField, SelectionStore, SessionBridge},
};

use crate::common::test_utils::{FailingStore, SharedStore, bridge};

mod common;

#[test]
fn empty_store_yields_defaults() {
    let config = ViewerConfig::default();
    let mut session = bridge(&config, MemoryStore::new());

    let selection = session.load_selection();
    assert_eq!(selection.model, "model5.glb");
    assert_eq!(selection.texture, "1.jpg");
    assert_eq!(selection.color.to_hex(), "#ffffff");
    assert!(!session.is_degraded());
    assert!(session.fallback().is_none());
}

#[test]
fn stored_values_win_over_defaults() {
    let config = ViewerConfig::default();
    let store = SharedStore::with(&[
        ("selectedModel", "gown.glb"),
        ("selectedTexture", "denim.png"),
        ("selectedColor", "#3366CC"),
    ]);
    let mut session = bridge(&config, store);

    let selection = session.load_selection();
    assert_eq!(selection.model, "gown.glb");
    assert_eq!(selection.texture, "denim.png");
    assert_eq!(selection.color, Tint::new(0x33, 0x66, 0xcc));
}

#[test]
fn keys_are_independent() {
    let config = ViewerConfig::default();
    let store = SharedStore::with(&[("selectedTexture", "denim.png")]);
    let mut session = bridge(&config, store);

    let selection = session.load_selection();
    assert_eq!(selection.model, "model5.glb");
    assert_eq!(selection.texture, "denim.png");
    assert_eq!(selection.color, Tint::WHITE);
}

#[test]
fn invalid_stored_color_falls_back_to_default() {
    let config = ViewerConfig::default();
    for bad in ["red", "#ff00", "ff0000", "#gg0000", ""] {
        let store = SharedStore::with(&[("selectedColor", bad)]);
        let mut session = bridge(&config, store);
        assert_eq!(session.load_selection().color, Tint::WHITE, "stored {bad:?}");
    }
}

#[test]
fn save_writes_each_field_immediately() {
    let config = ViewerConfig::default();
    let store = SharedStore::default();
    let mut session = bridge(&config, store.clone());

    session.save(SelectionField::Color, "#ff0000");
    assert_eq!(store.get("selectedColor").as_deref(), Some("#ff0000"));
    assert_eq!(store.get("selectedModel"), None);

    session.save(SelectionField::Model, "b.glb");
    session.save(SelectionField::Texture, "2.png");
    assert_eq!(store.get("selectedModel").as_deref(), Some("b.glb"));
    assert_eq!(store.get("selectedTexture").as_deref(), Some("2.png"));
}

#[test]
fn failing_store_degrades_to_memory() {
    let config = ViewerConfig::default();
    let mut session = bridge(&config, FailingStore);

    let selection = session.load_selection();
    assert!(session.is_degraded());
    assert!(matches!(
        session.fallback(),
        Some(ViewerError::Storage(reason)) if reason.contains("storage disabled")
    ));
    assert_eq!(&selection, session.defaults());

    session.save(SelectionField::Color, "#00ff00");
    session.save(SelectionField::Model, "b.glb");
    let selection = session.load_selection();
    assert_eq!(selection.color, Tint::new(0, 255, 0));
    assert_eq!(selection.model, "b.glb");
}

#[test]
fn write_failure_alone_degrades() {
    struct ReadOnly;
    impl SelectionStore for ReadOnly {
        fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(Some("stored.glb".to_string()))
        }

        fn write(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    let config = ViewerConfig::default();
    let mut session = bridge(&config, ReadOnly);
    assert_eq!(session.load_selection().model, "stored.glb");
    assert!(!session.is_degraded());

    session.save(SelectionField::Texture, "2.png");
    assert!(session.is_degraded());
    assert!(matches!(
        session.fallback(),
        Some(ViewerError::Storage(reason)) if reason.contains("quota exceeded")
    ));
    assert_eq!(session.load_selection().texture, "2.png");
}

#[test]
fn file_store_persists_across_instances() {
    let path = std::env::temp_dir().join(format!(
        "swatch-viewer-session-{}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let config = ViewerConfig::default();
    {
        let mut session = bridge(&config, FileStore::new(&path));
        assert_eq!(session.load_selection().model, "model5.glb");
        session.save(SelectionField::Model, "gown.glb");
        session.save(SelectionField::Color, "#abcdef");
    }

    let mut session = bridge(&config, FileStore::new(&path));
    let selection = session.load_selection();
    assert_eq!(selection.model, "gown.glb");
    assert_eq!(selection.texture, "1.jpg");
    assert_eq!(selection.color.to_hex(), "#abcdef");
    assert!(!session.is_degraded());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn corrupt_file_store_degrades() {
    let path = std::env::temp_dir().join(format!(
        "swatch-viewer-corrupt-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, "not json").unwrap();

    let config = ViewerConfig::default();
    let mut session = bridge(&config, FileStore::new(&path));
    assert_eq!(session.load_selection().model, "model5.glb");
    assert!(session.is_degraded());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn default_native_session_survives_restart() {
    let config = ViewerConfig::default();
    let path = config.session_file.clone().unwrap();
    let _ = std::fs::remove_file(&path);

    {
        let mut session = SessionBridge::for_platform(&config);
        session.save(SelectionField::Model, "model7.glb");
        session.save(SelectionField::Color, "#ff0000");
        assert!(!session.is_degraded());
    }

    let mut session = SessionBridge::for_platform(&config);
    let selection = session.load_selection();
    assert_eq!(selection.model, "model7.glb");
    assert_eq!(selection.texture, "1.jpg");
    assert_eq!(selection.color, Tint::new(255, 0, 0));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn disabled_session_file_keeps_selection_in_memory() {
    let config = ViewerConfig {
        session_file: None,
        ..Default::default()
    };
    {
        let mut session = SessionBridge::for_platform(&config);
        session.save(SelectionField::Model, "gown.glb");
        assert_eq!(session.load_selection().model, "gown.glb");
    }

    let mut session = SessionBridge::for_platform(&config);
    assert_eq!(session.load_selection().model, "model5.glb");
}
