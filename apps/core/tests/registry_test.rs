use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use sundar_core::discovery::{AppProvider, DiscoveryProvider};
use sundar_core::model::ApplicationEntry;
use sundar_core::registry::Registry;

fn unique_dir(label: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("sundar-registry-{label}-{unique}"));
    std::fs::create_dir_all(&root).unwrap();
    root
}

fn fixture_registry(interval: Duration) -> Registry {
    let providers: Vec<Box<dyn DiscoveryProvider>> =
        vec![Box::new(AppProvider::deterministic_fixture())];
    Registry::new(providers, interval)
}

#[test]
fn snapshot_is_reused_within_refresh_interval() {
    let mut registry = fixture_registry(Duration::from_secs(300));
    let start = Instant::now();

    let first = registry.get_snapshot_at(start);
    let second = registry.get_snapshot_at(start + Duration::from_secs(1));

    assert_eq!(registry.scan_count(), 1);
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 3);
}

#[test]
fn snapshot_is_rebuilt_after_refresh_interval() {
    let mut registry = fixture_registry(Duration::from_secs(300));
    let start = Instant::now();

    let first = registry.get_snapshot_at(start);
    let boundary = registry.get_snapshot_at(start + Duration::from_secs(300));
    assert!(std::sync::Arc::ptr_eq(&first, &boundary));

    let rebuilt = registry.get_snapshot_at(start + Duration::from_secs(301));
    assert_eq!(registry.scan_count(), 2);
    assert!(!std::sync::Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(first.names().collect::<Vec<_>>(), rebuilt.names().collect::<Vec<_>>());
}

#[test]
fn invalidate_forces_rescan() {
    let mut registry = fixture_registry(Duration::from_secs(300));
    let now = Instant::now();
    registry.get_snapshot_at(now);
    registry.invalidate();
    registry.get_snapshot_at(now);
    assert_eq!(registry.scan_count(), 2);
}

#[test]
fn empty_snapshot_still_counts_as_cached() {
    let mut registry = Registry::new(Vec::new(), Duration::from_secs(300));
    let now = Instant::now();
    assert!(registry.get_snapshot_at(now).is_empty());
    assert!(registry.get_snapshot_at(now).is_empty());
    assert_eq!(registry.scan_count(), 1);
}

#[test]
fn first_directory_wins_on_duplicate_names() {
    let user = unique_dir("user");
    let system = unique_dir("system");
    std::fs::write(user.join("editor.desktop"), "Name=Editor\nExec=my-editor\n").unwrap();
    std::fs::write(system.join("editor.desktop"), "Name=Editor\nExec=stock-editor\n").unwrap();
    std::fs::write(system.join("mail.desktop"), "Name=Mail\nExec=mail-client\n").unwrap();

    let mut registry = Registry::from_dirs(&[user.clone(), system.clone()], 1, Duration::from_secs(300));
    let snapshot = registry.get_snapshot();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get("Editor").unwrap().exec_command, "my-editor");
    assert_eq!(snapshot.get("Mail").unwrap().exec_command, "mail-client");

    std::fs::remove_dir_all(&user).unwrap();
    std::fs::remove_dir_all(&system).unwrap();
}

#[test]
fn entries_iterate_in_name_order() {
    let source = std::path::Path::new("/tmp/x.desktop");
    let providers: Vec<Box<dyn DiscoveryProvider>> = vec![Box::new(AppProvider::from_apps(vec![
        ApplicationEntry::new("Zed", "zed", None, source),
        ApplicationEntry::new("Atlas", "atlas", None, source),
        ApplicationEntry::new("", "ghost", None, source),
        ApplicationEntry::new("Mail", "mail", None, source),
    ]))];
    let mut registry = Registry::new(providers, Duration::from_secs(300));
    let snapshot = registry.get_snapshot();

    assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["Atlas", "Mail", "Zed"]);
}
