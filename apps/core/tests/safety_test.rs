use sundar_core::safety::{evaluate, is_allowed, SafetyVerdict, DENYLIST};

#[test]
fn every_denylist_entry_is_blocked_verbatim() {
    for pattern in DENYLIST {
        assert!(!is_allowed(pattern), "{pattern} should be blocked");
    }
}

#[test]
fn substring_match_blocks_harmless_looking_paths() {
    assert_eq!(
        evaluate("rm -rf /tmp/x"),
        SafetyVerdict::Blocked { pattern: "rm -rf /" }
    );
}

#[test]
fn patterns_embedded_in_longer_commands_are_blocked() {
    assert!(!is_allowed("sudo shutdown now"));
    assert!(!is_allowed("dd if=/dev/zero of=/dev/sda"));
    assert!(!is_allowed("sudo mkfs.ext4 /dev/sdb1"));
    assert!(!is_allowed("pkill -f x; kill -9 1"));
}

#[test]
fn ordinary_commands_are_allowed() {
    assert!(is_allowed("ls -la"));
    assert!(is_allowed("echo hello"));
    assert!(is_allowed("rm -r ./build"));
    assert!(evaluate("uptime").is_allowed());
}

#[test]
fn gate_is_case_sensitive() {
    assert!(is_allowed("SHUTDOWN"));
}
