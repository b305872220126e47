//! Denylist gate for shell commands.
//!
//! This is a plain substring check over the raw command text. It does not
//! parse shell syntax, resolve aliases or inspect what a command actually
//! does, so it is not a sandbox: anything phrased differently from the
//! denylist entries passes, and harmless commands that happen to contain an
//! entry (`rm -rf /tmp/x` contains `rm -rf /`) are refused.

pub const DENYLIST: [&str; 6] = ["rm -rf /", "dd if=", "mkfs", "shutdown", "reboot", "kill -9"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    Allowed,
    Blocked { pattern: &'static str },
}

impl SafetyVerdict {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

pub fn evaluate(command: &str) -> SafetyVerdict {
    DENYLIST
        .iter()
        .find(|pattern| command.contains(**pattern))
        .map(|pattern| SafetyVerdict::Blocked { pattern: *pattern })
        .unwrap_or(SafetyVerdict::Allowed)
}

pub fn is_allowed(command: &str) -> bool {
    evaluate(command).is_allowed()
}
