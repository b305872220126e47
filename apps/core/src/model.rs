use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationEntry {
    pub name: String,
    pub exec_command: String,
    pub icon_ref: Option<String>,
    pub source_path: PathBuf,
    folded_name: Vec<char>,
}

impl ApplicationEntry {
    pub fn new(name: &str, exec_command: &str, icon_ref: Option<&str>, source_path: &Path) -> Self {
        Self::from_owned(
            name.to_string(),
            exec_command.to_string(),
            icon_ref.map(str::to_string),
            source_path.to_path_buf(),
        )
    }

    pub fn from_owned(
        name: String,
        exec_command: String,
        icon_ref: Option<String>,
        source_path: PathBuf,
    ) -> Self {
        let folded_name = fold_for_match(&name);
        Self {
            name,
            exec_command,
            icon_ref,
            source_path,
            folded_name,
        }
    }

    /// Both the display name and the exec line must carry something to launch.
    pub fn is_indexable(&self) -> bool {
        !self.name.trim().is_empty() && !self.exec_command.trim().is_empty()
    }

    pub fn folded_name(&self) -> &[char] {
        &self.folded_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedMatch {
    pub entry: ApplicationEntry,
    pub score: u8,
}

pub fn fold_for_match(input: &str) -> Vec<char> {
    input.chars().flat_map(|c| c.to_lowercase()).collect()
}
