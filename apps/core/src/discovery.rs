use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::model::ApplicationEntry;

const DESCRIPTOR_EXTENSION: &str = "desktop";

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} has no usable Name or Exec line")]
    Incomplete { path: PathBuf },
    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

pub trait DiscoveryProvider: Send + Sync {
    fn provider_name(&self) -> &str;
    fn discover(&self) -> Result<Vec<ApplicationEntry>, DescriptorError>;
}

pub struct AppProvider {
    apps: Vec<ApplicationEntry>,
}

impl AppProvider {
    pub fn from_apps(apps: Vec<ApplicationEntry>) -> Self {
        Self { apps }
    }

    pub fn deterministic_fixture() -> Self {
        let source = Path::new("/usr/share/applications");
        Self {
            apps: vec![
                ApplicationEntry::new(
                    "Editor",
                    "editor  --flag",
                    Some("accessories-text-editor"),
                    &source.join("editor.desktop"),
                ),
                ApplicationEntry::new(
                    "Video Player",
                    "totem",
                    Some("totem"),
                    &source.join("org.gnome.Totem.desktop"),
                ),
                ApplicationEntry::new("Media", "media-hub", None, &source.join("media.desktop")),
            ],
        }
    }
}

impl DiscoveryProvider for AppProvider {
    fn provider_name(&self) -> &str {
        "fixture"
    }

    fn discover(&self) -> Result<Vec<ApplicationEntry>, DescriptorError> {
        Ok(self.apps.clone())
    }
}

/// Scans one descriptor directory. Files that fail to parse are logged and
/// skipped; only a directory walk failure is reported to the caller.
pub struct DescriptorDirProvider {
    root: PathBuf,
    max_depth: usize,
    label: String,
}

impl DescriptorDirProvider {
    pub fn new(root: PathBuf, max_depth: usize) -> Self {
        let label = root.display().to_string();
        Self {
            root,
            max_depth: max_depth.max(1),
            label,
        }
    }
}

impl DiscoveryProvider for DescriptorDirProvider {
    fn provider_name(&self) -> &str {
        &self.label
    }

    fn discover(&self) -> Result<Vec<ApplicationEntry>, DescriptorError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(self.max_depth)
            .sort_by_file_name();

        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(error) if error.depth() == 0 => {
                    return Err(DescriptorError::Walk {
                        path: self.root.clone(),
                        message: error.to_string(),
                    });
                }
                Err(error) => {
                    log::warn!("skipping unreadable descriptor entry: {error}");
                    continue;
                }
            };

            if !item.file_type().is_file() || !has_descriptor_extension(item.path()) {
                continue;
            }

            match load_descriptor(item.path()) {
                Ok(entry) => entries.push(entry),
                Err(DescriptorError::Incomplete { path }) => {
                    log::debug!("descriptor {} has no Name/Exec; skipped", path.display());
                }
                Err(error) => log::warn!("descriptor parse error: {error}"),
            }
        }

        Ok(entries)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorFields {
    pub name: Option<String>,
    pub exec: Option<String>,
    pub icon: Option<String>,
}

pub fn load_descriptor(path: &Path) -> Result<ApplicationEntry, DescriptorError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let fields = parse_descriptor(&raw);
    let name = fields.name.filter(|value| !value.is_empty());
    let exec = fields
        .exec
        .map(|value| strip_field_codes(&value))
        .filter(|value| !value.is_empty());

    match (name, exec) {
        (Some(name), Some(exec)) => Ok(ApplicationEntry::from_owned(
            name,
            exec,
            fields.icon.filter(|value| !value.is_empty()),
            path.to_path_buf(),
        )),
        _ => Err(DescriptorError::Incomplete {
            path: path.to_path_buf(),
        }),
    }
}

/// First occurrence of each recognized key wins, which keeps the main entry's
/// values ahead of any later `[Desktop Action ...]` groups.
pub fn parse_descriptor(raw: &str) -> DescriptorFields {
    let mut fields = DescriptorFields::default();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let slot = match key {
            "Name" => &mut fields.name,
            "Exec" => &mut fields.exec,
            "Icon" => &mut fields.icon,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.trim().to_string());
        }
    }

    fields
}

/// Removes `%<letter>` placeholders. Interior spacing is left alone; only the
/// ends are trimmed.
pub fn strip_field_codes(exec: &str) -> String {
    static FIELD_CODE: OnceLock<Regex> = OnceLock::new();
    let pattern = FIELD_CODE.get_or_init(|| Regex::new(r"%[a-zA-Z]").expect("valid field code pattern"));
    pattern.replace_all(exec, "").trim().to_string()
}

fn has_descriptor_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
        .unwrap_or(false)
}
