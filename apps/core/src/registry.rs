use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::discovery::{DescriptorDirProvider, DiscoveryProvider};
use crate::model::ApplicationEntry;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Point-in-time view of every indexable application, keyed and ordered by
/// display name.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: BTreeMap<String, ApplicationEntry>,
    built_at: Instant,
}

impl Snapshot {
    pub fn from_entries(entries: Vec<ApplicationEntry>, built_at: Instant) -> Self {
        let mut map = BTreeMap::new();
        for entry in entries {
            insert_first_seen(&mut map, entry);
        }
        Self {
            entries: map,
            built_at,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ApplicationEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ApplicationEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn insert_first_seen(map: &mut BTreeMap<String, ApplicationEntry>, entry: ApplicationEntry) -> bool {
    if !entry.is_indexable() {
        return false;
    }
    match map.entry(entry.name.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(entry);
            true
        }
        Entry::Occupied(existing) => {
            log::debug!(
                "duplicate application '{}' from {} ignored; keeping {}",
                entry.name,
                entry.source_path.display(),
                existing.get().source_path.display()
            );
            false
        }
    }
}

pub struct Registry {
    providers: Vec<Box<dyn DiscoveryProvider>>,
    refresh_interval: Duration,
    current: Option<Arc<Snapshot>>,
    scans: u64,
}

impl Registry {
    /// Providers are consulted in order; an earlier provider's entry wins over
    /// a later one with the same name.
    pub fn new(providers: Vec<Box<dyn DiscoveryProvider>>, refresh_interval: Duration) -> Self {
        Self {
            providers,
            refresh_interval,
            current: None,
            scans: 0,
        }
    }

    pub fn from_dirs(dirs: &[PathBuf], max_depth: usize, refresh_interval: Duration) -> Self {
        let providers = dirs
            .iter()
            .map(|dir| {
                Box::new(DescriptorDirProvider::new(dir.clone(), max_depth)) as Box<dyn DiscoveryProvider>
            })
            .collect();
        Self::new(providers, refresh_interval)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_dirs(
            &config.descriptor_dirs,
            config.descriptor_scan_depth,
            Duration::from_secs(config.refresh_interval_secs),
        )
    }

    pub fn get_snapshot(&mut self) -> Arc<Snapshot> {
        self.get_snapshot_at(Instant::now())
    }

    pub fn get_snapshot_at(&mut self, now: Instant) -> Arc<Snapshot> {
        if let Some(current) = &self.current {
            let age = now.saturating_duration_since(current.built_at);
            if age <= self.refresh_interval {
                return Arc::clone(current);
            }
        }

        let fresh = Arc::new(self.rescan(now));
        self.current = Some(Arc::clone(&fresh));
        fresh
    }

    pub fn invalidate(&mut self) {
        self.current = None;
    }

    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    fn rescan(&mut self, now: Instant) -> Snapshot {
        let mut map = BTreeMap::new();
        for provider in &self.providers {
            match provider.discover() {
                Ok(entries) => {
                    for entry in entries {
                        insert_first_seen(&mut map, entry);
                    }
                }
                Err(error) => log::warn!(
                    "discovery provider '{}' failed: {error}",
                    provider.provider_name()
                ),
            }
        }

        self.scans += 1;
        log::info!("application registry rebuilt entries={} scan={}", map.len(), self.scans);
        Snapshot {
            entries: map,
            built_at: now,
        }
    }
}
