use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub type FolderId = u32;
pub type CreativeId = u32;

/// Resolved code table ids for the eight targeting dimensions. On a
/// folder a zero means "any value", on a request it means the raw
/// name did not resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    pub country: u32,
    pub brand: u32,
    pub network: u32,
    pub network_type: u32,
    pub sub_network: u32,
    pub gender: u32,
    pub device_type: u32,
    pub vertical: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    #[serde(default)]
    pub parent: Option<FolderId>,
    #[serde(default)]
    pub children: Vec<FolderId>,
    #[serde(default)]
    pub creatives: Vec<CreativeId>,
    /// Price ceiling in micro units, zero inherits from the parent
    #[serde(default)]
    pub cpc: i64,
    #[serde(default)]
    pub budget: i64,
    #[serde(default)]
    pub owner: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub targeting: Dimensions,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    pub id: CreativeId,
    /// Click redirect with `{placeholder}` macros
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub id: u32,
    pub name: String,
}

/// Bidirectional name <-> id code table
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    by_name: HashMap<String, u32>,
    by_id: HashMap<u32, String>,
}

impl CodeTable {
    pub fn from_entries(entries: Vec<CodeEntry>) -> Self {
        let mut table = CodeTable::default();

        for entry in entries {
            table.by_name.insert(entry.name.clone(), entry.id);
            table.by_id.insert(entry.id, entry.name);
        }

        table
    }

    /// Zero when the name is unknown
    pub fn resolve(&self, name: &str) -> u32 {
        self.by_name.get(name).copied().unwrap_or(0)
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub countries: CodeTable,
    pub networks: CodeTable,
    pub sub_networks: CodeTable,
    pub network_types: CodeTable,
    pub brands: CodeTable,
    /// Url slugs keyed by the same ids as `brands`
    pub brand_slugs: CodeTable,
    pub verticals: CodeTable,
    pub device_types: CodeTable,
    pub genders: CodeTable,
}

/// Raw loader output, validated into a [`ConfigSnapshot`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSource {
    pub folders: Vec<Folder>,
    pub creatives: Vec<Creative>,
    pub countries: Vec<CodeEntry>,
    pub networks: Vec<CodeEntry>,
    pub sub_networks: Vec<CodeEntry>,
    pub network_types: Vec<CodeEntry>,
    pub brands: Vec<CodeEntry>,
    pub brand_slugs: Vec<CodeEntry>,
    pub verticals: Vec<CodeEntry>,
    pub device_types: Vec<CodeEntry>,
    pub genders: Vec<CodeEntry>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("folder {0} declared more than once")]
    DuplicateFolder(FolderId),
    #[error("creative {0} declared more than once")]
    DuplicateCreative(CreativeId),
    #[error("folder {folder} references missing parent {parent}")]
    MissingParent { folder: FolderId, parent: FolderId },
    #[error("folder {folder} references missing child {child}")]
    MissingChild { folder: FolderId, child: FolderId },
    #[error("folder {folder} references missing creative {creative}")]
    MissingCreative {
        folder: FolderId,
        creative: CreativeId,
    },
}

fn default_device_types() -> Vec<CodeEntry> {
    [("desktop", 1), ("mobile", 2), ("tablet", 3), ("unknown", 4)]
        .into_iter()
        .map(|(name, id)| CodeEntry {
            id,
            name: name.to_string(),
        })
        .collect()
}

/// Immutable, versioned view of all bidding configuration. Built
/// wholesale on every refresh and never mutated once published.
#[derive(Debug)]
pub struct ConfigSnapshot {
    version: u64,
    loaded_at: DateTime<Utc>,
    /// Arena in load order, parents and children refer by id
    folders: Vec<Folder>,
    folder_index: HashMap<FolderId, usize>,
    creatives: HashMap<CreativeId, Creative>,
    lookups: Lookups,
}

impl ConfigSnapshot {
    pub fn build(source: SnapshotSource, version: u64) -> Result<Self, SnapshotError> {
        let mut creatives = HashMap::with_capacity(source.creatives.len());
        for creative in source.creatives {
            let id = creative.id;
            if creatives.insert(id, creative).is_some() {
                return Err(SnapshotError::DuplicateCreative(id));
            }
        }

        let mut folder_index = HashMap::with_capacity(source.folders.len());
        for (position, folder) in source.folders.iter().enumerate() {
            if folder_index.insert(folder.id, position).is_some() {
                return Err(SnapshotError::DuplicateFolder(folder.id));
            }
        }

        for folder in &source.folders {
            if let Some(parent) = folder.parent
                && !folder_index.contains_key(&parent)
            {
                return Err(SnapshotError::MissingParent {
                    folder: folder.id,
                    parent,
                });
            }

            if let Some(child) = folder
                .children
                .iter()
                .find(|child| !folder_index.contains_key(child))
            {
                return Err(SnapshotError::MissingChild {
                    folder: folder.id,
                    child: *child,
                });
            }

            if let Some(creative) = folder
                .creatives
                .iter()
                .find(|creative| !creatives.contains_key(creative))
            {
                return Err(SnapshotError::MissingCreative {
                    folder: folder.id,
                    creative: *creative,
                });
            }
        }

        let device_types = if source.device_types.is_empty() {
            default_device_types()
        } else {
            source.device_types
        };

        let lookups = Lookups {
            countries: CodeTable::from_entries(source.countries),
            networks: CodeTable::from_entries(source.networks),
            sub_networks: CodeTable::from_entries(source.sub_networks),
            network_types: CodeTable::from_entries(source.network_types),
            brands: CodeTable::from_entries(source.brands),
            brand_slugs: CodeTable::from_entries(source.brand_slugs),
            verticals: CodeTable::from_entries(source.verticals),
            device_types: CodeTable::from_entries(device_types),
            genders: CodeTable::from_entries(source.genders),
        };

        Ok(ConfigSnapshot {
            version,
            loaded_at: Utc::now(),
            folders: source.folders,
            folder_index,
            creatives,
            lookups,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folder_index.get(&id).map(|position| &self.folders[*position])
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    /// Parentless folders in load order
    pub fn roots(&self) -> impl Iterator<Item = &Folder> {
        self.folders.iter().filter(|folder| folder.parent.is_none())
    }

    pub fn creative(&self, id: CreativeId) -> Option<&Creative> {
        self.creatives.get(&id)
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }
}
