//! Immutable per-build catalog of downloadable archives.
//!
//! The index maps an archive name to the named, typed assets it
//! contains. It is produced offline (one file per target platform),
//! read wholesale at startup and never mutated afterwards, so every
//! query here is a pure lookup: absence is answered with `None` or an
//! empty collection, never an error.
//!
//! Two backings answer the same query surface:
//! * [`ArchiveIndex::from_file`] - the built index shipped with the
//!   game, deserialized in one read.
//! * [`ArchiveIndex::from_catalog`] - "simulate" mode for development,
//!   scanning a [`DevCatalog`] directly so no archives need to be
//!   built at all.

// crate-specific lint exceptions:
#![warn(missing_docs)]

mod error;
pub use error::{Error, Result};

mod kind;
pub use kind::{name_hash, AssetKind};

mod catalog;
pub use catalog::DevCatalog;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Wardrobe metadata attached to recipe assets in the index.
///
/// Copied onto wardrobe-recipe placeholders so consumers can make
/// correct provisional layout decisions before the real recipe exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardrobeMeta {
    /// The wardrobe slot the recipe occupies (e.g. "Legs").
    pub wardrobe_slot: String,
    /// Slots hidden while this recipe is worn.
    pub hides: Vec<String>,
    /// Race names this recipe is compatible with.
    pub compatible_races: Vec<String>,
}

/// One asset as recorded in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexAsset {
    /// On-disk asset name within its archive.
    pub name: String,
    /// Stable hash of the asset's semantic name, see [`name_hash`].
    pub hash: i32,
    /// Asset kind.
    pub kind: AssetKind,
    /// Present only for wardrobe-type recipes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wardrobe: Option<WardrobeMeta>,
}

impl IndexAsset {
    /// Index entry with the hash derived from the name.
    pub fn new(name: impl Into<String>, kind: AssetKind) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        Self {
            name,
            hash,
            kind,
            wardrobe: None,
        }
    }

    /// Attach wardrobe metadata, marking the asset as a wardrobe recipe.
    #[must_use]
    pub fn with_wardrobe(mut self, wardrobe: WardrobeMeta) -> Self {
        self.wardrobe = Some(wardrobe);
        self
    }
}

/// Contents of one archive as recorded in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveIndexEntry {
    /// Archive name.
    pub name: String,
    /// Assets contained in the archive.
    pub assets: Vec<IndexAsset>,
}

/// The serialized form of the built index file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexData {
    /// All archives known to this build.
    pub archives: Vec<ArchiveIndexEntry>,
}

enum Backing {
    Built(IndexData),
    Simulated(DevCatalog),
}

/// Read-only catalog answering "which archive holds asset X" and its
/// inverse queries.
pub struct ArchiveIndex {
    backing: Backing,
}

impl ArchiveIndex {
    /// Index over already-deserialized data.
    pub fn new(data: IndexData) -> Self {
        Self {
            backing: Backing::Built(data),
        }
    }

    /// Reads the built index file wholesale.
    ///
    /// # Errors
    /// Fails on io or if the file is not a valid index document.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let data = serde_json::from_slice::<IndexData>(&bytes)?;
        Ok(Self::new(data))
    }

    /// Simulate mode: answer the same queries by scanning a
    /// development-time catalog instead of a built index.
    pub fn from_catalog(catalog: DevCatalog) -> Self {
        Self {
            backing: Backing::Simulated(catalog),
        }
    }

    /// True when backed by a [`DevCatalog`] rather than a built file.
    pub fn is_simulated(&self) -> bool {
        matches!(self.backing, Backing::Simulated(_))
    }

    fn assets_in<'a>(&'a self, archive: &str) -> Box<dyn Iterator<Item = &'a IndexAsset> + 'a> {
        match &self.backing {
            Backing::Built(data) => match data.archives.iter().find(|e| e.name == archive) {
                Some(entry) => Box::new(entry.assets.iter()),
                None => Box::new(std::iter::empty()),
            },
            Backing::Simulated(catalog) => Box::new(catalog.assets_in(archive)),
        }
    }

    /// Names of every archive known to the index.
    pub fn archive_names(&self) -> Vec<&str> {
        match &self.backing {
            Backing::Built(data) => data.archives.iter().map(|e| e.name.as_str()).collect(),
            Backing::Simulated(catalog) => catalog.archive_names(),
        }
    }

    /// Does `archive` contain an asset of `kind` called `asset_name`?
    pub fn contains(&self, archive: &str, asset_name: &str, kind: AssetKind) -> bool {
        self.assets_in(archive)
            .any(|a| a.kind == kind && a.name == asset_name)
    }

    /// Every archive holding an asset of `kind` called `asset_name`.
    pub fn find_containing_archives(&self, asset_name: &str, kind: AssetKind) -> Vec<&str> {
        self.archive_names()
            .into_iter()
            .filter(|archive| self.contains(archive, asset_name, kind))
            .collect()
    }

    /// Reverse lookup: the asset name in `archive` whose identity hash
    /// is `hash`.
    pub fn asset_name_from_hash(&self, archive: &str, hash: i32, kind: AssetKind) -> Option<&str> {
        self.assets_in(archive)
            .find(|a| a.kind == kind && a.hash == hash)
            .map(|a| a.name.as_str())
    }

    /// The identity hash recorded for `asset_name` in `archive`.
    pub fn asset_hash_from_name(
        &self,
        archive: &str,
        asset_name: &str,
        kind: AssetKind,
    ) -> Option<i32> {
        self.assets_in(archive)
            .find(|a| a.kind == kind && a.name == asset_name)
            .map(|a| a.hash)
    }

    /// All asset names of `kind` inside `archive`.
    pub fn all_assets_of_kind(&self, archive: &str, kind: AssetKind) -> Vec<&str> {
        self.assets_in(archive)
            .filter(|a| a.kind == kind)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// True if the index records `asset_name` in `archive` as a
    /// wardrobe-type recipe.
    pub fn is_wardrobe_recipe(&self, archive: &str, asset_name: &str) -> bool {
        self.wardrobe_meta(archive, asset_name).is_some()
    }

    /// Wardrobe metadata for a recipe, if the index has any.
    pub fn wardrobe_meta(&self, archive: &str, asset_name: &str) -> Option<&WardrobeMeta> {
        self.assets_in(archive)
            .find(|a| a.kind == AssetKind::WardrobeRecipe && a.name == asset_name)
            .and_then(|a| a.wardrobe.as_ref())
    }
}
