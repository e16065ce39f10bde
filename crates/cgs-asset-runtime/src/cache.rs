use std::collections::HashMap;

use cgs_archive_index::{name_hash, AssetKind};

use crate::AssetHandle;

/// Resident assets of one kind, keyed by identity hash and by name.
///
/// Append-only during a session except for explicit unload. An asset
/// whose semantic name differs from its on-disk name is reachable
/// under both names.
#[derive(Debug, Default)]
pub struct AssetDirectory {
    by_hash: HashMap<i32, AssetHandle>,
    by_name: HashMap<String, AssetHandle>,
}

impl AssetDirectory {
    /// Register an asset, replacing any previous registration under the
    /// same identity (this is how placeholder registrations are
    /// superseded by the real asset).
    pub fn register(&mut self, asset: AssetHandle) {
        self.by_hash.insert(asset.identity_hash(), asset.clone());
        self.by_name.insert(asset.name.clone(), asset.clone());
        if asset.semantic_name() != asset.name {
            self.by_name
                .insert(asset.semantic_name().to_string(), asset);
        }
    }

    /// Lookup by identity hash.
    pub fn get_by_hash(&self, hash: i32) -> Option<&AssetHandle> {
        self.by_hash.get(&hash)
    }

    /// Lookup by exact name (asset name or semantic name).
    pub fn get_by_name(&self, name: &str) -> Option<&AssetHandle> {
        self.by_name.get(name)
    }

    /// Drop every registration still pointing at `asset`, whatever keys
    /// it sits under. A placeholder requested by hash is registered
    /// under that hash, which the real asset's identity keys may not
    /// cover.
    pub(crate) fn forget(&mut self, asset: &AssetHandle) {
        self.by_hash
            .retain(|_, existing| !AssetHandle::ptr_eq(existing, asset));
        self.by_name
            .retain(|_, existing| !AssetHandle::ptr_eq(existing, asset));
    }

    /// Explicitly drop an asset from the directory.
    pub fn unload(&mut self, name: &str) {
        if let Some(asset) = self.by_name.remove(name) {
            self.by_hash.remove(&asset.identity_hash());
            self.by_name.remove(asset.name.as_str());
            let semantic = asset.semantic_name().to_string();
            self.by_name.remove(&semantic);
        }
    }

    /// Number of distinct assets registered.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

/// The per-kind resident directories.
///
/// Mutated only by the resolver and the promotion step, both of which
/// run on the single update loop; no synchronization is needed.
#[derive(Debug, Default)]
pub struct ResidentCaches {
    directories: HashMap<AssetKind, AssetDirectory>,
}

impl ResidentCaches {
    /// The directory for `kind`, if any asset of that kind was ever
    /// registered.
    pub fn directory(&self, kind: AssetKind) -> Option<&AssetDirectory> {
        self.directories.get(&kind)
    }

    /// The directory for `kind`, created on first use.
    pub fn directory_mut(&mut self, kind: AssetKind) -> &mut AssetDirectory {
        self.directories.entry(kind).or_default()
    }

    /// Register an asset under its own kind.
    pub fn register(&mut self, asset: AssetHandle) {
        self.directory_mut(asset.kind).register(asset);
    }

    /// Resident probe under the per-kind identity rule.
    ///
    /// Races, slots and overlays resolve by hash (supplied, or computed
    /// from the name); other kinds by name. Slots additionally retry
    /// with the `"_Slot"` suffix so a naming-convention mismatch
    /// between slot name and asset name still hits.
    pub fn lookup(
        &self,
        kind: AssetKind,
        name: Option<&str>,
        hash: Option<i32>,
    ) -> Option<&AssetHandle> {
        let directory = self.directory(kind)?;
        if kind.identity_is_hash() {
            let hash = hash.or_else(|| name.map(name_hash))?;
            if let Some(found) = directory.get_by_hash(hash) {
                return Some(found);
            }
            if kind == AssetKind::Slot {
                if let Some(name) = name {
                    return directory.get_by_hash(name_hash(&format!("{}_Slot", name)));
                }
            }
            None
        } else {
            directory.get_by_name(name?)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Asset, AssetPayload, RecipeData, SlotData};

    use super::*;

    #[test]
    fn slot_reachable_by_semantic_and_disk_name() {
        let mut caches = ResidentCaches::default();
        caches.register(Asset::real(
            "Boots_Slot",
            AssetPayload::Slot(SlotData::new("Boots")),
        ));

        assert!(caches.lookup(AssetKind::Slot, Some("Boots"), None).is_some());
        assert!(caches
            .lookup(AssetKind::Slot, None, Some(name_hash("Boots")))
            .is_some());
        assert!(caches
            .directory(AssetKind::Slot)
            .unwrap()
            .get_by_name("Boots_Slot")
            .is_some());
    }

    #[test]
    fn slot_suffix_fallback_on_probe() {
        // Registered under the on-disk convention only.
        let mut caches = ResidentCaches::default();
        caches.register(Asset::real(
            "Gloves_Slot",
            AssetPayload::Slot(SlotData::new("Gloves_Slot")),
        ));

        let found = caches.lookup(AssetKind::Slot, Some("Gloves"), None);
        assert_eq!(found.unwrap().name, "Gloves_Slot");
    }

    #[test]
    fn name_identity_for_recipes() {
        let mut caches = ResidentCaches::default();
        caches.register(Asset::real(
            "BootsRecipe",
            AssetPayload::Recipe(RecipeData::base()),
        ));

        assert!(caches
            .lookup(AssetKind::WardrobeRecipe, Some("BootsRecipe"), None)
            .is_some());
        assert!(caches
            .lookup(AssetKind::WardrobeRecipe, Some("Missing"), None)
            .is_none());
    }

    #[test]
    fn registration_supersedes_previous_identity() {
        let mut caches = ResidentCaches::default();
        let placeholder = Asset::placeholder(
            "Boots",
            name_hash("Boots"),
            AssetPayload::Slot(SlotData::new("Boots")),
        );
        caches.register(placeholder);
        let real = Asset::real("Boots_Slot", AssetPayload::Slot(SlotData::new("Boots")));
        caches.register(real);

        let found = caches.lookup(AssetKind::Slot, Some("Boots"), None).unwrap();
        assert!(!found.placeholder);
        assert_eq!(caches.directory(AssetKind::Slot).unwrap().len(), 1);
    }

    #[test]
    fn forget_drops_every_key_of_a_placeholder() {
        // Registered under the on-disk name's hash, as a hash-identified
        // request would leave it.
        let mut caches = ResidentCaches::default();
        let requested_hash = name_hash("Boots_Slot");
        let placeholder = Asset::placeholder(
            "Boots_Slot",
            requested_hash,
            AssetPayload::Slot(SlotData {
                slot_name: "Boots_Slot".to_string(),
                name_hash: requested_hash,
            }),
        );
        caches.register(placeholder.clone());
        assert!(caches
            .lookup(AssetKind::Slot, None, Some(requested_hash))
            .is_some());

        caches
            .directory_mut(AssetKind::Slot)
            .forget(&placeholder);
        caches.register(Asset::real(
            "Boots_Slot",
            AssetPayload::Slot(SlotData::new("Boots")),
        ));

        // The requested hash no longer answers with the placeholder.
        assert!(caches
            .lookup(AssetKind::Slot, None, Some(requested_hash))
            .is_none());
        let real = caches
            .lookup(AssetKind::Slot, Some("Boots"), None)
            .unwrap();
        assert!(!real.placeholder);
    }

    #[test]
    fn unload_removes_all_keys() {
        let mut caches = ResidentCaches::default();
        caches.register(Asset::real(
            "Boots_Slot",
            AssetPayload::Slot(SlotData::new("Boots")),
        ));
        caches.directory_mut(AssetKind::Slot).unload("Boots");
        assert!(caches.lookup(AssetKind::Slot, Some("Boots"), None).is_none());
        assert!(caches.directory(AssetKind::Slot).unwrap().is_empty());
    }
}
