use cgs_archive_index::{ArchiveIndex, AssetKind};

use crate::{
    AnimatorData, Asset, AssetHandle, AssetPayload, AssetStreamError, OverlayData, RaceData,
    RecipeData, RecipeKind, Result, SlotData,
};

/// Configured templates placeholders are cloned from.
///
/// Templates are required configuration with no default: a missing
/// template is a startup error, never a resolve-time one, so synthesis
/// itself cannot fail and never blocks.
#[derive(Debug, Clone)]
pub struct PlaceholderTemplates {
    pub(crate) race: RaceData,
    pub(crate) slot: SlotData,
    pub(crate) overlay: OverlayData,
    pub(crate) wardrobe_recipe: RecipeData,
}

impl PlaceholderTemplates {
    /// Bundle the per-kind templates.
    ///
    /// # Errors
    /// Fails if the race template carries no base recipe: that recipe
    /// is the template for non-wardrobe recipe placeholders.
    pub fn new(
        race: RaceData,
        slot: SlotData,
        overlay: OverlayData,
        wardrobe_recipe: RecipeData,
    ) -> Result<Self> {
        if race.base_recipe.is_none() {
            return Err(AssetStreamError::MissingTemplate(
                "placeholder race has no base recipe",
            ));
        }
        Ok(Self {
            race,
            slot,
            overlay,
            wardrobe_recipe,
        })
    }

    /// Synthesize a stand-in for `name`, renamed so downstream
    /// name/hash lookups resolve to it transparently.
    pub(crate) fn synthesize(
        &self,
        kind: AssetKind,
        name: &str,
        hash: i32,
        archive: &str,
        index: &ArchiveIndex,
    ) -> AssetHandle {
        let payload = match kind {
            AssetKind::Race => {
                let mut race = self.race.clone();
                race.race_name = name.to_string();
                race.display_name = name.to_string();
                AssetPayload::Race(race)
            }
            AssetKind::Slot => {
                let mut slot = self.slot.clone();
                slot.slot_name = name.to_string();
                slot.name_hash = hash;
                AssetPayload::Slot(slot)
            }
            AssetKind::Overlay => {
                let mut overlay = self.overlay.clone();
                overlay.overlay_name = name.to_string();
                overlay.name_hash = hash;
                AssetPayload::Overlay(overlay)
            }
            AssetKind::WardrobeRecipe => {
                // Wardrobe recipes get the index metadata copied on so
                // consumers can make correct provisional layout
                // decisions; anything else clones the race template's
                // base recipe.
                if let Some(meta) = index.wardrobe_meta(archive, name) {
                    let mut recipe = self.wardrobe_recipe.clone();
                    recipe.recipe_kind = RecipeKind::Wardrobe;
                    recipe.wardrobe_slot = Some(meta.wardrobe_slot.clone());
                    recipe.hides = meta.hides.clone();
                    recipe.compatible_races = meta.compatible_races.clone();
                    AssetPayload::Recipe(recipe)
                } else {
                    let mut recipe = self
                        .race
                        .base_recipe
                        .clone()
                        .unwrap_or_else(RecipeData::base);
                    recipe.recipe_kind = RecipeKind::Base;
                    AssetPayload::Recipe(recipe)
                }
            }
            AssetKind::AnimatorController => AssetPayload::Animator(AnimatorData {
                controller_name: name.to_string(),
            }),
            AssetKind::Other => AssetPayload::Opaque(Vec::new()),
        };
        Asset::placeholder(name, hash, payload)
    }
}

#[cfg(test)]
mod tests {
    use cgs_archive_index::{name_hash, DevCatalog, IndexAsset, WardrobeMeta};

    use super::*;

    fn templates() -> PlaceholderTemplates {
        PlaceholderTemplates::new(
            RaceData {
                race_name: "PlaceholderRace".to_string(),
                display_name: "Loading...".to_string(),
                base_recipe: Some(RecipeData::base()),
            },
            SlotData::new("PlaceholderSlot"),
            OverlayData::new("PlaceholderOverlay"),
            RecipeData {
                recipe_kind: RecipeKind::Wardrobe,
                wardrobe_slot: None,
                hides: Vec::new(),
                compatible_races: Vec::new(),
            },
        )
        .unwrap()
    }

    fn empty_index() -> ArchiveIndex {
        ArchiveIndex::from_catalog(DevCatalog::new())
    }

    #[test]
    fn race_template_requires_base_recipe() {
        let result = PlaceholderTemplates::new(
            RaceData {
                race_name: "r".to_string(),
                display_name: "r".to_string(),
                base_recipe: None,
            },
            SlotData::new("s"),
            OverlayData::new("o"),
            RecipeData::base(),
        );
        assert!(matches!(
            result,
            Err(AssetStreamError::MissingTemplate(_))
        ));
    }

    #[test]
    fn slot_placeholder_takes_target_identity() {
        // The template's own name/hash must not leak through.
        let hash = name_hash("Boots");
        let slot = templates().synthesize(AssetKind::Slot, "Boots", hash, "clothesA", &empty_index());

        assert!(slot.placeholder);
        assert_eq!(slot.name, "Boots");
        assert_eq!(slot.identity_hash(), hash);
        match &slot.payload {
            AssetPayload::Slot(data) => {
                assert_eq!(data.slot_name, "Boots");
                assert_eq!(data.name_hash, hash);
            }
            other => panic!("expected slot payload, got {:?}", other),
        }
    }

    #[test]
    fn race_placeholder_renamed_to_target() {
        let race = templates().synthesize(
            AssetKind::Race,
            "ElfFemale",
            name_hash("ElfFemale"),
            "races",
            &empty_index(),
        );
        match &race.payload {
            AssetPayload::Race(data) => {
                assert_eq!(data.race_name, "ElfFemale");
                assert_eq!(data.display_name, "ElfFemale");
            }
            other => panic!("expected race payload, got {:?}", other),
        }
    }

    #[test]
    fn wardrobe_recipe_copies_index_metadata() {
        let mut catalog = DevCatalog::new();
        catalog.add(
            "clothesA",
            IndexAsset::new("BootsRecipe", AssetKind::WardrobeRecipe).with_wardrobe(WardrobeMeta {
                wardrobe_slot: "Feet".to_string(),
                hides: vec!["Toes".to_string()],
                compatible_races: vec!["HumanMale".to_string()],
            }),
        );
        let index = ArchiveIndex::from_catalog(catalog);

        let recipe = templates().synthesize(
            AssetKind::WardrobeRecipe,
            "BootsRecipe",
            name_hash("BootsRecipe"),
            "clothesA",
            &index,
        );
        match &recipe.payload {
            AssetPayload::Recipe(data) => {
                assert_eq!(data.recipe_kind, RecipeKind::Wardrobe);
                assert_eq!(data.wardrobe_slot.as_deref(), Some("Feet"));
                assert_eq!(data.hides, vec!["Toes"]);
            }
            other => panic!("expected recipe payload, got {:?}", other),
        }
    }

    #[test]
    fn non_wardrobe_recipe_falls_back_to_base() {
        let recipe = templates().synthesize(
            AssetKind::WardrobeRecipe,
            "SomeBaseRecipe",
            name_hash("SomeBaseRecipe"),
            "clothesA",
            &empty_index(),
        );
        match &recipe.payload {
            AssetPayload::Recipe(data) => assert_eq!(data.recipe_kind, RecipeKind::Base),
            other => panic!("expected recipe payload, got {:?}", other),
        }
    }

    #[test]
    fn animator_placeholder_is_fresh_instance() {
        let animator = templates().synthesize(
            AssetKind::AnimatorController,
            "HumanoidController",
            name_hash("HumanoidController"),
            "anims",
            &empty_index(),
        );
        assert!(animator.placeholder);
        assert_eq!(animator.name, "HumanoidController");
        assert!(matches!(animator.payload, AssetPayload::Animator(_)));
    }
}
