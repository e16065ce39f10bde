use std::sync::Arc;

use cgs_archive_index::{name_hash, AssetKind};

/// Race definition payload.
///
/// The payloads here are deliberately thin: the streamer treats them as
/// opaque typed data keyed by name/hash, and only the fields that
/// placeholder synthesis and identity need are modeled.
#[derive(Debug, Clone)]
pub struct RaceData {
    /// Semantic race name; identity is the hash of this field, which
    /// may differ from the on-disk asset name.
    pub race_name: String,
    /// Name shown in the character editor.
    pub display_name: String,
    /// The race's base recipe; cloned for generic recipe placeholders.
    pub base_recipe: Option<RecipeData>,
}

/// Mesh slot payload.
#[derive(Debug, Clone)]
pub struct SlotData {
    /// Semantic slot name.
    pub slot_name: String,
    /// Precomputed hash of `slot_name`; the slot's identity.
    pub name_hash: i32,
}

impl SlotData {
    /// Slot payload with the hash derived from the name.
    pub fn new(slot_name: impl Into<String>) -> Self {
        let slot_name = slot_name.into();
        let name_hash = name_hash(&slot_name);
        Self {
            slot_name,
            name_hash,
        }
    }
}

/// Texture overlay payload.
#[derive(Debug, Clone)]
pub struct OverlayData {
    /// Semantic overlay name.
    pub overlay_name: String,
    /// Precomputed hash of `overlay_name`; the overlay's identity.
    pub name_hash: i32,
}

impl OverlayData {
    /// Overlay payload with the hash derived from the name.
    pub fn new(overlay_name: impl Into<String>) -> Self {
        let overlay_name = overlay_name.into();
        let name_hash = name_hash(&overlay_name);
        Self {
            overlay_name,
            name_hash,
        }
    }
}

/// Whether a recipe is a plain base recipe or a wardrobe item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    /// A base recipe (whole-character layout).
    Base,
    /// A wardrobe recipe occupying a wardrobe slot.
    Wardrobe,
}

/// Recipe payload.
#[derive(Debug, Clone)]
pub struct RecipeData {
    /// Base or wardrobe.
    pub recipe_kind: RecipeKind,
    /// Wardrobe slot occupied, for wardrobe recipes.
    pub wardrobe_slot: Option<String>,
    /// Slots hidden while the recipe is worn.
    pub hides: Vec<String>,
    /// Races the recipe is compatible with.
    pub compatible_races: Vec<String>,
}

impl RecipeData {
    /// An empty base recipe.
    pub fn base() -> Self {
        Self {
            recipe_kind: RecipeKind::Base,
            wardrobe_slot: None,
            hides: Vec::new(),
            compatible_races: Vec::new(),
        }
    }
}

/// Animator controller payload.
#[derive(Debug, Clone)]
pub struct AnimatorData {
    /// Controller name.
    pub controller_name: String,
}

/// Typed payload carried by an [`Asset`].
#[derive(Debug, Clone)]
pub enum AssetPayload {
    /// See [`RaceData`].
    Race(RaceData),
    /// See [`SlotData`].
    Slot(SlotData),
    /// See [`OverlayData`].
    Overlay(OverlayData),
    /// See [`RecipeData`].
    Recipe(RecipeData),
    /// See [`AnimatorData`].
    Animator(AnimatorData),
    /// Anything else the streamer moves around without interpreting.
    Opaque(Vec<u8>),
}

impl AssetPayload {
    /// The asset kind this payload belongs to.
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Race(_) => AssetKind::Race,
            Self::Slot(_) => AssetKind::Slot,
            Self::Overlay(_) => AssetKind::Overlay,
            Self::Recipe(_) => AssetKind::WardrobeRecipe,
            Self::Animator(_) => AssetKind::AnimatorController,
            Self::Opaque(_) => AssetKind::Other,
        }
    }
}

/// A loaded (or synthesized) asset.
#[derive(Debug)]
pub struct Asset {
    /// On-disk asset name, or the requested name for placeholders.
    pub name: String,
    /// Hash of `name`; for placeholders, the precomputed target hash.
    pub name_hash: i32,
    /// Asset kind.
    pub kind: AssetKind,
    /// True while this asset is a synthesized stand-in.
    pub placeholder: bool,
    /// The typed payload.
    pub payload: AssetPayload,
}

/// Shared, immutable reference to an [`Asset`].
pub type AssetHandle = Arc<Asset>;

impl Asset {
    /// A real asset as loaded from an archive.
    pub fn real(name: impl Into<String>, payload: AssetPayload) -> AssetHandle {
        let name = name.into();
        let hash = name_hash(&name);
        Arc::new(Self {
            kind: payload.kind(),
            name,
            name_hash: hash,
            placeholder: false,
            payload,
        })
    }

    pub(crate) fn placeholder(
        name: impl Into<String>,
        name_hash: i32,
        payload: AssetPayload,
    ) -> AssetHandle {
        Arc::new(Self {
            kind: payload.kind(),
            name: name.into(),
            name_hash,
            placeholder: true,
            payload,
        })
    }

    /// The semantic name identity is derived from, where that differs
    /// from the asset name (races, slots, overlays).
    pub fn semantic_name(&self) -> &str {
        match &self.payload {
            AssetPayload::Race(race) => &race.race_name,
            AssetPayload::Slot(slot) => &slot.slot_name,
            AssetPayload::Overlay(overlay) => &overlay.overlay_name,
            _ => &self.name,
        }
    }

    /// Identity hash under the per-kind rule: races, slots and overlays
    /// hash their semantic name field, everything else its asset name.
    pub fn identity_hash(&self) -> i32 {
        match &self.payload {
            AssetPayload::Race(race) => name_hash(&race.race_name),
            AssetPayload::Slot(slot) => slot.name_hash,
            AssetPayload::Overlay(overlay) => overlay.name_hash,
            _ => self.name_hash,
        }
    }
}
