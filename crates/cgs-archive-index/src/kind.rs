use serde::{Deserialize, Serialize};

/// Closed enumeration of the asset kinds the streamer knows how to
/// synthesize placeholders for and promote.
///
/// Adding a kind means extending this enum and the two `match`es that
/// dispatch on it (synthesis and promotion); there is no open-ended
/// type inspection anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// A race definition, the root of a character.
    Race,
    /// A mesh slot.
    Slot,
    /// A texture overlay.
    Overlay,
    /// A wardrobe or base recipe.
    WardrobeRecipe,
    /// An animator controller.
    AnimatorController,
    /// Anything else; resolved and promoted by name only.
    Other,
}

impl AssetKind {
    /// Kinds whose identity is the hash of a semantic name field that
    /// may legitimately differ from the on-disk asset name.
    pub fn identity_is_hash(self) -> bool {
        matches!(self, Self::Race | Self::Slot | Self::Overlay)
    }
}

/// Stable 32-bit FNV-1a hash of an asset's semantic name.
///
/// This is the system-wide identity hash: the index records it per
/// asset at build time and the runtime derives the same value from
/// request names, so the two sides agree without loading anything.
pub fn name_hash(name: &str) -> i32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    let mut hash = OFFSET_BASIS;
    for byte in name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_hash_is_stable_and_distinct() {
        assert_eq!(name_hash("Boots"), name_hash("Boots"));
        assert_ne!(name_hash("Boots"), name_hash("Boots_Slot"));
        assert_ne!(name_hash("boots"), name_hash("Boots"));
    }

    #[test]
    fn identity_rule_per_kind() {
        assert!(AssetKind::Race.identity_is_hash());
        assert!(AssetKind::Slot.identity_is_hash());
        assert!(AssetKind::Overlay.identity_is_hash());
        assert!(!AssetKind::WardrobeRecipe.identity_is_hash());
        assert!(!AssetKind::AnimatorController.identity_is_hash());
        assert!(!AssetKind::Other.identity_is_hash());
    }
}
