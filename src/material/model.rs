use smallvec::SmallVec;

/// Rarity tier of a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Rarity {
    /// Baseline tier.
    Common,
    /// Slightly elevated tier.
    Uncommon,
    /// Noteworthy tier.
    Rare,
    /// Exceptional tier.
    Epic,
    /// Highest tier.
    Legendary,
}

impl Rarity {
    /// Decode a wire rarity byte.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Common),
            1 => Some(Self::Uncommon),
            2 => Some(Self::Rare),
            3 => Some(Self::Epic),
            4 => Some(Self::Legendary),
            _ => None,
        }
    }
}

/// One way a material can drop in the world.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DropSource {
    /// Key of the dropping entity or container.
    pub source: String,
    /// Drop chance in `[0, 1]`.
    pub chance: f32,
    /// Minimum dropped quantity.
    pub min: i32,
    /// Maximum dropped quantity.
    pub max: i32,
}

/// One slot of a recipe ingredient.
///
/// Slots decode to a tagged union: empty padding, a native item reference,
/// or a cross-reference to another asset by identity key.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Ingredient {
    /// Empty padding slot.
    None,
    /// Native item by numeric id.
    Item {
        /// Item id.
        id: i32,
        /// Required quantity.
        quantity: u16,
    },
    /// Cross-reference to another asset/material/bundle by identity.
    CrossReference {
        /// Identity key of the referenced asset.
        key: String,
        /// Required quantity.
        quantity: u16,
    },
}

/// One crafting recipe producing this material.
///
/// Each ingredient owns `alternates + 1` slots; unused slots are padded
/// with [`Ingredient::None`] on the wire.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    /// Alternate count: every ingredient carries this many slots plus one.
    pub alternates: u16,
    /// Per-ingredient slot groups.
    pub ingredients: Vec<SmallVec<[Ingredient; 2]>>,
}

/// Decoded icon image in straight-alpha RGBA8.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IconImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 bytes.
    pub rgba8: Vec<u8>,
}

/// Shared metadata record attached to a projection asset.
///
/// Loaded and unloaded as a unit with the asset; the loader either returns
/// a fully valid record or fails without exposing partial state.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Material {
    /// Globally unique identity key.
    pub identity: String,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Tie-break ordering priority.
    pub priority: i32,
    /// Flag bitset.
    pub flags: u32,
    /// Base monetary value.
    pub value: i32,
    /// Drop sources.
    pub drop_sources: Vec<DropSource>,
    /// Crafting recipes.
    pub recipes: Vec<Recipe>,
    /// Icon image, when the container carries one.
    pub icon: Option<IconImage>,
}
