use anyhow::Context;
use smallvec::SmallVec;

use crate::container::source::Stream;
use crate::foundation::error::{HoloreelError, HoloreelResult};
use crate::material::model::{DropSource, IconImage, Ingredient, Material, Rarity, Recipe};

/// Caps applied before allocating from untrusted counts.
const MAX_INGREDIENTS: usize = 256;
const MAX_ALTERNATES: u16 = 63;
const MAX_ICON_BYTES: u32 = 16 * 1024 * 1024;

/// Icon wire formats.
const ICON_NONE: u8 = 0;
const ICON_RGBA32: u8 = 1;
const ICON_PNG: u8 = 2;

/// Read the shared material record from the container body.
///
/// All-or-nothing: any error leaves no partial record with the caller.
pub(crate) fn read_material(stream: &mut Stream) -> HoloreelResult<Material> {
    let identity = stream.read_string()?;
    let name = stream.read_string()?;
    let description = stream.read_string()?;

    let rarity_byte = stream.read_u8()?;
    let rarity = Rarity::from_u8(rarity_byte).ok_or_else(|| {
        HoloreelError::validation(format!("unknown rarity tier {rarity_byte}"))
    })?;

    let priority = stream.read_i32()?;
    let flags = stream.read_u32()?;
    let value = stream.read_i32()?;

    let drop_count = stream.read_u16()?;
    let mut drop_sources = Vec::with_capacity(usize::from(drop_count));
    for _ in 0..drop_count {
        drop_sources.push(read_drop_source(stream)?);
    }

    let recipe_count = stream.read_u16()?;
    let mut recipes = Vec::with_capacity(usize::from(recipe_count));
    for _ in 0..recipe_count {
        recipes.push(read_recipe(stream)?);
    }

    let icon = read_icon(stream)?;

    Ok(Material {
        identity,
        name,
        description,
        rarity,
        priority,
        flags,
        value,
        drop_sources,
        recipes,
        icon,
    })
}

fn read_drop_source(stream: &mut Stream) -> HoloreelResult<DropSource> {
    let source = stream.read_string()?;
    let chance = stream.read_f32()?;
    let min = stream.read_i32()?;
    let max = stream.read_i32()?;
    if !(0.0..=1.0).contains(&chance) {
        return Err(HoloreelError::validation(format!(
            "drop chance {chance} outside [0, 1] for source '{source}'"
        )));
    }
    if min > max {
        return Err(HoloreelError::validation(format!(
            "drop quantity range {min}..={max} is inverted for source '{source}'"
        )));
    }
    Ok(DropSource {
        source,
        chance,
        min,
        max,
    })
}

fn read_recipe(stream: &mut Stream) -> HoloreelResult<Recipe> {
    let alternates = stream.read_u16()?;
    if alternates > MAX_ALTERNATES {
        return Err(HoloreelError::validation(format!(
            "recipe alternate count {alternates} exceeds the cap of {MAX_ALTERNATES}"
        )));
    }
    let ingredient_count = usize::from(stream.read_u16()?);
    if ingredient_count > MAX_INGREDIENTS {
        return Err(HoloreelError::validation(format!(
            "recipe ingredient count {ingredient_count} exceeds the cap of {MAX_INGREDIENTS}"
        )));
    }

    let slots_per_ingredient = usize::from(alternates) + 1;
    let mut ingredients = Vec::with_capacity(ingredient_count);
    for _ in 0..ingredient_count {
        let mut slots = SmallVec::new();
        for _ in 0..slots_per_ingredient {
            slots.push(read_ingredient(stream)?);
        }
        ingredients.push(slots);
    }

    Ok(Recipe {
        alternates,
        ingredients,
    })
}

fn read_ingredient(stream: &mut Stream) -> HoloreelResult<Ingredient> {
    let tag = stream.read_u8()?;
    match tag {
        0 => Ok(Ingredient::None),
        1 => {
            let id = stream.read_i32()?;
            let quantity = stream.read_u16()?;
            Ok(Ingredient::Item { id, quantity })
        }
        2 => {
            let key = stream.read_string()?;
            let quantity = stream.read_u16()?;
            Ok(Ingredient::CrossReference { key, quantity })
        }
        other => Err(HoloreelError::validation(format!(
            "unknown ingredient slot tag {other}"
        ))),
    }
}

fn read_icon(stream: &mut Stream) -> HoloreelResult<Option<IconImage>> {
    let tag = stream.read_u8()?;
    let byte_len = stream.read_u32()?;
    if byte_len > MAX_ICON_BYTES {
        return Err(HoloreelError::validation(format!(
            "icon payload of {byte_len} bytes exceeds the cap of {MAX_ICON_BYTES}"
        )));
    }

    match tag {
        ICON_NONE => {
            stream.skip(u64::from(byte_len))?;
            Ok(None)
        }
        ICON_RGBA32 => {
            let width = stream.read_u32()?;
            let height = stream.read_u32()?;
            let expected = (width as u64)
                .checked_mul(height as u64)
                .and_then(|px| px.checked_mul(4))
                .filter(|&len| len + 8 == u64::from(byte_len))
                .ok_or_else(|| {
                    HoloreelError::validation(format!(
                        "raw icon payload length {byte_len} does not match {width}x{height}"
                    ))
                })?;
            let mut rgba8 = vec![0u8; expected as usize];
            stream.read_exact(&mut rgba8)?;
            Ok(Some(IconImage {
                width,
                height,
                rgba8,
            }))
        }
        ICON_PNG => {
            let mut payload = vec![0u8; byte_len as usize];
            stream.read_exact(&mut payload)?;
            let decoded = image::load_from_memory(&payload)
                .context("decode png icon payload")?
                .to_rgba8();
            let (width, height) = decoded.dimensions();
            Ok(Some(IconImage {
                width,
                height,
                rgba8: decoded.into_raw(),
            }))
        }
        other => Err(HoloreelError::validation(format!(
            "unknown icon format tag {other}"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/material/loader.rs"]
mod tests;
