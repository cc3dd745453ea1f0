use super::*;
use crate::container::source::StreamSource;
use crate::testutil::put_str;

struct MaterialBytes {
    buf: Vec<u8>,
}

impl MaterialBytes {
    fn new() -> Self {
        let mut buf = Vec::new();
        put_str(&mut buf, "gadget.alpha");
        put_str(&mut buf, "Alpha Gadget");
        put_str(&mut buf, "A curious device.");
        Self { buf }
    }

    fn scalars(mut self, rarity: u8, priority: i32, flags: u32, value: i32) -> Self {
        self.buf.push(rarity);
        self.buf.extend_from_slice(&priority.to_le_bytes());
        self.buf.extend_from_slice(&flags.to_le_bytes());
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn no_drops(mut self) -> Self {
        self.buf.extend_from_slice(&0u16.to_le_bytes());
        self
    }

    fn no_recipes(mut self) -> Self {
        self.buf.extend_from_slice(&0u16.to_le_bytes());
        self
    }

    fn no_icon(mut self) -> Self {
        self.buf.push(0);
        self.buf.extend_from_slice(&0u32.to_le_bytes());
        self
    }

    fn parse(self) -> HoloreelResult<Material> {
        let mut stream = Stream::open(&StreamSource::from_bytes(self.buf)).unwrap();
        read_material(&mut stream)
    }
}

#[test]
fn minimal_record_parses() {
    let material = MaterialBytes::new()
        .scalars(2, -5, 0b1010, 1200)
        .no_drops()
        .no_recipes()
        .no_icon()
        .parse()
        .unwrap();

    assert_eq!(material.identity, "gadget.alpha");
    assert_eq!(material.name, "Alpha Gadget");
    assert_eq!(material.rarity, Rarity::Rare);
    assert_eq!(material.priority, -5);
    assert_eq!(material.flags, 0b1010);
    assert_eq!(material.value, 1200);
    assert!(material.drop_sources.is_empty());
    assert!(material.recipes.is_empty());
    assert!(material.icon.is_none());
}

#[test]
fn unknown_rarity_is_a_validation_error() {
    let err = MaterialBytes::new()
        .scalars(9, 0, 0, 0)
        .no_drops()
        .no_recipes()
        .no_icon()
        .parse()
        .unwrap_err();
    assert!(matches!(err, HoloreelError::Validation(_)));
}

#[test]
fn drop_sources_round_trip_and_validate() {
    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0);
    m.buf.extend_from_slice(&1u16.to_le_bytes());
    put_str(&mut m.buf, "cave.chest");
    m.buf.extend_from_slice(&0.25f32.to_le_bytes());
    m.buf.extend_from_slice(&1i32.to_le_bytes());
    m.buf.extend_from_slice(&3i32.to_le_bytes());
    let material = m.no_recipes().no_icon().parse().unwrap();

    assert_eq!(
        material.drop_sources,
        vec![DropSource {
            source: "cave.chest".to_owned(),
            chance: 0.25,
            min: 1,
            max: 3,
        }]
    );
}

#[test]
fn inverted_drop_range_is_rejected() {
    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0);
    m.buf.extend_from_slice(&1u16.to_le_bytes());
    put_str(&mut m.buf, "x");
    m.buf.extend_from_slice(&0.5f32.to_le_bytes());
    m.buf.extend_from_slice(&5i32.to_le_bytes());
    m.buf.extend_from_slice(&2i32.to_le_bytes());
    let err = m.no_recipes().no_icon().parse().unwrap_err();
    assert!(matches!(err, HoloreelError::Validation(_)));
}

#[test]
fn recipe_slots_are_padded_to_alternates_plus_one() {
    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0).no_drops();
    // One recipe, one alternate, two ingredients -> 2 slots each.
    m.buf.extend_from_slice(&1u16.to_le_bytes());
    m.buf.extend_from_slice(&1u16.to_le_bytes()); // alternates
    m.buf.extend_from_slice(&2u16.to_le_bytes()); // ingredients
    // Ingredient 0: item 42 x3, padded with a none slot.
    m.buf.push(1);
    m.buf.extend_from_slice(&42i32.to_le_bytes());
    m.buf.extend_from_slice(&3u16.to_le_bytes());
    m.buf.push(0);
    // Ingredient 1: cross-reference or a native fallback.
    m.buf.push(2);
    put_str(&mut m.buf, "ore.lumen");
    m.buf.extend_from_slice(&2u16.to_le_bytes());
    m.buf.push(1);
    m.buf.extend_from_slice(&7i32.to_le_bytes());
    m.buf.extend_from_slice(&1u16.to_le_bytes());

    let material = m.no_icon().parse().unwrap();
    assert_eq!(material.recipes.len(), 1);
    let recipe = &material.recipes[0];
    assert_eq!(recipe.alternates, 1);
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(
        recipe.ingredients[0].as_slice(),
        &[
            Ingredient::Item {
                id: 42,
                quantity: 3
            },
            Ingredient::None
        ]
    );
    assert_eq!(
        recipe.ingredients[1].as_slice(),
        &[
            Ingredient::CrossReference {
                key: "ore.lumen".to_owned(),
                quantity: 2
            },
            Ingredient::Item { id: 7, quantity: 1 }
        ]
    );
}

#[test]
fn raw_icon_parses_with_length_check() {
    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0).no_drops().no_recipes();
    let pixels = [7u8, 8, 9, 255].repeat(4);
    m.buf.push(1); // raw rgba32
    m.buf.extend_from_slice(&(8 + pixels.len() as u32).to_le_bytes());
    m.buf.extend_from_slice(&2u32.to_le_bytes());
    m.buf.extend_from_slice(&2u32.to_le_bytes());
    m.buf.extend_from_slice(&pixels);
    let material = m.parse().unwrap();
    let icon = material.icon.unwrap();
    assert_eq!((icon.width, icon.height), (2, 2));
    assert_eq!(icon.rgba8, pixels);
}

#[test]
fn raw_icon_with_wrong_length_is_rejected() {
    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0).no_drops().no_recipes();
    m.buf.push(1);
    m.buf.extend_from_slice(&12u32.to_le_bytes()); // 2x2 needs 8 + 16
    m.buf.extend_from_slice(&2u32.to_le_bytes());
    m.buf.extend_from_slice(&2u32.to_le_bytes());
    m.buf.extend_from_slice(&[0u8; 4]);
    let err = m.parse().unwrap_err();
    assert!(matches!(err, HoloreelError::Validation(_)));
}

#[test]
fn png_icon_decodes_through_image() {
    let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 200]));
    let mut png = std::io::Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).unwrap();
    let png = png.into_inner();

    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0).no_drops().no_recipes();
    m.buf.push(2);
    m.buf.extend_from_slice(&(png.len() as u32).to_le_bytes());
    m.buf.extend_from_slice(&png);
    let material = m.parse().unwrap();
    let icon = material.icon.unwrap();
    assert_eq!((icon.width, icon.height), (3, 2));
    assert_eq!(&icon.rgba8[0..4], &[10, 20, 30, 200]);
}

#[test]
fn unknown_ingredient_tag_is_rejected() {
    let mut m = MaterialBytes::new().scalars(0, 0, 0, 0).no_drops();
    m.buf.extend_from_slice(&1u16.to_le_bytes());
    m.buf.extend_from_slice(&0u16.to_le_bytes());
    m.buf.extend_from_slice(&1u16.to_le_bytes());
    m.buf.push(9); // bad slot tag
    let err = m.no_icon().parse().unwrap_err();
    assert!(matches!(err, HoloreelError::Validation(_)));
}
