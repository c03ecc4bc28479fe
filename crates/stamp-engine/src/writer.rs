//! Flattens placed elements into a page of an lopdf document.
//!
//! Images become image XObjects (Flate-compressed RGB plus a DeviceGray soft
//! mask when the bitmap has transparency). Text becomes a Helvetica text run.
//! The page's existing content is wrapped in `q ... Q` and one new content
//! stream carrying every stamp is appended after it.

use crate::bitmap::{self, RgbaImage};
use crate::element::{ImageElement, PlacedElement, TextElement};
use crate::geometry::{DisplayScale, PageBox, PageFrame, Rotation, LETTER};
use crate::{EngineError, EngineResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Page tree attributes are inherited through at most this many parents.
const MAX_TREE_DEPTH: usize = 32;

const IMAGE_PREFIX: &str = "StampIm";
const FONT_PREFIX: &str = "StampF";

/// Looks up `key` on the page or the nearest ancestor that defines it.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(|parent| parent.as_reference()).ok();
    }
    None
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn read_box(doc: &Document, object: &Object) -> Option<PageBox> {
    let values = resolve(doc, object).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }

    let mut corners = [0.0f32; 4];
    for (slot, value) in corners.iter_mut().zip(values) {
        *slot = resolve(doc, value).as_float().ok()?;
    }

    let page_box = PageBox::from_corners(corners[0], corners[1], corners[2], corners[3]);
    let size = page_box.size();
    (size.width_pt > 0.0 && size.height_pt > 0.0).then_some(page_box)
}

/// Visible box of a page: the CropBox if it has one, else the MediaBox.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .into_iter()
        .find_map(|key| {
            inherited_attribute(doc, page_id, key).and_then(|object| read_box(doc, object))
        })
        .unwrap_or(LETTER)
}

/// The page's `/Rotate`, inherited like the boxes.
pub(crate) fn page_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|object| resolve(doc, object).as_i64().ok())
        .map(Rotation::from_degrees)
        .unwrap_or_default()
}

/// Visible box and rotation of a page.
pub(crate) fn page_frame(doc: &Document, page_id: ObjectId) -> PageFrame {
    PageFrame::new(page_box(doc, page_id), page_rotation(doc, page_id))
}

/// Writes `elements` onto the page. Does nothing when `elements` is empty.
pub(crate) fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    frame: PageFrame,
    scale: DisplayScale,
    elements: &[PlacedElement],
) -> EngineResult<()> {
    if elements.is_empty() {
        return Ok(());
    }

    let mut resources = page_resources(doc, page_id)?;
    let mut xobjects = sub_dictionary(doc, &resources, b"XObject")?;
    let mut fonts = sub_dictionary(doc, &resources, b"Font")?;
    let mut font_name: Option<String> = None;

    let mut operations = vec![Operation::new("Q", vec![])];

    for element in elements {
        match element {
            PlacedElement::Image(image) => {
                let name = unused_name(&xobjects, IMAGE_PREFIX);
                let (image_id, width_pt, height_pt) = embed_image(doc, image, scale)?;
                xobjects.set(name.as_bytes().to_vec(), image_id);

                let matrix = frame.image_matrix(scale.to_page(image.position), width_pt, height_pt);
                tracing::debug!(%name, ?matrix, rotation = frame.rotation.degrees(), "stamping image");
                operations.extend(image_operations(&name, matrix));
            }
            PlacedElement::Text(text) => {
                let name = match &font_name {
                    Some(name) => name.clone(),
                    None => {
                        let name = unused_name(&fonts, FONT_PREFIX);
                        let font_id = doc.add_object(helvetica());
                        fonts.set(name.as_bytes().to_vec(), font_id);
                        font_name = Some(name.clone());
                        name
                    }
                };

                let matrix = frame.text_matrix(scale.to_page(text.position));
                tracing::debug!(font = %name, ?matrix, size = text.font_size, "stamping text");
                operations.extend(text_operations(&name, matrix, text));
            }
        }
    }

    let stamp = Content { operations }.encode()?;
    let stamp_id = doc.add_object(Stream::new(Dictionary::new(), stamp));
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    resources.set("XObject", xobjects);
    resources.set("Font", fonts);

    let mut contents = vec![Object::Reference(save_id)];
    contents.extend(existing_contents(doc, page_id)?);
    contents.push(Object::Reference(stamp_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", resources);
    page.set("Contents", contents);

    Ok(())
}

/// The page's resource dictionary as an owned copy, pulling inherited
/// resources down from the page tree.
fn page_resources(doc: &Document, page_id: ObjectId) -> EngineResult<Dictionary> {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(object) => Ok(resolve(doc, object).as_dict()?.clone()),
        None => Ok(Dictionary::new()),
    }
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> EngineResult<Dictionary> {
    match resources.get(key) {
        Ok(object) => Ok(resolve(doc, object).as_dict()?.clone()),
        Err(_) => Ok(Dictionary::new()),
    }
}

/// Current content stream references of the page, flattened.
fn existing_contents(doc: &Document, page_id: ObjectId) -> EngineResult<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Object::Array(items) => Ok(items.clone()),
        _ => Err(EngineError::MalformedPage("/Contents is neither a stream nor an array")),
    }
}

fn unused_name(dict: &Dictionary, prefix: &str) -> String {
    let mut index = 1;
    loop {
        let name = format!("{prefix}{index}");
        if !dict.has(name.as_bytes()) {
            return name;
        }
        index += 1;
    }
}

/// Resamples the element from its original bitmap and adds it as an XObject.
///
/// Returns the object id and the drawn size in points.
fn embed_image(
    doc: &mut Document,
    element: &ImageElement,
    scale: DisplayScale,
) -> EngineResult<(ObjectId, f32, f32)> {
    let pixels = bitmap::resize(Some(&*element.original), element.scale).ok_or_else(|| {
        EngineError::InvalidElement(format!("image scale {} is not positive", element.scale))
    })?;

    let image_id = add_image_xobject(doc, &pixels)?;
    Ok((image_id, scale.to_points(pixels.width() as f32), scale.to_points(pixels.height() as f32)))
}

fn add_image_xobject(doc: &mut Document, pixels: &RgbaImage) -> EngineResult<ObjectId> {
    let (width, height) = pixels.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in pixels.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if alpha.iter().any(|&a| a != u8::MAX) {
        let mut mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        );
        mask.compress()?;
        image_dict.set("SMask", doc.add_object(mask));
    }

    let mut image = Stream::new(image_dict, rgb);
    image.compress()?;
    Ok(doc.add_object(image))
}

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

fn matrix_operands(matrix: [f32; 6]) -> Vec<Object> {
    matrix.into_iter().map(Object::from).collect()
}

fn image_operations(name: &str, matrix: [f32; 6]) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("cm", matrix_operands(matrix)),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn text_operations(font: &str, matrix: [f32; 6], text: &TextElement) -> Vec<Operation> {
    let color = text.color;
    vec![
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), text.font_size.into()]),
        Operation::new("Tm", matrix_operands(matrix)),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&text.content), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// Encodes text for a WinAnsi simple font. Unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => match c {
                '€' => 0x80,
                '‚' => 0x82,
                '„' => 0x84,
                '…' => 0x85,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '™' => 0x99,
                '\t' => b' ',
                _ => b'?',
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(attributes: Dictionary) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut page = dictionary! { "Type" => "Page", "Parent" => pages_id };
        for (key, value) in attributes.iter() {
            page.set(key.clone(), value.clone());
        }
        let page_id = doc.add_object(page);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            }),
        );
        (doc, page_id)
    }

    #[test]
    fn page_box_is_inherited_from_parent() {
        let (doc, page_id) = page_with(Dictionary::new());

        assert_eq!(page_box(&doc, page_id), PageBox::from_corners(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn crop_box_wins_over_media_box() {
        let (doc, page_id) = page_with(dictionary! {
            "CropBox" => vec![10.into(), 20.into(), 110.into(), 220.into()],
        });

        assert_eq!(page_box(&doc, page_id), PageBox::from_corners(10.0, 20.0, 110.0, 220.0));
    }

    #[test]
    fn degenerate_box_falls_back() {
        let (doc, page_id) = page_with(dictionary! {
            "CropBox" => vec![0.into(), 0.into(), 0.into(), 0.into()],
        });

        assert_eq!(page_box(&doc, page_id), PageBox::from_corners(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn rotation_is_inherited_and_normalized() {
        let (mut doc, page_id) = page_with(Dictionary::new());
        assert_eq!(page_rotation(&doc, page_id), Rotation::None);

        let pages_id = doc
            .get_dictionary(page_id)
            .and_then(|page| page.get(b"Parent"))
            .and_then(Object::as_reference)
            .expect("page has a parent");
        doc.get_dictionary_mut(pages_id).expect("pages node").set("Rotate", -90);

        let frame = page_frame(&doc, page_id);
        assert_eq!(frame.rotation, Rotation::ThreeQuarters);
        assert_eq!(frame.page_box, PageBox::from_corners(0.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn unused_name_skips_taken_names() {
        let taken = dictionary! { "StampIm1" => 1, "StampIm2" => 2 };

        assert_eq!(unused_name(&taken, IMAGE_PREFIX), "StampIm3");
        assert_eq!(unused_name(&Dictionary::new(), FONT_PREFIX), "StampF1");
    }

    #[test]
    fn win_ansi_maps_latin_and_replaces_the_rest() {
        assert_eq!(encode_win_ansi("Hi é"), vec![b'H', b'i', b' ', 0xE9]);
        assert_eq!(encode_win_ansi("€ — ✓"), vec![0x80, b' ', 0x97, b' ', b'?']);
        assert_eq!(encode_win_ansi("a\nb"), b"ab".to_vec());
    }

    #[test]
    fn opaque_images_have_no_soft_mask() {
        let (mut doc, _) = page_with(Dictionary::new());
        let opaque = RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 255]));

        let id = add_image_xobject(&mut doc, &opaque).expect("xobject should be added");
        let stream = doc.get_object(id).and_then(Object::as_stream).expect("image is a stream");

        assert!(stream.dict.get(b"SMask").is_err());
        assert_eq!(stream.dict.get(b"Width").and_then(Object::as_i64).ok(), Some(4));
    }

    #[test]
    fn translucent_images_carry_a_soft_mask() {
        let (mut doc, _) = page_with(Dictionary::new());
        let translucent = RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 10]));

        let id = add_image_xobject(&mut doc, &translucent).expect("xobject should be added");
        let stream = doc.get_object(id).and_then(Object::as_stream).expect("image is a stream");
        let mask_id = stream.dict.get(b"SMask").and_then(Object::as_reference).expect("mask ref");
        let mask = doc.get_object(mask_id).and_then(Object::as_stream).expect("mask is a stream");

        assert_eq!(mask.dict.get(b"ColorSpace").and_then(Object::as_name).ok(), Some(&b"DeviceGray"[..]));
        assert_eq!(mask.decompressed_content().expect("mask inflates"), vec![10u8; 9]);
    }
}
