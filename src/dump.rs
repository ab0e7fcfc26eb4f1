//
// dump.rs
// Dicom-Study-rs
//
// Renders the human-readable dump of one instance, including sequences, pointing at extracted binary items.
//
// Thales Matheus Mendonça Santos - November 2025

use std::io::{self, Write};

use dicom::core::value::Value;
use dicom::core::{PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::InMemDicomObject;

use crate::binary::{format_tag, BinaryStore, BINARY_INLINE_THRESHOLD};
use crate::dicom_access::PIXEL_DATA;
use crate::dictionary::FieldDictionary;

/// Longest value preview printed before truncating.
pub const MAX_VALUE_LEN: usize = 64;

/// Whether a primitive value is spilled to a binary item instead of being kept inline.
pub fn is_out_of_line(tag: Tag, vr: VR, len: usize) -> bool {
    let binary_vr = matches!(
        vr,
        VR::OB | VR::OW | VR::OF | VR::OD | VR::OL | VR::OV | VR::UN
    );
    binary_vr && (tag == PIXEL_DATA || len >= BINARY_INLINE_THRESHOLD)
}

/// Walks the object in the same order as extraction, so binary item numbers line up.
pub struct InstanceDump<'a> {
    dictionary: &'a FieldDictionary,
    binaries: &'a BinaryStore,
    next_item: usize,
}

impl<'a> InstanceDump<'a> {
    pub fn new(dictionary: &'a FieldDictionary, binaries: &'a BinaryStore) -> Self {
        Self {
            dictionary,
            binaries,
            next_item: 0,
        }
    }

    pub fn write_object(
        &mut self,
        obj: &InMemDicomObject<StandardDataDictionary>,
        depth: usize,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        for elem in obj.iter() {
            let tag = elem.header().tag;
            let vr = elem.header().vr;
            let name = self.dictionary.tag_name(tag);
            let indent = "  ".repeat(depth + 1);

            match elem.value() {
                Value::Primitive(p) => {
                    let preview = if is_out_of_line(tag, vr, p.to_bytes().len()) {
                        self.take_items(1)
                    } else {
                        preview_primitive(p, MAX_VALUE_LEN)
                    };
                    writeln!(out, "{}{} {} {} {}", indent, format_tag(tag), name, vr, preview)?;
                }
                Value::Sequence(seq) => {
                    writeln!(
                        out,
                        "{}{} {} {} [sequence: {} item(s)]",
                        indent,
                        format_tag(tag),
                        name,
                        vr,
                        seq.items().len()
                    )?;
                    for (idx, item) in seq.items().iter().enumerate() {
                        writeln!(out, "{}  Item {}", indent, idx + 1)?;
                        self.write_object(item, depth + 2, out)?;
                    }
                }
                Value::PixelSequence(p) => {
                    let fragments = p.fragments().len();
                    writeln!(
                        out,
                        "{}{} {} {} [encapsulated: {} fragment(s)] {}",
                        indent,
                        format_tag(tag),
                        name,
                        vr,
                        fragments,
                        self.take_items(fragments)
                    )?;
                }
            }
        }
        Ok(())
    }

    fn take_items(&mut self, count: usize) -> String {
        let first = self.next_item;
        self.next_item += count;
        let size: usize = self
            .binaries
            .items()
            .iter()
            .skip(first)
            .take(count)
            .map(|item| item.size)
            .sum();
        match count {
            0 => "[no binary items]".to_string(),
            1 => format!("[binary item {}: {} bytes]", first, size),
            _ => format!(
                "[binary items {}-{}: {} bytes]",
                first,
                first + count - 1,
                size
            ),
        }
    }
}

fn preview_primitive(value: &PrimitiveValue, max_value_len: usize) -> String {
    let text = value.to_str();
    if !text.is_empty() {
        return truncate(&text, max_value_len);
    }

    let bytes = value.to_bytes();
    format!("{} bytes", bytes.len())
}

fn truncate(input: &str, limit: usize) -> String {
    match input.char_indices().nth(limit) {
        None => input.to_string(),
        Some((cut, _)) => {
            let mut truncated = input[..cut].to_string();
            truncated.push('…');
            truncated
        }
    }
}
