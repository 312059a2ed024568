//! Human-readable debug dump.
//!
//! [`DebugEncoder`] renders grammar calls as indented text, one leaf per
//! line. The text is meant for people and is never parsed back.
//!
//! ```text
//! {
//!   id: 7
//!   name: "seven"
//!   tags: [
//!     "a"
//!   ]
//!   note: none
//!   shape: Circle 1.5
//! }
//! ```
//!
//! Objects and maps use braces, tuples use parentheses and lists use
//! brackets. A present optional prints as `some <value>`, a variant as its
//! label followed by the payload of the active arm.

use crate::grammar::{Region, RegionStack, Scalar, Transcoder, TrivialLayout};
use crate::options::DebugOptions;
use crate::Result;
use std::fmt::Write as _;

/// Per-region dump state.
#[derive(Debug)]
enum Mark {
    Plain,
    Variant { active: usize, written: usize },
}

/// Encoder that writes the indentation-based debug text.
///
/// Writing to a `String` cannot fail, so every call returns `Ok`.
#[derive(Debug)]
pub struct DebugEncoder {
    output: String,
    options: DebugOptions,
    depth: usize,
    prefix: String,
    regions: RegionStack<Mark>,
}

impl Default for DebugEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DebugOptions::default())
    }

    #[must_use]
    pub fn with_options(options: DebugOptions) -> Self {
        DebugEncoder {
            output: String::new(),
            options,
            depth: 0,
            prefix: String::new(),
            regions: RegionStack::new(),
        }
    }

    /// Returns the dump. Panics if a region is still open.
    #[must_use]
    pub fn into_string(self) -> String {
        self.regions.assert_closed();
        self.output
    }

    /// Returns whatever was rendered so far, even with regions still open.
    #[must_use]
    pub fn into_partial_string(self) -> String {
        self.output
    }

    fn line(&mut self, text: &str) {
        let width = self.depth * self.options.indent;
        self.output.extend(std::iter::repeat(' ').take(width));
        self.output.push_str(&self.prefix);
        self.output.push_str(text);
        self.output.push('\n');
        self.prefix.clear();
    }

    fn open(&mut self, region: Region, bracket: &str) {
        self.line(bracket);
        self.depth += 1;
        self.regions.push(region, Mark::Plain);
    }

    fn close(&mut self, region: Region, bracket: &str) {
        self.regions.pop(region);
        self.prefix.clear();
        self.depth -= 1;
        self.line(bracket);
    }

    fn member(&mut self, region: Region, label: String) {
        self.regions.top_mut(region);
        self.prefix = label;
    }
}

impl Transcoder for DebugEncoder {
    const DECODING: bool = false;

    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()> {
        let mut text = value.to_string();
        if self.options.show_kinds {
            let _ = write!(text, "{}", S::KIND);
        }
        self.line(&text);
        Ok(())
    }

    fn boolean(&mut self, value: &mut bool) -> Result<()> {
        self.line(if *value { "true" } else { "false" });
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        self.line(&format!("{value:?}"));
        Ok(())
    }

    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let label = labels.get(*index).copied().unwrap_or("?");
        self.line(label);
        Ok(())
    }

    fn optional_begin(&mut self, present: &mut bool) -> Result<()> {
        if *present {
            self.prefix.push_str("some ");
        } else {
            self.line("none");
        }
        self.regions.push(Region::Optional, Mark::Plain);
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Optional);
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let label = labels.get(*index).copied().unwrap_or("?");
        self.prefix.push_str(label);
        self.prefix.push(' ');
        let written = self.output.len();
        self.regions.push(
            Region::Variant,
            Mark::Variant {
                active: *index,
                written,
            },
        );
        Ok(())
    }

    fn variant_arm(&mut self, index: usize) -> Result<bool> {
        match self.regions.top_mut(Region::Variant) {
            Mark::Variant { active, .. } => Ok(*active == index),
            Mark::Plain => unreachable!("variant regions always hold Mark::Variant"),
        }
    }

    fn variant_end(&mut self) -> Result<()> {
        if let Mark::Variant { written, .. } = self.regions.pop(Region::Variant) {
            // An arm without payload still prints its label.
            if self.output.len() == written {
                let label = std::mem::take(&mut self.prefix);
                self.line(label.trim_end());
            }
        }
        Ok(())
    }

    fn object_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.open(Region::Object, "{");
        Ok(())
    }

    fn object_field(&mut self, key: &str) -> Result<()> {
        self.member(Region::Object, format!("{key}: "));
        Ok(())
    }

    fn object_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.close(Region::Object, "}");
        Ok(())
    }

    fn tuple_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.open(Region::Tuple, "(");
        Ok(())
    }

    fn tuple_element(&mut self) -> Result<()> {
        self.member(Region::Tuple, String::new());
        Ok(())
    }

    fn tuple_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.close(Region::Tuple, ")");
        Ok(())
    }

    fn list_begin(&mut self, _trivial: bool) -> Result<()> {
        self.open(Region::List, "[");
        Ok(())
    }

    fn list_next(&mut self) -> Result<bool> {
        self.member(Region::List, String::new());
        Ok(true)
    }

    fn list_end(&mut self) -> Result<()> {
        self.close(Region::List, "]");
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        self.open(Region::Map, "{");
        Ok(())
    }

    fn map_entry(&mut self, key: &mut String) -> Result<bool> {
        self.member(Region::Map, format!("{key:?}: "));
        Ok(true)
    }

    fn map_end(&mut self) -> Result<()> {
        self.close(Region::Map, "}");
        Ok(())
    }

    fn binary_header(&mut self, _stride: usize, _count: &mut usize, _fixed: bool) -> Result<()> {
        Ok(())
    }

    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()> {
        let mut text = String::with_capacity(2 + bytes.len() * 2);
        text.push_str("0x");
        for byte in bytes.iter() {
            let _ = write!(text, "{byte:02x}");
        }
        self.line(&text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_debug_string, to_debug_string_with_options, ByteArray, Shape};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Record {
        id: u32,
        name: String,
        tags: Vec<String>,
        note: Option<String>,
    }

    impl Shape for Record {
        fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
            t.object_begin(None)?;
            t.object_field("id")?;
            self.id.shape(t)?;
            t.object_field("name")?;
            self.name.shape(t)?;
            t.object_field("tags")?;
            self.tags.shape(t)?;
            t.object_field("note")?;
            self.note.shape(t)?;
            t.object_end(None)
        }
    }

    #[test]
    fn test_object_dump() {
        let mut record = Record {
            id: 7,
            name: "seven".to_string(),
            tags: vec!["a".to_string()],
            note: None,
        };
        assert_eq!(
            to_debug_string(&mut record),
            "{\n  id: 7\n  name: \"seven\"\n  tags: [\n    \"a\"\n  ]\n  note: none\n}\n"
        );
    }

    #[test]
    fn test_present_optional_and_map() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Some(1.5f64));
        assert_eq!(to_debug_string(&mut map), "{\n  \"k\": some 1.5\n}\n");
    }

    #[test]
    fn test_kinds_and_binary() {
        let options = DebugOptions::new().with_kinds(true).with_indent(1);
        let mut value = (3i16, ByteArray([0xde, 0xad]));
        assert_eq!(
            to_debug_string_with_options(&mut value, options),
            "(\n 3i16\n 0xdead\n)\n"
        );
    }

    #[test]
    fn test_variant_without_payload_prints_label() {
        let mut encoder = DebugEncoder::new();
        let mut index = 1;
        encoder.variant_begin(&["On", "Off"], &mut index).unwrap();
        assert!(!encoder.variant_arm(0).unwrap());
        assert!(encoder.variant_arm(1).unwrap());
        encoder.variant_end().unwrap();
        assert_eq!(encoder.into_string(), "Off\n");
    }
}
