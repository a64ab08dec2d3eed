// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Defines primitives in control files.

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html>
for the canonical source of truth for how control files work.

The parser in this module never rejects a paragraph because of its structure.
Lines lacking a colon become fields with empty values and repeated fields
overwrite earlier occurrences.
*/

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    io::Write,
};

/// A field in a control file.
///
/// Multiple line values are stored with continuation lines stripped of their
/// leading and trailing whitespace and joined by `\n`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlField {
    name: String,
    value: String,
}

impl ControlField {
    /// Construct an instance from a field name and value.
    pub fn new(name: impl ToString, value: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// The name of this field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Obtain the value as a [&str].
    pub fn value_str(&self) -> &str {
        &self.value
    }

    /// Obtain an iterator of lines in the value.
    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.value.split('\n')
    }

    /// Obtain an iterator of words in the value.
    pub fn iter_words(&self) -> impl Iterator<Item = &str> {
        self.value.split_ascii_whitespace()
    }

    /// Write the contents of this field to a writer.
    ///
    /// Lines after the first are indented by a single space so the value survives
    /// a subsequent parse.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(b": ")?;

        for (i, line) in self.iter_lines().enumerate() {
            if i > 0 {
                writer.write_all(b"\n ")?;
            }
            writer.write_all(line.as_bytes())?;
        }

        writer.write_all(b"\n")
    }
}

impl Display for ControlField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.name)?;

        for (i, line) in self.iter_lines().enumerate() {
            if i > 0 {
                f.write_str("\n ")?;
            }
            f.write_str(line)?;
        }

        f.write_str("\n")
    }
}

/// A paragraph in a control file.
///
/// A paragraph is an ordered series of control fields. Field names are case
/// sensitive and unique: setting a field that already exists replaces it.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlParagraph {
    fields: Vec<ControlField>,
}

impl ControlParagraph {
    /// Parse a single paragraph from raw bytes.
    ///
    /// Empty lines are ignored. Lines beginning with a space or tab continue the value of
    /// the field defined on the preceding line. A line without a `:` is recorded as a
    /// field with an empty value. If a field occurs multiple times, the last occurrence
    /// wins.
    ///
    /// Bytes that aren't valid UTF-8 are replaced with U+FFFD.
    pub fn parse_bytes(data: &[u8]) -> Self {
        Self::parse_str(&String::from_utf8_lossy(data))
    }

    /// Parse a single paragraph from a string.
    ///
    /// See [Self::parse_bytes()] for parsing rules.
    pub fn parse_str(s: &str) -> Self {
        let mut paragraph = Self::default();
        let mut lines = s.lines().peekable();

        while let Some(line) = lines.next() {
            if line.is_empty() {
                continue;
            }

            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name.trim(), value.trim()),
                None => {
                    paragraph.set_field_from_string(line.trim(), "");
                    continue;
                }
            };

            let mut value = value.to_string();

            while let Some(continuation) = lines.next_if(|l| l.starts_with([' ', '\t'])) {
                value.push('\n');
                value.push_str(continuation.trim());
            }

            paragraph.set_field_from_string(name, value);
        }

        paragraph
    }

    /// Whether the paragraph is empty.
    ///
    /// Empty is defined by the lack of any fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The number of fields in this paragraph.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Set the value of a field via a [ControlField].
    ///
    /// An existing field with the same name is replaced in place, preserving its
    /// position in the paragraph.
    pub fn set_field(&mut self, field: ControlField) {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
    }

    /// Set the value of a field defined via strings.
    pub fn set_field_from_string(&mut self, name: impl ToString, value: impl ToString) {
        self.set_field(ControlField::new(name, value));
    }

    /// Remove a field, returning it if present.
    pub fn remove_field(&mut self, name: &str) -> Option<ControlField> {
        let index = self.fields.iter().position(|f| f.name == name)?;

        Some(self.fields.remove(index))
    }

    /// Whether a named field is present in this paragraph.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterate over fields in this paragraph.
    ///
    /// Iteration order is insertion order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField> {
        self.fields.iter()
    }

    /// Obtain the field with a given name in this paragraph.
    pub fn field(&self, name: &str) -> Option<&ControlField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Obtain the raw string value of the named field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value_str())
    }

    /// Obtain an iterator of lines in the named field.
    pub fn field_iter_value_lines(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        self.field(name).map(|f| f.iter_lines())
    }

    /// Convert this paragraph to a [HashMap].
    pub fn as_str_hash_map(&self) -> HashMap<&str, &str> {
        HashMap::from_iter(
            self.fields
                .iter()
                .map(|field| (field.name.as_str(), field.value_str())),
        )
    }

    /// Serialize the paragraph to a writer.
    ///
    /// A trailing newline is written as part of the final field. However, an
    /// extra newline is not present. So if serializing multiple paragraphs, an
    /// additional line break must be written to effectively terminate this paragraph
    /// if the writer is not at EOF.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for field in &self.fields {
            field.write(writer)?;
        }

        Ok(())
    }
}

impl Display for ControlParagraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for field in &self.fields {
            write!(f, "{}", field)?;
        }

        Ok(())
    }
}
