//! DICOM metadata overrides applied by the server while packaging a series

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use quick_xml::escape::escape;
use std::collections::BTreeMap;

/// What happens to one DICOM element during export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideAction<'a> {
    /// Replace the element value
    Replace(&'a str),
    /// Strip the element value without replacement
    Anonymize,
}

/// Ordered set of element overrides, iterated in ascending tag order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataOverride {
    fields: BTreeMap<Tag, String>,
}

impl MetadataOverride {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides re-identifying a series under a new subject id
    ///
    /// Patient name becomes `<subject>^<subject>`, and patient id and series
    /// description become the subject id.
    pub fn for_subject(subject_id: &str) -> Self {
        let mut overrides = Self::new();
        overrides
            .set(tags::PATIENT_NAME, format!("{subject_id}^{subject_id}"))
            .set(tags::PATIENT_ID, subject_id)
            .set(tags::SERIES_DESCRIPTION, subject_id);
        overrides
    }

    /// Set an element to a literal value; a blank value anonymizes it
    pub fn set(&mut self, tag: Tag, value: impl Into<String>) -> &mut Self {
        self.fields.insert(tag, value.into());
        self
    }

    /// Mark an element for anonymization
    pub fn anonymize(&mut self, tag: Tag) -> &mut Self {
        self.set(tag, String::new())
    }

    /// Number of overridden elements
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no element is overridden
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overrides in ascending tag order
    pub fn iter(&self) -> impl Iterator<Item = (Tag, OverrideAction<'_>)> {
        self.fields.iter().map(|(tag, value)| {
            let action = if value.trim().is_empty() {
                OverrideAction::Anonymize
            } else {
                OverrideAction::Replace(value.as_str())
            };
            (*tag, action)
        })
    }

    /// Render the `<override>` argument of `daris.dicom.download`
    ///
    /// Returns an empty string when there is nothing to override.
    pub fn to_xml(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut xml = String::from("<override>");
        for (tag, action) in self.iter() {
            match action {
                OverrideAction::Replace(value) => xml.push_str(&format!(
                    "<element group=\"{:04x}\" element=\"{:04x}\"><value>{}</value></element>",
                    tag.group(),
                    tag.element(),
                    escape(value)
                )),
                OverrideAction::Anonymize => xml.push_str(&format!(
                    "<element group=\"{:04x}\" element=\"{:04x}\" anonymize=\"true\"/>",
                    tag.group(),
                    tag.element()
                )),
            }
        }
        xml.push_str("</override>");
        xml
    }
}
