//! In-memory template document.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::TemplateError;
use crate::fragment::Fragment;
use crate::reference::Reference;

/// Format version stamped on every template.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Top-level key carrying [`FORMAT_VERSION`].
pub const FORMAT_VERSION_KEY: &str = "AWSTemplateFormatVersion";

/// Top-level key carrying the description.
pub const DESCRIPTION_KEY: &str = "Description";

/// Entries of one section, in declaration order.
pub type SectionEntries = IndexMap<String, Fragment>;

/// Keyed sections of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Mappings,
    Parameters,
    Resources,
    Outputs,
}

impl Section {
    /// Sections in output order.
    pub const ALL: [Section; 4] = [
        Section::Mappings,
        Section::Parameters,
        Section::Resources,
        Section::Outputs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Mappings => "Mappings",
            Section::Parameters => "Parameters",
            Section::Resources => "Resources",
            Section::Outputs => "Outputs",
        }
    }

    /// Singular name used in log and error messages.
    pub fn entry_kind(&self) -> &'static str {
        match self {
            Section::Mappings => "Mapping",
            Section::Parameters => "Parameter",
            Section::Resources => "Resource",
            Section::Outputs => "Output",
        }
    }
}

/// Case-insensitive, accepting `resources` as well as `Resources`.
impl FromStr for Section {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mappings" => Ok(Section::Mappings),
            "parameters" => Ok(Section::Parameters),
            "resources" => Ok(Section::Resources),
            "outputs" => Ok(Section::Outputs),
            _ => Err(TemplateError::UnknownSection(s.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named document with a description and four keyed sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    description: Option<String>,
    mappings: SectionEntries,
    parameters: SectionEntries,
    resources: SectionEntries,
    outputs: SectionEntries,
}

impl Template {
    /// An empty template; every section exists and holds no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            mappings: SectionEntries::new(),
            parameters: SectionEntries::new(),
            resources: SectionEntries::new(),
            outputs: SectionEntries::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format_version(&self) -> &'static str {
        FORMAT_VERSION
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn section(&self, section: Section) -> &SectionEntries {
        match section {
            Section::Mappings => &self.mappings,
            Section::Parameters => &self.parameters,
            Section::Resources => &self.resources,
            Section::Outputs => &self.outputs,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut SectionEntries {
        match section {
            Section::Mappings => &mut self.mappings,
            Section::Parameters => &mut self.parameters,
            Section::Resources => &mut self.resources,
            Section::Outputs => &mut self.outputs,
        }
    }

    /// Insert or replace an entry. A replaced entry keeps its position.
    pub fn insert(
        &mut self,
        section: Section,
        name: impl Into<String>,
        fragment: Fragment,
    ) -> Option<Fragment> {
        self.section_mut(section).insert(name.into(), fragment)
    }

    pub fn fragment(&self, section: Section, name: &str) -> Option<&Fragment> {
        self.section(section).get(name)
    }

    pub fn parameters(&self) -> &SectionEntries {
        &self.parameters
    }

    pub fn resources(&self) -> &SectionEntries {
        &self.resources
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && Section::ALL.iter().all(|s| self.section(*s).is_empty())
    }

    /// Every reference in the template, in document order.
    pub fn references(&self) -> Vec<&Reference> {
        let mut found = Vec::new();
        for section in Section::ALL {
            for fragment in self.section(section).values() {
                for value in fragment.properties().values() {
                    value.visit_references(&mut |r| found.push(r));
                }
            }
        }
        found
    }

    /// References whose target is neither a declared parameter, a declared
    /// resource nor an `AWS::` pseudo parameter. Duplicates are listed once.
    pub fn dangling_references(&self) -> Vec<&Reference> {
        let mut seen = HashSet::new();
        self.references()
            .into_iter()
            .filter(|r| {
                !r.is_pseudo_parameter()
                    && !self.parameters.contains_key(r.name())
                    && !self.resources.contains_key(r.name())
            })
            .filter(|r| seen.insert(*r))
            .collect()
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(FORMAT_VERSION_KEY, FORMAT_VERSION)?;
        if let Some(description) = &self.description {
            map.serialize_entry(DESCRIPTION_KEY, description)?;
        }
        for section in Section::ALL {
            let entries = self.section(section);
            if !entries.is_empty() {
                map.serialize_entry(section.as_str(), entries)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::value::Value;

    #[test]
    fn test_new_template_has_empty_sections() {
        let template = Template::new("Empty");
        assert_eq!(template.format_version(), "2010-09-09");
        assert!(template.is_empty());
        for section in Section::ALL {
            assert!(template.section(section).is_empty());
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut template = Template::new("T");
        template.insert(Section::Resources, "A", Fragment::new(props! { "Type" => "1" }));
        template.insert(Section::Resources, "B", Fragment::new(props! { "Type" => "2" }));
        let previous =
            template.insert(Section::Resources, "A", Fragment::new(props! { "Type" => "3" }));

        assert!(previous.is_some());
        let names: Vec<_> = template.resources().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(
            template.fragment(Section::Resources, "A").unwrap().get("Type"),
            Some(&Value::from("3"))
        );
    }

    #[test]
    fn test_dangling_references() {
        let mut template = Template::new("T");
        template.insert(Section::Parameters, "Size", Fragment::new(props! { "Type" => "Number" }));
        template.insert(
            Section::Resources,
            "Group",
            Fragment::new(props! {
                "Properties" => props! {
                    "Count" => Reference::to("Size"),
                    "Region" => Reference::to("AWS::Region"),
                    "Subnet" => Reference::to("Missing"),
                    "Again" => Reference::attribute_of("Missing", "Id"),
                },
            }),
        );

        let dangling: Vec<_> = template
            .dangling_references()
            .into_iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(dangling, vec!["Missing", "Missing.Id"]);
    }

    #[test]
    fn test_section_from_str() {
        assert_eq!("resources".parse::<Section>().unwrap(), Section::Resources);
        assert_eq!("Outputs".parse::<Section>().unwrap(), Section::Outputs);
        assert!(matches!(
            "Conditions".parse::<Section>(),
            Err(TemplateError::UnknownSection(name)) if name == "Conditions"
        ));
    }
}
