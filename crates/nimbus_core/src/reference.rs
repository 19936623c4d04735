//! Lazy cross-references between declared fragments.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Wire key for a plain reference.
pub const REF_KEY: &str = "Ref";

/// Wire key for an attribute reference.
pub const GET_ATT_KEY: &str = "Fn::GetAtt";

/// A symbolic pointer to a named fragment, optionally to one of its attributes.
///
/// Only the name and attribute are stored. Nothing is looked up when the
/// reference is created, so it may point at a fragment declared later (or
/// never declared at all).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    name: String,
    attribute: Option<String>,
}

impl Reference {
    /// Plain reference to a parameter or resource.
    pub fn to(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: None,
        }
    }

    /// Reference to a runtime attribute of a resource.
    pub fn attribute_of(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: Some(attribute.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Whether the reference targets an `AWS::` pseudo parameter.
    pub fn is_pseudo_parameter(&self) -> bool {
        self.name.starts_with("AWS::")
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{}.{}", self.name, attribute),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match &self.attribute {
            Some(attribute) => map.serialize_entry(GET_ATT_KEY, &[&self.name, attribute])?,
            None => map.serialize_entry(REF_KEY, &self.name)?,
        }
        map.end()
    }
}

/// Returned by every section builder; names the declared fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    name: String,
}

impl Handle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{"Ref": name}` for this fragment.
    pub fn reference(&self) -> Reference {
        Reference::to(&self.name)
    }

    /// `{"Fn::GetAtt": [name, attribute]}` for this fragment.
    pub fn attribute(&self, attribute: impl Into<String>) -> Reference {
        Reference::attribute_of(&self.name, attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reference_wire_form() {
        let json = serde_json::to_string(&Reference::to("Size")).unwrap();
        assert_eq!(json, r#"{"Ref":"Size"}"#);
    }

    #[test]
    fn test_attribute_reference_wire_form() {
        let handle = Handle::new("Foo");
        let json = serde_json::to_string(&handle.attribute("GroupId")).unwrap();
        assert_eq!(json, r#"{"Fn::GetAtt":["Foo","GroupId"]}"#);
    }

    #[test]
    fn test_pseudo_parameter() {
        assert!(Reference::to("AWS::Region").is_pseudo_parameter());
        assert!(!Reference::to("Region").is_pseudo_parameter());
    }

    #[test]
    fn test_display() {
        assert_eq!(Reference::to("Vpc").to_string(), "Vpc");
        assert_eq!(Reference::attribute_of("Vpc", "CidrBlock").to_string(), "Vpc.CidrBlock");
    }
}
