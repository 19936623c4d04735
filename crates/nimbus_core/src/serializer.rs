//! Rendering templates to their canonical document form.

use crate::error::TemplateResult;
use crate::registry::TemplateRegistry;
use crate::template::Template;

/// Deterministic encoder from registered templates to document text.
///
/// Keys come out as `AWSTemplateFormatVersion`, `Description`, then the
/// non-empty sections in `Mappings`, `Parameters`, `Resources`, `Outputs`
/// order, with entries in declaration order. References are written in their
/// `Ref` / `Fn::GetAtt` form. Rendering never touches the registry.
pub struct Serializer;

impl Serializer {
    /// JSON document for the named template, indented by two spaces.
    pub fn output(registry: &TemplateRegistry, name: &str) -> TemplateResult<String> {
        registry.with_template(name, Self::render)?
    }

    /// YAML document for the named template.
    pub fn output_yaml(registry: &TemplateRegistry, name: &str) -> TemplateResult<String> {
        registry.with_template(name, Self::render_yaml)?
    }

    /// Resolved document tree for the named template. Object keys keep
    /// declaration order.
    pub fn to_value(registry: &TemplateRegistry, name: &str) -> TemplateResult<serde_json::Value> {
        registry.with_template(name, |template| Ok(serde_json::to_value(template)?))?
    }

    pub fn render(template: &Template) -> TemplateResult<String> {
        Ok(serde_json::to_string_pretty(template)?)
    }

    pub fn render_yaml(template: &Template) -> TemplateResult<String> {
        Ok(serde_yaml::to_string(template)?)
    }
}
