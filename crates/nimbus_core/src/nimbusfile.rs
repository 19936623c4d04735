//! Loading template declarations from a YAML nimbusfile.
//!
//! ```yaml
//! templates:
//!   - name: CoreOS Stack
//!     description: Launches a CoreOS cluster
//!     parameters:
//!       ClusterSize: { Type: Number, Default: "3" }
//!     resources:
//!       Group:
//!         Type: AWS::AutoScaling::AutoScalingGroup
//!         Properties:
//!           DesiredCapacity: !Ref ClusterSize
//! stacks:
//!   production:
//!     ClusterSize: "5"
//! ```
//!
//! Cross-references may be written as `{Ref: X}`, `{"Fn::GetAtt": [X, Attr]}`,
//! `!Ref X` or `!GetAtt X.Attr`. Declarations go through the ordinary
//! construction context, so a nimbusfile and hand-written builder code
//! produce the same templates.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value as Yaml};
use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::params::ParameterStore;
use crate::reference::{Reference, GET_ATT_KEY, REF_KEY};
use crate::registry::{TemplateBuilder, TemplateRegistry};
use crate::template::Section;
use crate::value::{Properties, Value};

/// File name looked up in the working directory.
pub const DEFAULT_NIMBUSFILE: &str = "nimbusfile.yaml";

/// A nimbusfile on disk.
#[derive(Debug, Clone)]
pub struct Nimbusfile {
    path: PathBuf,
}

impl Nimbusfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default nimbusfile inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_NIMBUSFILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Declare every template and stack parameter set in the file.
    ///
    /// Returns the names of the declared templates in file order.
    pub fn load(
        &self,
        registry: &TemplateRegistry,
        params: &ParameterStore,
    ) -> TemplateResult<Vec<String>> {
        if !self.exists() {
            return Err(TemplateError::NimbusfileNotFound(self.path.clone()));
        }
        let source = fs::read_to_string(&self.path)?;
        let names = load_str(&source, registry, params)?;
        info!("Loaded {}", self.path.display());
        Ok(names)
    }
}

/// Declare the templates and stack parameters found in `source`.
pub fn load_str(
    source: &str,
    registry: &TemplateRegistry,
    params: &ParameterStore,
) -> TemplateResult<Vec<String>> {
    let document: Yaml = serde_yaml::from_str(source)?;
    let root = match document {
        Yaml::Mapping(root) => root,
        Yaml::Null => Mapping::new(),
        _ => return Err(invalid("top level must be a mapping")),
    };

    let mut names = Vec::new();

    for (key, value) in &root {
        match key.as_str() {
            Some("templates") => {
                let templates = value
                    .as_sequence()
                    .ok_or_else(|| invalid("'templates' must be a list"))?;
                for declaration in templates {
                    let name = declare_template(registry, declaration, &names)?;
                    names.push(name);
                }
            }
            Some("stacks") => load_stacks(params, value)?,
            _ => {
                return Err(invalid(format!(
                    "unknown top-level key {}",
                    describe_key(key)
                )))
            }
        }
    }

    Ok(names)
}

/// Template keys are matched case-insensitively, like section names.
fn declare_template(
    registry: &TemplateRegistry,
    declaration: &Yaml,
    declared: &[String],
) -> TemplateResult<String> {
    let declaration = declaration
        .as_mapping()
        .ok_or_else(|| invalid("each template must be a mapping"))?;
    let name = declaration
        .iter()
        .find(|(key, _)| key.as_str().is_some_and(|k| k.eq_ignore_ascii_case("name")))
        .and_then(|(_, value)| value.as_str())
        .ok_or_else(|| invalid("template is missing a 'name'"))?
        .to_string();
    if declared.contains(&name) {
        return Err(invalid(format!("template '{}' is declared more than once", name)));
    }

    registry.build(name.clone(), |t| {
        for (key, value) in declaration {
            let key = key
                .as_str()
                .ok_or_else(|| invalid(format!("template '{}' has a non-string key", name)))?;
            match key.to_lowercase().as_str() {
                "name" => {}
                "description" => {
                    let text = value.as_str().ok_or_else(|| {
                        invalid(format!("description of '{}' must be a string", name))
                    })?;
                    t.description(text)?;
                }
                _ => match key.parse::<Section>() {
                    Ok(section) => declare_section(t, section, value)?,
                    Err(_) => {
                        return Err(invalid(format!(
                            "template '{}' has unknown key '{}'",
                            name, key
                        )))
                    }
                },
            }
        }
        Ok(())
    })?;

    debug!("Declared template from nimbusfile: {}", name);
    Ok(name)
}

fn declare_section(t: &TemplateBuilder<'_>, section: Section, entries: &Yaml) -> TemplateResult<()> {
    if entries.is_null() {
        return Ok(());
    }
    let entries = entries
        .as_mapping()
        .ok_or_else(|| invalid(format!("'{}' must be a mapping", section)))?;

    for (key, body) in entries {
        let name = scalar_key(key)?;
        // Mapping tables are lookup data, never cross-references.
        let body = if section == Section::Mappings {
            convert_verbatim(body)?
        } else {
            convert(body)?
        };
        let body = match body {
            Value::Map(props) => props,
            _ => {
                return Err(invalid(format!(
                    "{} '{}' must be a mapping",
                    section.entry_kind(),
                    name
                )))
            }
        };
        t.declare(section, name, body)?;
    }
    Ok(())
}

fn load_stacks(params: &ParameterStore, stacks: &Yaml) -> TemplateResult<()> {
    let stacks = stacks
        .as_mapping()
        .ok_or_else(|| invalid("'stacks' must be a mapping"))?;

    for (stack, values) in stacks {
        let stack = scalar_key(stack)?;
        let values = match values {
            Yaml::Null => Mapping::new(),
            Yaml::Mapping(values) => values.clone(),
            _ => return Err(invalid(format!("parameters of stack '{}' must be a mapping", stack))),
        };

        let mut pairs = Vec::with_capacity(values.len());
        for (name, value) in &values {
            let name = scalar_key(name)?;
            let value = convert(value)?.to_parameter_string().ok_or_else(|| {
                invalid(format!("parameter '{}' of stack '{}' must be a scalar", name, stack))
            })?;
            pairs.push((name, value));
        }
        params.set_params(stack, pairs);
    }
    Ok(())
}

/// Convert a YAML node into a template value, recognising reference forms.
pub fn convert(node: &Yaml) -> TemplateResult<Value> {
    Ok(match node {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Seq(
            items
                .iter()
                .map(convert)
                .collect::<TemplateResult<Vec<Value>>>()?,
        ),
        Yaml::Mapping(map) => {
            if let Some(reference) = reference_from_mapping(map)? {
                return Ok(Value::Ref(reference));
            }
            let mut props = Properties::with_capacity(map.len());
            for (key, value) in map {
                props.insert(scalar_key(key)?, convert(value)?);
            }
            Value::Map(props)
        }
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            match tag.trim_start_matches('!') {
                "Ref" => Value::Ref(plain_reference(&tagged.value)?),
                "GetAtt" => Value::Ref(attribute_reference(&tagged.value)?),
                other => return Err(invalid(format!("unsupported tag !{}", other))),
            }
        }
    })
}

/// Convert a YAML node structurally, leaving `Ref`-shaped maps as plain data.
fn convert_verbatim(node: &Yaml) -> TemplateResult<Value> {
    Ok(match node {
        Yaml::Sequence(items) => Value::Seq(
            items
                .iter()
                .map(convert_verbatim)
                .collect::<TemplateResult<Vec<Value>>>()?,
        ),
        Yaml::Mapping(map) => {
            let mut props = Properties::with_capacity(map.len());
            for (key, value) in map {
                props.insert(scalar_key(key)?, convert_verbatim(value)?);
            }
            Value::Map(props)
        }
        Yaml::Tagged(tagged) => {
            return Err(invalid(format!("tag {} is not allowed in mappings", tagged.tag)))
        }
        scalar => convert(scalar)?,
    })
}

fn reference_from_mapping(map: &Mapping) -> TemplateResult<Option<Reference>> {
    if map.len() != 1 {
        return Ok(None);
    }
    let Some((key, value)) = map.iter().next() else {
        return Ok(None);
    };
    match key.as_str() {
        Some(REF_KEY) => plain_reference(value).map(Some),
        Some(GET_ATT_KEY) => attribute_reference(value).map(Some),
        _ => Ok(None),
    }
}

fn plain_reference(value: &Yaml) -> TemplateResult<Reference> {
    value
        .as_str()
        .map(Reference::to)
        .ok_or_else(|| invalid("Ref target must be a string"))
}

fn attribute_reference(value: &Yaml) -> TemplateResult<Reference> {
    match value {
        Yaml::String(dotted) => dotted
            .split_once('.')
            .map(|(name, attribute)| Reference::attribute_of(name, attribute))
            .ok_or_else(|| invalid(format!("GetAtt '{}' must look like Name.Attribute", dotted))),
        Yaml::Sequence(parts) => match parts.as_slice() {
            [name, attribute] => match (name.as_str(), attribute.as_str()) {
                (Some(name), Some(attribute)) => Ok(Reference::attribute_of(name, attribute)),
                _ => Err(invalid("GetAtt parts must be strings")),
            },
            _ => Err(invalid("GetAtt takes exactly [name, attribute]")),
        },
        _ => Err(invalid("GetAtt must be a string or a two element list")),
    }
}

fn scalar_key(key: &Yaml) -> TemplateResult<String> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        other => Err(invalid(format!("unsupported key {}", describe_key(other)))),
    }
}

fn describe_key(key: &Yaml) -> String {
    serde_yaml::to_string(key)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "<unprintable>".to_string())
}

fn invalid(message: impl Into<String>) -> TemplateError {
    TemplateError::InvalidNimbusfile(message.into())
}
