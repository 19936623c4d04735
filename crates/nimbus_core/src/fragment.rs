//! Fragments: the declared body of one section entry.

use serde::Serialize;

use crate::error::{TemplateError, TemplateResult};
use crate::path::{Path, PathSegment};
use crate::value::{Properties, Value};

/// Keyed container holding one declared entity's properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Fragment {
    properties: Properties,
}

impl Fragment {
    pub fn new(properties: Properties) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn into_properties(self) -> Properties {
        self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Read the value at `path`, if every segment exists.
    pub fn lookup(&self, path: &Path) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = match first {
            PathSegment::Key(key) => self.properties.get(key)?,
            PathSegment::Index(_) => return None,
        };
        for segment in rest {
            node = match segment {
                PathSegment::Key(key) => node.as_map()?.get(key)?,
                PathSegment::Index(index) => node.as_seq()?.get(*index)?,
            };
        }
        Some(node)
    }

    /// Deep copy with `value` placed at `path`. The receiver is left untouched.
    pub fn mutate(&self, path: impl Into<Path>, value: impl Into<Value>) -> TemplateResult<Self> {
        let path: Path = path.into();
        let value: Value = value.into();
        self.mutate_all([(path, value)])
    }

    /// Deep copy with every `(path, value)` substitution applied in order.
    ///
    /// Either all substitutions succeed and the copy is returned, or the first
    /// invalid path fails the call and the partial copy is discarded.
    pub fn mutate_all<I, P, V>(&self, mutations: I) -> TemplateResult<Self>
    where
        I: IntoIterator<Item = (P, V)>,
        P: Into<Path>,
        V: Into<Value>,
    {
        let mut copy = self.clone();
        for (path, value) in mutations {
            set_at(&mut copy.properties, &path.into(), value.into())?;
        }
        Ok(copy)
    }
}

impl From<Properties> for Fragment {
    fn from(properties: Properties) -> Self {
        Self::new(properties)
    }
}

fn set_at(root: &mut Properties, path: &Path, value: Value) -> TemplateResult<()> {
    let (last, parents) = path
        .segments()
        .split_last()
        .ok_or_else(|| TemplateError::invalid_path(path, "path is empty"))?;

    let Some((first, rest)) = parents.split_first() else {
        return set_in_map(root, last, value, path);
    };

    let mut node = match first {
        PathSegment::Key(key) => root
            .get_mut(key)
            .ok_or_else(|| TemplateError::invalid_path(path, format!("no entry '{}'", key)))?,
        PathSegment::Index(index) => {
            return Err(TemplateError::invalid_path(
                path,
                format!("index [{}] applied to a mapping", index),
            ))
        }
    };

    for segment in rest {
        node = descend(node, segment, path)?;
    }

    match node {
        Value::Map(map) => set_in_map(map, last, value, path),
        Value::Seq(items) => match last {
            PathSegment::Index(index) => {
                let len = items.len();
                let slot = items.get_mut(*index).ok_or_else(|| {
                    TemplateError::invalid_path(
                        path,
                        format!("index [{}] out of bounds for sequence of {}", index, len),
                    )
                })?;
                *slot = value;
                Ok(())
            }
            PathSegment::Key(key) => Err(TemplateError::invalid_path(
                path,
                format!("key '{}' applied to a sequence", key),
            )),
        },
        _ => Err(TemplateError::invalid_path(
            path,
            format!("cannot set '{}' inside a scalar or reference", last),
        )),
    }
}

fn set_in_map(
    map: &mut Properties,
    segment: &PathSegment,
    value: Value,
    path: &Path,
) -> TemplateResult<()> {
    match segment {
        PathSegment::Key(key) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        PathSegment::Index(index) => Err(TemplateError::invalid_path(
            path,
            format!("index [{}] applied to a mapping", index),
        )),
    }
}

fn descend<'a>(
    node: &'a mut Value,
    segment: &PathSegment,
    path: &Path,
) -> TemplateResult<&'a mut Value> {
    let not_container = || {
        TemplateError::invalid_path(
            path,
            format!("segment '{}' does not address a container", segment),
        )
    };

    match node {
        Value::Map(map) => match segment {
            PathSegment::Key(key) => map
                .get_mut(key)
                .ok_or_else(|| TemplateError::invalid_path(path, format!("no entry '{}'", key))),
            PathSegment::Index(_) => Err(not_container()),
        },
        Value::Seq(items) => match segment {
            PathSegment::Index(index) => {
                let len = items.len();
                items.get_mut(*index).ok_or_else(|| {
                    TemplateError::invalid_path(
                        path,
                        format!("index [{}] out of bounds for sequence of {}", index, len),
                    )
                })
            }
            PathSegment::Key(_) => Err(not_container()),
        },
        _ => Err(not_container()),
    }
}
