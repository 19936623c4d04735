//! Paths addressing a location inside a fragment.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{TemplateError, TemplateResult};

/// One dot-separated part: a key followed by zero or more `[n]` indices.
static PART_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)((?:\[\d+\])*)$").unwrap());

static INDEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").unwrap());

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Ordered sequence of keys and indices from a fragment's root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parse a dotted path with bracketed indices, e.g. `Properties.Tags[0].Value`.
    ///
    /// Every dot-separated part must start with a key. Keys containing dots or
    /// brackets have to be built with [`Path::key`] instead.
    pub fn parse(input: &str) -> TemplateResult<Self> {
        if input.is_empty() {
            return Err(TemplateError::invalid_path(input, "path is empty"));
        }

        let mut path = Path::new();
        for part in input.split('.') {
            let captures = PART_PATTERN.captures(part).ok_or_else(|| {
                TemplateError::invalid_path(input, format!("malformed segment '{}'", part))
            })?;
            path = path.key(&captures[1]);

            for index in INDEX_PATTERN.captures_iter(&captures[2]) {
                let index = index[1].parse::<usize>().map_err(|e| {
                    TemplateError::invalid_path(input, format!("bad index in '{}': {}", part, e))
                })?;
                path = path.index(index);
            }
        }

        Ok(path)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, PathSegment::Key(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl<S: Into<PathSegment>, const N: usize> From<[S; N]> for Path {
    fn from(segments: [S; N]) -> Self {
        segments.into_iter().map(Into::into).collect()
    }
}

/// A bare string is a single top-level key; use [`Path::parse`] for dotted paths.
impl From<&str> for Path {
    fn from(key: &str) -> Self {
        Path::new().key(key)
    }
}
