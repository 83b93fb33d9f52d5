//! Configuration paths.
//!
//! A [`ConfigPath`] addresses one data node instance, with list keys in
//! brackets: `interfaces/interface[eth0]/sub-interfaces/sub-interface[1]`.
//! Its [`SchemaPath`] drops the keys (`interfaces/interface/sub-interfaces/
//! sub-interface`) and is what writers are registered under.

use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`ConfigPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment {
    name: String,
    key: Option<String>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>, key: Option<String>) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]", self.name, key),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Splits on `/` outside of brackets, so keys may contain slashes.
fn split_segments(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                parts.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&path[start..]);
    parts
}

/// Keyed path of a configuration data node instance.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigPath {
    segments: Vec<PathSegment>,
}

impl ConfigPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path with every list key removed.
    pub fn schema(&self) -> SchemaPath {
        SchemaPath {
            segments: self.segments.iter().map(|s| s.name.clone()).collect(),
        }
    }

    /// The first `len` segments of this path.
    pub fn prefix(&self, len: usize) -> ConfigPath {
        ConfigPath {
            segments: self.segments.iter().take(len).cloned().collect(),
        }
    }

    pub fn parent(&self) -> Option<ConfigPath> {
        if self.segments.len() > 1 {
            Some(self.prefix(self.segments.len() - 1))
        } else {
            None
        }
    }

    /// Returns a new path with a child segment appended.
    pub fn child(&self, name: impl Into<String>, key: Option<String>) -> ConfigPath {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::new(name, key));
        ConfigPath { segments }
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &ConfigPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// Key of the nearest segment named `name`.
    ///
    /// `interfaces/interface[eth0]/sub-interfaces/sub-interface[1]` gives
    /// `Some("eth0")` for `interface`.
    pub fn key_of(&self, name: &str) -> Option<&str> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.name == name)
            .and_then(PathSegment::key)
    }

    /// Key of the last segment.
    pub fn last_key(&self) -> Option<&str> {
        self.segments.last().and_then(PathSegment::key)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigPath({})", self)
    }
}

impl FromStr for ConfigPath {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Err(TranslateError::validation(s, "empty path"));
        }

        let mut segments = Vec::new();
        for part in split_segments(trimmed) {
            let segment = match part.find('[') {
                Some(open) => {
                    let key = part[open + 1..]
                        .strip_suffix(']')
                        .ok_or_else(|| TranslateError::validation(s, "unterminated key"))?;
                    if key.is_empty() {
                        return Err(TranslateError::validation(s, "empty key"));
                    }
                    PathSegment::new(&part[..open], Some(key.to_string()))
                }
                None => PathSegment::new(part, None),
            };
            if segment.name.is_empty() {
                return Err(TranslateError::validation(s, "empty segment"));
            }
            segments.push(segment);
        }
        Ok(ConfigPath { segments })
    }
}

impl TryFrom<String> for ConfigPath {
    type Error = TranslateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ConfigPath> for String {
    fn from(path: ConfigPath) -> String {
        path.to_string()
    }
}

/// Unkeyed path identifying a node of the configuration schema.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaPath {
    segments: Vec<String>,
}

impl SchemaPath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a relative path.
    pub fn join(&self, relative: &SchemaPath) -> SchemaPath {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        SchemaPath { segments }
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> SchemaPath {
        SchemaPath {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &SchemaPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }
}

/// Builds a schema path, discarding any list keys present in the input.
impl From<&str> for SchemaPath {
    fn from(path: &str) -> Self {
        let segments = split_segments(path.trim_matches('/'))
            .into_iter()
            .map(|part| match part.find('[') {
                Some(open) => part[..open].to_string(),
                None => part.to_string(),
            })
            .filter(|name| !name.is_empty())
            .collect();
        SchemaPath { segments }
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Debug for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaPath({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keyed_path() {
        let path: ConfigPath = "interfaces/interface[eth0]/sub-interfaces/sub-interface[1]"
            .parse()
            .unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.key_of("interface"), Some("eth0"));
        assert_eq!(path.last_key(), Some("1"));
        assert_eq!(
            path.schema().to_string(),
            "interfaces/interface/sub-interfaces/sub-interface"
        );
        assert_eq!(
            path.to_string(),
            "interfaces/interface[eth0]/sub-interfaces/sub-interface[1]"
        );
    }

    #[test]
    fn test_key_may_contain_slash() {
        let path: ConfigPath = "routes/route[10.0.0.0/24]".parse().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.last_key(), Some("10.0.0.0/24"));
    }

    #[test]
    fn test_rejects_malformed_paths() {
        assert!("".parse::<ConfigPath>().is_err());
        assert!("a//b".parse::<ConfigPath>().is_err());
        assert!("a/b[".parse::<ConfigPath>().is_err());
        assert!("a/b[]".parse::<ConfigPath>().is_err());
        assert!("a/[x]".parse::<ConfigPath>().is_err());
    }

    #[test]
    fn test_descendant_relation() {
        let parent: ConfigPath = "interfaces/interface[eth0]".parse().unwrap();
        let child: ConfigPath = "interfaces/interface[eth0]/l2".parse().unwrap();
        let other: ConfigPath = "interfaces/interface[eth1]/l2".parse().unwrap();
        assert!(child.is_descendant_of(&parent));
        assert!(!other.is_descendant_of(&parent));
        assert!(!parent.is_descendant_of(&parent));
        assert_eq!(child.parent(), Some(parent.clone()));
        assert_eq!(child.prefix(2), parent);
    }

    #[test]
    fn test_schema_path_from_str_strips_keys() {
        let schema = SchemaPath::from("interfaces/interface[eth0]/l2");
        assert_eq!(schema, SchemaPath::from("interfaces/interface/l2"));
        assert!(schema.is_descendant_of(&SchemaPath::from("interfaces/interface")));
        assert_eq!(
            SchemaPath::from("a/b").join(&SchemaPath::from("c/d")),
            SchemaPath::from("a/b/c/d")
        );
    }

    #[test]
    fn test_serde_as_string() {
        let path: ConfigPath = serde_json::from_str(r#""bridge-domains/bridge-domain[bd1]""#).unwrap();
        assert_eq!(path.last_key(), Some("bd1"));
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            r#""bridge-domains/bridge-domain[bd1]""#
        );
    }
}
