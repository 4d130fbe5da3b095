//! Package Identifiers
//!
//! Dot-separated Java package names and the values derived from them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ReleaseError, Result};

/// A dotted package name such as `com.example.app`.
///
/// Always holds at least one segment, and every segment is a valid Java
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentifier {
    segments: Vec<String>,
}

impl PackageIdentifier {
    /// Parse a dotted package name
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid(value, "empty package name"));
        }

        let mut segments = Vec::new();
        for segment in value.split('.') {
            if segment.is_empty() {
                return Err(invalid(value, "empty segment"));
            }
            if !is_java_identifier(segment) {
                return Err(invalid(value, &format!("'{}' is not a valid identifier", segment)));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// Segments in declaration order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first segment (`com` in `com.example.app`)
    pub fn first_segment(&self) -> &str {
        &self.segments[0]
    }

    /// Segments in reverse order, dot-joined (`app.example.com`)
    pub fn reversed(&self) -> String {
        let mut segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        segments.reverse();
        segments.join(".")
    }

    /// Nested directory path for the package (`com/example/app`)
    pub fn relative_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

fn invalid(value: &str, reason: &str) -> ReleaseError {
    ReleaseError::InvalidIdentifier {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn is_java_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for PackageIdentifier {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PackageIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PackageIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
