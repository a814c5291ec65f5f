//! Canonical web-path type.
//!
//! A [`WebPath`] identifies a served resource by its `/`-delimited segments.
//! It is deliberately distinct from `std::path::Path`: web paths are the
//! lookup key of the asset map and a security boundary (prefix tests decide
//! listing visibility and reserved-prefix routing), so conflating them with
//! local filesystem paths would harm both readability and safety.
//!
//! All operations are pure; a `WebPath` is an immutable value.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed web path in a request or manifest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid web path {0:?}")]
    Invalid(String),
}

/// Slash-delimited resource identifier with an absolute flag.
///
/// Equality, ordering and hashing are structural (segment by segment), so
/// two paths built from the same canonical string always compare equal and
/// hash identically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WebPath {
    absolute: bool,
    segments: Vec<String>,
}

impl WebPath {
    /// Parse a string into a `WebPath`.
    ///
    /// Empty segments (doubled or trailing slashes) are dropped, so the
    /// rendered form of the result is already canonical for dot-free input.
    /// `.` and `..` segments are kept verbatim until [`normalize`].
    ///
    /// [`normalize`]: WebPath::normalize
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.contains('\0') {
            return Err(PathError::Invalid(s.to_string()));
        }
        let absolute = s.starts_with('/');
        let segments = s
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { absolute, segments })
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            segments: Vec::new(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Collapse `.` and `..` segments.
    ///
    /// A `..` pops the preceding real segment. On an absolute path, `..`
    /// that would ascend above the root is clamped at the root; on a
    /// relative path, leading `..` segments are preserved.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut out: Vec<String> = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg.as_str() {
                "." => {}
                ".." => {
                    if matches!(out.last().map(String::as_str), Some(last) if last != "..") {
                        out.pop();
                    } else if !self.absolute {
                        out.push("..".to_string());
                    }
                    // absolute with nothing left to pop: clamp at root
                }
                _ => out.push(seg.clone()),
            }
        }
        Self {
            absolute: self.absolute,
            segments: out,
        }
    }

    /// Path of the directory containing this path.
    ///
    /// The parent of the root is the root itself.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self {
            absolute: self.absolute,
            segments,
        }
    }

    /// Append `other` to this path. An absolute `other` replaces `self`.
    #[must_use]
    pub fn resolve(&self, other: &WebPath) -> Self {
        if other.absolute {
            return other.clone();
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            absolute: self.absolute,
            segments,
        }
    }

    /// Href-style reference resolution.
    ///
    /// A relative `reference` combines with the directory containing the
    /// current document; an absolute reference passes through unchanged.
    /// The result is normalized.
    #[must_use]
    pub fn lookup(&self, reference: &WebPath) -> Self {
        if reference.absolute {
            return reference.normalize();
        }
        self.parent().resolve(reference).normalize()
    }

    /// Structural segment-prefix test. Absolute flags must agree.
    pub fn starts_with(&self, prefix: &WebPath) -> bool {
        self.absolute == prefix.absolute
            && self.segments.len() >= prefix.segments.len()
            && self.segments.iter().zip(&prefix.segments).all(|(a, b)| a == b)
    }

    /// Relative path holding the segment range `start..end`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds, like slice indexing.
    #[must_use]
    pub fn subpath(&self, start: usize, end: usize) -> Self {
        Self {
            absolute: false,
            segments: self.segments[start..end].to_vec(),
        }
    }

    /// Convert a relative `WebPath` into a relative filesystem path.
    ///
    /// Callers must normalize first; the segments are joined as-is.
    pub fn to_relative_fs_path(&self) -> PathBuf {
        debug_assert!(!self.absolute);
        self.segments.iter().collect()
    }

    /// Final segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl fmt::Display for WebPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("/")?;
        }
        f.write_str(&self.segments.join("/"))
    }
}
