//! Source locations.
//!
//! Lines and columns are 1-based, matching what editors display. A range is
//! inclusive at `begin` and exclusive at `end`, except that the analysis
//! containment check treats the boundary column as inside (see the walker).

use std::fmt;
use std::sync::Arc;

/// A 1-based line/column position.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Debug)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }

    /// True once both fields have been assigned a real position.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A begin/end pair without a filename, stored per node in the arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct Range {
    pub begin: Location,
    pub end: Location,
}

impl Range {
    #[inline]
    pub const fn new(begin: Location, end: Location) -> Self {
        Range { begin, end }
    }

    /// Span covering both ranges.
    #[must_use]
    pub fn merge(self, other: Range) -> Range {
        Range {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

/// A range tagged with the file it came from. Values, variables, and
/// diagnostics carry these so results can point across imported files.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LocationRange {
    pub filename: Arc<str>,
    pub begin: Location,
    pub end: Location,
}

impl LocationRange {
    pub fn new(filename: Arc<str>, range: Range) -> Self {
        LocationRange {
            filename,
            begin: range.begin,
            end: range.end,
        }
    }

    #[inline]
    pub fn range(&self) -> Range {
        Range::new(self.begin, self.end)
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.begin.is_set()
    }
}

impl Default for LocationRange {
    fn default() -> Self {
        LocationRange {
            filename: Arc::from(""),
            begin: Location::default(),
            end: Location::default(),
        }
    }
}

impl fmt::Display for LocationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.filename, self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ordering() {
        assert!(Location::new(1, 9) < Location::new(2, 1));
        assert!(Location::new(3, 4) < Location::new(3, 5));
    }

    #[test]
    fn range_merge() {
        let a = Range::new(Location::new(1, 1), Location::new(1, 5));
        let b = Range::new(Location::new(1, 3), Location::new(2, 2));
        let m = a.merge(b);
        assert_eq!(m.begin, Location::new(1, 1));
        assert_eq!(m.end, Location::new(2, 2));
    }

    #[test]
    fn unset_location() {
        assert!(!Location::default().is_set());
        assert!(!LocationRange::default().is_set());
        assert!(Location::new(1, 1).is_set());
    }
}
