//! Path helpers shared by the registry and the dispatch types.
//!
//! Paths are stored in canonical form: no leading or trailing slash and no
//! empty segments, so `/foo//bar/` and `foo/bar` are the same key. The root
//! path is the empty string.

use smallvec::SmallVec;

/// Maximum path depth before the segment list spills to the heap.
pub const MAX_INLINE_SEGMENTS: usize = 8;

/// Stack-allocated segment list for the matching hot path.
pub type SegmentVec<'a> = SmallVec<[&'a str; MAX_INLINE_SEGMENTS]>;

/// Split a path into its non-empty segments.
#[must_use]
pub fn segments(path: &str) -> SegmentVec<'_> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical form of `path`.
#[must_use]
pub fn canonical(path: &str) -> String {
    segments(path).join("/")
}

/// Join a namespace and a relative part, both canonicalised.
#[must_use]
pub fn join(namespace: &str, part: &str) -> String {
    let mut joined: SegmentVec<'_> = segments(namespace);
    joined.extend(segments(part));
    joined.join("/")
}

/// Percent-decode one path segment; undecodable input is passed through untouched.
#[must_use]
pub fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
