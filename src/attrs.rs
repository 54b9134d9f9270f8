//! Attribute extraction
//!
//! Splits a declaration's attribute list into marker attributes and the
//! attributes that survive into the output.
//!
//! ## Documentation
//!
//! `///` comments reach us as outer `#[doc = ".."]` attributes interleaved
//! with the rest of the list. Documentation belongs to the declaration, not
//! to whichever attribute it happens to sit next to, so it is never matched.
//! Documentation written ahead of a removed marker moves forward and leads the
//! next surviving attribute; when no other attribute survives it stays as the
//! declaration's own leading documentation.
//!
//! ```text
//! /// Adds two.          /// Adds two.
//! #[matrix(n = [1, 2])]  #[inline]
//! #[inline]          →   fn add() {}
//! fn add() {}
//! ```

use syn::{AttrStyle, Attribute, Meta};

/// Result of a successful extraction: at least one attribute matched.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Attributes to keep on the declaration, documentation included.
    pub remaining: Vec<Attribute>,
    /// Matched attributes, in their original order.
    pub matches: Vec<Attribute>,
}

/// Whether `attr` is an outer documentation attribute (`///` or `#[doc = ".."]`).
pub fn is_doc(attr: &Attribute) -> bool {
    matches!(attr.style, AttrStyle::Outer)
        && matches!(&attr.meta, Meta::NameValue(nv) if nv.path.is_ident("doc"))
}

/// Remove every attribute matching `is_marker` from `attrs`.
///
/// Returns `None` when nothing matched, so callers can tell "no marker" apart
/// from "marker with an empty argument list" and skip further work.
pub fn extract_attrs<F>(attrs: &[Attribute], mut is_marker: F) -> Option<Extracted>
where
    F: FnMut(&Attribute) -> bool,
{
    if !attrs.iter().any(|attr| !is_doc(attr) && is_marker(attr)) {
        return None;
    }

    let mut remaining = Vec::with_capacity(attrs.len());
    let mut matches = Vec::new();
    // Documentation seen since the last surviving attribute. It is flushed in
    // front of the next survivor, or onto the declaration at the end.
    let mut pending_docs = Vec::new();

    for attr in attrs {
        if is_doc(attr) {
            pending_docs.push(attr.clone());
        } else if is_marker(attr) {
            matches.push(attr.clone());
        } else {
            remaining.append(&mut pending_docs);
            remaining.push(attr.clone());
        }
    }
    remaining.append(&mut pending_docs);

    Some(Extracted { remaining, matches })
}
