//! Field Joiner
//!
//! Joins string fields with a zero-width space so the joined string still
//! renders as one atomic token. Marker and escape characters inside a field
//! are escaped, which makes `separate` the exact inverse of `join`.
//!
//! ```text
//! ["abc", "0", "12"]  →  "abc\u{200B}0\u{200B}12"
//! ["a\u{200B}b"]      →  "a\u{200C}\u{200B}b"
//! ```

/// Field marker (zero-width space)
pub const MARKER: char = '\u{200B}';

/// Escape prefix (zero-width non-joiner)
pub const ESCAPE: char = '\u{200C}';

/// Join fields into one string
pub fn join<S: AsRef<str>>(fields: &[S]) -> String {
    let mut joined = String::new();

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            joined.push(MARKER);
        }
        for c in field.as_ref().chars() {
            if c == MARKER || c == ESCAPE {
                joined.push(ESCAPE);
            }
            joined.push(c);
        }
    }

    joined
}

/// Split a joined string back into its fields
///
/// A string without markers comes back as a single field. A dangling
/// escape at the very end is kept as a literal character.
pub fn separate(joined: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in joined.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == MARKER {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    if escaped {
        current.push(ESCAPE);
    }
    fields.push(current);

    fields
}

/// True if the string contains a field marker outside an escape
pub fn is_joined(value: &str) -> bool {
    separate(value).len() > 1
}
