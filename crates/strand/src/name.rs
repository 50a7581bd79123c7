//! Name validity and the `__<uid>` identifier-reference syntax.
//!
//! Every child in a scene is addressable two ways: by its name, or by the
//! reserved key `__` followed by the decimal digits of its uid. Because the
//! second form is never a valid name, the two addressing modes cannot collide.

use crate::child::Uid;

/// Keywords of the host scripting grammar. None of these may name a child.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const UID_PREFIX: &str = "__";

/// Check if a string is a reserved keyword.
pub fn is_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name)
}

/// Check if a string is a syntactically legal identifier
/// (ASCII letters, digits and underscores, not starting with a digit).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check that a name may be given to a child.
///
/// Valid names are non-empty legal identifiers that are neither reserved
/// keywords nor identifier references.
pub fn is_name_valid(name: &str) -> bool {
    is_identifier(name) && !is_keyword(name) && !is_uid_key(name)
}

/// Check if a key uses the identifier-reference syntax.
pub fn is_uid_key(key: &str) -> bool {
    match key.strip_prefix(UID_PREFIX) {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Format the identifier-reference key for a uid (`42` -> `"__42"`).
pub fn uid_key(uid: Uid) -> String {
    format!("{UID_PREFIX}{uid}")
}

/// A parsed lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key<'a> {
    /// Lookup by exact name.
    Name(&'a str),
    /// Lookup by uid. `None` when the digit run does not fit a uid, which
    /// no child can match.
    Uid(Option<Uid>),
}

impl<'a> Key<'a> {
    /// Classify a key. The uid form must match the whole string.
    pub fn parse(key: &'a str) -> Self {
        if is_uid_key(key) {
            Key::Uid(key[UID_PREFIX.len()..].parse().ok())
        } else {
            Key::Name(key)
        }
    }
}

/// Pick `prefix` followed by the lowest number that makes an unused name.
///
/// Used to auto-name freshly created nodes (`c0`, `c1`, ...).
pub fn next_free_name(prefix: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut n: u64 = 0;
    loop {
        let candidate = format!("{prefix}{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
