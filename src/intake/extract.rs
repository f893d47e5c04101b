//! Best-effort extraction of the child's name and age from free text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name used until (or unless) a real one is extracted.
pub const PLACEHOLDER_NAME: &str = "your child";
/// Age used until (or unless) a number is found.
pub const PLACEHOLDER_AGE: &str = "unknown";

/// Introductory phrase is case-insensitive; the name token itself is not.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:my child is|this is)\s+([A-Z][a-z]+)").unwrap());

static AGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:is|aged)?\s*(\d{1,2})").unwrap());

/// Name and age as shown back to the parent and embedded in prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildIdentity {
    pub name: String,
    pub age: String,
}

impl Default for ChildIdentity {
    fn default() -> Self {
        Self {
            name: PLACEHOLDER_NAME.to_string(),
            age: PLACEHOLDER_AGE.to_string(),
        }
    }
}

/// Pull a name and age out of the parent's introduction.
///
/// Misses fall back to the placeholders; nothing is ever rejected.
pub fn extract_identity(input: &str) -> ChildIdentity {
    let name = NAME_PATTERN
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| PLACEHOLDER_NAME.to_string());

    let age = AGE_PATTERN
        .captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| PLACEHOLDER_AGE.to_string());

    ChildIdentity { name, age }
}
