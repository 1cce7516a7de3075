//! License expression sanitizer.
//!
//! Pure, total post-processing for license field values: every input string
//! has some valid sanitized output, and running the sanitizer on its own
//! output changes nothing.
//!
//! The pipeline is conservative. Leaf identifiers are accepted only when they
//! are exact (or exact-up-to-case) members of the SPDX license list, a
//! `LicenseRef-` reference, or a verbatim entry in the alias table. Anything
//! else is rewritten to a deterministic `LicenseRef-<slug>` rather than
//! guessed at, and input that does not parse as a boolean expression at all
//! is wrapped whole.

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use super::aliases;
use super::parser::{self, Leaf};

/// SPDX sentinel values that are valid license fields in their own right.
const SENTINELS: &[&str] = &["NOASSERTION", "NONE"];

/// Longest slug kept verbatim; longer ones are truncated and disambiguated
/// with a hash of the full original text.
const MAX_SLUG_LEN: usize = 64;

/// Result of sanitizing one license field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizeOutcome {
    /// Canonical expression text. Always satisfies the invariant: parses
    /// under SPDX boolean grammar, every leaf a license-list member or a
    /// `LicenseRef-`.
    pub expression: String,
    /// Whether the value differs from the input.
    pub was_modified: bool,
    /// Number of leaves rewritten to `LicenseRef-` identifiers.
    pub repaired_leaves: usize,
}

impl SanitizeOutcome {
    fn unchanged(input: &str) -> Self {
        Self {
            expression: input.to_string(),
            was_modified: false,
            repaired_leaves: 0,
        }
    }
}

/// Sanitize a license field value.
///
/// Absent (empty) values and the SPDX sentinels `NOASSERTION`/`NONE` pass
/// through unchanged: they are valid field values, not invalid licenses.
pub fn sanitize(input: &str) -> SanitizeOutcome {
    let trimmed = input.trim();
    if trimmed.is_empty() || SENTINELS.contains(&trimmed) {
        return SanitizeOutcome::unchanged(input);
    }

    // Whole-string alias: catches spellings like "Apache License 2.0" that
    // contain spaces and would otherwise fail the expression parse.
    if let Some(canonical) = aliases::lookup(trimmed) {
        return SanitizeOutcome {
            was_modified: canonical != input,
            expression: canonical.to_string(),
            repaired_leaves: 0,
        };
    }

    let Ok(mut expr) = parser::parse(trimmed) else {
        // Free-form vendor text. Wrap the whole value in a single
        // LicenseRef rather than repairing fragments of something that was
        // never an expression.
        return SanitizeOutcome {
            expression: format!("LicenseRef-{}", slug(trimmed)),
            was_modified: true,
            repaired_leaves: 1,
        };
    };

    let mut repaired = 0usize;
    expr.for_each_leaf_mut(&mut |leaf| {
        if matches!(canonicalize_leaf(leaf), LeafVerdict::Repaired) {
            repaired += 1;
        }
    });

    let canonical = expr.render();
    SanitizeOutcome {
        was_modified: canonical != input,
        expression: canonical,
        repaired_leaves: repaired,
    }
}

enum LeafVerdict {
    /// Leaf was already canonical.
    Valid,
    /// Leaf was a list member up to case or an exact alias; text normalized.
    Canonicalized,
    /// Leaf was rewritten to a `LicenseRef-`.
    Repaired,
}

fn canonicalize_leaf(leaf: &mut Leaf) -> LeafVerdict {
    let mut verdict = match canonicalize_id(&leaf.id, leaf.or_later) {
        IdVerdict::Valid => LeafVerdict::Valid,
        IdVerdict::Canonical(canonical) => {
            leaf.id = canonical;
            LeafVerdict::Canonicalized
        }
        IdVerdict::CanonicalNoPlus(canonical) => {
            // Alias targets like GPL-2.0-or-later already encode the suffix.
            leaf.id = canonical;
            leaf.or_later = false;
            LeafVerdict::Canonicalized
        }
        IdVerdict::Unknown => return repair_leaf(leaf),
    };

    if let Some(exception) = &leaf.exception {
        match canonicalize_exception(exception) {
            Some(canonical) => {
                if canonical != *exception {
                    leaf.exception = Some(canonical);
                    verdict = LeafVerdict::Canonicalized;
                }
            }
            // Unknown exception invalidates the whole pairing: repairing
            // only the exception would attach a real license to a made-up
            // exception id.
            None => return repair_leaf(leaf),
        }
    }

    verdict
}

fn repair_leaf(leaf: &mut Leaf) -> LeafVerdict {
    let original = leaf.source_text();
    *leaf = Leaf {
        id: format!("LicenseRef-{}", slug(&original)),
        or_later: false,
        exception: None,
    };
    LeafVerdict::Repaired
}

enum IdVerdict {
    Valid,
    Canonical(String),
    CanonicalNoPlus(String),
    Unknown,
}

fn canonicalize_id(id: &str, or_later: bool) -> IdVerdict {
    if is_license_ref(id) {
        // Declared custom reference, accepted as-is; a '+' suffix on a
        // LicenseRef is not grammatical, so fall through to repair.
        return if or_later { IdVerdict::Unknown } else { IdVerdict::Valid };
    }

    if spdx::license_id(id).is_some() {
        return IdVerdict::Valid;
    }

    // Exact member up to ASCII case ("mit", "apache-2.0").
    if let Some(canonical) = spdx::identifiers::LICENSES
        .iter()
        .map(|entry| entry.0)
        .find(|name| name.eq_ignore_ascii_case(id))
    {
        return IdVerdict::Canonical(canonical.to_string());
    }

    // Single-token aliases ("gplv3", "gplv2+"). The alias target is a
    // complete identifier, so any parsed '+' suffix is part of the alias
    // key, not something to re-append.
    let alias_key = if or_later {
        format!("{id}+")
    } else {
        id.to_string()
    };
    if let Some(canonical) = aliases::lookup(&alias_key) {
        return IdVerdict::CanonicalNoPlus(canonical.to_string());
    }

    IdVerdict::Unknown
}

fn canonicalize_exception(exception: &str) -> Option<String> {
    if spdx::exception_id(exception).is_some() {
        return Some(exception.to_string());
    }
    spdx::identifiers::EXCEPTIONS
        .iter()
        .map(|entry| entry.0)
        .find(|name| name.eq_ignore_ascii_case(exception))
        .map(str::to_string)
}

/// True for a well-formed `LicenseRef-idstring` reference.
pub fn is_license_ref(id: &str) -> bool {
    match id.strip_prefix("LicenseRef-") {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        }
        None => false,
    }
}

/// Derive a deterministic `LicenseRef` idstring from arbitrary text.
///
/// Equal inputs always produce equal slugs, so repeated sanitization is
/// stable across runs. Long inputs are truncated and suffixed with a hash of
/// the full text to keep distinct inputs distinct.
fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return format!("Unspecified-{:08x}", xxh3_64(text.as_bytes()) as u32);
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') || slug.ends_with('.') {
            slug.pop();
        }
        slug.push_str(&format!("-{:08x}", xxh3_64(text.as_bytes()) as u32));
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_pass_through() {
        for sentinel in ["NOASSERTION", "NONE"] {
            let outcome = sanitize(sentinel);
            assert_eq!(outcome.expression, sentinel);
            assert!(!outcome.was_modified);
            assert_eq!(outcome.repaired_leaves, 0);
        }
    }

    #[test]
    fn empty_passes_through() {
        let outcome = sanitize("");
        assert_eq!(outcome.expression, "");
        assert!(!outcome.was_modified);
    }

    #[test]
    fn valid_expression_unchanged() {
        let outcome = sanitize("MIT OR Apache-2.0");
        assert_eq!(outcome.expression, "MIT OR Apache-2.0");
        assert!(!outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn valid_with_exception_unchanged() {
        let outcome = sanitize("GPL-2.0-only WITH Classpath-exception-2.0");
        assert!(!outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn case_is_canonicalized_without_repair() {
        let outcome = sanitize("mit OR apache-2.0");
        assert_eq!(outcome.expression, "MIT OR Apache-2.0");
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn whole_string_alias_applies() {
        let outcome = sanitize("Apache License 2.0");
        assert_eq!(outcome.expression, "Apache-2.0");
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn single_token_alias_inside_expression() {
        let outcome = sanitize("gplv2+ OR MIT");
        assert_eq!(outcome.expression, "GPL-2.0-or-later OR MIT");
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn unknown_leaf_repaired_to_license_ref() {
        let outcome = sanitize("MIT OR SuperProprietary-1.0");
        assert_eq!(outcome.expression, "MIT OR LicenseRef-SuperProprietary-1.0");
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 1);
    }

    #[test]
    fn unparsable_text_wrapped_whole() {
        let outcome = sanitize("Commercial - see LICENSE.txt");
        assert_eq!(outcome.expression, "LicenseRef-Commercial-see-LICENSE.txt");
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 1);
    }

    #[test]
    fn license_ref_accepted_as_is() {
        let outcome = sanitize("LicenseRef-Commercial-see-LICENSE.txt");
        assert!(!outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn unknown_exception_repairs_whole_leaf() {
        let outcome = sanitize("GPL-2.0-only WITH Imaginary-exception");
        assert_eq!(
            outcome.expression,
            "LicenseRef-GPL-2.0-only-WITH-Imaginary-exception"
        );
        assert_eq!(outcome.repaired_leaves, 1);
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in [
            "MIT",
            "mit and zlib",
            "Commercial - see LICENSE.txt",
            "(MIT OR ISC) AND Zlib",
            "NOASSERTION",
            "GPL-2.0+ WITH Classpath-exception-2.0",
            "some random words here",
        ] {
            let first = sanitize(input);
            let second = sanitize(&first.expression);
            assert_eq!(
                second.expression, first.expression,
                "not idempotent for {input:?}"
            );
            assert!(!second.was_modified, "re-sanitize modified {input:?}");
            assert_eq!(second.repaired_leaves, 0);
        }
    }

    #[test]
    fn slug_is_deterministic_and_collapses_runs() {
        assert_eq!(slug("Commercial - see LICENSE.txt"), "Commercial-see-LICENSE.txt");
        assert_eq!(slug("a   b"), "a-b");
        assert_eq!(slug("a   b"), slug("a   b"));
    }

    #[test]
    fn slug_of_symbol_only_text_is_stable() {
        let a = slug("???");
        let b = slug("???");
        assert_eq!(a, b);
        assert!(a.starts_with("Unspecified-"));
        assert_ne!(slug("???"), slug("!!!"));
    }

    #[test]
    fn long_text_slug_is_truncated_with_hash() {
        let text = "x".repeat(500);
        let s = slug(&text);
        assert!(s.len() <= MAX_SLUG_LEN + 9);
        assert_eq!(s, slug(&text));
    }

    #[test]
    fn group_structure_preserved() {
        let outcome = sanitize("(MIT OR NotALicense) AND Zlib");
        assert_eq!(
            outcome.expression,
            "(MIT OR LicenseRef-NotALicense) AND Zlib"
        );
        assert_eq!(outcome.repaired_leaves, 1);
    }
}
