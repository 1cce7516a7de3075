//! Exact alias mappings for common non-SPDX license spellings.
//!
//! License identification is a legal matter, so only exact, 100%-certain
//! translations belong here. No fuzzy matching: a string that is not a
//! verbatim (case-insensitive) match for one of these entries keeps its
//! original text and goes through the `LicenseRef-` repair path instead.

/// Case-insensitive exact matches for common variations. Every target must
/// be a valid SPDX identifier.
const EXACT_ALIASES: &[(&str, &str)] = &[
    ("mit license", "MIT"),
    ("the mit license", "MIT"),
    ("x11", "X11"),
    ("apache license 2.0", "Apache-2.0"),
    ("apache license, version 2.0", "Apache-2.0"),
    ("apache-2", "Apache-2.0"),
    ("apache 2.0", "Apache-2.0"),
    ("apache software license", "Apache-2.0"),
    ("asl 2.0", "Apache-2.0"),
    ("bsd 3-clause", "BSD-3-Clause"),
    ("3-clause bsd", "BSD-3-Clause"),
    ("new bsd", "BSD-3-Clause"),
    ("new bsd license", "BSD-3-Clause"),
    ("bsd 2-clause", "BSD-2-Clause"),
    ("2-clause bsd", "BSD-2-Clause"),
    ("simplified bsd", "BSD-2-Clause"),
    ("simplified bsd license", "BSD-2-Clause"),
    ("isc license", "ISC"),
    ("expat", "MIT"),
    ("gplv2", "GPL-2.0-only"),
    ("gplv2+", "GPL-2.0-or-later"),
    ("gpl v2", "GPL-2.0-only"),
    ("gnu gpl v2", "GPL-2.0-only"),
    ("gplv3", "GPL-3.0-only"),
    ("gplv3+", "GPL-3.0-or-later"),
    ("gpl v3", "GPL-3.0-only"),
    ("gnu gpl v3", "GPL-3.0-only"),
    ("agplv3", "AGPL-3.0-only"),
    ("agplv3+", "AGPL-3.0-or-later"),
    ("lgplv2", "LGPL-2.0-only"),
    ("lgplv2.1", "LGPL-2.1-only"),
    ("lgplv2.1+", "LGPL-2.1-or-later"),
    ("lgpl v2.1", "LGPL-2.1-only"),
    ("gnu lgpl v2.1", "LGPL-2.1-only"),
    ("lgplv3", "LGPL-3.0-only"),
    ("lgplv3+", "LGPL-3.0-or-later"),
    ("lgpl v3", "LGPL-3.0-only"),
    ("gnu lgpl v3", "LGPL-3.0-only"),
    ("mpl 2.0", "MPL-2.0"),
    ("mplv2.0", "MPL-2.0"),
    ("mozilla public license 2.0", "MPL-2.0"),
    ("cc0 1.0", "CC0-1.0"),
    ("cc0", "CC0-1.0"),
    // Approximation: public-domain dedications have no SPDX id of their own.
    ("public domain", "CC0-1.0"),
    ("psf", "Python-2.0"),
    ("psf-2.0", "Python-2.0"),
    ("psfl", "Python-2.0"),
    ("python software foundation license", "Python-2.0"),
    ("boost", "BSL-1.0"),
    ("artistic 2.0", "Artistic-2.0"),
    ("zlib/libpng", "Zlib"),
];

/// Look up the canonical SPDX identifier for a known alias.
pub fn lookup(raw: &str) -> Option<&'static str> {
    let needle = raw.trim();
    EXACT_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(needle))
        .map(|(_, spdx)| *spdx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("MIT License"), Some("MIT"));
        assert_eq!(lookup("GPLv3"), Some("GPL-3.0-only"));
        assert_eq!(lookup("  Apache 2.0  "), Some("Apache-2.0"));
    }

    #[test]
    fn unknown_strings_miss() {
        assert_eq!(lookup("Commercial"), None);
        assert_eq!(lookup(""), None);
    }

    #[test]
    fn every_alias_target_is_valid_spdx() {
        for (alias, target) in EXACT_ALIASES {
            assert!(
                spdx::license_id(target).is_some(),
                "alias {alias:?} maps to unknown SPDX id {target:?}"
            );
        }
    }
}
