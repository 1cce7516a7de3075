//! License sanitizer integration tests.

use sbom_resolver::license::{is_license_ref, sanitize};

// ============================================================================
// Sentinels and valid input
// ============================================================================

mod passthrough {
    use super::*;

    #[test]
    fn noassertion_sentinel() {
        let outcome = sanitize("NOASSERTION");
        assert_eq!(outcome.expression, "NOASSERTION");
        assert!(!outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn none_sentinel() {
        let outcome = sanitize("NONE");
        assert_eq!(outcome.expression, "NONE");
        assert!(!outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn valid_spdx_expression_unchanged() {
        let outcome = sanitize("MIT OR Apache-2.0");
        assert_eq!(outcome.expression, "MIT OR Apache-2.0");
        assert!(!outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn valid_compound_expressions_unchanged() {
        for expr in [
            "MIT",
            "Apache-2.0 AND MIT",
            "(MIT OR ISC) AND Zlib",
            "GPL-2.0-only WITH Classpath-exception-2.0",
            "LGPL-2.1-or-later",
            "LicenseRef-Proprietary-1",
        ] {
            let outcome = sanitize(expr);
            assert!(!outcome.was_modified, "{expr:?} should pass through");
            assert_eq!(outcome.expression, expr);
        }
    }
}

// ============================================================================
// Repair
// ============================================================================

mod repair {
    use super::*;

    #[test]
    fn free_text_wrapped_into_single_license_ref() {
        let outcome = sanitize("Commercial - see LICENSE.txt");
        assert!(outcome.expression.starts_with("LicenseRef-"));
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 1);
        // No partial repair: the whole value is one identifier.
        assert!(!outcome.expression.contains(' '));
    }

    #[test]
    fn unknown_leaf_repaired_in_place() {
        let outcome = sanitize("MIT OR TotallyMadeUp-3.0");
        assert_eq!(outcome.expression, "MIT OR LicenseRef-TotallyMadeUp-3.0");
        assert_eq!(outcome.repaired_leaves, 1);
    }

    #[test]
    fn multiple_invalid_leaves_each_counted() {
        let outcome = sanitize("FooLicense AND BarLicense");
        assert_eq!(outcome.repaired_leaves, 2);
        assert_eq!(
            outcome.expression,
            "LicenseRef-FooLicense AND LicenseRef-BarLicense"
        );
    }

    #[test]
    fn alias_normalization_is_not_a_repair() {
        let outcome = sanitize("Apache License 2.0");
        assert_eq!(outcome.expression, "Apache-2.0");
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn case_only_mismatch_is_canonicalized_not_repaired() {
        let outcome = sanitize("mit");
        assert_eq!(outcome.expression, "MIT");
        assert!(outcome.was_modified);
        assert_eq!(outcome.repaired_leaves, 0);
    }

    #[test]
    fn output_always_satisfies_the_invariant() {
        for input in [
            "some random words",
            "GPL-2.0+ WITH bogus-exception",
            "MIT AND",
            "(((",
            "Commercial",
        ] {
            let outcome = sanitize(input);
            let recheck = sanitize(&outcome.expression);
            assert!(
                !recheck.was_modified,
                "sanitized output of {input:?} must itself be valid, got {:?}",
                outcome.expression
            );
        }
    }
}

// ============================================================================
// Determinism and idempotency
// ============================================================================

mod stability {
    use super::*;

    #[test]
    fn same_text_always_yields_same_slug() {
        let first = sanitize("Custom EULA v2 (internal)");
        let second = sanitize("Custom EULA v2 (internal)");
        assert_eq!(first.expression, second.expression);
    }

    #[test]
    fn different_text_yields_different_slugs() {
        assert_ne!(
            sanitize("Vendor License A").expression,
            sanitize("Vendor License B").expression
        );
    }

    #[test]
    fn sanitize_is_idempotent_on_varied_inputs() {
        for input in [
            "",
            "NOASSERTION",
            "MIT",
            "mit or apache-2.0",
            "Commercial - see LICENSE.txt",
            "GPLv3",
            "(BSD-3-Clause AND whatever) OR MIT",
        ] {
            let first = sanitize(input);
            let second = sanitize(&first.expression);
            assert_eq!(second.expression, first.expression, "input {input:?}");
            assert!(!second.was_modified, "input {input:?}");
            assert_eq!(second.repaired_leaves, 0, "input {input:?}");
        }
    }
}

// ============================================================================
// LicenseRef shape
// ============================================================================

mod license_ref {
    use super::*;

    #[test]
    fn recognizes_well_formed_refs() {
        assert!(is_license_ref("LicenseRef-Custom"));
        assert!(is_license_ref("LicenseRef-v2.0-internal"));
        assert!(!is_license_ref("LicenseRef-"));
        assert!(!is_license_ref("licenseref-custom"));
        assert!(!is_license_ref("MIT"));
    }

    #[test]
    fn generated_refs_are_well_formed() {
        for input in ["weird   spacing", "tabs\there", "ünicode-license", "%%%"] {
            let outcome = sanitize(input);
            assert!(
                is_license_ref(&outcome.expression),
                "generated ref for {input:?} is malformed: {}",
                outcome.expression
            );
        }
    }
}
