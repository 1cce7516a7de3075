//! PURL-based fallback source for OS package metadata.
//!
//! No API calls: supplier and package-tracker homepage are derived directly
//! from the PURL namespace and type. This keeps the NTIA supplier requirement
//! satisfiable for distro packages even when every registry lookup fails.

use crate::enrich::PackageInput;
use crate::model::MetadataDraft;
use crate::provider::{Provider, ProviderContext, ProviderOutcome};

/// OS package types that can be enriched from the PURL alone.
const OS_PACKAGE_TYPES: &[&str] = &["deb", "rpm", "apk", "alpm", "ebuild"];

/// PURL namespace to supplier organization.
const NAMESPACE_TO_SUPPLIER: &[(&str, &str)] = &[
    ("debian", "Debian Project"),
    ("ubuntu", "Canonical Ltd"),
    ("redhat", "Red Hat, Inc."),
    ("rhel", "Red Hat, Inc."),
    ("centos", "CentOS Project"),
    ("fedora", "Fedora Project"),
    ("amazon", "Amazon Web Services"),
    ("oracle", "Oracle Corporation"),
    ("rocky", "Rocky Enterprise Software Foundation"),
    ("almalinux", "AlmaLinux OS Foundation"),
    ("alpine", "Alpine Linux"),
    ("arch", "Arch Linux"),
    ("gentoo", "Gentoo Foundation"),
    ("opensuse", "openSUSE Project"),
    ("suse", "SUSE LLC"),
    ("wolfi", "Chainguard, Inc."),
    ("chainguard", "Chainguard, Inc."),
];

/// Package tracker URL templates per (type, namespace); `{}` takes the
/// package name.
const PACKAGE_TRACKER_URLS: &[(&str, &str, &str)] = &[
    ("deb", "debian", "https://tracker.debian.org/pkg/{}"),
    ("deb", "ubuntu", "https://launchpad.net/ubuntu/+source/{}"),
    ("rpm", "fedora", "https://packages.fedoraproject.org/pkgs/{}"),
    ("rpm", "centos", "https://git.centos.org/rpms/{}"),
    ("apk", "alpine", "https://pkgs.alpinelinux.org/package/edge/main/x86_64/{}"),
    ("apk", "wolfi", "https://github.com/wolfi-dev/os/tree/main/{}"),
    (
        "apk",
        "chainguard",
        "https://images.chainguard.dev/directory/image/{}/overview",
    ),
];

/// Local extraction source for OS packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurlFallbackSource;

impl PurlFallbackSource {
    pub fn new() -> Self {
        Self
    }

    fn supplier_for(namespace: &str) -> Option<&'static str> {
        let needle = namespace.to_ascii_lowercase();
        NAMESPACE_TO_SUPPLIER
            .iter()
            .find(|(ns, _)| *ns == needle)
            .map(|(_, supplier)| *supplier)
    }

    fn tracker_url(ty: &str, namespace: &str, name: &str) -> Option<String> {
        let needle = namespace.to_ascii_lowercase();
        PACKAGE_TRACKER_URLS
            .iter()
            .find(|(t, ns, _)| *t == ty && *ns == needle)
            .map(|(_, _, template)| template.replace("{}", name))
    }
}

impl Provider<PackageInput, MetadataDraft> for PurlFallbackSource {
    fn name(&self) -> &str {
        "purl"
    }

    fn priority(&self) -> i32 {
        // Tier 3 fallback: no API calls, basic metadata only.
        70
    }

    fn supports(&self, input: &PackageInput) -> bool {
        OS_PACKAGE_TYPES.contains(&input.ty())
    }

    fn execute(&self, input: &PackageInput, _ctx: &ProviderContext) -> ProviderOutcome<MetadataDraft> {
        let Some(namespace) = input.namespace() else {
            return ProviderOutcome::Unsupported;
        };

        let mut draft = MetadataDraft::new();
        if let Some(supplier) = Self::supplier_for(namespace) {
            draft.set_supplier(supplier);
        }
        if let Some(url) = Self::tracker_url(input.ty(), namespace, input.name()) {
            draft.set_homepage(&url);
        }

        if draft.has_data() {
            ProviderOutcome::Success(draft)
        } else {
            ProviderOutcome::Unsupported
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CancelToken, ProviderContext};
    use std::time::{Duration, Instant};

    fn ctx() -> ProviderContext {
        ProviderContext::new(Instant::now() + Duration::from_secs(1), CancelToken::new())
    }

    #[test]
    fn supports_only_os_packages() {
        let source = PurlFallbackSource::new();
        assert!(source.supports(&PackageInput::parse("pkg:deb/debian/bash@5.1").unwrap()));
        assert!(!source.supports(&PackageInput::parse("pkg:cargo/serde@1.0").unwrap()));
    }

    #[test]
    fn derives_supplier_and_tracker() {
        let source = PurlFallbackSource::new();
        let input = PackageInput::parse("pkg:deb/debian/bash@5.1-2").unwrap();
        match source.execute(&input, &ctx()) {
            ProviderOutcome::Success(draft) => {
                assert_eq!(draft.supplier.as_deref(), Some("Debian Project"));
                assert_eq!(
                    draft.homepage.as_deref(),
                    Some("https://tracker.debian.org/pkg/bash")
                );
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn unknown_namespace_is_unsupported() {
        let source = PurlFallbackSource::new();
        let input = PackageInput::parse("pkg:deb/unknowndistro/foo@1").unwrap();
        assert!(matches!(
            source.execute(&input, &ctx()),
            ProviderOutcome::Unsupported
        ));
    }
}
