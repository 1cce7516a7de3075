//! Package input descriptor for the enrichment capability.

use std::str::FromStr;

use packageurl::PackageUrl;

use crate::error::{Result, SbomResolverError};
use crate::provider::ResolveInput;

/// One package to enrich, identified by its Package URL.
#[derive(Debug, Clone)]
pub struct PackageInput {
    purl: PackageUrl<'static>,
    raw: String,
}

impl PackageInput {
    /// Parse a PURL string into an input descriptor.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let purl = PackageUrl::from_str(trimmed)
            .map_err(|e| SbomResolverError::invalid_purl(trimmed, e.to_string()))?;
        Ok(Self {
            purl,
            raw: trimmed.to_string(),
        })
    }

    pub fn purl(&self) -> &PackageUrl<'static> {
        &self.purl
    }

    /// PURL type ("cargo", "pypi", "deb", ...).
    pub fn ty(&self) -> &str {
        self.purl.ty()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.purl.namespace()
    }

    pub fn name(&self) -> &str {
        self.purl.name()
    }

    pub fn version(&self) -> Option<&str> {
        self.purl.version()
    }

    /// The PURL string as given.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl ResolveInput for PackageInput {
    fn identity(&self) -> String {
        self.raw.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_purl() {
        let input = PackageInput::parse("pkg:pypi/requests@2.31.0").unwrap();
        assert_eq!(input.ty(), "pypi");
        assert_eq!(input.name(), "requests");
        assert_eq!(input.version(), Some("2.31.0"));
        assert_eq!(input.identity(), "pkg:pypi/requests@2.31.0");
    }

    #[test]
    fn parses_namespaced_purl() {
        let input = PackageInput::parse("pkg:deb/debian/bash@5.1").unwrap();
        assert_eq!(input.ty(), "deb");
        assert_eq!(input.namespace(), Some("debian"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(PackageInput::parse("not-a-purl").is_err());
    }
}
