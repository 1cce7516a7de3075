//! Field sanitization for values fetched from external registries.
//!
//! Everything arriving from a package registry is untrusted text. These
//! helpers strip control characters, enforce length limits, validate URL
//! schemes, and normalize VCS URLs to the SPDX form before a value is
//! allowed into a [`crate::model::MetadataDraft`].

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Maximum lengths for the individual fields.
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;
pub const MAX_SUPPLIER_LENGTH: usize = 256;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_LICENSE_LENGTH: usize = 512;
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Allowed URL schemes: http(s) plus the SPDX VCS schemes.
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "git", "git+ssh", "git+https", "git+http"];

/// Git hosting providers whose https URLs are known to be git repositories.
const KNOWN_GIT_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "codeberg.org",
    "sr.ht",
    "git.sr.ht",
    "gitea.com",
    "gitee.com",
    "salsa.debian.org",
    "gitlab.gnome.org",
    "gitlab.freedesktop.org",
    "git.kernel.org",
    "git.savannah.gnu.org",
    "git.savannah.nongnu.org",
];

static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("static regex")
});

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<[a-zA-Z][^>]*>").expect("static regex"));

static SSH_GIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^git@([^:]+):(.+)$").expect("static regex"));

static SCM_GIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^scm:git:(.+)$").expect("static regex"));

/// Sanitize a free-text string: strip control characters, optionally fold
/// newlines, collapse whitespace, and truncate at a word boundary.
pub fn sanitize_string(value: &str, max_length: usize, allow_newlines: bool) -> Option<String> {
    let mut sanitized = CONTROL_CHARS.replace_all(value, "").into_owned();

    if !allow_newlines {
        sanitized = sanitized.replace(['\n', '\r'], " ");
        sanitized = sanitized.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    let mut sanitized = sanitized.trim().to_string();

    if sanitized.chars().count() > max_length {
        tracing::debug!(
            from = sanitized.chars().count(),
            to = max_length,
            "truncating oversized field"
        );
        if max_length > 3 {
            let mut base: String = sanitized.chars().take(max_length - 3).collect();
            // Break on a space rather than mid-word where possible.
            if let Some(last_space) = base.rfind(' ') {
                if last_space > 0 {
                    base.truncate(last_space);
                }
            }
            sanitized = format!("{}...", base.trim_end());
        } else {
            sanitized = sanitized.chars().take(max_length).collect();
        }
    }

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Sanitize a description (newlines preserved).
pub fn sanitize_description(value: &str) -> Option<String> {
    sanitize_string(value, MAX_DESCRIPTION_LENGTH, true)
}

/// Sanitize a supplier/vendor name.
pub fn sanitize_supplier(value: &str) -> Option<String> {
    sanitize_string(value, MAX_SUPPLIER_LENGTH, false)
}

/// Sanitize a raw license string. SPDX-expression validation happens later,
/// in the merge chokepoint; this only bounds and cleans the text.
pub fn sanitize_license_text(value: &str) -> Option<String> {
    sanitize_string(value, MAX_LICENSE_LENGTH, false)
}

/// Validate and sanitize a URL. Returns `None` for anything outside the
/// scheme allowlist, without a host, oversized, or containing HTML-ish text.
pub fn sanitize_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() > MAX_URL_LENGTH {
        tracing::debug!(len = trimmed.len(), "rejecting oversized URL");
        return None;
    }

    if HTML_TAG.is_match(trimmed) {
        tracing::debug!("rejecting URL containing HTML-like content");
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting unparsable URL");
            return None;
        }
    };

    let scheme = parsed.scheme().to_ascii_lowercase();
    if !ALLOWED_URL_SCHEMES.contains(&scheme.as_str()) {
        tracing::debug!(scheme = scheme.as_str(), "rejecting URL with disallowed scheme");
        return None;
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        tracing::debug!("rejecting URL without host");
        return None;
    }

    Some(trimmed.to_string())
}

/// Validate an email address shape. The actual address is never logged.
pub fn sanitize_email(value: &str) -> Option<String> {
    let email = value.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return None;
    }
    if !EMAIL_SHAPE.is_match(email) {
        tracing::debug!("rejecting malformed email");
        return None;
    }
    Some(email.to_string())
}

/// Normalize VCS URLs to the SPDX form.
///
/// Only URLs that are explicitly git-flavored or hosted on a known git
/// provider are touched; a plain https URL on an unknown domain could be
/// Mercurial, SVN, or just a website, and is returned unchanged.
///
/// - `scm:git:...` Maven prefixes are stripped
/// - `git@host:path` SSH shorthand becomes `git+https://host/path`
/// - `git://` is already a valid SPDX VCS scheme and is preserved
/// - `http(s)://` on a known git host gains a `git+` prefix
pub fn normalize_vcs_url(url: &str) -> String {
    if url.is_empty() {
        return url.to_string();
    }

    let mut had_scm_prefix = false;
    let mut current = url.to_string();

    if let Some(caps) = SCM_GIT.captures(&current) {
        current = caps[1].to_string();
        had_scm_prefix = true;
    }

    if let Some(caps) = SSH_GIT.captures(&current) {
        let normalized = format!("git+https://{}/{}", &caps[1], &caps[2]);
        tracing::debug!(original = url, normalized = normalized.as_str(), "normalized VCS URL");
        return normalized;
    }

    if current.starts_with("git://") {
        return current;
    }

    let is_known_git = had_scm_prefix || is_known_git_host(&current);
    if is_known_git && (current.starts_with("https://") || current.starts_with("http://")) {
        let normalized = format!("git+{current}");
        if normalized != url {
            tracing::debug!(original = url, normalized = normalized.as_str(), "normalized VCS URL");
        }
        return normalized;
    }

    current
}

fn is_known_git_host(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    KNOWN_GIT_HOSTS.contains(&host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        assert_eq!(
            sanitize_string("hello\x00world\x07", 100, true),
            Some("helloworld".to_string())
        );
    }

    #[test]
    fn collapses_whitespace_without_newlines() {
        assert_eq!(
            sanitize_supplier("Acme   Corp\n Inc"),
            Some("Acme Corp Inc".to_string())
        );
    }

    #[test]
    fn truncates_on_word_boundary_with_ellipsis() {
        let long = "word ".repeat(100);
        let out = sanitize_string(&long, 20, false).unwrap();
        assert!(out.len() <= 20);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn empty_becomes_none() {
        assert_eq!(sanitize_string("   ", 100, true), None);
        assert_eq!(sanitize_description(""), None);
    }

    #[test]
    fn url_scheme_allowlist() {
        assert!(sanitize_url("https://example.com/pkg").is_some());
        assert!(sanitize_url("git+https://github.com/x/y").is_some());
        assert!(sanitize_url("javascript:alert(1)").is_none());
        assert!(sanitize_url("ftp://example.com").is_none());
    }

    #[test]
    fn url_rejects_html_and_hostless() {
        assert!(sanitize_url("https://example.com/<script>x</script>").is_none());
        assert!(sanitize_url("https://").is_none());
    }

    #[test]
    fn email_shape_validation() {
        assert_eq!(
            sanitize_email("dev@example.com"),
            Some("dev@example.com".to_string())
        );
        assert_eq!(sanitize_email("not-an-email"), None);
    }

    #[test]
    fn vcs_ssh_shorthand_normalized() {
        assert_eq!(
            normalize_vcs_url("git@github.com:serde-rs/serde.git"),
            "git+https://github.com/serde-rs/serde.git"
        );
    }

    #[test]
    fn vcs_scm_prefix_stripped() {
        assert_eq!(
            normalize_vcs_url("scm:git:https://example.org/repo.git"),
            "git+https://example.org/repo.git"
        );
    }

    #[test]
    fn vcs_known_host_gets_git_prefix() {
        assert_eq!(
            normalize_vcs_url("https://github.com/serde-rs/serde"),
            "git+https://github.com/serde-rs/serde"
        );
    }

    #[test]
    fn vcs_unknown_host_untouched() {
        assert_eq!(
            normalize_vcs_url("https://example.org/repo"),
            "https://example.org/repo"
        );
    }

    #[test]
    fn vcs_git_protocol_preserved() {
        assert_eq!(
            normalize_vcs_url("git://git.kernel.org/pub/scm/linux.git"),
            "git://git.kernel.org/pub/scm/linux.git"
        );
    }
}
