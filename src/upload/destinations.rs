//! Upload destination adapters.

use base64::Engine as _;
use reqwest::blocking::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::UploadConfig;
use crate::generate::SbomFormat;
use crate::net::build_client;
use crate::provider::{FailureKind, FailureReason, Provider, ProviderContext, ProviderOutcome};
use crate::upload::{UploadInput, UploadReceipt};

fn read_sbom(input: &UploadInput) -> Result<Vec<u8>, FailureReason> {
    std::fs::read(&input.sbom_file).map_err(|e| {
        FailureReason::new(
            FailureKind::Io,
            format!("reading {}: {e}", input.sbom_file.display()),
        )
    })
}

fn send_error(e: &reqwest::Error) -> ProviderOutcome<UploadReceipt> {
    if e.is_timeout() {
        ProviderOutcome::TimedOut
    } else {
        ProviderOutcome::Failed(FailureReason::network(e.to_string()))
    }
}

// ============================================================================
// sbomify
// ============================================================================

/// Credentials for the sbomify artifact API.
#[derive(Debug, Clone)]
pub struct SbomifyUploadConfig {
    pub api_base: String,
    pub token: String,
    pub component_id: String,
    pub timeout: Duration,
}

impl SbomifyUploadConfig {
    /// Pull sbomify credentials out of the global upload config, if all of
    /// them are present.
    pub fn from_config(config: &UploadConfig) -> Option<Self> {
        match (&config.sbomify_token, &config.sbomify_component_id) {
            (Some(token), Some(component_id)) => Some(Self {
                api_base: config.sbomify_api_base.clone(),
                token: token.clone(),
                component_id: component_id.clone(),
                timeout: Duration::from_secs(config.upload_timeout_secs),
            }),
            _ => None,
        }
    }
}

/// Primary destination: the sbomify backend.
pub struct SbomifyDestination {
    config: SbomifyUploadConfig,
    client: Client,
}

impl SbomifyDestination {
    pub fn new(config: SbomifyUploadConfig) -> Result<Self, FailureReason> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

impl Provider<UploadInput, UploadReceipt> for SbomifyDestination {
    fn name(&self) -> &str {
        "sbomify"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supports(&self, _input: &UploadInput) -> bool {
        // Construction already guaranteed full credentials; both formats are
        // accepted by the artifact endpoint.
        true
    }

    fn execute(&self, input: &UploadInput, ctx: &ProviderContext) -> ProviderOutcome<UploadReceipt> {
        let body = match read_sbom(input) {
            Ok(body) => body,
            Err(reason) => return ProviderOutcome::Failed(reason),
        };
        let url = format!(
            "{}/api/v1/sboms/artifact/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            input.format,
            self.config.component_id
        );
        tracing::debug!(url = url.as_str(), bytes = body.len(), "uploading SBOM to sbomify");

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .header("Content-Type", "application/json")
            .body(body)
            .timeout(ctx.remaining())
            .send()
        {
            Ok(response) => response,
            Err(e) => return send_error(&e),
        };

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return ProviderOutcome::Failed(FailureReason::new(
                FailureKind::Auth,
                format!("sbomify rejected credentials: HTTP {status}"),
            ));
        }
        if !status.is_success() {
            return ProviderOutcome::Failed(FailureReason::api(format!(
                "sbomify upload failed: HTTP {status}"
            )));
        }

        ProviderOutcome::Success(UploadReceipt {
            destination: self.name().to_string(),
            location: Some(format!(
                "{}/component/{}",
                self.config.api_base.trim_end_matches('/'),
                self.config.component_id
            )),
        })
    }
}

// ============================================================================
// Dependency Track
// ============================================================================

/// Credentials for a Dependency Track server, from `DTRACK_*` variables.
#[derive(Debug, Clone)]
pub struct DependencyTrackConfig {
    pub api_key: String,
    /// Full API base URL; `/v1/bom` is appended.
    pub api_url: String,
    pub project_id: Option<String>,
    pub auto_create: bool,
    pub timeout: Duration,
}

impl DependencyTrackConfig {
    /// Load from `DTRACK_API_KEY` / `DTRACK_API_URL` / `DTRACK_PROJECT_ID` /
    /// `DTRACK_AUTO_CREATE`. Returns None when the required pair is absent.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("DTRACK_API_KEY").ok()?;
        let api_url = std::env::var("DTRACK_API_URL").ok()?;
        if api_key.is_empty() || api_url.is_empty() {
            return None;
        }
        let auto_create = std::env::var("DTRACK_AUTO_CREATE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "on"))
            .unwrap_or(false);
        Some(Self {
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            project_id: std::env::var("DTRACK_PROJECT_ID").ok().filter(|v| !v.is_empty()),
            auto_create,
            timeout: Duration::from_secs(120),
        })
    }
}

/// Dependency Track destination. CycloneDX only; SPDX uploads are rejected
/// by the server, so `supports` filters them out up front.
pub struct DependencyTrackDestination {
    config: DependencyTrackConfig,
    client: Client,
}

impl DependencyTrackDestination {
    pub fn new(config: DependencyTrackConfig) -> Result<Self, FailureReason> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }
}

impl Provider<UploadInput, UploadReceipt> for DependencyTrackDestination {
    fn name(&self) -> &str {
        "dependency-track"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn supports(&self, input: &UploadInput) -> bool {
        input.format == SbomFormat::CycloneDx
    }

    fn execute(&self, input: &UploadInput, ctx: &ProviderContext) -> ProviderOutcome<UploadReceipt> {
        let body = match read_sbom(input) {
            Ok(body) => body,
            Err(reason) => return ProviderOutcome::Failed(reason),
        };
        let bom = base64::engine::general_purpose::STANDARD.encode(body);

        let mut payload = json!({ "bom": bom });
        if let Some(project_id) = &self.config.project_id {
            payload["project"] = json!(project_id);
        } else {
            payload["projectName"] = json!(input
                .component_name
                .clone()
                .unwrap_or_else(|| "unnamed-component".to_string()));
            if let Some(version) = &input.component_version {
                payload["projectVersion"] = json!(version);
            }
            payload["autoCreate"] = json!(self.config.auto_create);
        }

        let url = format!("{}/v1/bom", self.config.api_url);
        tracing::debug!(url = url.as_str(), "uploading SBOM to Dependency Track");

        let response = match self
            .client
            .put(&url)
            .header("X-Api-Key", &self.config.api_key)
            .json(&payload)
            .timeout(ctx.remaining())
            .send()
        {
            Ok(response) => response,
            Err(e) => return send_error(&e),
        };

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return ProviderOutcome::Failed(FailureReason::new(
                FailureKind::Auth,
                format!("Dependency Track rejected credentials: HTTP {status}"),
            ));
        }
        if !status.is_success() {
            return ProviderOutcome::Failed(FailureReason::api(format!(
                "Dependency Track upload failed: HTTP {status}"
            )));
        }

        ProviderOutcome::Success(UploadReceipt {
            destination: self.name().to_string(),
            location: self.config.project_id.clone(),
        })
    }
}
