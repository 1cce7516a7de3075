//! Generator tool adapters.
//!
//! Each adapter is a thin provider over an external CLI tool. `supports`
//! inspects only the input's static shape (lock file name, requested format
//! and version); tool availability is discovered at execution time, where a
//! missing binary is just another recoverable failure in the cascade.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::generate::{
    GenerationInput, GenerationReport, SbomFormat, CPP_LOCK_FILES, DART_LOCK_FILES,
    DOTNET_LOCK_FILES, ELIXIR_LOCK_FILES, GO_LOCK_FILES, JAVASCRIPT_LOCK_FILES, JAVA_LOCK_FILES,
    PHP_LOCK_FILES, PYTHON_LOCK_FILES, RUBY_LOCK_FILES, RUST_LOCK_FILES, SWIFT_LOCK_FILES,
};
use crate::provider::{FailureReason, Provider, ProviderContext, ProviderOutcome};

/// Poll interval while waiting for a tool to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run a tool to completion, killing it at the context deadline.
fn run_tool(mut command: Command, ctx: &ProviderContext) -> Result<(), ProviderOutcome<GenerationReport>> {
    let program = command.get_program().to_string_lossy().into_owned();
    command.stdout(Stdio::null()).stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProviderOutcome::Failed(FailureReason::tool(format!(
                "{program} not found on PATH"
            ))));
        }
        Err(e) => {
            return Err(ProviderOutcome::Failed(FailureReason::tool(format!(
                "failed to start {program}: {e}"
            ))));
        }
    };

    // Drain stderr on a separate thread so a chatty tool cannot fill the
    // pipe and block itself.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            use std::io::Read;
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    return Ok(());
                }
                let stderr = stderr_reader
                    .and_then(|handle| handle.join().ok())
                    .unwrap_or_default();
                let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
                return Err(ProviderOutcome::Failed(FailureReason::tool(format!(
                    "{program} exited with {status}: {tail}"
                ))));
            }
            Ok(None) => {
                if ctx.remaining().is_zero() || ctx.is_cancelled() {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProviderOutcome::TimedOut);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(ProviderOutcome::Failed(FailureReason::tool(format!(
                    "waiting for {program}: {e}"
                ))));
            }
        }
    }
}

/// Check that the generator actually produced a JSON document.
fn validate_output(path: &Path) -> Result<(), ProviderOutcome<GenerationReport>> {
    let content = std::fs::read_to_string(path).map_err(|_| {
        ProviderOutcome::Failed(FailureReason::tool(format!(
            "generator produced no output at {}",
            path.display()
        )))
    })?;
    serde_json::from_str::<serde_json::Value>(&content).map_err(|e| {
        ProviderOutcome::Failed(FailureReason::tool(format!(
            "generator output is not valid JSON: {e}"
        )))
    })?;
    Ok(())
}

fn report(generator: &str, input: &GenerationInput, spec_version: String) -> GenerationReport {
    GenerationReport {
        generator: generator.to_string(),
        output_file: input.output_file.clone(),
        format: input.output_format,
        spec_version,
    }
}

// ============================================================================
// cargo-cyclonedx
// ============================================================================

const CARGO_CYCLONEDX_VERSIONS: &[&str] = &["1.4", "1.5", "1.6"];
const CARGO_CYCLONEDX_DEFAULT: &str = "1.6";

/// Native generator for Rust workspaces (`Cargo.lock`), CycloneDX only.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoCyclonedxGenerator;

impl CargoCyclonedxGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Provider<GenerationInput, GenerationReport> for CargoCyclonedxGenerator {
    fn name(&self) -> &str {
        "cargo-cyclonedx"
    }

    fn priority(&self) -> i32 {
        // Native generator for its ecosystem.
        10
    }

    fn supports(&self, input: &GenerationInput) -> bool {
        input.output_format == SbomFormat::CycloneDx
            && input
                .lock_file_name()
                .is_some_and(|name| RUST_LOCK_FILES.contains(&name.as_str()))
            && input
                .spec_version
                .as_deref()
                .map_or(true, |v| CARGO_CYCLONEDX_VERSIONS.contains(&v))
    }

    fn execute(&self, input: &GenerationInput, ctx: &ProviderContext) -> ProviderOutcome<GenerationReport> {
        let Some(lock_file) = input.lock_file() else {
            return ProviderOutcome::Unsupported;
        };
        let spec_version = input
            .spec_version
            .clone()
            .unwrap_or_else(|| CARGO_CYCLONEDX_DEFAULT.to_string());
        let workspace = lock_file.parent().unwrap_or_else(|| Path::new("."));

        let mut command = Command::new("cargo");
        command
            .arg("cyclonedx")
            .arg("--format")
            .arg("json")
            .arg("--spec-version")
            .arg(&spec_version)
            .current_dir(workspace);
        if let Err(outcome) = run_tool(command, ctx) {
            return outcome;
        }

        // cargo-cyclonedx writes <package>.cdx.json next to the manifest;
        // move the first match to the requested output path.
        let produced = std::fs::read_dir(workspace).ok().and_then(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .find(|p| p.to_string_lossy().ends_with(".cdx.json"))
        });
        let Some(produced) = produced else {
            return ProviderOutcome::Failed(FailureReason::tool(
                "cargo cyclonedx produced no .cdx.json output",
            ));
        };
        if produced != input.output_file {
            if let Err(e) = std::fs::rename(&produced, &input.output_file) {
                return ProviderOutcome::Failed(FailureReason::tool(format!(
                    "failed to move generated SBOM into place: {e}"
                )));
            }
        }

        if let Err(outcome) = validate_output(&input.output_file) {
            return outcome;
        }
        ProviderOutcome::Success(report(self.name(), input, spec_version))
    }
}

// ============================================================================
// syft
// ============================================================================

const SYFT_CYCLONEDX_VERSIONS: &[&str] = &["1.2", "1.3", "1.4", "1.5", "1.6"];
const SYFT_CYCLONEDX_DEFAULT: &str = "1.6";
const SYFT_SPDX_VERSIONS: &[&str] = &["2.2", "2.3"];
const SYFT_SPDX_DEFAULT: &str = "2.3";

/// Multi-ecosystem generator; handles lock files and container images in
/// both formats, with version selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyftGenerator;

impl SyftGenerator {
    pub fn new() -> Self {
        Self
    }

    fn versions_for(format: SbomFormat) -> (&'static [&'static str], &'static str) {
        match format {
            SbomFormat::CycloneDx => (SYFT_CYCLONEDX_VERSIONS, SYFT_CYCLONEDX_DEFAULT),
            SbomFormat::Spdx => (SYFT_SPDX_VERSIONS, SYFT_SPDX_DEFAULT),
        }
    }
}

impl Provider<GenerationInput, GenerationReport> for SyftGenerator {
    fn name(&self) -> &str {
        "syft"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn supports(&self, input: &GenerationInput) -> bool {
        let (versions, _) = Self::versions_for(input.output_format);
        let version_ok = input
            .spec_version
            .as_deref()
            .map_or(true, |v| versions.contains(&v));
        let source_ok = match input.lock_file_name() {
            Some(name) => crate::generate::is_known_lock_file(&name),
            None => input.docker_image().is_some(),
        };
        version_ok && source_ok
    }

    fn execute(&self, input: &GenerationInput, ctx: &ProviderContext) -> ProviderOutcome<GenerationReport> {
        let (_, default_version) = Self::versions_for(input.output_format);
        let spec_version = input
            .spec_version
            .clone()
            .unwrap_or_else(|| default_version.to_string());

        let target = match (&input.lock_file(), input.docker_image()) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(image)) => image.to_string(),
            (None, None) => return ProviderOutcome::Unsupported,
        };
        let output_spec = match input.output_format {
            SbomFormat::CycloneDx => format!(
                "cyclonedx-json@{}={}",
                spec_version,
                input.output_file.display()
            ),
            SbomFormat::Spdx => format!(
                "spdx-json@{}={}",
                spec_version,
                input.output_file.display()
            ),
        };

        let mut command = Command::new("syft");
        command.arg("scan").arg(&target).arg("-o").arg(&output_spec);
        if let Err(outcome) = run_tool(command, ctx) {
            return outcome;
        }
        if let Err(outcome) = validate_output(&input.output_file) {
            return outcome;
        }
        ProviderOutcome::Success(report(self.name(), input, spec_version))
    }
}

// ============================================================================
// trivy
// ============================================================================

const TRIVY_CYCLONEDX_VERSION: &str = "1.6";
const TRIVY_SPDX_VERSION: &str = "2.3";

/// Multi-ecosystem generator with fixed spec versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivyGenerator;

impl TrivyGenerator {
    pub fn new() -> Self {
        Self
    }

    fn fixed_version(format: SbomFormat) -> &'static str {
        match format {
            SbomFormat::CycloneDx => TRIVY_CYCLONEDX_VERSION,
            SbomFormat::Spdx => TRIVY_SPDX_VERSION,
        }
    }
}

impl Provider<GenerationInput, GenerationReport> for TrivyGenerator {
    fn name(&self) -> &str {
        "trivy"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn supports(&self, input: &GenerationInput) -> bool {
        // Trivy offers no spec version selection.
        let version_ok = input
            .spec_version
            .as_deref()
            .map_or(true, |v| v == Self::fixed_version(input.output_format));
        let source_ok = match input.lock_file_name() {
            Some(name) => crate::generate::is_known_lock_file(&name),
            None => input.docker_image().is_some(),
        };
        version_ok && source_ok
    }

    fn execute(&self, input: &GenerationInput, ctx: &ProviderContext) -> ProviderOutcome<GenerationReport> {
        let format_arg = match input.output_format {
            SbomFormat::CycloneDx => "cyclonedx",
            SbomFormat::Spdx => "spdx-json",
        };

        let mut command = Command::new("trivy");
        match (&input.lock_file(), input.docker_image()) {
            (Some(path), _) => {
                let scan_dir = path.parent().unwrap_or_else(|| Path::new("."));
                command.arg("fs").arg(scan_dir);
            }
            (None, Some(image)) => {
                command.arg("image").arg(image);
            }
            (None, None) => return ProviderOutcome::Unsupported,
        }
        command
            .arg("--format")
            .arg(format_arg)
            .arg("--output")
            .arg(&input.output_file);

        if let Err(outcome) = run_tool(command, ctx) {
            return outcome;
        }
        if let Err(outcome) = validate_output(&input.output_file) {
            return outcome;
        }
        ProviderOutcome::Success(report(
            self.name(),
            input,
            Self::fixed_version(input.output_format).to_string(),
        ))
    }
}

// ============================================================================
// cdxgen
// ============================================================================

const CDXGEN_VERSIONS: &[&str] = &["1.4", "1.5", "1.6", "1.7"];
const CDXGEN_DEFAULT: &str = "1.6";

/// CycloneDX-only generator, strongest on the node/JVM ecosystems.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdxgenGenerator;

impl CdxgenGenerator {
    pub fn new() -> Self {
        Self
    }

    fn supported_lock_file(name: &str) -> bool {
        [
            PYTHON_LOCK_FILES,
            JAVASCRIPT_LOCK_FILES,
            JAVA_LOCK_FILES,
            GO_LOCK_FILES,
            RUST_LOCK_FILES,
            RUBY_LOCK_FILES,
            DART_LOCK_FILES,
            CPP_LOCK_FILES,
            PHP_LOCK_FILES,
            DOTNET_LOCK_FILES,
            SWIFT_LOCK_FILES,
            ELIXIR_LOCK_FILES,
        ]
        .iter()
        .any(|list| list.contains(&name))
    }
}

impl Provider<GenerationInput, GenerationReport> for CdxgenGenerator {
    fn name(&self) -> &str {
        "cdxgen"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn supports(&self, input: &GenerationInput) -> bool {
        input.output_format == SbomFormat::CycloneDx
            && input
                .spec_version
                .as_deref()
                .map_or(true, |v| CDXGEN_VERSIONS.contains(&v))
            && input
                .lock_file_name()
                .is_some_and(|name| Self::supported_lock_file(&name))
    }

    fn execute(&self, input: &GenerationInput, ctx: &ProviderContext) -> ProviderOutcome<GenerationReport> {
        let Some(lock_file) = input.lock_file() else {
            return ProviderOutcome::Unsupported;
        };
        let spec_version = input
            .spec_version
            .clone()
            .unwrap_or_else(|| CDXGEN_DEFAULT.to_string());
        let scan_dir = lock_file.parent().unwrap_or_else(|| Path::new("."));

        let mut command = Command::new("cdxgen");
        command
            .arg("--spec-version")
            .arg(&spec_version)
            .arg("-o")
            .arg(&input.output_file)
            .arg(scan_dir);
        if let Err(outcome) = run_tool(command, ctx) {
            return outcome;
        }
        if let Err(outcome) = validate_output(&input.output_file) {
            return outcome;
        }
        ProviderOutcome::Success(report(self.name(), input, spec_version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::GenerationInput;

    #[test]
    fn cargo_cyclonedx_supports_cargo_lock_only() {
        let generator = CargoCyclonedxGenerator::new();
        assert!(generator.supports(&GenerationInput::for_lock_file("Cargo.lock")));
        assert!(!generator.supports(&GenerationInput::for_lock_file("requirements.txt")));
        assert!(!generator.supports(
            &GenerationInput::for_lock_file("Cargo.lock").with_format(SbomFormat::Spdx)
        ));
        assert!(!generator.supports(&GenerationInput::for_docker_image("alpine:3.20")));
    }

    #[test]
    fn syft_supports_images_and_lock_files() {
        let generator = SyftGenerator::new();
        assert!(generator.supports(&GenerationInput::for_docker_image("alpine:3.20")));
        assert!(generator.supports(&GenerationInput::for_lock_file("go.mod")));
        assert!(!generator.supports(
            &GenerationInput::for_lock_file("go.mod").with_spec_version(Some("9.9".into()))
        ));
    }

    #[test]
    fn trivy_rejects_unsupported_spec_version() {
        let generator = TrivyGenerator::new();
        assert!(generator.supports(
            &GenerationInput::for_docker_image("alpine:3.20").with_spec_version(Some("1.6".into()))
        ));
        assert!(!generator.supports(
            &GenerationInput::for_docker_image("alpine:3.20").with_spec_version(Some("1.5".into()))
        ));
    }

    #[test]
    fn cdxgen_is_cyclonedx_only() {
        let generator = CdxgenGenerator::new();
        assert!(generator.supports(&GenerationInput::for_lock_file("package-lock.json")));
        assert!(!generator.supports(
            &GenerationInput::for_lock_file("package-lock.json").with_format(SbomFormat::Spdx)
        ));
    }
}
