//! Minimal CycloneDX JSON document boundary.
//!
//! The resolver core works on PURLs and `NormalizedMetadata`; this module is
//! the narrow bridge to an actual SBOM file. It extracts component PURLs and
//! writes merged fields back, filling only fields the document does not
//! already carry. Full schema emission belongs to the SBOM generators, not
//! here.

use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{DocumentErrorKind, ErrorContext, Result, SbomResolverError};
use crate::model::NormalizedMetadata;

/// A CycloneDX document held as a JSON tree.
#[derive(Debug, Clone)]
pub struct CycloneDxDocument {
    root: Value,
}

impl CycloneDxDocument {
    /// Load and validate a CycloneDX JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SbomResolverError::io(path, e))?;
        Self::from_str(&content).with_context(|| format!("loading {}", path.display()))
    }

    /// Parse CycloneDX JSON text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(content)?;
        if root.get("bomFormat").and_then(Value::as_str) != Some("CycloneDX") {
            return Err(SbomResolverError::document(
                "validating document",
                DocumentErrorKind::NotCycloneDx,
            ));
        }
        Ok(Self { root })
    }

    /// All component PURLs, in document order.
    pub fn component_purls(&self) -> Vec<String> {
        self.root
            .get("components")
            .and_then(Value::as_array)
            .map(|components| {
                components
                    .iter()
                    .filter_map(|c| c.get("purl").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Name and version of the document's subject component, if declared.
    pub fn subject(&self) -> (Option<String>, Option<String>) {
        let component = self.root.pointer("/metadata/component");
        let name = component
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let version = component
            .and_then(|c| c.get("version"))
            .and_then(Value::as_str)
            .map(str::to_string);
        (name, version)
    }

    /// Apply merged metadata to the component with the given PURL.
    ///
    /// Fill-only: fields the document already populates are left alone, so
    /// generator-produced data always wins over fetched data. Returns the
    /// number of fields written.
    pub fn apply_component_metadata(&mut self, purl: &str, metadata: &NormalizedMetadata) -> usize {
        let Some(components) = self.root.get_mut("components").and_then(Value::as_array_mut) else {
            return 0;
        };
        let Some(component) = components
            .iter_mut()
            .find(|c| c.get("purl").and_then(Value::as_str) == Some(purl))
        else {
            return 0;
        };
        Self::apply_to_component(component, metadata)
    }

    /// Apply organizational metadata to the document's subject component
    /// (`metadata.component`) and document supplier.
    pub fn apply_root_metadata(&mut self, metadata: &NormalizedMetadata) -> usize {
        let mut written = 0;

        let metadata_obj = self
            .root
            .as_object_mut()
            .map(|root| {
                root.entry("metadata")
                    .or_insert_with(|| Value::Object(Map::new()))
            })
            .and_then(Value::as_object_mut);
        let Some(metadata_obj) = metadata_obj else {
            return 0;
        };

        if let Some(supplier) = &metadata.supplier {
            if metadata_obj.get("supplier").is_none() {
                metadata_obj.insert(
                    "supplier".to_string(),
                    json!({ "name": supplier.value }),
                );
                written += 1;
            }
        }

        if let Some(component) = metadata_obj.get_mut("component") {
            written += Self::apply_to_component(component, metadata);
        }

        written
    }

    fn apply_to_component(component: &mut Value, metadata: &NormalizedMetadata) -> usize {
        let Some(obj) = component.as_object_mut() else {
            return 0;
        };
        let mut written = 0;

        if let Some(description) = &metadata.description {
            if obj.get("description").and_then(Value::as_str).map_or(true, str::is_empty) {
                obj.insert("description".to_string(), json!(description.value));
                written += 1;
            }
        }

        if let Some(supplier) = &metadata.supplier {
            if obj.get("supplier").is_none() {
                obj.insert("supplier".to_string(), json!({ "name": supplier.value }));
                written += 1;
            }
        }

        if let Some(licenses) = &metadata.licenses {
            let existing = obj.get("licenses").and_then(Value::as_array);
            if existing.map_or(true, |entries| entries.is_empty()) {
                let entries: Vec<Value> = licenses
                    .value
                    .iter()
                    .map(|expression| json!({ "expression": expression }))
                    .collect();
                if !entries.is_empty() {
                    obj.insert("licenses".to_string(), Value::Array(entries));
                    written += 1;
                }
            }
        }

        let references = [
            (&metadata.homepage, "website"),
            (&metadata.repository_url, "vcs"),
            (&metadata.issue_tracker_url, "issue-tracker"),
            (&metadata.documentation_url, "documentation"),
            (&metadata.download_url, "distribution"),
            (&metadata.registry_url, "other"),
        ];
        for (slot, ref_type) in references {
            let Some(sourced) = slot else { continue };
            let refs = obj
                .entry("externalReferences")
                .or_insert_with(|| Value::Array(Vec::new()));
            let Some(refs) = refs.as_array_mut() else { continue };
            let already_present = refs
                .iter()
                .any(|r| r.get("type").and_then(Value::as_str) == Some(ref_type));
            if !already_present {
                refs.push(json!({ "type": ref_type, "url": sourced.value }));
                written += 1;
            }
        }

        written
    }

    /// Serialize back to pretty JSON.
    pub fn to_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    /// Write the document to a file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.to_string_pretty()?;
        fs::write(path, content).map_err(|e| SbomResolverError::io(path, e))
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }
}
