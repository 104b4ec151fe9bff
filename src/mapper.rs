//! Mapping of registry records into internal resources.
//!
//! Besides copying the flat properties, mapping materializes the record's
//! secret and certificate files and explodes composite application
//! properties into discrete pairs.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::MappingError;
use crate::metrics::{self, ErrorKind, SharedMetrics};
use crate::registry::{RawResource, ResourceRegistry, SecretReference};
use crate::resource::{InternalResource, ResourceType};

/// Property holding the composite `key=value` block.
pub const APPLICATION_PROPERTIES_KEY: &str = "applicationProperties";

/// Key the resolved secret is stored under.
pub const SECRET_KEY: &str = "password";

/// A certificate file referenced by a files object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFile {
    /// File role, e.g. `keystore`.
    pub role: String,
    /// File name.
    pub filename: String,
    /// URL the file is served from.
    pub reference: String,
}

/// Converts registry records into [`InternalResource`]s.
#[derive(Debug)]
pub struct ResourceMapper<'a, R: ResourceRegistry + ?Sized> {
    /// Registry used to fetch secrets and files.
    registry: &'a R,
    /// Metrics sink.
    metrics: SharedMetrics,
}

impl<'a, R: ResourceRegistry + ?Sized> ResourceMapper<'a, R> {
    /// Creates a mapper that fetches through `registry`.
    #[must_use]
    pub fn new(registry: &'a R) -> Self {
        Self {
            registry,
            metrics: metrics::noop(),
        }
    }

    /// Sets the metrics recorder.
    #[must_use]
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Maps a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret or certificate files cannot be
    /// resolved, or if application properties are malformed.
    pub async fn map(&self, raw: RawResource) -> Result<InternalResource, MappingError> {
        let kind = ResourceType::parse(&raw.resource_type);

        let mut resource = InternalResource {
            id: raw.id,
            name: raw.alias,
            resource_type: raw.resource_type,
            properties: raw.properties,
            ..InternalResource::default()
        };

        if !raw.secrets.is_empty() {
            resource.secret = self.resolve_secret(&resource.name, &raw.secrets).await?;
        }

        match kind {
            ResourceType::Certificate => {
                if let Some(files) = raw.files.as_ref().filter(|files| !is_empty_files(files)) {
                    resource.certificates =
                        self.resolve_certificates(&resource.name, files).await?;
                }
            }
            ResourceType::ApplicationProperties => {
                explode_application_properties(&mut resource.properties).inspect_err(|_| {
                    self.metrics.record_error(ErrorKind::Mapping);
                })?;
            }
            _ => {}
        }

        Ok(resource)
    }

    async fn resolve_secret(
        &self,
        alias: &str,
        secrets: &BTreeMap<String, SecretReference>,
    ) -> Result<HashMap<String, String>, MappingError> {
        if secrets.len() > 1 {
            self.metrics.record_error(ErrorKind::Secret);
            return Err(MappingError::MultipleSecrets {
                count: secrets.len(),
                names: secrets.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }

        let Some((name, secret)) = secrets.iter().next() else {
            return Ok(HashMap::new());
        };

        let reference = secret.reference.as_deref().ok_or_else(|| {
            self.metrics.record_error(ErrorKind::Secret);
            MappingError::MissingSecretReference { name: name.clone() }
        })?;

        let value = self
            .registry
            .fetch_secret(reference)
            .await
            .map_err(|source| {
                self.metrics.record_error(ErrorKind::Secret);
                MappingError::SecretUnresolved { source }
            })?;

        debug!("Resolved secret '{name}' for {alias}");
        Ok(HashMap::from([(SECRET_KEY.to_string(), value)]))
    }

    async fn resolve_certificates(
        &self,
        alias: &str,
        files: &Value,
    ) -> Result<HashMap<String, Vec<u8>>, MappingError> {
        let files = parse_files_object(files).inspect_err(|_| {
            self.metrics.record_error(ErrorKind::File);
        })?;

        let mut certificates = HashMap::with_capacity(files.len());
        for file in files {
            let content = self
                .registry
                .fetch_file(&file.reference)
                .await
                .map_err(|source| {
                    self.metrics.record_error(ErrorKind::File);
                    MappingError::FileUnresolved {
                        filename: file.filename.clone(),
                        source,
                    }
                })?;

            debug!(
                "Downloaded {} ({} bytes) for {alias}",
                file.role,
                content.len()
            );
            certificates.insert(format!("{alias}_{}", file.filename), content);
        }

        Ok(certificates)
    }
}

fn is_empty_files(files: &Value) -> bool {
    match files {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Reads the `filename` and `ref` of every file role, sorted by role.
///
/// # Errors
///
/// Returns an error if the object is not a map of objects or a role lacks
/// either field as a string.
pub fn parse_files_object(files: &Value) -> Result<Vec<CertificateFile>, MappingError> {
    let Value::Object(roles) = files else {
        return Err(MappingError::InvalidFilesObject {
            message: format!("expected an object, got {files}"),
        });
    };

    let mut parsed = Vec::with_capacity(roles.len());
    for (role, entry) in roles {
        let Value::Object(fields) = entry else {
            return Err(MappingError::InvalidFilesObject {
                message: format!("file '{role}' is not an object"),
            });
        };

        let filename = fields
            .get("filename")
            .and_then(Value::as_str)
            .ok_or_else(|| MappingError::MissingFileField {
                role: role.clone(),
                field: "filename",
            })?;

        let reference = fields
            .get("ref")
            .and_then(Value::as_str)
            .ok_or_else(|| MappingError::MissingFileField {
                role: role.clone(),
                field: "ref",
            })?;

        parsed.push(CertificateFile {
            role: role.clone(),
            filename: filename.to_string(),
            reference: reference.to_string(),
        });
    }

    parsed.sort_by(|a, b| a.role.cmp(&b.role));
    Ok(parsed)
}

/// Replaces the composite application properties value with its pairs.
///
/// Each non-blank line is split on the first `=`.
///
/// # Errors
///
/// Returns an error for a non-blank line without `=`.
pub fn explode_application_properties(
    properties: &mut HashMap<String, String>,
) -> Result<(), MappingError> {
    let Some(composite) = properties.get(APPLICATION_PROPERTIES_KEY) else {
        return Ok(());
    };

    let mut pairs = Vec::new();
    for (index, line) in composite.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| MappingError::MalformedProperty {
                line: index + 1,
                entry: line.to_string(),
            })?;
        pairs.push((key.to_string(), value.to_string()));
    }

    properties.extend(pairs);
    properties.remove(APPLICATION_PROPERTIES_KEY);
    Ok(())
}
