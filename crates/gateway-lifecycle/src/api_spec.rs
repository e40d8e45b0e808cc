use std::path::Path;

use serde_json::Value;

use crate::error::{LifecycleError, Result};

/// Default location of the tool schema, relative to the working directory.
pub const DEFAULT_API_SPEC_FILE: &str = "lambda/api_spec.json";

/// Load the api spec document that becomes the target's inline tool schema.
///
/// The content is only required to be JSON; it is forwarded as-is.
///
/// # Errors
///
/// Returns a configuration error if the file is missing, unreadable or not JSON.
pub fn load_api_spec(path: &Path) -> Result<Value> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LifecycleError::Config(format!(
                "API specification file not found: {}",
                path.display()
            )));
        }
        Err(source) => {
            return Err(LifecycleError::ReadFile {
                path: path.display().to_string(),
                source,
            });
        }
    };
    let spec: Value = serde_json::from_slice(&bytes).map_err(|source| LifecycleError::ParseFile {
        path: path.display().to_string(),
        source,
    })?;
    if !spec.is_array() {
        tracing::warn!(path = %path.display(), "api spec is not a JSON array; forwarding it unchanged");
    }
    Ok(spec)
}
