use crate::utils::error::{EtlError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EtlError::MissingConfigError {
        field: field_name.to_string(),
    })
}

/// Like [`validate_required_field`] but also rejects blank strings.
pub fn require_non_empty(field_name: &str, value: &Option<String>) -> Result<String> {
    let value = validate_required_field(field_name, value)?;
    if value.trim().is_empty() {
        return Err(EtlError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(value.clone())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "Bucket name must be between 3 and 63 characters".to_string(),
        });
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "Bucket name can only contain lowercase letters, numbers, hyphens, and dots"
                .to_string(),
        });
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "Bucket name cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}

pub fn validate_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: region.to_string(),
            reason: "Region can only contain lowercase letters, numbers, and hyphens".to_string(),
        });
    }

    Ok(())
}

pub fn validate_endpoint(field_name: &str, endpoint: &str) -> Result<()> {
    validate_non_empty_string(field_name, endpoint)?;

    // DuckDB expects host[:port]; a full URL is also accepted and reduced by the caller.
    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    url::Url::parse(&candidate)
        .map(|_| ())
        .map_err(|e| EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: endpoint.to_string(),
            reason: format!("Invalid endpoint: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("store.path", "export.duckdb").is_ok());
        assert!(validate_path("store.path", "").is_err());
        assert!(validate_path("store.path", "bad\0path").is_err());
    }

    #[test]
    fn test_require_non_empty() {
        assert_eq!(
            require_non_empty("storage.region", &Some("us-east-2".to_string())).unwrap(),
            "us-east-2"
        );
        assert!(matches!(
            require_non_empty("storage.region", &Some("  ".to_string())),
            Err(EtlError::MissingConfigError { .. })
        ));
        assert!(matches!(
            require_non_empty("storage.region", &None),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_bucket_name() {
        assert!(validate_bucket_name("destination.bucket", "my-data-lake").is_ok());
        assert!(validate_bucket_name("destination.bucket", "ab").is_err());
        assert!(validate_bucket_name("destination.bucket", "My_Bucket").is_err());
        assert!(validate_bucket_name("destination.bucket", "-bucket").is_err());
    }

    #[test]
    fn test_validate_region() {
        assert!(validate_region("storage.region", "us-east-2").is_ok());
        assert!(validate_region("storage.region", "US East").is_err());
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("storage.endpoint", "localhost:9000").is_ok());
        assert!(validate_endpoint("storage.endpoint", "https://minio.internal:9000").is_ok());
        assert!(validate_endpoint("storage.endpoint", "").is_err());
    }
}
