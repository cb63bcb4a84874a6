use crate::config::{DestinationScheme, ExportConfig};
use crate::domain::ports::ObjectVerifier;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// Verifies objects written to a local directory.
#[derive(Debug, Clone, Default)]
pub struct LocalVerifier;

#[async_trait]
impl ObjectVerifier for LocalVerifier {
    async fn verify(&self, destination: &str) -> Result<Option<u64>> {
        let metadata =
            tokio::fs::metadata(destination)
                .await
                .map_err(|e| EtlError::VerificationError {
                    destination: destination.to_string(),
                    message: e.to_string(),
                })?;

        if !metadata.is_file() {
            return Err(EtlError::VerificationError {
                destination: destination.to_string(),
                message: "destination is not a regular file".to_string(),
            });
        }
        Ok(Some(metadata.len()))
    }
}

/// Splits `s3://bucket/key` into its bucket and key.
pub fn parse_object_url(destination: &str) -> Result<(String, String)> {
    let invalid = |message: String| EtlError::VerificationError {
        destination: destination.to_string(),
        message,
    };

    let url = url::Url::parse(destination).map_err(|e| invalid(e.to_string()))?;
    let bucket = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing bucket".to_string()))?
        .to_string();
    let key = url.path().trim_start_matches('/').to_string();
    if key.is_empty() {
        return Err(invalid("missing object key".to_string()));
    }
    Ok((bucket, key))
}

#[cfg(feature = "verify")]
pub use s3::S3Verifier;

#[cfg(feature = "verify")]
mod s3 {
    use super::parse_object_url;
    use crate::config::ExportConfig;
    use crate::domain::model::UrlStyle;
    use crate::domain::ports::ObjectVerifier;
    use crate::utils::error::{EtlError, Result};
    use async_trait::async_trait;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::config::{Credentials, Region};
    use aws_sdk_s3::Client as S3Client;

    /// Verifies objects through S3 `HeadObject`, with the credentials used for the export.
    #[derive(Debug, Clone)]
    pub struct S3Verifier {
        client: S3Client,
    }

    impl S3Verifier {
        pub fn new(client: S3Client) -> Self {
            Self { client }
        }

        pub async fn from_config(config: &ExportConfig) -> Self {
            let credentials = Credentials::new(
                config.storage.access_key_id.clone(),
                config.storage.secret_access_key.clone(),
                None,
                None,
                "table-export",
            );

            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.storage.region.clone()))
                .credentials_provider(credentials);
            if let Some(endpoint) = &config.storage.endpoint {
                let endpoint_url = if endpoint.contains("://") {
                    endpoint.clone()
                } else {
                    format!("https://{}", endpoint)
                };
                loader = loader.endpoint_url(endpoint_url);
            }
            let sdk_config = loader.load().await;

            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(config.storage.url_style == Some(UrlStyle::Path))
                .build();

            Self::new(S3Client::from_conf(s3_config))
        }
    }

    #[async_trait]
    impl ObjectVerifier for S3Verifier {
        async fn verify(&self, destination: &str) -> Result<Option<u64>> {
            let (bucket, key) = parse_object_url(destination)?;

            let output = self
                .client
                .head_object()
                .bucket(&bucket)
                .key(&key)
                .send()
                .await
                .map_err(|e| EtlError::VerificationError {
                    destination: destination.to_string(),
                    message: format!("HeadObject failed: {}", e.into_service_error()),
                })?;

            Ok(output
                .content_length()
                .and_then(|len| u64::try_from(len).ok()))
        }
    }
}

/// Picks the verifier for the configured destination, if the scheme has one.
pub async fn verifier_for(config: &ExportConfig) -> Option<Box<dyn ObjectVerifier>> {
    match config.destination.scheme {
        DestinationScheme::File => Some(Box::new(LocalVerifier)),
        #[cfg(feature = "verify")]
        DestinationScheme::S3 => Some(Box::new(S3Verifier::from_config(config).await)),
        _ => None,
    }
}
