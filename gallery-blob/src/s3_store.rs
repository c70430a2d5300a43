use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;

use crate::{BlobBody, BlobError, BlobResult, BlobStore, StoreEntry, StoredBlob};

/// Content type S3 assigns when the uploader did not set one.
const S3_DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

/// S3 connection settings from environment variables
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
}

impl S3Config {
    pub fn from_env() -> BlobResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> BlobResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BlobError::invalid(format!("{} environment variable required", key)))
        };

        Ok(Self {
            region: get("S3_REGION")?,
            access_key_id: get("S3_ACCESS_KEY_ID")?,
            secret_access_key: get("S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get("S3_ENDPOINT_URL")?,
        })
    }
}

/// Read-only store over any S3-compatible bucket (AWS, RustFS, MinIO, R2).
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
}

impl S3CompatibleStore {
    pub async fn from_env(bucket: impl Into<String>) -> BlobResult<Self> {
        let config = S3Config::from_env()?;
        Ok(Self::connect(config, bucket).await)
    }

    pub async fn connect(config: S3Config, bucket: impl Into<String>) -> Self {
        let client = Self::create_client(config).await;
        Self::with_client(client, bucket)
    }

    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "gallery-s3",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        )
    }

    fn map_sdk_error<E, R>(err: SdkError<E, R>) -> BlobError
    where
        E: std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        match err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => BlobError::unavailable(err),
            other => BlobError::backend(other),
        }
    }
}

/// Upload-time `content-type` user metadata, else the object's own content
/// type unless S3 defaulted it.
fn pick_content_type(
    metadata: Option<&HashMap<String, String>>,
    object_content_type: Option<&str>,
) -> Option<String> {
    let usable = |ct: &str| {
        let ct = ct.trim();
        (!ct.is_empty() && !ct.eq_ignore_ascii_case(S3_DEFAULT_CONTENT_TYPE)).then(|| ct.to_string())
    };

    metadata
        .and_then(|m| m.get("content-type").or_else(|| m.get("contenttype")))
        .and_then(|ct| usable(ct))
        .or_else(|| object_content_type.and_then(usable))
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn list(&self, prefix: &str) -> BlobResult<Vec<StoreEntry>> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let result = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(Self::map_sdk_error)?;

            for object in result.contents() {
                if let Some(key) = object.key() {
                    entries.push(StoreEntry::new(key, object.e_tag().unwrap_or_default()));
                }
            }

            match result.next_continuation_token() {
                Some(token) if result.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn get_with_metadata(&self, key: &str) -> BlobResult<StoredBlob> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(SdkError::ServiceError(service))
                if service.err().is_no_such_key() || service.raw().status().as_u16() == 404 =>
            {
                return Err(BlobError::not_found(key));
            }
            Err(err) => return Err(Self::map_sdk_error(err)),
        };

        let content_type = pick_content_type(output.metadata(), output.content_type());
        let size = output.content_length().and_then(|len| u64::try_from(len).ok());

        let reader = output.body.into_async_read();
        let mut blob = StoredBlob::new(BlobBody::Reader(Box::pin(reader)));
        if let Some(ct) = content_type {
            blob = blob.with_content_type(ct);
        }
        if let Some(size) = size {
            blob = blob.with_size_hint(size);
        }
        Ok(blob)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_requires_every_variable() {
        let vars: HashMap<&str, &str> = [
            ("S3_REGION", "us-east-1"),
            ("S3_ACCESS_KEY_ID", "ak"),
            ("S3_SECRET_ACCESS_KEY", "sk"),
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
        ]
        .into_iter()
        .collect();

        let config = S3Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.endpoint_url, "http://localhost:9000");

        let err = S3Config::from_lookup(|k| {
            if k == "S3_ENDPOINT_URL" {
                None
            } else {
                vars.get(k).map(|v| v.to_string())
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("S3_ENDPOINT_URL"));
    }

    #[test]
    fn user_metadata_content_type_wins() {
        let mut metadata = HashMap::new();
        metadata.insert("content-type".to_string(), "image/webp".to_string());
        assert_eq!(
            pick_content_type(Some(&metadata), Some("image/jpeg")),
            Some("image/webp".to_string())
        );
    }

    #[test]
    fn s3_default_content_type_is_ignored() {
        assert_eq!(pick_content_type(None, Some("binary/octet-stream")), None);
        assert_eq!(pick_content_type(None, Some("")), None);
        assert_eq!(
            pick_content_type(None, Some("image/png")),
            Some("image/png".to_string())
        );
    }

    #[test]
    fn unusable_metadata_falls_back_to_object_content_type() {
        let mut metadata = HashMap::new();
        metadata.insert("content-type".to_string(), "binary/octet-stream".to_string());
        assert_eq!(
            pick_content_type(Some(&metadata), Some("image/jpeg")),
            Some("image/jpeg".to_string())
        );

        metadata.insert("content-type".to_string(), "  ".to_string());
        assert_eq!(
            pick_content_type(Some(&metadata), Some("image/png")),
            Some("image/png".to_string())
        );
    }
}
