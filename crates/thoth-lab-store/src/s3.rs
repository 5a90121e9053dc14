use std::env;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::{ResultStore, StoreError};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
    /// Key prefix the documents live under, e.g. `data/adviser/`.
    pub prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "thoth".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            prefix: String::new(),
        }
    }
}

impl S3Config {
    pub fn from_env() -> Result<Self, StoreError> {
        let bucket = env::var("S3_BUCKET")
            .map_err(|_| StoreError::Configuration("S3_BUCKET must be set".into()))?;
        let defaults = S3Config::default();

        Ok(Self {
            bucket,
            region: non_empty_var("S3_REGION").unwrap_or(defaults.region),
            endpoint: non_empty_var("S3_ENDPOINT_URL"),
            access_key_id: non_empty_var("S3_ACCESS_KEY_ID"),
            secret_access_key: non_empty_var("S3_SECRET_ACCESS_KEY"),
            force_path_style: non_empty_var("S3_FORCE_PATH_STYLE")
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            prefix: non_empty_var("THOTH_RESULTS_PREFIX").unwrap_or_default(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub struct S3ResultStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3ResultStore {
    pub async fn connect(config: S3Config) -> Result<Self, StoreError> {
        if config.bucket.is_empty() {
            return Err(StoreError::Configuration(
                "bucket name cannot be empty".into(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket,
            prefix: config.prefix,
        })
    }

    fn document_key(&self, document_id: &str) -> String {
        format!("{}{}", self.prefix, document_id)
    }

    async fn get_bytes(&self, key: &str) -> Result<Bytes, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err {
                SdkError::ServiceError(service_err) => {
                    let message = service_err.err().to_string();
                    if message.contains("NoSuchKey") {
                        StoreError::NotFound(key.to_string())
                    } else {
                        StoreError::from_sdk(message)
                    }
                }
                other => StoreError::from_sdk(other),
            })?;

        let data = output.body.collect().await.map_err(StoreError::from_sdk)?;
        Ok(data.into_bytes())
    }
}

#[async_trait]
impl ResultStore for S3ResultStore {
    async fn list_document_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(StoreError::from_sdk)?;

            for object in output.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let id = key.strip_prefix(self.prefix.as_str()).unwrap_or(key);
                if !id.is_empty() {
                    ids.push(id.to_string());
                }
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(count = ids.len(), prefix = %self.prefix, "listed result documents");
        Ok(ids)
    }

    async fn get_document(&self, document_id: &str) -> Result<Value, StoreError> {
        let bytes = self.get_bytes(&self.document_key(document_id)).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            document_id: document_id.to_string(),
            source,
        })
    }
}
