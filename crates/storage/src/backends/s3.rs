//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ContinuationToken, ListingOptions, ListingPage, ObjectLister};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use backfill_core::config::StorageConfig;
use tracing::instrument;
use url::Url;

fn map_s3_operation_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    // S3 returns 400 for continuation tokens it does not recognise.
    if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err
        && service_err.raw().status().as_u16() == 400
    {
        let body = format!("{:?}", service_err.err());
        if body.contains("continuation") || body.contains("ContinuationToken") {
            return StorageError::InvalidContinuationToken(
                "S3 rejected continuation token".to_string(),
            );
        }
    }

    StorageError::S3(Box::new(err))
}

/// S3-compatible object lister using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    base_url: Url,
    /// Stored endpoint for logging (normalized).
    endpoint: String,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend from an `s3` storage configuration.
    ///
    /// Credentials are always explicit. A custom endpoint (MinIO, etc.)
    /// implies path-style addressing.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let StorageConfig::S3 {
            bucket,
            region,
            access_key_id,
            secret_access_key,
            force_path_style,
            ..
        } = config
        else {
            return Err(StorageError::Config(
                "S3 backend requires an s3 storage configuration".to_string(),
            ));
        };

        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id.clone(),
            secret_access_key.clone(),
            None, // session token
            None, // expiration
            "backfill-config",
        );

        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .credentials_provider(credentials);

        let normalized_endpoint = config.normalized_endpoint();
        if let Some(endpoint_url) = &normalized_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if *force_path_style || normalized_endpoint.is_some() {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let endpoint = match normalized_endpoint {
            Some(url) => url,
            None => format!("s3.{region}.amazonaws.com"),
        };

        Ok(Self {
            client,
            bucket: bucket.clone(),
            base_url: config.base_url()?,
            endpoint,
            region: region.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectLister for S3Backend {
    #[instrument(skip(self, token), fields(backend = "s3", bucket = %self.bucket))]
    async fn list_page(
        &self,
        prefix: &str,
        options: ListingOptions,
        token: Option<ContinuationToken>,
    ) -> StorageResult<ListingPage> {
        let page_size = i32::try_from(options.normalized_page_size()).unwrap_or(i32::MAX);
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(page_size);

        if let Some(token) = token {
            request = request.continuation_token(token.into_inner());
        }

        let output = request.send().await.map_err(map_s3_operation_error)?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        let next_token = if output.is_truncated() == Some(true) {
            output
                .next_continuation_token()
                .map(ContinuationToken::new)
        } else {
            None
        };

        Ok(ListingPage { keys, next_token })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
