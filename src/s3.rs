use std::fs;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use tokio::runtime::Runtime;

use crate::error::ProfileError;
use crate::store::{ObjectPage, ObjectStore, ObjectSummary};

/// Blocking S3 access for the worker pool. The client is driven by an owned
/// multi-threaded runtime, so any number of workers may call in at once.
pub struct S3ObjectStore {
    client: Client,
    runtime: Runtime,
}

impl S3ObjectStore {
    /// Builds a client from the default AWS credential chain, or from the
    /// named shared-config profile when `profile` is set.
    pub fn new(profile: Option<&str>) -> Result<Self, ProfileError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("s3-io")
            .build()
            .map_err(|err| ProfileError::StorageSetup(err.to_string()))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = runtime.block_on(loader.load());

        Ok(Self {
            client: Client::new(&sdk_config),
            runtime,
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, ProfileError> {
        let request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation.map(str::to_string));
        let response = self
            .runtime
            .block_on(request.send())
            .map_err(|err| ProfileError::Listing {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(ObjectSummary {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                })
            })
            .collect();
        let next_continuation = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation,
        })
    }

    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), ProfileError> {
        let download_error = |message: String| ProfileError::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let bytes = self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| download_error(DisplayErrorContext(&err).to_string()))?;
            output
                .body
                .collect()
                .await
                .map(|data| data.into_bytes())
                .map_err(|err| download_error(err.to_string()))
        })?;

        fs::write(destination, &bytes)
            .map_err(|err| download_error(format!("write {}: {err}", destination.display())))
    }
}
