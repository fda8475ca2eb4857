use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::export::Surface;

/// Object key for a poster's master surface blob.
pub fn surface_key(poster_id: Uuid) -> String {
    format!("surfaces/{poster_id}.rgba")
}

// 1. RenderService Contract
/// RenderService
///
/// The render collaborator boundary: the export engine consumes a pixel
/// surface produced elsewhere (the generation pipeline renders poster
/// artwork and stores it; this service retrieves it). The trait lets us
/// swap the S3-backed implementation for an in-memory mock in tests
/// without touching any handler.
///
/// Surface blobs are stored with an 8-byte header: width then height as
/// big-endian u32, followed by tightly-packed RGBA8 pixels. That header
/// is this service's storage contract with the generation pipeline.
#[async_trait]
pub trait RenderService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local`
    /// setup to provision the bucket in MinIO. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary, signed URL allowing a client to upload a
    /// poster's master artwork surface directly to the bucket. The URL
    /// carries an expiration and a content-type constraint.
    async fn artwork_upload_url(
        &self,
        poster_id: Uuid,
        content_type: &str,
    ) -> Result<String, String>;

    /// Retrieves and decodes the master surface for a poster. Errors are
    /// stringly here; the export handler collapses them into the generic
    /// ExportFailed so rendering internals never leak to callers.
    async fn fetch_surface(&self, poster_id: Uuid) -> Result<Surface, String>;
}

/// RenderState
///
/// The concrete type used to share the render service across the
/// application state.
pub type RenderState = Arc<dyn RenderService>;

// 2. The Real Implementation (S3/MinIO)
/// S3RenderSource
///
/// S3-backed surface store using the AWS SDK. S3 compatibility covers
/// both the Dockerized MinIO instance locally and the hosted object store
/// in production. `force_path_style(true)` is required for MinIO-style
/// gateways.
#[derive(Clone)]
pub struct S3RenderSource {
    client: s3::Client,
    bucket_name: String,
}

impl S3RenderSource {
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required
            // for MinIO and similar S3 gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl RenderService for S3RenderSource {
    /// Idempotent CreateBucket call; safe at startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn artwork_upload_url(
        &self,
        poster_id: Uuid,
        content_type: &str,
    ) -> Result<String, String> {
        // Expiration constrained to 10 minutes.
        let expires_in = Duration::from_secs(600);

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(surface_key(poster_id))
            // Forces the client request to include this Content-Type header.
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(expires_in).map_err(|e| e.to_string())?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }

    async fn fetch_surface(&self, poster_id: Uuid) -> Result<Surface, String> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(surface_key(poster_id))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| e.to_string())?
            .into_bytes();

        decode_surface_blob(&bytes)
    }
}

/// decode_surface_blob
///
/// Parses the dimension header and validates the pixel payload length.
pub fn decode_surface_blob(bytes: &[u8]) -> Result<Surface, String> {
    if bytes.len() < 8 {
        return Err("surface blob is missing its dimension header".to_string());
    }
    let width = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    let height = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
    Surface::new(width, height, bytes[8..].to_vec())
}

// 3. The Mock Implementation (For Unit Tests)
/// MockRenderService
///
/// In-memory render collaborator used by unit and integration tests: it
/// hands back a pre-seeded surface (or a simulated failure) without any
/// network dependency.
#[derive(Clone)]
pub struct MockRenderService {
    /// The surface returned by `fetch_surface` when present.
    pub surface: Option<Surface>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockRenderService {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface: Some(surface),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            surface: None,
            should_fail: true,
        }
    }
}

#[async_trait]
impl RenderService for MockRenderService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn artwork_upload_url(
        &self,
        poster_id: Uuid,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Render Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            surface_key(poster_id)
        ))
    }

    async fn fetch_surface(&self, _poster_id: Uuid) -> Result<Surface, String> {
        if self.should_fail {
            return Err("Mock Render Error: Simulation requested".to_string());
        }
        self.surface
            .clone()
            .ok_or_else(|| "Mock Render Error: no surface seeded".to_string())
    }
}
