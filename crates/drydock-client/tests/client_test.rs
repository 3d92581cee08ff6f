use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drydock_client::{Remote, SyncPipeline, SyncRequest, TransferClient, TransferError};
use drydock_core::{ContentDigest, RemoteConfig, ServiceName};
use drydock_docker::{ArtifactBuilder, BuildError, ContainerRuntime, ImageArtifact, RuntimeError};
use drydock_server::{AppState, DescriptorStore};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Runtime that accepts everything and remembers what it saw.
#[derive(Default)]
struct RecordingRuntime {
    images: Mutex<Vec<Vec<u8>>>,
    deploys: Mutex<Vec<(String, Vec<u8>)>>,
    /// How long a stack deploy takes.
    deploy_delay: Duration,
}

impl ContainerRuntime for RecordingRuntime {
    async fn load_image(&self, archive: &Path) -> Result<String, RuntimeError> {
        self.images
            .lock()
            .unwrap()
            .push(std::fs::read(archive).unwrap());
        Ok("Loaded image: myapp:1\n".to_owned())
    }

    async fn apply_manifest(
        &self,
        manifest: &Path,
        service: &ServiceName,
    ) -> Result<String, RuntimeError> {
        self.deploys
            .lock()
            .unwrap()
            .push((service.to_string(), std::fs::read(manifest).unwrap()));
        tokio::time::sleep(self.deploy_delay).await;
        Ok(format!("Updating service {service}_web\n"))
    }
}

/// Builder that skips docker and writes a fixed archive.
struct StaticBuilder;

impl ArtifactBuilder for StaticBuilder {
    async fn build(&self, _image: &str) -> Result<(), BuildError> {
        Ok(())
    }

    async fn save(&self, image: &str) -> Result<ImageArtifact, BuildError> {
        let artifact = ImageArtifact::reserve(image).map_err(BuildError::TempFile)?;
        std::fs::write(artifact.path(), format!("archive of {image}"))
            .map_err(BuildError::TempFile)?;
        Ok(artifact)
    }
}

struct Loopback {
    tmp: TempDir,
    runtime: Arc<RecordingRuntime>,
    config: RemoteConfig,
}

impl Loopback {
    async fn start() -> Self {
        Self::with_runtime(RecordingRuntime::default()).await
    }

    async fn with_runtime(runtime: RecordingRuntime) -> Self {
        let tmp = TempDir::new().unwrap();
        let state = AppState::new(
            DescriptorStore::new(tmp.path().join("deployments")),
            runtime,
        );
        let runtime = Arc::clone(&state.runtime);
        let app = drydock_server::router(state, 64 * 1024 * 1024);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = RemoteConfig {
            // Trailing slash is trimmed by base_url().
            url: format!("http://{addr}/"),
            ..RemoteConfig::default()
        };
        Self {
            tmp,
            runtime,
            config,
        }
    }

    fn client(&self) -> TransferClient {
        TransferClient::new(&self.config).unwrap()
    }

    fn descriptor(&self, yaml: &str) -> PathBuf {
        let path = self.tmp.path().join("deploy.yml");
        std::fs::write(&path, yaml).unwrap();
        path
    }
}

fn svc(name: &str) -> ServiceName {
    ServiceName::parse(name).unwrap()
}

// ── TransferClient ──

#[tokio::test]
async fn base_url_has_no_trailing_slash() {
    let server = Loopback::start().await;

    assert!(!server.client().base_url().ends_with('/'));
}

#[tokio::test]
async fn uploaded_descriptor_digest_matches_local() {
    let server = Loopback::start().await;
    let client = server.client();
    let service = svc("svc-a");
    let descriptor = server.descriptor("services:\n  web:\n    image: myapp:1\n");

    client
        .upload_descriptor(&service, &descriptor)
        .await
        .unwrap();
    let remote = client.fetch_remote_digest(&service).await.unwrap();

    assert_eq!(remote, ContentDigest::of_file(&descriptor).await.unwrap());
}

#[tokio::test]
async fn fetch_digest_of_unknown_service_is_not_found() {
    let server = Loopback::start().await;

    let err = server
        .client()
        .fetch_remote_digest(&svc("never-deployed"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn deploy_of_unknown_service_is_not_found() {
    let server = Loopback::start().await;

    let err = server
        .client()
        .trigger_deploy(&svc("never-deployed"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::NotFound { endpoint: "/deploy", .. }));
    assert!(server.runtime.deploys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn deploy_outlives_the_request_timeout() {
    let mut server = Loopback::with_runtime(RecordingRuntime {
        deploy_delay: Duration::from_millis(1500),
        ..RecordingRuntime::default()
    })
    .await;
    server.config.timeout_secs = 1;
    server.config.deploy_timeout_secs = 10;
    let client = server.client();
    let service = svc("svc-a");
    let descriptor = server.descriptor("services:\n  web:\n    image: myapp:1\n");
    client
        .upload_descriptor(&service, &descriptor)
        .await
        .unwrap();

    let output = client.trigger_deploy(&service).await.unwrap();

    assert!(output.contains("svc-a_web"));
    assert_eq!(server.runtime.deploys.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn deploy_slower_than_deploy_timeout_times_out() {
    let mut server = Loopback::with_runtime(RecordingRuntime {
        deploy_delay: Duration::from_secs(3),
        ..RecordingRuntime::default()
    })
    .await;
    server.config.deploy_timeout_secs = 1;
    let client = server.client();
    let service = svc("svc-a");
    let descriptor = server.descriptor("services:\n  web:\n    image: myapp:1\n");
    client
        .upload_descriptor(&service, &descriptor)
        .await
        .unwrap();

    let err = client.trigger_deploy(&service).await.unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn artifact_upload_reaches_runtime_intact() {
    let server = Loopback::start().await;
    let archive = server.tmp.path().join("image.tar");
    let content: Vec<u8> = (0..=255u8).cycle().take(300_000).collect();
    std::fs::write(&archive, &content).unwrap();

    server
        .client()
        .upload_artifact(&svc("svc-a"), &archive)
        .await
        .unwrap();

    assert_eq!(*server.runtime.images.lock().unwrap(), vec![content]);
}

#[tokio::test]
async fn upload_of_missing_file_is_io_error() {
    let server = Loopback::start().await;

    let err = server
        .client()
        .upload_artifact(&svc("svc-a"), &server.tmp.path().join("absent.tar"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Io { .. }));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let client = TransferClient::new(&RemoteConfig {
        url: format!("http://{addr}"),
        ..RemoteConfig::default()
    })
    .unwrap();

    let err = client.trigger_deploy(&svc("svc-a")).await.unwrap_err();

    assert!(matches!(err, TransferError::Transport { .. }));
}

// ── End-to-end sync ──

#[tokio::test]
async fn descriptor_is_uploaded_only_when_changed() {
    let server = Loopback::start().await;
    let service = svc("svc-a");
    let pipeline = SyncPipeline::new(StaticBuilder, server.client());

    let v1 = "services:\n  web:\n    image: myapp:1\n";
    let descriptor = server.descriptor(v1);
    let request = SyncRequest {
        descriptor: &descriptor,
        service: &service,
        entry: None,
    };

    let first = pipeline.run(&request).await.unwrap();
    assert!(first.descriptor_uploaded);
    assert!(first.remote_digest.is_none());
    assert_eq!(first.deploy_output, "Updating service svc-a_web\n");

    let second = pipeline.run(&request).await.unwrap();
    assert!(!second.descriptor_uploaded);
    assert_eq!(second.remote_digest, Some(first.local_digest.clone()));

    let v2 = "services:\n  web:\n    image: myapp:1\n    deploy:\n      replicas: 2\n";
    server.descriptor(v2);
    let third = pipeline.run(&request).await.unwrap();
    assert!(third.descriptor_uploaded);
    assert_ne!(third.local_digest, first.local_digest);

    // The image goes up every time; the server always deploys its latest copy.
    assert_eq!(server.runtime.images.lock().unwrap().len(), 3);
    let deploys = server.runtime.deploys.lock().unwrap();
    assert_eq!(deploys.len(), 3);
    assert_eq!(deploys[1].1, v1.as_bytes());
    assert_eq!(deploys[2].1, v2.as_bytes());
    assert!(deploys.iter().all(|(name, _)| name == "svc-a"));
}

#[tokio::test]
async fn services_are_stored_independently() {
    let server = Loopback::start().await;
    let pipeline = SyncPipeline::new(StaticBuilder, server.client());
    let descriptor = server.descriptor("services:\n  web:\n    image: myapp:1\n");
    let (a, b) = (svc("svc-a"), svc("svc-b"));

    pipeline
        .run(&SyncRequest {
            descriptor: &descriptor,
            service: &a,
            entry: None,
        })
        .await
        .unwrap();
    let outcome = pipeline
        .run(&SyncRequest {
            descriptor: &descriptor,
            service: &b,
            entry: None,
        })
        .await
        .unwrap();

    // Same content, but svc-b had nothing stored yet.
    assert!(outcome.descriptor_uploaded);
    assert!(outcome.remote_digest.is_none());
}
