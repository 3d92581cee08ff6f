use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use drydock_core::{BuildConfig, ServiceName};
use drydock_docker::{
    ArtifactBuilder, BuildError, CommandExecutor, ContainerRuntime, DockerBuilder, DockerError,
    DockerRuntime, ImageArtifact, RuntimeError,
};

/// Records every invocation and answers from a script.
///
/// `save -o <path>` writes a fake archive to `<path>`, like docker would.
#[derive(Default)]
struct FakeExecutor {
    calls: Mutex<Vec<(Vec<String>, Duration)>>,
    fail_subcommand: Option<&'static str>,
    time_out: bool,
    output: &'static str,
}

impl FakeExecutor {
    fn failing(subcommand: &'static str, output: &'static str) -> Self {
        Self {
            fail_subcommand: Some(subcommand),
            output,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(a, _)| a.clone())
            .collect()
    }

    fn timeouts(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    fn respond(&self, args: &[String], timeout: Duration) -> Result<String, DockerError> {
        self.calls.lock().unwrap().push((args.to_vec(), timeout));

        if self.time_out {
            return Err(DockerError::Timeout {
                program: "docker".to_owned(),
                args: args.to_vec(),
                after: timeout,
            });
        }
        if self.fail_subcommand == Some(args[0].as_str()) {
            return Err(DockerError::CommandFailed {
                program: "docker".to_owned(),
                args: args.to_vec(),
                status: "exit status: 1".to_owned(),
                output: self.output.to_owned(),
            });
        }
        if args[0] == "save" {
            std::fs::write(&args[2], b"fake image archive").unwrap();
        }
        Ok(self.output.to_owned())
    }
}

impl CommandExecutor for FakeExecutor {
    async fn exec(&self, args: &[String], timeout: Duration) -> Result<String, DockerError> {
        self.respond(args, timeout)
    }

    async fn exec_streaming(&self, args: &[String], timeout: Duration) -> Result<(), DockerError> {
        self.respond(args, timeout).map(|_| ())
    }
}

fn build_config() -> BuildConfig {
    BuildConfig {
        context: PathBuf::from("services/api"),
        build_timeout_secs: 120,
        save_timeout_secs: 30,
        ..Default::default()
    }
}

// ── Builder ──

#[tokio::test]
async fn build_invokes_docker_build_with_context() {
    let builder = DockerBuilder::with_executor(FakeExecutor::default(), &build_config());

    builder.build("myapp:1").await.unwrap();

    let executor = builder.executor();
    assert_eq!(
        executor.calls(),
        vec![vec!["build", "-t", "myapp:1", "services/api"]]
    );
    assert_eq!(executor.timeouts(), vec![Duration::from_secs(120)]);
}

#[tokio::test]
async fn build_failure_is_build_error() {
    let builder = DockerBuilder::with_executor(
        FakeExecutor::failing("build", "COPY failed: no such file"),
        &build_config(),
    );

    let err = builder.build("myapp:1").await.unwrap_err();

    assert!(matches!(err, BuildError::Build { ref image, .. } if image == "myapp:1"));
}

#[tokio::test]
async fn save_produces_archive_that_is_removed_on_drop() {
    let builder = DockerBuilder::with_executor(FakeExecutor::default(), &build_config());

    let artifact = builder.save("myapp:1").await.unwrap();
    let path = artifact.path().to_path_buf();

    assert_eq!(artifact.image(), "myapp:1");
    assert_eq!(std::fs::read(&path).unwrap(), b"fake image archive");
    let calls = builder.executor().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], "save");
    assert_eq!(calls[0][1], "-o");
    assert_eq!(Path::new(&calls[0][2]), path);
    assert_eq!(calls[0][3], "myapp:1");
    assert_eq!(
        builder.executor().timeouts(),
        vec![Duration::from_secs(30)]
    );

    drop(artifact);
    assert!(!path.exists());
}

#[tokio::test]
async fn save_failure_leaves_no_archive_behind() {
    let builder = DockerBuilder::with_executor(
        FakeExecutor::failing("save", "reference does not exist"),
        &build_config(),
    );

    let err = builder.save("myapp:1").await.unwrap_err();

    assert!(matches!(err, BuildError::Save { .. }));
    let calls = builder.executor().calls();
    assert!(!Path::new(&calls[0][2]).exists());
}

#[test]
fn discard_removes_archive() {
    let artifact = ImageArtifact::reserve("myapp:1").unwrap();
    let path = artifact.path().to_path_buf();
    assert!(path.exists());

    artifact.discard().unwrap();

    assert!(!path.exists());
}

// ── Runtime ──

#[tokio::test]
async fn load_image_runs_docker_load() {
    let executor = FakeExecutor {
        output: "Loaded image: myapp:1\n",
        ..Default::default()
    };
    let runtime = DockerRuntime::with_executor(executor, Duration::from_secs(5));

    let output = runtime
        .load_image(Path::new("/tmp/image-123.tar"))
        .await
        .unwrap();

    assert_eq!(output, "Loaded image: myapp:1\n");
    assert_eq!(
        runtime.executor().calls(),
        vec![vec!["load", "-i", "/tmp/image-123.tar"]]
    );
}

#[tokio::test]
async fn apply_manifest_runs_stack_deploy() {
    let executor = FakeExecutor {
        output: "Updating service svc-a_web\n",
        ..Default::default()
    };
    let runtime = DockerRuntime::with_executor(executor, Duration::from_secs(5));
    let service = ServiceName::parse("svc-a").unwrap();

    let output = runtime
        .apply_manifest(Path::new("deployments/svc-a/deploy.yml"), &service)
        .await
        .unwrap();

    assert_eq!(output, "Updating service svc-a_web\n");
    assert_eq!(
        runtime.executor().calls(),
        vec![vec![
            "stack",
            "deploy",
            "-c",
            "deployments/svc-a/deploy.yml",
            "svc-a"
        ]]
    );
}

#[tokio::test]
async fn runtime_failure_keeps_tool_output_verbatim() {
    let runtime = DockerRuntime::with_executor(
        FakeExecutor::failing("load", "open /tmp/x.tar: no such file or directory\n"),
        Duration::from_secs(5),
    );

    let err = runtime
        .load_image(Path::new("/tmp/x.tar"))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::Load { .. }));
    assert_eq!(
        err.diagnostic(),
        "open /tmp/x.tar: no such file or directory\n"
    );
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn runtime_timeout_is_reported_as_timeout() {
    let executor = FakeExecutor {
        time_out: true,
        ..Default::default()
    };
    let runtime = DockerRuntime::with_executor(executor, Duration::from_millis(10));
    let service = ServiceName::parse("svc-a").unwrap();

    let err = runtime
        .apply_manifest(Path::new("deploy.yml"), &service)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.diagnostic().contains("timed out"));
}

#[test]
fn diagnostic_falls_back_to_message_when_output_is_empty() {
    let err = DockerError::CommandFailed {
        program: "docker".to_owned(),
        args: vec!["load".to_owned()],
        status: "exit status: 1".to_owned(),
        output: "  \n".to_owned(),
    };

    assert!(err.diagnostic().contains("exit status: 1"));
}
