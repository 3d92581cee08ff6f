use std::path::Path;

use drydock_client::{SyncError, SyncPipeline, SyncRequest, TransferClient};
use drydock_core::{Manifest, ManifestError};
use drydock_docker::DockerBuilder;

use super::Overrides;

/// Build, upload and deploy `service` from the deployment file at `file`.
///
/// Ctrl-C or SIGTERM aborts the step in progress. Dropping the pipeline kills
/// any docker child and removes the saved image archive before the process
/// exits.
pub async fn deploy(
    file: &Path,
    service: &str,
    entry: Option<&str>,
    overrides: &Overrides,
) -> anyhow::Result<()> {
    let service = super::service_name(service)?;
    let config = overrides.load()?;

    let builder = DockerBuilder::new(&config.build);
    let remote = TransferClient::new(&config.remote)?;
    println!("Deploying {service} to {}", remote.base_url());

    let pipeline = SyncPipeline::new(builder, remote);
    let request = SyncRequest {
        descriptor: file,
        service: &service,
        entry,
    };

    let outcome = tokio::select! {
        result = pipeline.run(&request) => match result {
            Ok(outcome) => outcome,
            Err(SyncError::Descriptor(ManifestError::UnknownEntry(name))) => {
                return Err(unknown_entry(file, &name).await);
            }
            Err(e) => return Err(e.into()),
        },
        signal = super::termination() => {
            let signal = signal?;
            tracing::warn!(%service, signal, "interrupted, cleaning up");
            anyhow::bail!("deployment of {service} interrupted by {signal}");
        }
    };

    println!("Image {} uploaded", outcome.image);
    if outcome.descriptor_uploaded {
        println!("Deployment file updated ({})", outcome.local_digest);
    } else {
        println!("Deployment file unchanged");
    }
    let output = outcome.deploy_output.trim();
    if !output.is_empty() {
        println!("{output}");
    }
    println!("Deployment complete!");
    Ok(())
}

/// Error for an `--entry` that names no service, listing the ones that exist.
async fn unknown_entry(file: &Path, name: &str) -> anyhow::Error {
    let available = match Manifest::read(file).await {
        Ok(manifest) => manifest.entries().collect::<Vec<_>>().join(", "),
        Err(e) => return anyhow::Error::new(e).context(format!("unknown entry '{name}'")),
    };
    anyhow::anyhow!(
        "{} has no service entry named '{name}' (available: {available})",
        file.display()
    )
}
