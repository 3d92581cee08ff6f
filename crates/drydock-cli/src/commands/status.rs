use std::path::Path;

use drydock_client::{Remote, TransferClient};
use drydock_core::ContentDigest;

use super::Overrides;

/// Report whether the server's copy of the deployment file matches `file`.
/// Read-only: nothing is uploaded or deployed.
pub async fn status(file: &Path, service: &str, overrides: &Overrides) -> anyhow::Result<()> {
    let service = super::service_name(service)?;
    let config = overrides.load()?;

    let local = ContentDigest::of_file(file).await?;
    let client = TransferClient::new(&config.remote)?;

    match client.fetch_remote_digest(&service).await {
        Ok(remote) if remote == local => println!("{service}: up to date ({local})"),
        Ok(remote) => {
            println!("{service}: changed");
            println!("  local:  {local}");
            println!("  remote: {remote}");
        }
        Err(e) if e.is_not_found() => println!("{service}: not deployed"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
