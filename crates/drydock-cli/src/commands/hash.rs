use std::path::Path;

use drydock_core::ContentDigest;

pub async fn hash(file: &Path) -> anyhow::Result<()> {
    let digest = ContentDigest::of_file(file).await?;
    println!("{digest}");
    Ok(())
}
