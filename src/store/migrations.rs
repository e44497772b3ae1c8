//! Migration integrity: each `.sql` file under `migrations/` has a companion
//! sha256 entry in `manifest.sha256`, verified before `sqlx::migrate!` is
//! allowed to touch the database.

use anyhow::Context;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;

const MIGRATIONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");

fn verify_manifest() -> anyhow::Result<()> {
    let manifest_path = Path::new(MIGRATIONS_DIR).join("manifest.sha256");
    let manifest = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading migration manifest at {}", manifest_path.display()))?;

    let mut checked = 0usize;
    for line in manifest.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut parts = line.split_whitespace();
        let file_name = parts
            .next()
            .with_context(|| format!("manifest line missing file name: {line}"))?;
        let expected_hash = parts
            .next()
            .with_context(|| format!("manifest line missing hash: {line}"))?;

        let file_path = Path::new(MIGRATIONS_DIR).join(file_name);
        let contents = std::fs::read(&file_path)
            .with_context(|| format!("reading migration file {}", file_path.display()))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let actual_hash = hex::encode(hasher.finalize());

        if actual_hash != expected_hash {
            anyhow::bail!(
                "migration integrity check failed for {file_name}: manifest says {expected_hash}, file hashes to {actual_hash}"
            );
        }
        checked += 1;
    }

    if checked == 0 {
        anyhow::bail!("migration manifest at {} is empty", manifest_path.display());
    }

    Ok(())
}

/// Verify manifest integrity, then apply pending migrations in version
/// order, each inside its own transaction, recording version/description/
/// timestamp. Fatal on any failure: the process must not serve traffic
/// against a database it couldn't bring to the expected schema.
pub async fn run(pool: &SqlitePool) -> anyhow::Result<()> {
    verify_manifest().context("migration manifest verification failed")?;
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("applying database migrations")?;
    Ok(())
}
