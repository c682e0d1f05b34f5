//! `hive admin` subcommands.

use sha2::{Digest, Sha256};

use hive_domain::config::Config;

/// Prompt for a password twice and store its SHA-256 hex digest where
/// the admin dashboard expects it.
pub fn set_password(config: &Config) -> anyhow::Result<()> {
    let first = rpassword::prompt_password("New admin password: ")?;
    if first.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }
    let second = rpassword::prompt_password("Repeat password: ")?;
    if first != second {
        anyhow::bail!("passwords do not match");
    }

    let digest = hex::encode(Sha256::digest(first.as_bytes()));
    let admin_dir = config.state.path.join("admin");
    std::fs::create_dir_all(&admin_dir)?;
    let path = admin_dir.join("password.sha256");
    std::fs::write(&path, digest)?;
    println!("password hash written to {}", path.display());
    Ok(())
}
