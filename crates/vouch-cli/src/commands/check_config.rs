//! `vouch check-config`

use anyhow::Result;
use std::path::Path;
use vouch_core::VouchConfig;

use super::load_config;

/// Validate the file at `path` and print what it configures
pub fn run(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    println!("{}", summary(&config));
    Ok(())
}

fn summary(config: &VouchConfig) -> String {
    let server = config
        .server_url
        .as_deref()
        .unwrap_or("(unset, invitation e-mails disabled)");
    format!(
        "server_url: {server}\n\
         email.sender: {}\n\
         email.product_name: {}\n\
         email.outbox_dir: {}\n\
         invitations.token_collision_retries: {}",
        config.email.sender,
        config.email.product_name,
        config.email.outbox_dir.display(),
        config.invitations.token_collision_retries,
    )
}
