use anyhow::{Context, Result};
use g74_algo::StudyConfig;

pub fn handle(config: &StudyConfig) -> Result<()> {
    let text = config
        .to_toml_string()
        .context("rendering configuration as TOML")?;
    print!("{text}");
    Ok(())
}
