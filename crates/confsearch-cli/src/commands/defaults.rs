use crate::config;
use crate::error::Result;
use tracing::info;

pub fn run() -> Result<()> {
    info!("Rendering default configuration.");
    print!("{}", config::default_config_toml()?);
    Ok(())
}
