//! Configuration view command — `taskcanvas config`.

use anyhow::Result;

use taskcanvas::config::Config;

pub fn cmd_config() -> Result<()> {
    let config = Config::from_env()?;
    println!("taskcanvas configuration");
    println!("========================");
    println!("{}", config.describe());
    Ok(())
}
