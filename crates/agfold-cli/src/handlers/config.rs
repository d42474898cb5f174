use agfold_runtime::Config;
use anyhow::{Result, bail};
use std::path::Path;

pub fn show(config: &Config, path: &Path) -> Result<()> {
    let source = if path.exists() { "" } else { " (not found, defaults)" };
    println!("# {}{}", path.display(), source);
    print!("{}", config.to_toml()?);
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
