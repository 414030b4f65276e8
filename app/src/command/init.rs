use std::path::PathBuf;

use palaver_config::Config;

#[derive(Debug, Clone)]
pub struct InitInput {
    /// Defaults to `~/palaver/config.json`
    pub path: Option<PathBuf>,
}

/// Strategy for writing the starter configuration file.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = InitInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let path = match input.path {
            Some(path) => path,
            None => Config::default_path()?,
        };
        Config::create_config(&path)?;
        println!("Created {}", path.display());
        Ok(())
    }
}
