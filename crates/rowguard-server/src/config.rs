use std::path::PathBuf;

use clap::Parser;
use rowguard_core::RowguardConfig;

#[derive(Parser, Debug)]
#[command(name = "rowguard-server")]
#[command(about = "HTTP host binding authenticated principals into Postgres sessions")]
#[command(version)]
pub struct ServerArgs {
    /// Path to the configuration file.
    #[arg(short, long, env = "ROWGUARD_CONFIG", default_value = "rowguard.yaml")]
    pub config: PathBuf,

    /// Listen address, overriding `server.bind`.
    #[arg(long, env = "ROWGUARD_BIND")]
    pub bind: Option<String>,

    /// Skip the startup compliance audit.
    #[arg(long)]
    pub skip_compliance: bool,
}

impl ServerArgs {
    /// Load the config file (defaults if absent) and apply flag overrides.
    pub fn load(&self) -> anyhow::Result<RowguardConfig> {
        let mut config = RowguardConfig::load_or_default(&self.config)?;
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if self.skip_compliance {
            config.compliance.check_on_startup = false;
        }
        Ok(config)
    }
}
