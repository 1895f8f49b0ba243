//! Command line flags shared by applications built on the runner
//!
//! Include [`CommonArgs`] in an application's own parser with
//! `#[command(flatten)]`:
//!
//! ```ignore
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     common: CommonArgs,
//!
//!     #[arg(long)]
//!     software: Option<PathBuf>,
//! }
//!
//! let args = Args::parse();
//! let config = args.common.apply_to(AppConfig::new("Viewer"));
//! ```

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Run N frames, save a screenshot of the last one and exit
    #[arg(long, value_name = "FRAMES")]
    pub debug: Option<u64>,

    /// Where `--debug` writes its screenshot
    #[arg(long, value_name = "PATH", requires = "debug")]
    pub screenshot: Option<PathBuf>,

    /// Load startup configuration from a RON file
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Apply the common arguments to an AppConfig
    #[cfg(feature = "runtime")]
    pub fn apply_to(&self, mut config: crate::AppConfig) -> crate::AppConfig {
        if let Some(frames) = self.debug {
            config = config.with_debug_mode(frames);
            if let (Some(debug), Some(path)) = (config.debug_mode.as_mut(), &self.screenshot) {
                debug.output_path = path.clone();
            }
        }
        config
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn is_debug(&self) -> bool {
        self.debug.is_some()
    }
}
