//! Command-line argument parsing: `gmr1-rx sps arfcn1:file1 [arfcn2:file2 ...]`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gmr1_core::config::{validate_sps, ChannelSpec};
use gmr1_core::errors::ConfigError;

/// Log serialization format, mirrored from the original's TOML-driven CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Logfmt,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "GMR-1 receiver orchestration core", long_about = None)]
pub struct Cli {
    /// Samples per symbol, in [1,16].
    pub sps: i32,

    /// One or more `arfcn:filename` channel assignments.
    #[arg(required = true)]
    pub channels: Vec<String>,

    /// Mirror stderr diagnostics at Debug level in addition to Info.
    #[arg(short, long)]
    pub verbose: bool,

    /// Structured log serialization format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Directory debug dumps (speech_*.dat / csd_*.dat) are written to.
    #[arg(long, default_value = ".")]
    pub dump_dir: PathBuf,

    /// GSMTAP destination address.
    #[arg(long, default_value = "127.0.0.1:4729")]
    pub tap_addr: String,
}

impl Cli {
    /// Validate `sps` and parse every `channels` entry into a `ChannelSpec`.
    pub fn parsed_channels(&self) -> Result<(u32, Vec<ChannelSpec>), ConfigError> {
        let sps = validate_sps(self.sps)?;
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let specs = self
            .channels
            .iter()
            .map(|arg| ChannelSpec::parse(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((sps, specs))
    }

    pub fn tap_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.tap_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidTapAddr {
                value: self.tap_addr.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sps_and_channels() {
        let cli = Cli::parse_from(["gmr1-rx", "4", "120:a.cfile", "240:b.cfile"]);
        let (sps, specs) = cli.parsed_channels().unwrap();
        assert_eq!(sps, 4);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].arfcn, 120);
    }

    #[test]
    fn rejects_out_of_range_sps() {
        let cli = Cli::parse_from(["gmr1-rx", "17", "120:a.cfile"]);
        assert!(cli.parsed_channels().is_err());
    }

    #[test]
    fn tap_addr_defaults_to_standard_port() {
        let cli = Cli::parse_from(["gmr1-rx", "1", "120:a.cfile"]);
        let addr = cli.tap_addr().unwrap();
        assert_eq!(addr.port(), 4729);
    }
}
