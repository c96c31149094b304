mod config;
mod logging;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

use gmr1_core::actors::fcch::{FcchActor, FcchParams};
use gmr1_core::actors::file_source::FileSource;
use gmr1_core::config::ChannelMap;
use gmr1_core::logging::{LogConfig, SignalLogger};
use gmr1_core::tap::TapSink;
use gmr1_core::SampleBus;

use config::Cli;
use logging::StructuredLogger;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let structured = StructuredLogger::new(cli.log_format);

    let (sps, specs) = match cli.parsed_channels() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let tap_addr = match cli.tap_addr() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let tap = TapSink::connect(tap_addr).wrap_err("failed to bind GSMTAP socket")?;
    let channel_map = ChannelMap::new(specs.clone());

    let mut bus = SampleBus::alloc(specs.len());
    for (idx, spec) in specs.iter().enumerate() {
        let source = FileSource::open(&spec.filename)
            .wrap_err_with(|| format!("failed to open sample file {}", spec.filename))?;
        bus.set_producer(idx, Box::new(source));

        let params = FcchParams::new(sps, spec.arfcn, idx, tap.clone(), channel_map.clone());
        bus.add_consumer(idx, Box::new(FcchActor::new(params)));
    }

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let mut log = SignalLogger::new(log_config);

    bus.run(&mut log);
    structured.emit_all(log.entries());

    Ok(())
}
