use anyhow::Result;
use clap::Parser;
use iptally::IptallyConfig;
use tracing::Level;

mod commands;

use commands::analyze::AnalyzeArgs;

trait Validate {
    fn validate(&self) -> Result<()>;
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// configuration file path, by default $HOME/.iptally.toml is used if present
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Print the effective configuration and exit
    #[clap(long)]
    show_config: bool,

    #[clap(flatten)]
    analyze: AnalyzeArgs,
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match IptallyConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if cli.show_config {
        println!("{}", config.summary());
        return;
    }

    if let Err(e) = commands::analyze::run(cli.analyze, &config) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
