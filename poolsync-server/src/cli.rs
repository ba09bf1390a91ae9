use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "poolsync",
    about = "Poolsync - keeps load-balancer pools in step with a service registry",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(
        short,
        long,
        global = true,
        env = "POOLSYNC_CONFIG",
        help = "Path to poolsync.json (default: <data dir>/poolsync.json)"
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the daemon (default if no command specified)")]
    Serve {
        #[arg(short, long, help = "Listen port, overrides the config file and POOLSYNC_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Validate and print the resolved configuration")]
    CheckConfig {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Write a default configuration file")]
    InitConfig {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_is_optional() {
        let cli = Cli::try_parse_from(["poolsync", "--config", "/tmp/p.json"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.json")));

        let cli = Cli::try_parse_from(["poolsync", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9000) })));
    }
}
