use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8046;

#[derive(Parser)]
#[command(
    name = "toolwire",
    about = "Toolwire - resilience status daemon and upstream probe",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, global = true, env = "TOOLWIRE_CONFIG", help = "Path to config.json")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the status server (default if no command specified)")]
    Serve {
        #[arg(short, long, env = "TOOLWIRE_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    #[command(about = "Make one resilient call and print the outcome")]
    Probe {
        #[arg(help = "URL to call")]
        url: String,

        #[arg(short, long, help = "Upstream name (derived from the host if omitted)")]
        upstream: Option<String>,

        #[arg(short = 'X', long, default_value = "GET", help = "HTTP method")]
        method: String,

        #[arg(short, long, help = "Override max retries")]
        retries: Option<u32>,

        #[arg(long, help = "Print the response or error as JSON")]
        json: bool,
    },

    #[command(about = "Print the effective configuration")]
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe() {
        let cli = Cli::parse_from([
            "toolwire",
            "probe",
            "https://api.stlouisfed.org/fred/series",
            "--upstream",
            "fred",
            "-X",
            "HEAD",
            "--retries",
            "1",
        ]);

        match cli.command {
            Some(Commands::Probe { url, upstream, method, retries, json }) => {
                assert_eq!(url, "https://api.stlouisfed.org/fred/series");
                assert_eq!(upstream.as_deref(), Some("fred"));
                assert_eq!(method, "HEAD");
                assert_eq!(retries, Some(1));
                assert!(!json);
            },
            _ => panic!("expected probe command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["toolwire", "config", "--config", "/etc/toolwire.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/toolwire.json")));
        assert!(matches!(cli.command, Some(Commands::Config)));
    }
}
