//! CLI module for Conclave
//!
//! - `serve`: run the live progress server
//! - `watch`: follow a channel and print the reconstructed state

use clap::{Parser, Subcommand};

pub mod watch;

/// Conclave live progress streaming
#[derive(Parser, Debug)]
#[command(name = "conclave")]
#[command(about = "Live progress streaming for multi-agent work")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve,
    /// Follow a channel from a running server
    Watch(watch::WatchArgs),
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Watch(args)) => watch::run(args).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watch::WatchMode;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["conclave", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn test_parse_watch_defaults() {
        let cli = Cli::try_parse_from(["conclave", "watch", "board-7"]).unwrap();
        match cli.command {
            Some(Commands::Watch(args)) => {
                assert_eq!(args.channel, "board-7");
                assert_eq!(args.mode, WatchMode::Discussion);
                assert!(args.url.is_none());
                assert!(!args.follow);
            }
            other => panic!("expected watch, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_watch_options() {
        let cli = Cli::try_parse_from([
            "conclave",
            "watch",
            "proj-1",
            "--mode",
            "progress",
            "--url",
            "http://10.0.0.5:8080",
            "--follow",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Watch(args)) => {
                assert_eq!(args.mode, WatchMode::Progress);
                assert_eq!(args.url.as_deref(), Some("http://10.0.0.5:8080"));
                assert!(args.follow);
            }
            other => panic!("expected watch, got: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["conclave", "watch", "p", "--mode", "chat"]).is_err());
    }
}
