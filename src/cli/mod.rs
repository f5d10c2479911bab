//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running the bridge (`start`, also the default with no subcommand)
//! - Pairing administration (`pairing list`, `pairing approve`, `pairing deny`)

mod pairing;

pub use pairing::{PairingCommand, run_pairing_command};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chatbridge")]
#[command(about = "Bridge nine chat channels to a single AI agent backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path (defaults to ~/.config/chatbridge/bridge.json)
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bridge (default if no subcommand given)
    Start,

    /// Review pairing requests from unknown senders
    #[command(subcommand)]
    Pairing(PairingCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_no_args() {
        let cli = Cli::try_parse_from(["chatbridge"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_start() {
        let cli = Cli::try_parse_from(["chatbridge", "start"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Start)));
    }

    #[test]
    fn parse_config_flag() {
        let cli = Cli::try_parse_from(["chatbridge", "-c", "/tmp/bridge.json"]).unwrap();
        assert!(cli.config.is_some());
    }

    #[test]
    fn parse_pairing_list() {
        let cli = Cli::try_parse_from(["chatbridge", "pairing", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Pairing(PairingCommand::List { channel: None }))
        ));
    }

    #[test]
    fn parse_pairing_approve_with_channel() {
        let cli = Cli::try_parse_from([
            "chatbridge",
            "pairing",
            "approve",
            "123456",
            "--channel",
            "slack",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Pairing(PairingCommand::Approve { code, channel })) => {
                assert_eq!(code, "123456");
                assert_eq!(channel, Some(crate::channels::ChannelName::Slack));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
