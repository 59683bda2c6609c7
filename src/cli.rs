//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// linkpulse - visitor and outbound-click analytics
#[derive(Parser, Debug)]
#[command(name = "linkpulse")]
#[command(version)]
#[command(about = "Visitor and outbound-click analytics with a live operator dashboard", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve,

    /// Compute the analytics summary once and print it
    Summary {
        /// Print JSON instead of a text report
        #[arg(long)]
        json: bool,
    },

    /// Open the live terminal dashboard
    #[cfg(feature = "tui")]
    Dashboard {
        /// Operator token (same as auth.admin_token)
        #[arg(long, env = "LINKPULSE_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate a sample config.toml (prints to stdout without a path)
    Generate {
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_means_serve() {
        let cli = Cli::try_parse_from(["linkpulse"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_summary_json_with_global_config() {
        let cli = Cli::try_parse_from(["linkpulse", "summary", "--json", "-c", "prod.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("prod.toml"));
        assert!(matches!(cli.command, Some(Commands::Summary { json: true })));
    }

    #[test]
    fn test_config_generate_path() {
        let cli = Cli::try_parse_from(["linkpulse", "config", "generate", "out.toml", "--force"])
            .unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigCommands::Generate { output_path, force },
            }) => {
                assert_eq!(output_path.as_deref(), Some("out.toml"));
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
