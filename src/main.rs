use clap::Parser;

use linkpulse::cli::{Cli, Commands};
use linkpulse::config::{get_config, init_config_from};
use linkpulse::interfaces::cli::{CliError, print_summary, run_config_command};
use linkpulse::runtime::modes;
use linkpulse::system::init_logging;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());

    match cli.command {
        None | Some(Commands::Serve) => {
            // 日志写入器需要在整个进程期间存活
            let _guard = match init_logging(&get_config().logging) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("{}", e.format_colored());
                    std::process::exit(1);
                }
            };

            if let Err(e) = modes::run_server().await {
                tracing::error!("Server exited with error: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Summary { json }) => {
            if let Err(e) = print_summary(json).await {
                exit_with(e);
            }
        }
        Some(Commands::Config { action }) => {
            if let Err(e) = run_config_command(action) {
                exit_with(e);
            }
        }
        #[cfg(feature = "tui")]
        Some(Commands::Dashboard { token }) => {
            if let Err(e) = modes::run_tui(Some(token)).await {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn exit_with(err: CliError) -> ! {
    eprintln!("{}", err.format_colored());
    std::process::exit(1);
}
