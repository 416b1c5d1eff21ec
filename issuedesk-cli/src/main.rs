use clap::CommandFactory;
use issuedesk_cli::cli::{Cli, Commands};
use issuedesk_cli::context::CommandContext;
use issuedesk_cli::error::CliResult;
use issuedesk_cli::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use issuedesk_cli::{activity, db, issue, logging, settings};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if cli.command.is_none() {
        let code = match Cli::command().print_help() {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_ERROR,
        };
        process::exit(code);
    }

    let config = match CommandContext::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            process::exit(e.exit_code);
        }
    };

    logging::init(
        &logging::filter_directive(&cli, &config),
        config.log_file.as_deref(),
    );
    tracing::debug!("Using {} configuration", config.environment);

    let context = CommandContext::new(config, cli.format, cli.actor);
    let result = match cli.command {
        Some(Commands::Settings) => settings::show_settings(&context),
        Some(Commands::Db { subcommand }) => {
            tracing::debug!("Running db command");
            db::handle_db_command(subcommand, &context).await
        }
        Some(Commands::Issue { subcommand }) => {
            tracing::debug!("Running issue command");
            issue::handle_issue_command(subcommand, &context).await
        }
        Some(Commands::Activity { subcommand }) => {
            tracing::debug!("Running activity command");
            activity::handle_activity_command(subcommand, &context).await
        }
        None => Ok(()),
    };

    process::exit(exit_code(&context, result));
}

fn exit_code(context: &CommandContext, result: CliResult<()>) -> i32 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => context.fail(&e),
    }
}
