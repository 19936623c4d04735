//! Nimbus CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General or CloudFormation error
//! - 2: Missing nimbusfile or invalid arguments
//! - 3: Template error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nimbus_core::TemplateError;
use nimbus_deploy::DeployError;

mod commands;
mod prompt;

use commands::{Cli, Commands, UsageError};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const TEMPLATE_ERROR: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "nimbus=debug"
    } else if cli.quiet {
        "nimbus=warn"
    } else {
        "nimbus=info"
    };

    // Logs go to stderr so rendered templates can be piped.
    let log_result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(level.parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let globals = cli.globals;
    let result = match cli.command {
        Commands::Templates => commands::templates::execute(&globals).await,
        Commands::Show(args) => commands::show::execute(args, &globals).await,
        Commands::List => commands::list::execute(&globals).await,
        Commands::Create(args) => commands::deploy::create(args, &globals).await,
        Commands::Update(args) => commands::deploy::update(args, &globals).await,
        Commands::Destroy(args) => commands::destroy::execute(args, &globals).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.is::<UsageError>() {
            return ExitCodes::INVALID_ARGS;
        }
        if let Some(err) = cause.downcast_ref::<TemplateError>() {
            return match err {
                TemplateError::NimbusfileNotFound(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::TEMPLATE_ERROR,
            };
        }
        if let Some(err) = cause.downcast_ref::<DeployError>() {
            if let DeployError::Template(TemplateError::NimbusfileNotFound(_)) = err {
                return ExitCodes::INVALID_ARGS;
            }
            if let DeployError::Template(_) = err {
                return ExitCodes::TEMPLATE_ERROR;
            }
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_nimbusfile_is_invalid_args() {
        let err = anyhow::Error::new(TemplateError::NimbusfileNotFound(PathBuf::from("x")));
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_template_errors() {
        let err = anyhow::Error::new(TemplateError::UnknownTemplate("web".to_string()))
            .context("Failed to render template");
        assert_eq!(categorize_error(&err), ExitCodes::TEMPLATE_ERROR);

        let err = anyhow::Error::new(DeployError::Template(TemplateError::NoActiveTemplate));
        assert_eq!(categorize_error(&err), ExitCodes::TEMPLATE_ERROR);
    }

    #[test]
    fn test_api_and_usage_errors() {
        let err = anyhow::Error::new(DeployError::Api("Stack [web] already exists".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);

        let err = anyhow::Error::new(UsageError("no template given".to_string()));
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);
    }
}
