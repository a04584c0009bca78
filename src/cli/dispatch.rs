use anyhow::Result;

use super::classify::cmd_classify;
use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::info::cmd_info;
use super::signatures::cmd_signatures;
use super::simulate::cmd_simulate;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Simulate(args) => cmd_simulate(args, ctx, cli.output).await,
        Commands::Classify(args) => cmd_classify(args, ctx, cli.output),
        Commands::Signatures => cmd_signatures(ctx, cli.output),
        Commands::Info => cmd_info(ctx, cli.output),
    }
}
