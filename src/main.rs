//! Metro cost estimator - Main Entry Point

use clap::Parser;
use metro_cost::cli::{
    cmd_batch, cmd_generate, cmd_info, cmd_predict, cmd_serve, cmd_train, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metro_cost=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            output,
            schema,
            infer_schema,
            trees,
            max_depth,
            seed,
            test_size,
        } => {
            cmd_train(
                &data,
                &output,
                schema.as_deref(),
                infer_schema.as_deref(),
                trees,
                max_depth,
                seed,
                test_size,
            )?;
        }
        Commands::Predict { model, input, set, show_record } => {
            cmd_predict(&model, input.as_deref(), &set, show_record)?;
        }
        Commands::Batch { model, data, output } => {
            cmd_batch(&model, &data, output.as_deref())?;
        }
        Commands::Generate { rows, output, seed, noise } => {
            cmd_generate(rows, &output, seed, noise)?;
        }
        Commands::Info { model } => {
            cmd_info(&model)?;
        }
        Commands::Serve { model, port, host } => {
            cmd_serve(model.as_deref(), &host, port).await?;
        }
    }

    Ok(())
}
