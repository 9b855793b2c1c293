use clap::Parser;
use color_eyre::Result;
use crafty_exporter::{
    init_errors,
    init_logging,
    Args,
    Settings,
};
use eyre::WrapErr as _;

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    init_logging()?;

    let args = Args::parse();
    let settings = Settings::new(&args)
        .wrap_err_with(|| format!("failed to load configuration from {}", args.config.display()))?;

    if args.print_config {
        print!("{}", settings.redacted_yaml()?);
        return Ok(());
    }

    tracing::info!(instances = settings.crafty_instances.len(), "started the server info updater");
    crafty_exporter::run(settings).await
}
