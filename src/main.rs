use minicoin::cli::commands::run_cli;

fn main() -> anyhow::Result<()> {
    // Logging is initialized inside run_cli, before the config is loaded
    run_cli()?;

    Ok(())
}
