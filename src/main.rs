use maison_track::cli;
use maison_track::env::setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv_override().ok();
    let (env, command) = cli::CliEnv::parse_and_convert()?;
    setup_tracing(&env);

    cli::run_command(env, command).await?;
    Ok(())
}
