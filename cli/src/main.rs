use census_cli::Cli;
use census_cli::run_main;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_main(cli))
}

/// Load `.env` from the working directory, if any, so the popularity
/// credential can live next to the source table.
fn load_dotenv() {
    if let Ok(iter) = dotenvy::dotenv_iter() {
        for (key, value) in iter.into_iter().flatten() {
            if std::env::var_os(&key).is_none() {
                // It is safe to call set_var() because our process is
                // single-threaded at this point in its execution.
                unsafe { std::env::set_var(&key, &value) };
            }
        }
    }
}
