use anyhow::Result;

mod app;
mod cli;
mod logging;
mod output;

fn main() -> Result<()> {
    let args = cli::parse();
    app::run(args)
}
