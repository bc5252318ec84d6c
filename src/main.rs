mod capture;
mod cli;
mod config;
mod delivery;
mod event;
mod scheduler;
mod timelapse;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
