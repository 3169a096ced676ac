use clap::Parser;
use log::error;
use yt_privacy::{
    config::{Args, RunConfig},
    preflight,
    provider::YouTube,
    reconcile,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Wait for YouTube to be reachable
    if !args.skip_preflight {
        preflight::wait_for_provider().await;
    }

    let youtube = match YouTube::new() {
        Ok(youtube) => youtube,
        Err(e) => {
            error!("Could not create HttpClient: {}", e);
            std::process::exit(1);
        }
    };

    let config = RunConfig::from(args);
    if let Err(e) = reconcile::run(&youtube, &config).await {
        error!("Run aborted: {}", e);
        std::process::exit(1);
    }
}
