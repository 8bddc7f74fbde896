use clap::Parser;
use policysrv::{app, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = app::run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
