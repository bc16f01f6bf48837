use structopt::StructOpt;

use goesvfi::cli::Cli;
use goesvfi::progress;
use goesvfi::worker_pool::CancelToken;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::from_args();
    let emit_progress = cli.progress;

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    let (sink, mut rx) = progress::channel();
    let cancel = CancelToken::new();

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if emit_progress {
                progress::print_json(&event);
            }
        }
    });

    let result = goesvfi::orchestrator::run(&config, sink, cancel).await;
    let _ = printer.await;

    match result {
        Ok(path) => {
            log::info!("wrote {path:?}");
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
