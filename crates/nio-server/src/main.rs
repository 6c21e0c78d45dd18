mod cli;
mod client;
mod lifecycle;
mod logging;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::{Action, Cli};
use nio_config::{Config, PROGRAM_NAME, PROGRAM_VERSION};
use nio_db::Engine;
use nio_net::{Reactor, spawn_workers};
use nio_protocol::Dispatcher;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("nio-server: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.action() {
        Action::Version => {
            println!("{PROGRAM_NAME} {PROGRAM_VERSION}");
            ExitCode::SUCCESS
        }
        Action::Stop => {
            println!("\n{}\n", client::stop(config.port_no));
            ExitCode::SUCCESS
        }
        Action::Status => {
            println!("\n{}\n", client::status(config.port_no));
            ExitCode::SUCCESS
        }
        Action::Start => run_server(config),
    }
}

fn run_server(config: Config) -> ExitCode {
    logging::init(&config);
    lifecycle::ignore_sigpipe();

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port_no);
    let mut reactor = match Reactor::bind(addr, config.backlog.max(0) as u32) {
        Ok(reactor) => reactor,
        Err(err) => {
            error!(?err, port = config.port_no, "failed to bind listen socket");
            return ExitCode::FAILURE;
        }
    };

    if config.daemon {
        if let Err(err) = lifecycle::daemonize() {
            error!(?err, "failed to daemonize");
            return ExitCode::FAILURE;
        }
    }

    if let Err(err) = lifecycle::drop_privileges(config.username.as_deref()) {
        error!(?err, "failed to drop privileges");
        return ExitCode::FAILURE;
    }

    let shutdown = reactor.shutdown_flag();
    if let Err(err) = lifecycle::install_signal_handlers(&shutdown) {
        error!(?err, "failed to install signal handlers");
        return ExitCode::FAILURE;
    }

    let engine = match Engine::open(&config.database_file, config.nio_bucket_num, config.mmap_size) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            error!(?err, path = %config.database_file.display(), "failed to open database");
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&engine), PROGRAM_VERSION, config.trace_flag));
    let (work_tx, work_rx) = nio_net::channel_pair();
    let (result_tx, result_rx) = nio_net::channel_pair();

    let handler: Arc<nio_net::Handler> = Arc::new(move |conn| dispatcher.handle(conn));
    let workers = spawn_workers(config.worker_threads.max(1), work_rx, result_tx, reactor.local_port(), handler);

    info!(port = config.port_no, workers = config.worker_threads, "listening");
    let result = reactor.run(work_tx, result_rx);
    lifecycle::cleanup_once("reactor loop exited");

    for worker in workers {
        let _ = worker.join();
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(?err, "reactor loop failed");
            ExitCode::FAILURE
        }
    }
}
