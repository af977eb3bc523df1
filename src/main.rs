mod cli;
mod config;
mod daemon;
mod frame;
mod gestures;
mod identity;
mod logging;
mod mapper;
mod source;
mod translator;
mod transport;
mod tuio;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
