use clap::Parser;
use snapmatch::cli::SubCommandExtend;
use snapmatch::config::{Opts, SubCommand};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Build(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
        SubCommand::Stats(config) => config.run(&opts).await,
    }
}
