use antipode::Opts;
use antipode::cli::SubCommandExtend;
use antipode::config::SubCommand;
use clap::Parser;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Add(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Antipode(config) => config.run(&opts).await,
        SubCommand::Radar(config) => config.run(&opts).await,
        SubCommand::Stats(config) => config.run(&opts).await,
        SubCommand::Server(config) => config.run(&opts).await,
    }
}
