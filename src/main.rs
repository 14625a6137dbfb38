use clap::Parser;
use speech_relay_rs::config::ServiceConfig;
use speech_relay_rs::server;

fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::parse();
    server::init_logging(config.log_level_filter());

    actix_web::rt::System::new().block_on(server::run(config))
}
