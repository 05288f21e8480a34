use floatspace::config::{enable_fpe, parse_args};
use floatspace::demo::LightingDemo;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_args(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };
    if config.fpe {
        enable_fpe();
    }

    floatspace::run::<LightingDemo>(config)
}
