use zy::{logger, App, Config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First CLI argument, then ZY_CONFIG, then ./config.toml
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ZY_CONFIG").ok())
        .unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    let app = App::new(cfg)?;
    runtime.block_on(app.serve())
}
