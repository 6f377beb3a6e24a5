use acsp_sidecar::config::Config;
use acsp_sidecar::pipeline;
use acsp_sidecar::session::PipelineContext;
use acsp_sidecar::store::RecordStore;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_env().context("reading configuration")?;
    log::info!("starting with config: {:?}", config);

    let store = RecordStore::open(&config.sqlite_path)
        .with_context(|| format!("opening record store at {}", config.sqlite_path))?;
    let mut ctx = PipelineContext::new(store);

    pipeline::run(&mut ctx, config.udp_bind).context("running the event pipeline")?;

    Ok(())
}
