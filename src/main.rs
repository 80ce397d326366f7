use color_eyre::{eyre::eyre, Result};
use padwatch::config::{ConsumeMode, MonitorConfig};
use padwatch::controller::{
    Bound, ChannelSink, ConsoleSink, ControllerSession, DeviceHandle, EventSink, SemanticEvent,
    SessionTask,
};
use padwatch::logging;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = tracing::subscriber::with_default(logging::startup_subscriber(), || {
        MonitorConfig::load().map(|config| config.apply_args(std::env::args().skip(1)))
    })?;
    logging::install(config.level()?)?;
    debug!("Effective configuration: {:?}", config);

    let handle = DeviceHandle::open(&config.device)?;
    let profile = config.resolve_profile(handle.name())?;
    let session = ControllerSession::<Bound>::bind(handle, profile)?;

    let (event_sender, mut event_receiver) = mpsc::channel::<SemanticEvent>(1000);
    let sink = ChannelSink::new(event_sender);

    // Plain threads: a worker parked in read() must not hold up runtime shutdown
    let task = match config.mode {
        ConsumeMode::Loop => {
            info!("Running blocking decode loop");
            SessionTask::new(session, sink)
        }
        ConsumeMode::Queue => {
            info!("Running queue reader");
            SessionTask::queued(session, sink)
        }
    };
    let worker = task.spawn()?;

    let mut console = ConsoleSink::stdout(config.timestamps);
    loop {
        tokio::select! {
            event = event_receiver.recv() => match event {
                Some(event) => {
                    if let Err(e) = console.emit(event) {
                        error!("Console output failed: {}", e);
                        return Err(e.into());
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, exiting");
                return Ok(());
            }
        }
    }

    // Channel closed: the worker has left its loop
    match worker.join() {
        Ok(Some(report)) => info!("Session finished: {:?}", report),
        Ok(None) => info!("Controller disconnected"),
        Err(_) => return Err(eyre!("Controller worker panicked")),
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}
