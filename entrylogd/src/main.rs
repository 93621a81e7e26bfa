use std::sync::{Arc, Barrier};
use std::time::{Duration, Instant};

use anyhow::Context;
use config::options::{get_args, Options};
use entrylog::EntryLogger;
use event::BusinessEvent;

mod config;
mod event;

fn main() {
    let args = get_args();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(&args.log_level)
            .default_write_style_or("always"),
    )
    .init();

    log::info!("args: {:?}", args);

    if let Err(e) = run(args) {
        log::error!("entrylogd failed: {:?}", e);
        std::process::exit(3)
    }
}

fn run(args: Options) -> anyhow::Result<()> {
    let expected = args.expected_events()?;
    let logger = Arc::new(
        EntryLogger::new(args.logger_config()).context("could not start the entry logger")?,
    );
    let start = Arc::new(Barrier::new(args.producers.max(1)));

    let mut handlers = Vec::new();
    for producer in 0..args.producers {
        let logger = Arc::clone(&logger);
        let start = Arc::clone(&start);
        let events = args.events_per_producer;
        let h = std::thread::Builder::new()
            .name(format!("producer-{producer}"))
            .spawn(move || {
                start.wait();
                for sequence in 0..events {
                    logger.add_entry(BusinessEvent::now(producer, sequence));
                }
            })
            .context("could not spawn a producer thread")?;
        handlers.push(h);
    }
    for h in handlers {
        h.join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    }

    log::info!("appended {} events, waiting for the flush worker", expected);

    let deadline = Instant::now() + args.run_for;
    while logger.flushed_count() < expected && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let flushed = logger.flushed_count();
    log::info!(
        "flushed {} of {} events, {} still pending",
        flushed,
        expected,
        logger.pending_count()
    );

    match Arc::try_unwrap(logger) {
        Ok(logger) => logger.shutdown()?,
        Err(_) => log::warn!("entry logger still shared, not waiting for the worker"),
    }

    if flushed != expected {
        anyhow::bail!("flushed {flushed} events but {expected} were appended");
    }
    println!("{flushed}");
    Ok(())
}
