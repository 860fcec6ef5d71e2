use anyhow::Context;
use env_logger::Env;
use prospect::configuration::get_configuration;
use prospect::console::read_run_request;
use prospect::dal::Ledger;
use prospect::services::{event_channel, CancelFlag, ConsoleEvent, Droid, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration")?;

    println!("--- Map Listing Lead Finder ---");
    println!("Scans a niche across one city's neighborhoods for businesses without a website.");

    let Some(request) = read_run_request().context("Failed to read input")? else {
        println!("Niche and city cannot be empty. Exiting.");
        return Ok(());
    };
    let tasks = request.tasks();
    log::info!("Prepared {} search task(s).", tasks.len());

    let ledger =
        Ledger::load(&configuration.store.csv_path).context("Failed to read the lead store")?;
    log::info!(
        "Loaded {} existing leads from {}.",
        ledger.len(),
        configuration.store.csv_path
    );

    let droid = Droid::new(&configuration.webdriver)
        .await
        .context("Failed to start the browser session")?;

    let (events, mut receiver) = event_channel();
    let cancel = CancelFlag::new();

    // Front-end side: print the worker's progress stream as it arrives.
    let printer = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                ConsoleEvent::Line { at, text } => println!("{at} - {text}"),
                ConsoleEvent::Finished { .. } => break,
            }
        }
    });

    // Ctrl-C requests a cooperative stop; the worker finishes its in-flight
    // item and exits at the next checkpoint.
    let stop_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Stop requested; finishing the current item...");
            stop_flag.cancel();
        }
    });

    let orchestrator = Orchestrator::new(&droid, ledger, configuration, events, cancel);
    let summary = orchestrator.run(&tasks).await;

    droid.quit().await;
    let _ = printer.await;

    println!(
        "Checked {} businesses, found {} leads.",
        summary.checked, summary.found
    );
    if summary.session_lost {
        log::error!("Run ended early: the browser session was lost.");
    }

    Ok(())
}
