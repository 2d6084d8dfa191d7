use calmkit_core::{
    BreathingDefinition, Catalog, ChannelListener, Config, GroundingDefinition, SessionDriver,
    SessionEvent,
};
use tokio::sync::mpsc;

enum Exercise {
    Breathing(BreathingDefinition),
    Grounding(GroundingDefinition),
}

pub async fn breathe(
    config: &Config,
    id: &str,
    cycles: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::with_custom(config);
    let mut def = catalog.breathing(id)?.clone();
    if let Some(cycles) = cycles {
        def.cycles = cycles;
    }
    run(config, Exercise::Breathing(def), json).await
}

pub async fn ground(
    config: &Config,
    id: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::with_custom(config);
    let def = catalog.grounding(id)?.clone();
    run(config, Exercise::Grounding(def), json).await
}

pub async fn panic_button(
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::with_custom(config);
    let def = catalog.panic_exercise()?.clone();
    run(config, Exercise::Breathing(def), json).await
}

/// Run one session to completion, or until Ctrl-C stops it.
async fn run(
    config: &Config,
    exercise: Exercise,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.engine_settings()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (driver, engine) = SessionDriver::new(ChannelListener::new(tx), settings);
    let driver_task = tokio::spawn(driver.run());

    if !json {
        let (name, description) = match &exercise {
            Exercise::Breathing(d) => (d.name.clone(), d.description.clone()),
            Exercise::Grounding(d) => (d.name.clone(), d.description.clone()),
        };
        println!("{name}");
        if !description.is_empty() {
            println!("{description}");
        }
        println!("(Ctrl-C to stop)");
    }

    {
        let mut engine = engine.lock().await;
        match exercise {
            Exercise::Breathing(def) => engine.start_breathing(def)?,
            Exercise::Grounding(def) => engine.start_grounding(def)?,
        };
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                print_event(&event, json)?;
                if event.is_terminal() {
                    break;
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                engine.lock().await.stop();
            }
        }
    }

    drop(engine);
    driver_task.await?;
    Ok(())
}

fn print_event(event: &SessionEvent, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        SessionEvent::PhaseChanged {
            phase,
            remaining_secs,
            cycle,
            total_cycles,
            ..
        } => println!(
            "{:<7} {:>2}s   cycle {cycle}/{total_cycles}",
            phase.instruction(),
            remaining_secs
        ),
        SessionEvent::StepChanged {
            step_index,
            step_label,
            total_steps,
            ..
        } => println!("Step {} of {total_steps}: {step_label}", step_index + 1),
        SessionEvent::SessionCompleted { .. } => println!("Session complete."),
        SessionEvent::SessionStopped { .. } => println!("Session stopped."),
    }
    Ok(())
}
