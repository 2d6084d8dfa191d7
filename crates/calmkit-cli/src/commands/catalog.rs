use calmkit_core::{Catalog, CatalogError, Config, Phase};

pub fn list(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::with_custom(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let settings = config.engine_settings()?;
    println!("Breathing:");
    for def in &catalog.breathing {
        let pattern: Vec<String> = [Phase::Inhale, Phase::Hold, Phase::Exhale]
            .into_iter()
            .map(|phase| {
                def.phases
                    .iter()
                    .filter(|s| s.phase == phase)
                    .map(|s| s.duration_secs)
                    .sum::<u32>()
                    .to_string()
            })
            .collect();
        println!(
            "  {:<20} {:<28} {} x{} ({}s)",
            def.id,
            def.name,
            pattern.join("-"),
            def.cycles,
            def.total_secs()
        );
    }
    println!("Grounding:");
    for def in &catalog.grounding {
        println!(
            "  {:<20} {:<28} {} steps ({}s)",
            def.id,
            def.name,
            def.steps.len(),
            def.total_secs(settings.grounding_step)
        );
    }
    Ok(())
}

pub fn show(config: &Config, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::with_custom(config);
    let json = if let Ok(def) = catalog.breathing(id) {
        serde_json::to_string_pretty(def)?
    } else if let Ok(def) = catalog.grounding(id) {
        serde_json::to_string_pretty(def)?
    } else {
        return Err(CatalogError::ExerciseNotFound {
            kind: "breathing or grounding",
            id: id.to_string(),
        }
        .into());
    };
    println!("{json}");
    Ok(())
}
