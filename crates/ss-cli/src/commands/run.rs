use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use ss_script::{DirectoryLoader, SimConfig, Simulation};
use ss_world::{EntityId, EventLog, World, WorldEvent, WorldEventKind};

use crate::scenario::Scenario;

/// Which part of the event log to print.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub entity: Option<EntityId>,
    pub tick: Option<u64>,
}

impl EventFilter {
    fn select<'a>(&self, log: &'a EventLog) -> Vec<&'a WorldEvent> {
        match (self.entity, self.tick) {
            (Some(id), Some(tick)) => log
                .events_for_entity(id)
                .into_iter()
                .filter(|e| e.tick == tick)
                .collect(),
            (Some(id), None) => log.events_for_entity(id),
            (None, Some(tick)) => log.events_at_tick(tick),
            (None, None) => log.events().iter().collect(),
        }
    }
}

pub fn run(
    scenario_path: &Path,
    scripts: &Path,
    ticks: u64,
    budget: Option<usize>,
    events: Option<EventFilter>,
) -> Result<(), String> {
    let scenario = Scenario::load(scenario_path)?;
    let (world, ids) = scenario.build_world()?;

    let mut config = SimConfig::default().with_max_events(500);
    if let Some(budget) = budget {
        config = config.with_token_budget(budget);
    }
    let budget = config.token_budget;

    let mut sim = Simulation::new(world, DirectoryLoader::new(scripts), config)
        .map_err(|e| format!("cannot load scripts: {e}"))?;

    let mut attached = 0;
    for (spec, &id) in scenario.entities.iter().zip(&ids) {
        if let Some(name) = &spec.script {
            sim.attach_script(id, name)
                .map_err(|e| format!("{} {id}: {e}", spec.type_name))?;
            attached += 1;
        }
        if let Some(source) = &spec.source {
            sim.attach_source(id, source)
                .map_err(|e| format!("{} {id}: {e}", spec.type_name))?;
            attached += 1;
        }
    }

    sim.run(ticks);

    // Header
    let name = if scenario.name.is_empty() {
        scenario_path.display().to_string()
    } else {
        scenario.name.clone()
    };
    println!(
        "  {} '{}' {}",
        "Scenario".bold(),
        name,
        format!("({ticks} ticks, budget={budget})").dimmed()
    );
    println!(
        "  {} entities, {} scripts attached, {} still running, {} functions",
        sim.world().entity_count(),
        attached,
        sim.scripts().len(),
        sim.repository().len()
    );
    println!();

    if let Some(filter) = events {
        println!("  {}", "Event Log".bold().underline());
        println!();
        let selected = filter.select(sim.world().events());
        for event in &selected {
            let tick_label = format!("[tick {:>3}]", event.tick).dimmed();
            println!("  {tick_label} {}", describe(sim.world(), &event.kind));
        }
        if selected.is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    }

    // Entity logs
    println!("  {}", "Entity Logs".bold().underline());
    println!();
    let mut any_log = false;
    for entity in sim.world().entities() {
        if entity.log.is_empty() {
            continue;
        }
        any_log = true;
        println!("  {}", label(sim.world(), entity.id).bold());
        for line in &entity.log {
            println!("    {line}");
        }
    }
    if !any_log {
        println!("  {}", "(empty)".dimmed());
    }
    println!();

    // Summary
    println!("  {}", "Entities".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Entity", "Type", "Position", "Facing", "Cooldown", "Items", "Scripts"]);
    for entity in sim.world().entities() {
        let type_name = sim
            .world()
            .entity_type_of(entity.id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "?".to_string());
        let held = entity.storage.iter().filter(|slot| slot.is_some()).count();
        table.add_row(vec![
            entity.id.to_string(),
            type_name,
            entity.pos.to_string(),
            entity.direction.to_string(),
            entity.cooldown().to_string(),
            format!("{held}/{}", entity.storage.len()),
            sim.scripts().instances_on(entity.id).count().to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn label(world: &World, id: EntityId) -> String {
    match world.entity_type_of(id) {
        Some(ty) => format!("{} #{id}", ty.name),
        None => format!("#{id}"),
    }
}

fn describe(world: &World, kind: &WorldEventKind) -> String {
    match kind {
        WorldEventKind::Logged { entity, message } => format!("{}: {message}", label(world, *entity)),
        WorldEventKind::InventoryChanged { entity, item, slot } => {
            format!("{} received item {item} in slot {slot}", label(world, *entity))
        }
        WorldEventKind::Moved { entity, from, to } => {
            format!("{} moved {from} -> {to}", label(world, *entity))
        }
        WorldEventKind::Shaken { entity, seconds } => {
            format!("{} shaken for {seconds}s", label(world, *entity))
        }
        WorldEventKind::ScriptFailed { entity, error } => {
            format!("{} {} {error}", label(world, *entity), "script failed:".red().bold())
        }
    }
}
