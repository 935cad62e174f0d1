//! Research example: ages, prerequisites, and progression events.
//!
//! Uses the standard ruleset, prints the research order, then plays a short
//! research session feeding a fixed science income each turn and reporting
//! the events the player's research state emits.
//!
//! Run with: `RUST_LOG=debug cargo run -p epoch-examples --example research`

use epoch_data::builtin;
use epoch_tech_tree::{Research, ResearchEvent};
use tracing_subscriber::EnvFilter;

const SCIENCE_PER_TURN: u32 = 30;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let ruleset = builtin::ruleset().expect("standard ruleset");
    let tree = ruleset.tech_tree();

    // --- Structure ---

    println!("=== {} technologies in {} ages ===\n", tree.technology_count(), tree.ages().len());
    for age in tree.ages() {
        let keys: Vec<&str> = tree.technologies_in_age(&age.key).map(|t| t.key.as_str()).collect();
        println!("{:<16} {}", age.name, keys.join(", "));
    }

    let order = tree.topological_order().expect("valid tree");
    let keys: Vec<&str> = order.iter().map(|t| t.key.as_str()).collect();
    println!("\nResearch order: {}\n", keys.join(" -> "));

    // --- Play ---

    let mut research = Research::new();
    research.grant(tree, "pottery").expect("grant starting tech");

    for turn in 1..=20 {
        if research.current().is_none() {
            let Some(next) = research.available(tree).first().map(|t| t.key.clone()) else {
                println!("Turn {turn}: nothing left to research.");
                break;
            };
            research.start(tree, &next).expect("start research");
        }

        research
            .contribute_points(tree, SCIENCE_PER_TURN)
            .expect("contribute science");

        for event in research.drain_events() {
            match event {
                ResearchEvent::Started { tech } => println!("Turn {turn}: started {tech}"),
                ResearchEvent::Completed { tech, .. } => println!("Turn {turn}: completed {tech}"),
                ResearchEvent::AgeEntered { age } => println!("Turn {turn}: entered the {age} age"),
            }
        }
    }

    let age = research
        .current_age(tree)
        .map(|a| a.name.as_str())
        .unwrap_or("none");
    println!(
        "\n{} technologies completed; current age: {age}",
        research.completed().len()
    );
}
