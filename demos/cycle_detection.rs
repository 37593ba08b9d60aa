//! Cycle detection example: modifiers that would loop are refused
//!
//! This example shows:
//! - What happens when a modifier would close a dependency loop
//! - How to inspect the observer graph afterwards

use statgraph::modifier::BasicModifier;
use statgraph::*;

fn main() {
    let mut world = StatsWorld::<BasicModifier>::new();
    let owner = world.create_owner();
    let a = world.create_stat(owner, 10.0, false).unwrap();
    let b = world.create_stat(owner, 20.0, false).unwrap();
    let c = world.create_stat(owner, 30.0, false).unwrap();

    println!("=== Setting up dependencies ===\n");

    world
        .add_stat_modifier(a, BasicModifier::AddFromStat { stat: b, factor: 1.0 })
        .unwrap();
    println!("A: 10 (base) + B * 1.0");
    world
        .add_stat_modifier(b, BasicModifier::AddFromStat { stat: c, factor: 1.0 })
        .unwrap();
    println!("B: 20 (base) + C * 1.0");

    println!("\n=== Attempting C: 30 (base) + A * 1.0 ===\n");

    match world.add_stat_modifier(c, BasicModifier::AddFromStat { stat: a, factor: 1.0 }) {
        Err(rejection @ ModifierRejected::WouldCreateCycle { .. }) => {
            println!("✓ Cycle refused: {}", rejection);
        }
        Err(e) => println!("✗ Unexpected rejection: {}", e),
        Ok(_) => println!("✗ Cycle was not detected"),
    }

    println!("\n=== Propagation order ===\n");
    let graph = world.observer_graph();
    match graph.propagation_order() {
        Ok(order) => {
            let names: Vec<String> = order.iter().map(ToString::to_string).collect();
            println!("{}", names.join(" -> "));
        }
        Err(cycle) => println!("graph unexpectedly cyclic: {:?}", cycle),
    }
    println!("\nA = {:.1}", world.stat_value(a).unwrap());
}
