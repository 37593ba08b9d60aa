//! RPG example: a hero whose stats feed each other
//!
//! This example shows:
//! - Flat and percentage modifiers applied in order
//! - Stats that read other stats, on the same owner and across owners
//! - Change events produced by a single base value change

use statgraph::modifier::BasicModifier;
use statgraph::*;

fn main() {
    let mut world = StatsWorld::<BasicModifier>::new();
    let hero = world.create_owner();
    let banner = world.create_owner();

    let strength = world.create_stat(hero, 12.0, true).unwrap();
    let health = world.create_stat(hero, 100.0, true).unwrap();
    let armor = world.create_stat(hero, 0.0, true).unwrap();
    let attack = world.create_stat(hero, 20.0, true).unwrap();
    let rally = world.create_stat(banner, 1.25, false).unwrap();

    println!("=== Building the hero ===\n");

    // Health: (100 + strength * 5) * 1.1
    world
        .add_stat_modifier(health, BasicModifier::AddFromStat { stat: strength, factor: 5.0 })
        .unwrap();
    world.add_stat_modifier(health, BasicModifier::Multiply(1.1)).unwrap();

    // Armor is a tenth of health, capped.
    world
        .add_stat_modifier(armor, BasicModifier::SetFromStat { stat: health, factor: 0.1 })
        .unwrap();
    world
        .add_stat_modifier(armor, BasicModifier::Clamp { min: None, max: Some(25.0) })
        .unwrap();

    // Attack scales with strength and the banner carried nearby.
    world
        .add_stat_modifier(attack, BasicModifier::AddFromStat { stat: strength, factor: 2.0 })
        .unwrap();
    world
        .add_stat_modifier(attack, BasicModifier::MultiplyFromStat { stat: rally, factor: 1.0 })
        .unwrap();

    for (name, stat) in [("STR", strength), ("HP", health), ("ARM", armor), ("ATK", attack)] {
        println!("{:>4}: {:.2}", name, world.stat_value(stat).unwrap());
    }

    println!("\n=== Level up: STR 12 -> 18 ===\n");
    world.take_change_events();
    world.try_set_stat_base_value(strength, 18.0);
    for event in world.take_change_events() {
        println!(
            "{}: {:.2} -> {:.2} ({:+.2})",
            event.stat,
            event.previous.value(),
            event.current.value(),
            event.delta()
        );
    }

    println!("\n=== Banner destroyed ===\n");
    world.destroy_owner(banner);
    println!(" ATK: {:.2}", world.stat_value(attack).unwrap());
}
