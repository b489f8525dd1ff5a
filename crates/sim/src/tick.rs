use std::sync::Arc;

use command::{Buttons, Command, Input, PlayerAction};
use level::Level;
use sim_math::Vec3;

use crate::entity::{Entity, EntityConfig};
use crate::snapshot::Snapshot;

const WALK_SPEED: f64 = 4.0;
const JUMP_SPEED: f64 = 5.0;
const GRAVITY: f64 = -18.0;
const GROUND_EPSILON: f64 = 1e-9;

/// The deterministic tick (§4.C). Pure: given the same `prev`, `commands`,
/// `level` and `period_ms`, `next` is byte-identical across machines and
/// runs. The only randomness permitted is seeded from `prev.tick` alone;
/// nothing here currently needs it, but new-entity placement below is
/// wired through the seed so future additions (e.g. picking among several
/// spawn points) stay deterministic.
pub fn tick(next: &mut Snapshot, prev: &Snapshot, commands: &[Command], level: &Level, period_ms: u64) {
    *next = prev.clone();
    next.tick += 1;

    let mut rng = sim_math::Rng::new(prev.tick);

    // Step 2: Player(add).
    for command in commands {
        if let Command::Player { client_id, action: PlayerAction::Add } = command {
            let id = next.next_free_entity_id();
            let seed = rng.random_float().to_bits();
            let (pos, polygon_index) = level.spawn_point(seed);
            let entity = Entity::spawn(id, Arc::new(EntityConfig::default()), pos, polygon_index);
            next.entities.insert(id, entity);
            next.players.insert(*client_id, id);
        }
    }

    // Step 3: Player(remove). A remove for a client whose Input also
    // arrives this tick wins (§4.C edge case) because it runs first.
    for command in commands {
        if let Command::Player { client_id, action: PlayerAction::Remove } = command {
            if let Some(entity_id) = next.players.remove(client_id) {
                next.entities.remove(&entity_id);
            }
        }
    }

    // Step 4: apply inputs, translating them into intended motion.
    for command in commands {
        if let Command::Input { client_id, input, .. } = command {
            let Some(entity_id) = next.players.get(client_id).copied() else {
                // Stale input for an unknown (or just-removed) client: drop silently.
                continue;
            };
            let Some(entity) = next.entities.get_mut(&entity_id) else {
                continue;
            };
            apply_input(entity, input);
        }
    }

    // Step 5: integrate kinematics for all entities (semi-implicit Euler).
    let dt = period_ms as f64 / 1000.0;
    for entity in next.entities.values_mut() {
        integrate(entity, dt);
    }

    // Step 6: resolve world collisions against the level.
    for entity in next.entities.values_mut() {
        let (resolved_pos, resolved_polygon) = level.resolve(entity.position, entity.polygon_index);
        let floor_contact = level
            .polygon(resolved_polygon)
            .map(|p| (resolved_pos.z - p.floor_height).abs() < GROUND_EPSILON)
            .unwrap_or(false);
        entity.position = resolved_pos;
        entity.polygon_index = resolved_polygon;
        entity.on_ground = floor_contact;
        if floor_contact && entity.velocity.z <= 0.0 {
            entity.velocity.z = 0.0;
        }
    }
}

fn apply_input(entity: &mut Entity, input: &Input) {
    entity.buttons_held = input.update_buttons(entity.buttons_held);
    entity.orientation = entity.orientation.apply_look_delta(input.yaw_delta, input.pitch_delta);
}

fn integrate(entity: &mut Entity, dt: f64) {
    let (yaw, _) = entity.orientation.to_yaw_pitch();
    let forward = Vec3::new(-yaw.sin(), yaw.cos(), 0.0);
    let right = Vec3::new(yaw.cos(), yaw.sin(), 0.0);

    let mut move_dir = Vec3::ZERO;
    if entity.buttons_held.contains(Buttons::WALK_FORWARD) {
        move_dir += forward;
    }
    if entity.buttons_held.contains(Buttons::WALK_BACKWARD) {
        move_dir += -forward;
    }
    if entity.buttons_held.contains(Buttons::STRAFE_RIGHT) {
        move_dir += right;
    }
    if entity.buttons_held.contains(Buttons::STRAFE_LEFT) {
        move_dir += -right;
    }
    let move_dir = move_dir.normalize();

    entity.velocity.x = move_dir.x * WALK_SPEED;
    entity.velocity.y = move_dir.y * WALK_SPEED;

    if entity.config.ground_constrained {
        if entity.on_ground && entity.buttons_held.contains(Buttons::JUMP) {
            entity.velocity.z = JUMP_SPEED;
        } else if !entity.on_ground {
            entity.velocity.z += GRAVITY * dt;
        }
    }

    // semi-implicit Euler: velocity was updated above, position uses it now.
    entity.position += entity.velocity * dt;
}

#[cfg(test)]
mod test {
    use super::*;
    use command::PlayerAction;
    use level::{Edge, Polygon};

    fn flat_level() -> Level {
        Level {
            polygons: vec![Polygon {
                floor_height: 0.0,
                ceiling_height: 4.0,
                edges: vec![
                    Edge { a: (-50.0, -50.0), b: (50.0, -50.0), back_polygon: None },
                    Edge { a: (50.0, -50.0), b: (50.0, 50.0), back_polygon: None },
                    Edge { a: (50.0, 50.0), b: (-50.0, 50.0), back_polygon: None },
                    Edge { a: (-50.0, 50.0), b: (-50.0, -50.0), back_polygon: None },
                ],
            }],
            spawn_points: vec![(Vec3::new(0.0, 0.0, 0.0), 0)],
        }
    }

    #[test]
    fn join_creates_entity_at_spawn() {
        let level = flat_level();
        let prev = Snapshot::empty();
        let mut next = Snapshot::empty();
        let commands = vec![Command::Player { client_id: 1, action: PlayerAction::Add }];
        tick(&mut next, &prev, &commands, &level, 32);
        assert_eq!(next.tick, 1);
        assert_eq!(next.players.get(&1), Some(&0));
        assert!(next.entities.contains_key(&0));
        assert!(next.no_dangling_players());
    }

    #[test]
    fn remove_wins_over_same_tick_input() {
        let level = flat_level();
        let mut prev = Snapshot::empty();
        let commands = vec![Command::Player { client_id: 1, action: PlayerAction::Add }];
        let mut next = Snapshot::empty();
        tick(&mut next, &prev, &commands, &level, 32);
        prev = next;

        let commands = vec![
            Command::Player { client_id: 1, action: PlayerAction::Remove },
            Command::Input { client_id: 1, clock: prev.tick, input: Input::default() },
        ];
        tick(&mut next, &prev, &commands, &level, 32);
        assert!(!next.players.contains_key(&1));
        assert!(next.entities.is_empty());
    }

    #[test]
    fn stale_input_for_unknown_client_is_dropped() {
        let level = flat_level();
        let prev = Snapshot::empty();
        let mut next = Snapshot::empty();
        let commands = vec![Command::Input { client_id: 99, clock: 0, input: Input::default() }];
        tick(&mut next, &prev, &commands, &level, 32);
        assert!(next.entities.is_empty());
    }

    #[test]
    fn walking_forward_moves_entity() {
        let level = flat_level();
        let mut prev = Snapshot::empty();
        let mut next = Snapshot::empty();
        tick(&mut next, &prev, &[Command::Player { client_id: 1, action: PlayerAction::Add }], &level, 32);
        prev = next.clone();

        let mut input = Input::default();
        input.set_pressed(Buttons::WALK_FORWARD);
        let commands = vec![Command::Input { client_id: 1, clock: prev.tick, input }];
        tick(&mut next, &prev, &commands, &level, 32);

        let id = next.players[&1];
        assert!(next.entities[&id].position.y > 0.0);
    }

    #[test]
    fn determinism_same_inputs_same_output() {
        let level = flat_level();
        let prev = Snapshot::empty();
        let commands = vec![Command::Player { client_id: 1, action: PlayerAction::Add }];
        let mut a = Snapshot::empty();
        let mut b = Snapshot::empty();
        tick(&mut a, &prev, &commands, &level, 32);
        tick(&mut b, &prev, &commands, &level, 32);
        assert_eq!(a, b);
    }
}
