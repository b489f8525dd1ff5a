//! End-to-end "predict-correct" scenario: a client's locally predicted
//! position for a tick must match the authoritative position the server
//! later reports for that same tick, once the server has actually
//! consumed the Input the client tagged it with.

use std::time::Duration;

use client::Client;
use command::Buttons;
use level::{Edge, Level, Polygon};
use server::Server;
use sim_math::Vec3;
use transport::channel::channel_pair;

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
        spawn_points: vec![(Vec3::ZERO, 0)],
    }
}

#[test]
fn client_prediction_matches_the_authoritative_position_once_the_server_catches_up() {
    let mut server = Server::new(flat_level(), 32);
    let (server_side, client_side) = channel_pair(Duration::from_millis(20));
    let client_id = server.accept(Box::new(server_side));
    let mut client = Client::connect(Box::new(client_side), flat_level(), 32, "A");

    // Bootstrap: get Hello/Ping/Snapshot flowing and the client's
    // predicted clock seeded from the first authoritative tick.
    for _ in 0..4 {
        server.tick();
        client.tick();
    }

    // Arm a walking input for the client's next tick and remember the
    // clock it will be tagged with.
    client.submit_local_input(Buttons::WALK_FORWARD, Buttons::empty(), 0.0, 0.0);
    let tagged_clock = client.predicted_clock();
    client.tick();

    let predicted = client.snapshot();
    assert_eq!(predicted.tick, tagged_clock + 1);
    let entity_id = predicted.players[&client_id];
    let predicted_position = predicted.entities[&entity_id].position;
    assert!(predicted_position.y > 0.0, "the walking input should have moved the entity forward");

    // Drive both sides until the server actually produces tick
    // `tagged_clock + 1` off the back of that same Input.
    let mut authoritative_position = None;
    for _ in 0..64 {
        server.tick();
        client.tick();
        if server.current_snapshot().tick == tagged_clock + 1 {
            let snapshot = server.current_snapshot();
            let entity_id = snapshot.players[&client_id];
            authoritative_position = Some(snapshot.entities[&entity_id].position);
            break;
        }
    }

    let authoritative_position = authoritative_position.expect("server never reached the tagged tick");
    assert_eq!(authoritative_position, predicted_position);
}
