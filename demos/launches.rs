//! Launch payload example.
//!
//! Validates a realistic GraphQL-style API response (past rocket launches)
//! with the interpreter and with the compiled routine, then checks a batch
//! of payloads in parallel and converts one into typed structs.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cito-demos --example launches --release
//! ```

use std::time::Instant;

use cito_core::{CitoError, Validator, array, nullable, number, object, string};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

const ROUNDS: usize = 10_000;

#[derive(Debug, Deserialize)]
struct Response {
    data: Data,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    launches_past: Vec<Launch>,
}

#[derive(Debug, Deserialize)]
struct Launch {
    mission_name: String,
    launch_date_local: String,
    rocket: Rocket,
}

#[derive(Debug, Deserialize)]
struct Rocket {
    rocket_name: String,
}

fn launches_schema() -> Result<Validator, CitoError> {
    let core = object([
        ("flight", number()),
        (
            "core",
            object([("reuse_count", number()), ("status", nullable(string()))])?,
        ),
    ])?;
    let payload = object([
        ("payload_type", string()),
        ("payload_mass_kg", nullable(number())),
        ("payload_mass_lbs", nullable(number())),
    ])?;
    let rocket = object([
        ("rocket_name", string()),
        ("first_stage", object([("cores", array(core))])?),
        ("second_stage", object([("payloads", array(payload))])?),
    ])?;
    let ship = object([("name", string()), ("home_port", string()), ("image", string())])?;
    let launch = object([
        ("mission_name", string()),
        ("launch_date_local", string()),
        ("launch_site", object([("site_name_long", string())])?),
        (
            "links",
            object([("article_link", nullable(string())), ("video_link", string())])?,
        ),
        ("rocket", rocket),
        ("ships", array(ship)),
    ])?;
    Ok(object([(
        "data",
        object([("launchesPast", array(launch))])?,
    )])?)
}

fn sample_launch(i: usize) -> Value {
    json!({
        "mission_name": format!("Mission {i}"),
        "launch_date_local": "2020-12-06T11:17:00-05:00",
        "launch_site": {"site_name_long": "Kennedy Space Center Historic Launch Complex 39A"},
        "links": {
            "article_link": null,
            "video_link": "https://youtu.be/example"
        },
        "rocket": {
            "rocket_name": "Falcon 9",
            "first_stage": {
                "cores": [{"flight": 1 + i % 5, "core": {"reuse_count": i % 4, "status": null}}]
            },
            "second_stage": {
                "payloads": [{
                    "payload_type": "Dragon 2.0",
                    "payload_mass_kg": 2972,
                    "payload_mass_lbs": 6552
                }]
            }
        },
        "ships": [
            {"name": "Ben", "home_port": "Port Canaveral", "image": "https://i.imgur.com/example.jpg"}
        ]
    })
}

fn payload(launches: usize) -> Value {
    json!({"data": {"launchesPast": (0..launches).map(sample_launch).collect::<Vec<_>>()}})
}

fn main() -> Result<(), CitoError> {
    let schema = launches_schema()?;
    let data = payload(10);

    let start = Instant::now();
    let compiled = schema.compile()?;
    println!("Compiled in {:.2?} ({} chars of routine source)", start.elapsed(), compiled.source().len());

    let start = Instant::now();
    let interpreted_ok = (0..ROUNDS).all(|_| schema.check(&data));
    println!("Interpreted: {ROUNDS} checks in {:.2?} (all ok: {interpreted_ok})", start.elapsed());

    let start = Instant::now();
    let compiled_ok = (0..ROUNDS).all(|_| compiled.check(&data));
    println!("Compiled:    {ROUNDS} checks in {:.2?} (all ok: {compiled_ok})", start.elapsed());
    println!();

    // Corrupt every seventh payload and validate the batch across threads.
    let batch: Vec<Value> = (0..256usize)
        .map(|i| {
            let mut value = payload(3);
            if i % 7 == 0 {
                value["data"]["launchesPast"][i % 3]["rocket"]["second_stage"]["payloads"][0]
                    ["payload_mass_kg"] = json!("heavy");
            }
            value
        })
        .collect();
    let start = Instant::now();
    let rejected: Vec<(usize, String)> = batch
        .par_iter()
        .enumerate()
        .filter_map(|(i, value)| compiled.assert(value).err().map(|e| (i, e.to_string())))
        .collect();
    println!(
        "Parallel batch: {} payloads, {} rejected in {:.2?}",
        batch.len(),
        rejected.len(),
        start.elapsed()
    );
    for (i, message) in rejected.iter().take(3) {
        println!("  #{i}: {message}");
    }
    println!();

    let response: Response = compiled.construct(payload(2))?;
    for launch in &response.data.launches_past {
        println!(
            "{} on {} ({})",
            launch.mission_name, launch.launch_date_local, launch.rocket.rocket_name
        );
    }

    Ok(())
}
