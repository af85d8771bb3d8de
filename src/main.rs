//! Crossbar Match - demo binary.
//!
//! ```text
//! crossbar-match                       # scenario + trace over default algorithms
//! crossbar-match pim seed=7 iterations=2
//! ```
//!
//! Runs the two-slot 4x4 SLIP scenario, then a seeded random trace on an
//! 8x8 switch with two priority rings, printing each algorithm's match count
//! and trace digest. Set `RUST_LOG=crossbar_match=debug` for per-ring logs.

use std::error::Error;
use std::process::ExitCode;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use crossbar_match::registry::Fabric;
use crossbar_match::types::{Bitmap, MatchLog, RequestMatrix, SlotRequests, SwitchSpec};

const TRACE_ALGORITHMS: &[&str] = &["islip", "pim", "ilqf", "mwm", "mm", "mcast-distribute"];
const TRACE_PORTS: usize = 8;
const TRACE_RINGS: usize = 2;
const TRACE_SLOTS: u64 = 32;
const TRACE_SEED: u64 = 2024;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,crossbar_match=info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();

    println!("===========================================");
    println!("  Crossbar Match");
    println!("===========================================");
    println!();

    match run(&argv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(argv: &[&str]) -> Result<(), Box<dyn Error>> {
    scenario()?;
    println!();

    match argv.split_first() {
        Some((name, init_args)) => trace(name, init_args)?,
        None => {
            for name in TRACE_ALGORITHMS {
                trace(name, &[])?;
            }
        }
    }
    Ok(())
}

/// Inputs 0 and 1 want output 0, inputs 2 and 3 want output 1, two slots.
fn scenario() -> Result<(), Box<dyn Error>> {
    println!("4x4 islip, identical requests for two slots:");
    let requests = RequestMatrix::from_rows(&[
        vec![1, 0, 0, 0],
        vec![1, 0, 0, 0],
        vec![0, 1, 0, 0],
        vec![0, 1, 0, 0],
    ])?;
    let slot = SlotRequests::single(requests);

    let mut fabric = Fabric::with_capacity(1);
    let sw = fabric.attach(SwitchSpec::square(4)?, "islip", &[])?;
    for n in 1..=2 {
        let m = fabric.schedule(sw, &slot)?;
        println!("  slot {n}: {m}");
    }
    fabric.detach(sw)?;
    Ok(())
}

/// Random requests: each ring row gets a random output set with weights in
/// `1..=16`.
fn random_slot(rng: &mut ChaCha8Rng, spec: SwitchSpec) -> SlotRequests {
    let mut slot = SlotRequests::new(spec, TRACE_RINGS);
    for priority in 0..TRACE_RINGS {
        let ring = slot.ring_mut(priority);
        for input in 0..spec.inputs {
            let mut wanted = Bitmap::new();
            wanted.random_fill(rng, spec.outputs);
            // ring 0 is sparse
            if priority == 0 && rng.gen_bool(0.5) {
                wanted.reset();
            }
            for output in wanted.iter_ones() {
                ring.set(input, output, rng.gen_range(1..=16));
            }
        }
    }
    slot
}

fn trace(name: &str, init_args: &[&str]) -> Result<(), Box<dyn Error>> {
    let spec = SwitchSpec::square(TRACE_PORTS)?;
    let rings = format!("priorities={TRACE_RINGS}");
    let mut args = init_args.to_vec();
    if !args.iter().any(|a| a.starts_with("priorities=")) {
        args.push(&rings);
    }
    let mut fabric = Fabric::new();
    let sw = fabric.attach(spec, name, &args)?;

    let mut rng = ChaCha8Rng::seed_from_u64(TRACE_SEED);
    let mut log = MatchLog::new();
    let mut matched = 0;
    for slot in 0..TRACE_SLOTS {
        let requests = random_slot(&mut rng, spec);
        for (priority, ring) in requests.iter().filter(|(_, ring)| !ring.is_empty()) {
            let m = fabric.run(sw, slot, ring, priority)?;
            matched += m.len();
            log.record_matching(slot, priority, &m)?;
        }
    }

    println!(
        "{name:<18} slots={TRACE_SLOTS} pairs={matched:<4} digest={}",
        &log.root_hex()[..16]
    );
    fabric.detach(sw)?;
    Ok(())
}
