//! Error Handling Example
//!
//! This example demonstrates the failure modes of spawned processes:
//! - Spawn errors (missing program, bad working directory)
//! - Unsuccessful exits raised when a handle is dropped
//! - Opting out by inspecting the result
//!
//! ## Running this example
//!
//! ```bash
//! cargo run --example error_handling
//! ```

use std::panic;

use proc_rs::{Proc, ProcError, SinkPolicy, unsuccessful_exit};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Process Error Handling Examples ===\n");

    println!("[Scenario 1] Spawn failures\n");
    scenario_spawn_failure();
    println!();

    println!("[Scenario 2] Unsuccessful exit on drop\n");
    scenario_dropped_failure();
    println!();

    println!("[Scenario 3] Taking responsibility for the outcome\n");
    scenario_inspected()?;
    println!();

    println!("=== All scenarios completed ===");
    Ok(())
}

fn scenario_spawn_failure() {
    match Proc::run(["no-such-program-here"]).spawn() {
        Err(ProcError::Spawn { command, source }) => {
            println!("  Could not start '{}': {}", command, source);
        }
        Err(e) => println!("  Unexpected error: {}", e),
        Ok(_) => println!("  Unexpectedly started"),
    }

    match Proc::run(["true"]).cwd("/no/such/dir").spawn() {
        Err(e) => println!("  Bad working directory: {}", e),
        Ok(_) => println!("  Unexpectedly started"),
    }
}

fn scenario_dropped_failure() {
    // silence the default panic message for this demo
    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));

    let outcome = panic::catch_unwind(|| {
        let _child = Proc::run(["false"]).spawn();
    });

    panic::set_hook(hook);

    match outcome {
        Err(payload) => match unsuccessful_exit(payload.as_ref()) {
            Some(err) => println!("  Raised at drop: {}", err),
            None => println!("  Some other panic"),
        },
        Ok(()) => println!("  Nothing raised"),
    }

    // With the Log policy the failure is only logged
    let _child = Proc::run(["false"]).sink_policy(SinkPolicy::Log).spawn();
    println!("  With SinkPolicy::Log the failure is logged instead");
}

fn scenario_inspected() -> proc_rs::Result<()> {
    let mut child = Proc::shell("exit 2").spawn()?;
    if !child.success()? {
        println!("  Exit code {} handled by the caller", child.exit_code());
    }

    let child = Proc::run(["false"]).spawn()?;
    if let Err(e) = child.sink() {
        println!("  sink() returned: {}", e);
    }
    Ok(())
}
