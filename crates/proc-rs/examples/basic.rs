//! Basic process example

use proc_rs::{Proc, StreamDirective};

fn main() -> proc_rs::Result<()> {
    println!("=== proc-rs - Basic Example ===\n");

    // Arguments are passed verbatim, no shell involved
    println!("[1] Running 'echo hello world'...");
    let mut child = Proc::run(["echo", "hello", "world"])
        .output(StreamDirective::Capture)
        .spawn()?;

    println!("[*] Command: {}", child.command().join(" "));
    if let Some(pid) = child.pid() {
        println!("[*] Pid: {}", pid);
    }
    print!("[*] Output: {}", child.output_pipe()?.slurp()?);
    println!("[*] Exit code: {}\n", child.exit_code());

    // Shell mode hands the string to /bin/sh
    println!("[2] Running a shell command...");
    let mut child = Proc::shell("echo out; echo err >&2; exit 3")
        .capture_all()
        .spawn()?;

    let captured = child.collect()?;
    println!("[*] stdout: {:?}", captured.stdout_text()?);
    println!("[*] stderr: {:?}", captured.stderr_text()?);
    println!("Exit code: {}", captured.exit.exit_code);
    println!("Success: {}\n", captured.success());

    Ok(())
}
