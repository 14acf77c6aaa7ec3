use log::info;
use proc_rs::SystemCapabilities;

/// Print what this system supports; returns whether processes can be spawned
pub fn check_requirements() -> bool {
    info!("Checking process requirements");
    println!("Checking process requirements...\n");

    let caps = SystemCapabilities::detect();
    println!("{}", caps.summary());

    let pid = std::process::id();
    println!("\nSystem info:");
    println!("  PID: {}", pid);
    match std::env::current_dir() {
        Ok(cwd) => println!("  CWD: {}", cwd.display()),
        Err(e) => println!("  CWD: unavailable ({})", e),
    }

    caps.can_spawn()
}
