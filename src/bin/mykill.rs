/*
 * mykill.rs - Send SIGUSR1 to a process
 *
 * usage: mykill <pid>
 */

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::env;
use std::process;

fn main() {
    let Some(arg) = env::args().nth(1) else {
        println!("No process ID specified.");
        process::exit(1);
    };

    let pid = arg.parse::<i32>().unwrap_or_else(|_| {
        eprintln!("Error: <pid> must be an integer");
        process::exit(1);
    });

    if let Err(err) = signal::kill(Pid::from_raw(pid), Signal::SIGUSR1) {
        eprintln!("kill (usr1) error: {}", err);
        process::exit(1);
    }
}
