/*
 * handle.rs - A process that shrugs off Ctrl-C
 *
 * usage: handle
 * Prints its pid, then "Still here" once a second. SIGINT prints
 * "Nice try." and is otherwise ignored; SIGUSR1 prints "exiting" and
 * exits with status 1. Pair it with `mykill <pid>`.
 */

use signal_hook::{consts::signal::*, iterator::Signals};
use std::io::{self, Write};
use std::process;
use std::thread;
use std::time::Duration;

fn main() {
    let mut signals = Signals::new([SIGINT, SIGUSR1]).unwrap_or_else(|err| {
        eprintln!("signal error: {}", err);
        process::exit(1);
    });
    thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGINT => println!("Nice try."),
                SIGUSR1 => {
                    println!("exiting");
                    let _ = io::stdout().flush();
                    process::exit(1);
                }
                _ => unreachable!(),
            }
        }
    });

    println!("{}", process::id());
    let _ = io::stdout().flush();

    loop {
        thread::sleep(Duration::from_secs(1));
        println!("Still here");
        let _ = io::stdout().flush();
    }
}
