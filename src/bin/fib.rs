/*
 * fib.rs - Recursive Fibonacci, one process per call
 *
 * usage: fib <n>
 * Computes fib(n) for 0 <= n <= 13. Every recursive call runs in its own
 * forked child, which hands its result back to the parent as its exit
 * status. Only the top-level process prints.
 */

use nix::sys::wait::{wait, WaitStatus};
use nix::unistd::{fork, ForkResult};
use std::env;
use std::process;

/// Largest n whose result still fits in an exit status.
const MAX: i32 = 13;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: fib <num>");
        process::exit(-1);
    }

    let n = match args[1].parse::<i32>() {
        Ok(n) if (0..=MAX).contains(&n) => n,
        _ => {
            eprintln!("number must be between 0 and {}", MAX);
            process::exit(-1);
        }
    };

    do_fib(n, true);
}

/// Never returns: every process, the top-level one included, exits with
/// its result.
fn do_fib(n: i32, do_print: bool) -> ! {
    if n == 0 || n == 1 {
        finish(n, do_print);
    }

    spawn_fib(n - 1);
    spawn_fib(n - 2);

    let mut sum = 0;
    loop {
        match wait() {
            Ok(WaitStatus::Exited(_, code)) => sum += code,
            Ok(_) => fail("Child did not exit successfully."),
            Err(_) => break,
        }
    }
    finish(sum, do_print);
}

/// Forks a child that computes fib(n) and exits with it.
fn spawn_fib(n: i32) {
    match unsafe { fork() } {
        Ok(ForkResult::Child) => do_fib(n, false),
        Ok(ForkResult::Parent { .. }) => {}
        Err(err) => {
            println!("Did not successfully fork.: {}", err);
            process::exit(1);
        }
    }
}

fn finish(n: i32, do_print: bool) -> ! {
    if do_print {
        println!("{}", n);
    }
    process::exit(n);
}

fn fail(msg: &str) -> ! {
    println!("{}", msg);
    process::exit(1);
}
