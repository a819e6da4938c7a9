use std::fmt::Display;
use std::io::{self, Write};
use std::process;

pub fn print_usage() -> ! {
    println!("Usage: shell [-hvp]");
    println!("   -h   print this message");
    println!("   -v   print additional diagnostic information");
    println!("   -p   do not emit a command prompt");
    process::exit(1);
}

/// Reports an OS-level failure together with its error text and exits.
pub fn unix_error(msg: &str, err: impl Display) -> ! {
    println!("{}: {}", msg, err);
    let _ = io::stdout().flush();
    process::exit(1);
}

/// Reports an internal failure and exits.
pub fn app_error(msg: impl Display) -> ! {
    println!("{}", msg);
    let _ = io::stdout().flush();
    process::exit(1);
}
