//! CLI tool to generate a private keyset.
//!
//! Usage:
//!   takagi-keygen
//!
//! Prints a JSON keyset (one RSA signing key, one octet sealing key)
//! suitable for the TAKAGI_KEYSET environment variable.

use std::env;

use takagi::services::keys::KeySet;

fn main() {
    let args: Vec<String> = env::args().collect();

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", arg);
                print_usage();
                std::process::exit(1);
            }
        }
    }

    let keyset = match KeySet::generate() {
        Ok(keyset) => keyset,
        Err(e) => {
            eprintln!("Error generating keyset: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", keyset.to_json());
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: takagi-keygen");
    eprintln!();
    eprintln!("Prints a fresh private keyset as JSON. Store it in TAKAGI_KEYSET (or in a");
    eprintln!("file referenced by TAKAGI_KEYSET_FILE) to pin this instance's keys.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --help, -h        Show this help");
    eprintln!();
}
