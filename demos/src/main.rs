//! Trust-Region BBO Demos
//!
//! # Minimize a benchmark
//!
//! ```bash
//! # First-order surrogate on 10-d Rosenbrock (the defaults)
//! cargo run --release -- minimize first_order
//!
//! # Value surrogate on 5-d Rastrigin, seed 3, 50k evaluations
//! cargo run --release -- minimize value rastrigin 5 3 50000
//! ```
//!
//! # Resume a run
//!
//! ```bash
//! cargo run --release -- resume first_order rosenbrock 10
//! ```
//!
//! Outputs go to `runs/<method>_<function>_<dim>d_s<seed>/`.

mod common;
mod minimize;
mod resume;

use common::RunOptions;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage();
        return;
    }

    let opts = match RunOptions::from_args(&args[2..]) {
        Ok(opts) => opts,
        Err(e) => {
            println!("Invalid arguments: {}", e);
            println!();
            print_usage();
            return;
        }
    };

    let result = match args[1].as_str() {
        "minimize" => minimize::run(&opts),
        "resume" => resume::run(&opts),
        other => {
            println!("Unknown command: {}", other);
            println!();
            print_usage();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: cargo run --release -- <command> <method> [function] [dim] [seed] [budget]");
    println!();
    println!("=============================================================================");
    println!("                                 COMMANDS");
    println!("=============================================================================");
    println!();
    println!("  minimize        Run from scratch until solved or out of budget");
    println!("  resume          Continue from the latest checkpoint of a previous run");
    println!();
    println!("=============================================================================");
    println!("                            SURROGATE METHODS");
    println!("=============================================================================");
    println!();
    println!("  value           Regress the objective, step along its input gradient");
    println!("  first_order     Learn the gradient field from reward differences");
    println!("  second_order    First order with a curvature correction");
    println!("  anchor          Learned gradient fitted against a learned value");
    println!();
    println!("=============================================================================");
    println!("                                FUNCTIONS");
    println!("=============================================================================");
    println!();
    println!("  sphere | ellipsoid | rosenbrock | rastrigin | constant");
    println!("  Defaults: rosenbrock, dim 10, seed 0, budget 150000");
    println!();
}
