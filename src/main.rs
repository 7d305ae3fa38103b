use std::env;

use asm10::assembler;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <basename> [<basename> ...]", args[0]);
        return;
    }

    // Every base name is assembled independently; a failed file only
    // suppresses its own output files. Failures are reported on stderr
    // and the exit code stays 0 either way.
    for base in &args[1..] {
        assembler::assemble_base(base);
    }
}
