mod opt;

use std::io::stdout;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};

#[derive(Debug, Parser)]
struct ShellSelect {
    /// Shell for which to generate completions
    #[clap(value_enum)]
    shell: Shell,
}

fn main() {
    let shell = ShellSelect::parse().shell;
    eprintln!("Generating {shell} completions");
    generate(shell, &mut crate::opt::Opt::command(), "jetuple", &mut stdout());
}
