use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser as _;

use palaver::*;

#[derive(clap::Parser)]
#[command(name = "palaver-run")]
#[command(about = "Play a dialogue script in the terminal")]
struct Args {
    /// Path to the dialogue script
    script: PathBuf,

    /// Node to start from instead of the first one in the script
    #[arg(long)]
    start: Option<String>,

    /// CSV file of `kind,literal` command overrides
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Print the compiled node names and exit
    #[arg(long)]
    list_nodes: bool,
}

struct Console;

impl DialogueReader for Console {
    fn read_line(&mut self, line: &DialogueLine) -> bool {
        if line.speaker.is_empty() {
            println!("{}", line.text);
        } else {
            println!("{}: {}", line.speaker, line.text);
        }
        true
    }

    fn read_options(&mut self, options: &OptionLine) -> Option<String> {
        let enabled: Vec<_> = options.enabled_options().collect();
        if enabled.is_empty() {
            println!("== No options left ==");
            return None;
        }

        println!("== Choose option ==");
        for (number, (_, option)) in enabled.iter().enumerate() {
            println!("{}: {}", number + 1, option.text);
        }

        loop {
            print!("> ");
            io::stdout().flush().ok()?;

            let mut selection = String::new();
            if io::stdin().read_line(&mut selection).ok()? == 0 {
                return None;
            }
            match selection.trim().parse::<usize>() {
                Ok(number) if (1..=enabled.len()).contains(&number) => {
                    return Some(enabled[number - 1].1.target.clone());
                }
                _ => println!("Pick a number from 1 to {}", enabled.len()),
            }
        }
    }

    fn read_end(&mut self) {
        println!("== Dialogue complete ==");
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let table = match &args.commands {
        Some(path) => CommandTable::from_overrides_path(path)?,
        None => CommandTable::default(),
    };

    let source = fs::read_to_string(&args.script)?;
    let graph = Parser::new(&table).parse(&source)?;

    if args.list_nodes {
        for name in graph.node_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let functions: Vec<String> = graph
        .function_names()
        .into_iter()
        .map(str::to_owned)
        .collect();

    let mut sequence = Sequence::new(graph);
    for name in functions {
        let label = name.clone();
        sequence.register_function(
            &name,
            FunctionInfo::new(Arity::Variadic, move |params: &[String]| {
                println!("== {}({}) ==", label, params.join(", "));
            }),
        )?;
    }

    if let Some(start) = &args.start {
        sequence.set_current_node(start, 0)?;
    }

    match sequence.run_with(&mut Console)? {
        ExecutionState::Ended => Ok(()),
        state => Err(format!("Dialogue stopped early ({:?})", state).into()),
    }
}

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
