use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use clbmap::{parse_functions_in, Config, Evaluator, GenerationReport, Observer, Solver};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

#[derive(Parser)]
#[command(author, version, about = "Map Boolean functions onto an array of configurable logic blocks")]
struct Cli {
    /// Number of blocks and number of inputs per block
    #[arg(long, num_args = 2, value_names = ["CLBS", "INPUTS"], required = true)]
    fpga: Vec<usize>,

    /// Population size
    #[arg(short = 's', long, default_value_t = Config::DEFAULT_POP_SIZE)]
    pop_size: usize,

    /// Number of generations in each pass
    #[arg(short = 'g', long, default_value_t = Config::DEFAULT_GENERATIONS)]
    generations: usize,

    /// Number of mutated clones of each parent
    #[arg(short = 'M', long, default_value_t = Config::DEFAULT_MUTATIONS_PER_PARENT)]
    mutations: usize,

    /// Probability of each individual mutation
    #[arg(short = 'm', long, default_value_t = Config::DEFAULT_MUTATION_CHANCE)]
    mutation_chance: f64,

    /// Print a message for each generation
    #[arg(short = 'p', long)]
    print: bool,

    /// Print a message with its duration for each generation
    #[arg(short = 'P', long)]
    print_time: bool,

    /// Ask whether to continue at the end of each pass
    #[arg(short = 'i', long)]
    interactive: bool,

    /// Stop at the first solution without error
    #[arg(short = 'f', long)]
    first: bool,

    /// Seed of the random generator
    #[arg(long, value_name = "INT")]
    seed: Option<u64>,

    /// Number of worker threads
    #[arg(long, value_name = "INT")]
    threads: Option<usize>,

    /// Increase the log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Files with function definitions, read from standard input if missing
    files: Vec<PathBuf>,
}

struct ConsoleObserver {
    print_messages: bool,
    print_time: bool,
}

impl Observer for ConsoleObserver {
    fn on_generation(&mut self, report: &GenerationReport) {
        if !self.print_messages {
            return;
        }
        match self.print_time {
            true => println!("[{} ms] {}", report.elapsed.as_millis(), report),
            false => println!("{}", report),
        }
    }

    fn continue_iterating(&mut self) -> bool {
        print!("Continue iterating? (Y/n): ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line.trim().eq_ignore_ascii_case("y"),
            Err(_) => false,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => simplelog::LevelFilter::Warn,
        1 => simplelog::LevelFilter::Info,
        2 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let mut functions = vec![];
    if cli.files.is_empty() {
        let text = io::read_to_string(io::stdin()).wrap_err("Unable to read standard input")?;
        functions.extend(parse_functions_in(&text, "<stdin>")?);
    }
    for path in &cli.files {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Unable to read {}", path.display()))?;
        let parsed = parse_functions_in(&text, &path.display().to_string())
            .wrap_err_with(|| format!("Invalid definitions in {}", path.display()))?;
        functions.extend(parsed);
    }

    println!("Input functions:");
    for f in &functions {
        println!("{}", f);
    }
    println!();

    let evaluator = Evaluator::new(functions)?;
    let config = Config {
        pop_size: cli.pop_size,
        num_blocks: cli.fpga[0],
        inputs_per_block: cli.fpga[1],
        mutations_per_parent: cli.mutations,
        max_generations: cli.generations,
        mutation_chance: cli.mutation_chance,
        first_acceptable: cli.first,
        iterative: cli.interactive,
        threads: cli.threads,
        seed: cli.seed,
    };

    let mut observer = ConsoleObserver {
        print_messages: cli.print || cli.print_time,
        print_time: cli.print_time,
    };
    let mut solver = Solver::new(config, &evaluator)?;
    let best = solver.solve(&mut observer)?;

    println!();
    println!("Found solution in {}ms.", solver.total_time().as_millis());
    println!(
        "Solution - errors: {}, number of CLBs: {}",
        best.fitness().error,
        best.fitness().used_blocks
    );
    print!("{}", best.named(evaluator.variables(), evaluator.functions()));
    Ok(())
}
