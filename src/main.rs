use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::process;

use clap::{value_t, App, Arg, ArgMatches};
use log::info;
use prettytable::{cell, row, Table};
use separator::Separatable;

use sokoban_search::config::{HeuristicKind, Method};
use sokoban_search::solution::FrameWriter;
use sokoban_search::solver::{self, Solver, DEFAULT_MAX_ITERS};
use sokoban_search::{Level, LoadLevel, PuzzleState, Recovery, Solution};

fn main() {
    env_logger::init();

    let default_iters = DEFAULT_MAX_ITERS.to_string();
    let matches = App::new("sokoban-search")
        .author("martin-t")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::with_name("method")
                .short("m")
                .long("method")
                .takes_value(true)
                .default_value("beam")
                .help("beam, lrta-backoff or lrta-restart"),
        )
        .arg(
            Arg::with_name("heuristic")
                .long("heuristic")
                .takes_value(true)
                .default_value("min-cost")
                .help("min-cost, reachable, player-boxes, manhattan or unplaced"),
        )
        .arg(
            Arg::with_name("iters")
                .short("i")
                .long("iters")
                .takes_value(true)
                .default_value(&default_iters)
                .help("max iterations of one search"),
        )
        .arg(
            Arg::with_name("width")
                .short("w")
                .long("width")
                .takes_value(true)
                .default_value("20")
                .help("beam width"),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::with_name("runs")
                .short("r")
                .long("runs")
                .takes_value(true)
                .default_value("1")
                .help("solve repeatedly with consecutive seeds and print averages"),
        )
        .arg(
            Arg::with_name("no-pulls")
                .long("no-pulls")
                .help("only steps and pushes"),
        )
        .arg(
            Arg::with_name("save")
                .long("save")
                .takes_value(true)
                .value_name("FILE")
                .help("write the states of the first run into a file"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("don't print the table and the final state"),
        )
        .arg(Arg::with_name("file").required(true))
        .get_matches();

    if let Err(err) = run(&matches) {
        println!("{}", err);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches<'_>) -> Result<(), Box<dyn Error>> {
    let method: Method = matches.value_of("method").unwrap().parse()?;
    let heuristic: HeuristicKind = matches.value_of("heuristic").unwrap().parse()?;
    let iters = value_t!(matches, "iters", usize)?;
    let width = value_t!(matches, "width", usize)?;
    let seed = value_t!(matches, "seed", u64)?;
    let runs = value_t!(matches, "runs", u64)?;
    let quiet = matches.is_present("quiet");

    let path = matches.value_of("file").unwrap();
    let level = path.load_level().map_err(|err| {
        let current_dir = env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        format!("Can't load level {} in {}: {}", path, current_dir, err)
    })?;

    let expand: fn(&Level) -> Vec<Level> = if matches.is_present("no-pulls") {
        solver::no_pulls
    } else {
        solver::all_moves
    };
    let base = Solver::new(heuristic.function(), expand, iters)?;

    info!("Solving {} with {} and {}", path, method, heuristic);
    let mut solutions = Vec::new();
    for run_seed in seed..seed + runs {
        let mut search = solver::searcher(method, base.clone(), width, run_seed)?;
        let solution = search.solve(&level);
        println!("{}", solution);
        solutions.push(solution);
    }

    if !quiet {
        results_table(&solutions).printstd();
        if let Some(last) = solutions.last().and_then(|s| s.steps.last()) {
            println!("{}", last);
        }
    }
    if runs > 1 {
        println!("{}", Solution::average(&solutions));
    }

    if let (Some(file), Some(first)) = (matches.value_of("save"), solutions.first()) {
        let mut sink = FrameWriter::new(BufWriter::new(File::create(file)?));
        first.export(&mut sink)?;
        info!("Saved {} states to {}", first.length(), file);
    }

    Ok(())
}

fn results_table<S: PuzzleState>(solutions: &[Solution<S>]) -> Table {
    let mut table = Table::new();
    table.set_titles(row![
        "run", "solved", "steps", "explored", "time", "pulls", "recovery"
    ]);
    for (i, s) in solutions.iter().enumerate() {
        let recovery = match s.recovery {
            Recovery::None => String::new(),
            Recovery::Backoffs(n) => format!("{} backoffs", n),
            Recovery::Restarts(n) => format!("{} restarts", n),
        };
        table.add_row(row![
            i,
            s.is_solved(),
            s.length(),
            (s.explored_states as u64).separated_string(),
            format!("{:.3}s", s.time.as_secs_f64()),
            s.pull_moves,
            recovery
        ]);
    }
    table
}
