use anyhow::{bail, Context};
use log::*;

use intcode::{
    format_program, parse_program, DenseMemory, Memory, Pipeline, SparseMemory, Status, Vm,
    Wiring, Word,
};

const USAGE: &str = "\
Usage: intcode-run [OPTIONS] path/to/program.txt [INPUT...]

Runs the program with the given inputs and prints everything it outputs.

Options:
    --chain PHASES   run one copy per phase (e.g. 4,3,2,1,0) in a line, feeding
                     INPUT (default 0) to the first, and print the last output
    --loop PHASES    like --chain, but the last copy feeds back into the first
    --sparse         keep memory in a map instead of a flat vector
    --entry ADDRESS  start executing at ADDRESS instead of 0
    --dump           print the final memory contents after a plain run";

#[derive(Default)]
struct Options {
    wiring: Option<(Wiring, Vec<Word>)>,
    sparse: bool,
    entry: Option<Word>,
    dump: bool,
    path: Option<String>,
    inputs: Vec<Word>,
}

fn parse_arguments(arguments: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut arguments = arguments.iter();
    while let Some(argument) = arguments.next() {
        match argument.as_str() {
            "--chain" | "--loop" => {
                let wiring = if argument == "--chain" {
                    Wiring::Linear
                } else {
                    Wiring::Feedback
                };
                let phases = arguments
                    .next()
                    .with_context(|| format!("{argument} needs a list of phases"))?;
                let phases = parse_program(phases)
                    .with_context(|| format!("bad phase list {phases:?}"))?;
                options.wiring = Some((wiring, phases));
            }
            "--sparse" => options.sparse = true,
            "--dump" => options.dump = true,
            "--entry" => {
                let address = arguments.next().context("--entry needs an address")?;
                options.entry = Some(
                    address
                        .parse()
                        .with_context(|| format!("bad entry address {address:?}"))?,
                );
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ if options.path.is_none() => options.path = Some(argument.clone()),
            input => options.inputs.push(
                input
                    .parse()
                    .with_context(|| format!("input {input:?} is not an integer"))?,
            ),
        }
    }
    Ok(options)
}

fn run_alone<M: Memory>(mut vm: Vm<M>, options: &Options) -> anyhow::Result<Vm<M>> {
    if let Some(entry) = options.entry {
        vm.set_pc(entry);
    }
    for &input in &options.inputs {
        vm.push_input(input);
    }
    loop {
        match vm.run_until_output()? {
            Status::AfterOutput => println!("{}", vm.consume_output()?),
            Status::Halted => break,
            Status::AwaitingInput => bail!("program wants more input than was given ({vm:?})"),
            Status::Ready => unreachable!("run_until_output never stops while ready"),
        }
    }
    info!("halted: {vm:?}");
    Ok(vm)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let our_arguments: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_arguments(&our_arguments)?;
    let Some(path) = &options.path else {
        error!("Please provide the path to a program file.");
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    info!("Attempting to open path: '{path}'");
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let program = parse_program(&text).with_context(|| format!("failed to parse {path}"))?;
    info!("loaded {} words", program.len());

    if let Some((wiring, phases)) = &options.wiring {
        if options.sparse || options.entry.is_some() || options.dump {
            warn!("--sparse, --entry and --dump only apply to a plain run; ignoring them");
        }
        let initial_input = match options.inputs.as_slice() {
            [] => 0,
            [input] => *input,
            _ => bail!("a pipeline takes a single initial input"),
        };
        let mut pipeline = Pipeline::with_phases(&program, phases);
        let result = pipeline.run(*wiring, initial_input)?;
        println!("{result}");
        return Ok(());
    }

    if options.sparse {
        let vm = Vm::with_memory(SparseMemory::from(&program[..]));
        let vm = run_alone(vm, &options)?;
        if options.dump {
            print!("{}", dump_cells(vm.get_memory().cells()));
        }
    } else {
        let vm = Vm::with_memory(DenseMemory::from(&program[..]));
        let vm = run_alone(vm, &options)?;
        if options.dump {
            println!("{}", format_program(vm.get_memory().as_slice()));
            print!("{}", dump_cells(vm.get_memory().far_cells()));
        }
    }
    Ok(())
}

/// One `address: value` line per cell.
fn dump_cells(cells: impl Iterator<Item = (usize, Word)>) -> String {
    cells
        .map(|(address, value)| format!("{address}: {value}\n"))
        .collect()
}
