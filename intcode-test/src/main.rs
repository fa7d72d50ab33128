use intcode::{parse_program, Status, Vm, Word};
use log::*;

const BOOST: &str = include_str!("../../intcode/tests/programs/boost.txt");
/// Input that puts BOOST in test mode.
const TEST_MODE: Word = 1;

fn main() {
    env_logger::init();
    let program = match parse_program(BOOST) {
        Ok(program) => program,
        Err(e) => {
            error!("The bundled BOOST program doesn't even parse: {e}");
            std::process::exit(1);
        }
    };
    let mut vm = Vm::new(&program);
    vm.push_input(TEST_MODE);
    let mut steps: u64 = 0;
    loop {
        match vm.step() {
            Ok(Status::Halted) => break,
            Ok(Status::AwaitingInput) => {
                error!("BOOST asked for more input at {}. {vm:?}", vm.get_pc());
                std::process::exit(1);
            }
            Ok(Status::Ready | Status::AfterOutput) => steps += 1,
            Err(e) => {
                error!("Engine fault after {steps} steps: {e}. {vm:?}");
                std::process::exit(1);
            }
        }
    }
    let outputs = vm.drain_output();
    info!("BOOST halted after {steps} steps");
    match outputs.as_slice() {
        [keycode] => println!("All opcodes check out. BOOST keycode: {keycode}"),
        [broken @ .., _] => {
            // BOOST outputs the opcodes it thinks are malfunctioning first
            for opcode in broken {
                println!("Malfunctioning opcode: {opcode}");
            }
            std::process::exit(1);
        }
        _ => {
            println!("BOOST halted without saying anything?!");
            std::process::exit(1);
        }
    }
}
