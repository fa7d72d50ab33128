//! An Intcode computer.
//!
//! Programs are flat lists of integers. Each [`Vm`] owns a private copy of
//! its program in growable [`Memory`], and talks to the outside world through
//! an input queue and an output queue. When it needs input that isn't there
//! it stops and says so ([`Status::AwaitingInput`]) instead of blocking, which
//! is what lets a [`Pipeline`] drive several engines in a loop from one
//! thread.

mod error;
pub use error::{Error, Result};
mod memory;
pub use memory::{DenseMemory, Memory, SparseMemory};
mod program;
pub use program::{format_program, parse_program};
mod vm;
pub use vm::{Instruction, Mode, Opcode, Parameter, Status, Vm};
pub mod pipeline;
pub use pipeline::{Pipeline, Wiring};

/// Every value the machine deals with: memory cells, registers, inputs and
/// outputs.
pub type Word = i64;

/// Run a fresh copy of `program` to completion with the given inputs, and
/// return everything it output.
///
/// Fails with [`Error::StageNotHalted`] if the program runs out of input
/// before it halts.
pub fn run_program(program: &[Word], inputs: &[Word]) -> Result<Vec<Word>> {
    let mut vm = Vm::new(program);
    for &input in inputs {
        vm.push_input(input);
    }
    match vm.run()? {
        Status::Halted => Ok(vm.drain_output()),
        status => Err(Error::StageNotHalted { stage: 0, status }),
    }
}
