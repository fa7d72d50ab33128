use std::{
    collections::VecDeque,
    fmt::{Debug, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::{parse_program, DenseMemory, Error, Memory, Result, Word};

mod addressing_modes;
pub use addressing_modes::*;

/// Where an engine stands after its most recent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing is stopping the next instruction from running.
    Ready,
    /// Executed a halt. Nothing more will ever happen.
    Halted,
    /// Tried to read input, but the input queue was empty. The program counter
    /// still points at the input instruction, so it will be retried.
    AwaitingInput,
    /// Just appended a value to the output queue.
    AfterOutput,
}

/// An Intcode computer: memory, two registers, and a queue at each end.
#[derive(Clone)]
pub struct Vm<M: Memory = DenseMemory> {
    memory: M,
    /// The program counter.
    pc: Word,
    /// Added to the parameter of every relative-mode access.
    relative_base: Word,
    status: Status,
    input: VecDeque<Word>,
    output: VecDeque<Word>,
}

impl<M: Memory> Debug for Vm<M> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "PC:{pc} RB:{rb} IN:{input:?} OUT:{output:?} {status:?}",
            pc = self.pc,
            rb = self.relative_base,
            input = self.input,
            output = self.output,
            status = self.status,
        )
    }
}

impl Vm<DenseMemory> {
    /// Load a copy of `program` into fresh memory, ready to run from address 0.
    pub fn new(program: &[Word]) -> Vm {
        Vm::with_memory(DenseMemory::from(program))
    }

    pub fn from_text(text: &str) -> Result<Vm> {
        Ok(Vm::new(&parse_program(text)?))
    }
}

impl FromStr for Vm<DenseMemory> {
    type Err = Error;
    fn from_str(text: &str) -> Result<Self> {
        Vm::from_text(text)
    }
}

impl<M: Memory> Vm<M> {
    /// Run whatever is already in `memory`, starting from address 0.
    pub fn with_memory(memory: M) -> Vm<M> {
        Vm {
            memory,
            pc: 0,
            relative_base: 0,
            status: Status::Ready,
            input: VecDeque::new(),
            output: VecDeque::new(),
        }
    }

    pub fn push_input(&mut self, value: Word) {
        self.input.push_back(value);
        if self.status == Status::AwaitingInput {
            log::debug!("input {value} arrived, resuming at {}", self.pc);
            self.status = Status::Ready;
        }
    }

    /// Oldest value in the output queue.
    pub fn consume_output(&mut self) -> Result<Word> {
        self.output.pop_front().ok_or(Error::EmptyOutput)
    }
    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }
    /// Everything in the output queue, oldest first.
    pub fn drain_output(&mut self) -> Vec<Word> {
        self.output.drain(..).collect()
    }

    /// Keep stepping until the program halts or needs input that isn't there.
    /// Producing output doesn't stop it.
    ///
    /// Calling this on a halted engine is fine; it just reports
    /// [`Status::Halted`] again.
    pub fn run(&mut self) -> Result<Status> {
        while self.status != Status::Halted {
            if self.step()? == Status::AwaitingInput {
                break;
            }
        }
        Ok(self.status)
    }

    /// Keep stepping until exactly one value has been output, or the program
    /// halts or needs input that isn't there.
    pub fn run_until_output(&mut self) -> Result<Status> {
        while self.status != Status::Halted {
            match self.step()? {
                Status::AfterOutput | Status::AwaitingInput => break,
                Status::Ready | Status::Halted => (),
            }
        }
        Ok(self.status)
    }

    /// Execute one instruction.
    ///
    /// Stepping a halted engine is an error ([`Error::HaltedEngine`]). Any
    /// other error leaves memory, registers and queues exactly as they were
    /// before the call.
    pub fn step(&mut self) -> Result<Status> {
        if self.status == Status::Halted {
            return Err(Error::HaltedEngine { pc: self.pc });
        }
        let instruction = Instruction::fetch(self.pc, &self.memory)?;
        log::trace!("{:?}: {}", self, instruction);
        let mut next_pc = self.pc.wrapping_add(instruction.length());
        let status = match instruction.opcode {
            Opcode::Add => {
                self.perform_binary_operation(&instruction, |a, b| a.wrapping_add(b))?
            }
            Opcode::Multiply => {
                self.perform_binary_operation(&instruction, |a, b| a.wrapping_mul(b))?
            }
            Opcode::LessThan => {
                self.perform_binary_operation(&instruction, |a, b| (a < b) as Word)?
            }
            Opcode::Equals => {
                self.perform_binary_operation(&instruction, |a, b| (a == b) as Word)?
            }
            Opcode::Input => match self.input.front() {
                None => {
                    log::debug!("waiting for input at {}", self.pc);
                    // stay put so the same instruction runs again on resume
                    next_pc = self.pc;
                    Status::AwaitingInput
                }
                Some(&value) => {
                    let destination = self.get_destination(&instruction, 0)?;
                    self.memory.write_word(destination, value)?;
                    self.input.pop_front();
                    Status::Ready
                }
            },
            Opcode::Output => {
                let value = self.get_value(&instruction, 0)?;
                self.output.push_back(value);
                Status::AfterOutput
            }
            Opcode::JumpIfTrue => {
                self.handle_jump_operation(&instruction, &mut next_pc, |condition| condition != 0)?
            }
            Opcode::JumpIfFalse => {
                self.handle_jump_operation(&instruction, &mut next_pc, |condition| condition == 0)?
            }
            Opcode::AdjustRelativeBase => {
                let offset = self.get_value(&instruction, 0)?;
                self.relative_base = self.relative_base.wrapping_add(offset);
                Status::Ready
            }
            Opcode::Halt => {
                log::debug!("halted at {}", self.pc);
                next_pc = self.pc;
                Status::Halted
            }
        };
        self.pc = next_pc;
        self.status = status;
        Ok(status)
    }

    fn get_value(&self, instruction: &Instruction, index: usize) -> Result<Word> {
        instruction
            .parameter(index)
            .get_value(self.relative_base, &self.memory)
    }

    /// Resolve a parameter that is about to be written to.
    fn get_destination(&self, instruction: &Instruction, index: usize) -> Result<Word> {
        instruction
            .parameter(index)
            .get_address(self.relative_base)
            .ok_or(Error::InvalidWriteTarget {
                pc: self.pc,
                instruction: instruction.word,
            })
    }

    fn perform_binary_operation(
        &mut self,
        instruction: &Instruction,
        operation: impl FnOnce(Word, Word) -> Word,
    ) -> Result<Status> {
        let a = self.get_value(instruction, 0)?;
        let b = self.get_value(instruction, 1)?;
        let destination = self.get_destination(instruction, 2)?;
        self.memory.write_word(destination, operation(a, b))?;
        Ok(Status::Ready)
    }

    fn handle_jump_operation(
        &self,
        instruction: &Instruction,
        next_pc: &mut Word,
        should_jump: impl FnOnce(Word) -> bool,
    ) -> Result<Status> {
        let condition = self.get_value(instruction, 0)?;
        let destination = self.get_value(instruction, 1)?;
        if should_jump(condition) {
            *next_pc = destination;
        }
        Ok(Status::Ready)
    }

    // Ways to inspect the state of the engine, for debugging and for reading
    // results out of memory.
    pub fn get_status(&self) -> Status {
        self.status
    }
    pub fn get_pc(&self) -> Word {
        self.pc
    }
    pub fn get_relative_base(&self) -> Word {
        self.relative_base
    }
    pub fn read_memory(&self, address: Word) -> Result<Word> {
        self.memory.read_word(address)
    }
    /// Patch memory, usually before the program starts.
    pub fn write_memory(&mut self, address: Word, value: Word) -> Result<()> {
        self.memory.write_word(address, value)
    }
    pub fn get_memory(&self) -> &M {
        &self.memory
    }
    // A running program can only move these through jumps and ARB, so we'll
    // feature gate setting them directly.
    #[cfg(feature = "override-registers")]
    pub fn set_pc(&mut self, nu: Word) {
        self.pc = nu
    }
    #[cfg(feature = "override-registers")]
    pub fn set_relative_base(&mut self, nu: Word) {
        self.relative_base = nu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SparseMemory;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn vm(text: &str) -> Vm {
        text.parse().unwrap()
    }

    #[test]
    fn adds_and_multiplies() {
        let mut vm = vm("1,9,10,3,2,3,11,0,99,30,40,50");
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.read_memory(3), Ok(70));
        assert_eq!(vm.read_memory(0), Ok(3500));
        assert_eq!(vm.get_pc(), 8);

        let mut vm = self::vm("1,0,0,0,99");
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.read_memory(0), Ok(2));
    }

    #[rstest]
    #[case("2,3,0,3,99", 3, 6)]
    #[case("2,4,4,5,99,0", 5, 9801)]
    #[case("1,1,1,4,99,5,6,0,99", 0, 30)]
    #[case("1002,4,3,4,33", 4, 99)]
    #[case("1101,100,-1,4,0", 4, 99)]
    fn writes_land_where_expected(#[case] text: &str, #[case] address: Word, #[case] expected: Word) {
        let mut vm = vm(text);
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.read_memory(address), Ok(expected));
    }

    #[test]
    fn input_suspends_without_moving() {
        let mut vm = vm("3,5,4,5,99,0");
        assert_eq!(vm.step(), Ok(Status::AwaitingInput));
        assert_eq!(vm.get_pc(), 0);
        // asking again changes nothing
        assert_eq!(vm.run(), Ok(Status::AwaitingInput));
        assert_eq!(vm.get_pc(), 0);
        vm.push_input(17);
        assert_eq!(vm.get_status(), Status::Ready);
        assert_eq!(vm.step(), Ok(Status::Ready));
        assert_eq!(vm.get_pc(), 2);
        assert_eq!(vm.read_memory(5), Ok(17));
        assert_eq!(vm.step(), Ok(Status::AfterOutput));
        assert!(vm.has_output());
        assert_eq!(vm.consume_output(), Ok(17));
        assert_eq!(vm.step(), Ok(Status::Halted));
    }

    #[test]
    fn run_keeps_going_after_output() {
        let mut vm = vm("104,1,104,2,104,3,99");
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.drain_output(), vec![1, 2, 3]);
        assert!(!vm.has_output());
    }

    #[test]
    fn run_until_output_stops_after_each_value() {
        let mut vm = vm("104,1,104,2,99");
        assert_eq!(vm.run_until_output(), Ok(Status::AfterOutput));
        assert_eq!(vm.get_pc(), 2);
        assert_eq!(vm.consume_output(), Ok(1));
        assert_eq!(vm.run_until_output(), Ok(Status::AfterOutput));
        assert_eq!(vm.consume_output(), Ok(2));
        assert_eq!(vm.run_until_output(), Ok(Status::Halted));
        assert_eq!(vm.run_until_output(), Ok(Status::Halted));
        assert!(!vm.has_output());
    }

    #[test]
    fn run_until_output_returns_when_starved() {
        let mut vm = vm("3,0,4,0,99");
        assert_eq!(vm.run_until_output(), Ok(Status::AwaitingInput));
        vm.push_input(5);
        assert_eq!(vm.run_until_output(), Ok(Status::AfterOutput));
        assert_eq!(vm.consume_output(), Ok(5));
    }

    #[test]
    fn halted_engines_refuse_to_step() {
        let mut vm = vm("99");
        assert_eq!(vm.step(), Ok(Status::Halted));
        assert_eq!(vm.get_pc(), 0);
        assert_eq!(vm.step(), Err(Error::HaltedEngine { pc: 0 }));
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.get_status(), Status::Halted);
    }

    #[test]
    fn empty_output_is_an_error() {
        let mut vm = vm("99");
        assert_eq!(vm.consume_output(), Err(Error::EmptyOutput));
        vm.run().unwrap();
        assert_eq!(vm.consume_output(), Err(Error::EmptyOutput));
    }

    #[test]
    fn illegal_opcode_preserves_state() {
        let mut vm = vm("1101,2,3,7,42,0,0,0");
        assert_eq!(vm.step(), Ok(Status::Ready));
        assert_eq!(
            vm.run(),
            Err(Error::IllegalOpcode {
                pc: 4,
                instruction: 42
            })
        );
        assert_eq!(vm.get_pc(), 4);
        assert_eq!(vm.read_memory(7), Ok(5));
        assert_eq!(vm.get_status(), Status::Ready);
    }

    #[test]
    fn immediate_write_targets_are_rejected() {
        let mut vm = vm("11101,1,2,3,99");
        assert_eq!(
            vm.step(),
            Err(Error::InvalidWriteTarget {
                pc: 0,
                instruction: 11101
            })
        );
        assert_eq!(vm.get_memory().as_slice(), &[11101, 1, 2, 3, 99]);

        // the pending input must survive a failed read instruction
        let mut vm = self::vm("103,0,99");
        vm.push_input(8);
        assert!(matches!(vm.step(), Err(Error::InvalidWriteTarget { .. })));
        assert_eq!(vm.get_pc(), 0);
        let mut vm = self::vm("3,0,99");
        vm.push_input(8);
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.read_memory(0), Ok(8));
    }

    #[test]
    fn negative_addresses_fail() {
        let mut vm = vm("4,-1,99");
        assert_eq!(vm.step(), Err(Error::NegativeAddress(-1)));
        assert!(!vm.has_output());
        assert_eq!(vm.read_memory(-5), Err(Error::NegativeAddress(-5)));

        // jumping below zero fails on the next fetch
        let mut vm = self::vm("1105,1,-3");
        assert_eq!(vm.step(), Ok(Status::Ready));
        assert_eq!(vm.get_pc(), -3);
        assert_eq!(vm.step(), Err(Error::NegativeAddress(-3)));
    }

    #[test]
    fn relative_mode_uses_the_base() {
        let mut vm = vm("109,2000,109,19,204,-34,99");
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.get_relative_base(), 2019);
        assert_eq!(vm.drain_output(), vec![0]);

        let mut vm = self::vm("109,2000,109,19,204,-34,99");
        vm.write_memory(1985, 1234).unwrap();
        vm.run().unwrap();
        assert_eq!(vm.drain_output(), vec![1234]);

        // relative writes, through both the arithmetic and input paths
        let mut vm = self::vm("109,10,21101,3,4,0,203,1,99");
        vm.push_input(-9);
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.read_memory(10), Ok(7));
        assert_eq!(vm.read_memory(11), Ok(-9));
    }

    #[test]
    fn reads_past_the_end_are_zero() {
        let mut vm = vm("4,1000000,99");
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.drain_output(), vec![0]);
        assert_eq!(vm.read_memory(123_456_789), Ok(0));
    }

    #[test]
    fn handles_big_numbers() {
        let mut vm = vm("1102,34915192,34915192,7,4,7,99,0");
        vm.run().unwrap();
        assert_eq!(vm.consume_output(), Ok(1219070632396864));
        let mut vm = self::vm("104,1125899906842624,99");
        vm.run().unwrap();
        assert_eq!(vm.consume_output(), Ok(1125899906842624));
    }

    #[test]
    fn quine_outputs_itself() {
        let text = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
        let mut vm = vm(text);
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.drain_output(), parse_program(text).unwrap());
    }

    #[test]
    fn far_writes_work_in_default_memory() {
        let mut vm = Vm::new(&[1101, 1, 1, Word::MAX, 4, Word::MAX, 99]);
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.read_memory(Word::MAX), Ok(2));
        assert_eq!(vm.drain_output(), vec![2]);
        assert_eq!(vm.get_memory().len(), 7);
    }

    #[test]
    fn sparse_memory_runs_far_away_writes() {
        let program = parse_program("3,0,1101,5,6,1000000000000,4,1000000000000,99").unwrap();
        let mut vm = Vm::with_memory(SparseMemory::from(&program[..]));
        vm.push_input(1);
        assert_eq!(vm.run(), Ok(Status::Halted));
        assert_eq!(vm.drain_output(), vec![11]);
        assert_eq!(vm.read_memory(0), Ok(1));
    }

    #[test]
    fn clones_do_not_share_memory() {
        let mut original = vm("1101,1,1,0,99");
        let copy = original.clone();
        original.run().unwrap();
        assert_eq!(original.read_memory(0), Ok(2));
        assert_eq!(copy.read_memory(0), Ok(1101));
        assert_eq!(copy.get_status(), Status::Ready);
    }

    #[test]
    fn debug_shows_registers() {
        let mut vm = vm("109,5,3,0,99");
        vm.step().unwrap();
        vm.push_input(4);
        assert_eq!(format!("{vm:?}"), "PC:2 RB:5 IN:[4] OUT:[] Ready");
    }

    #[test]
    fn parse_errors_surface_from_construction() {
        assert!(matches!(Vm::from_text("1,2,three"), Err(Error::Parse { index: 2, .. })));
        let mut empty = Vm::from_text("").unwrap();
        // an empty program reads as a single zero, which is not an opcode
        assert_eq!(
            empty.step(),
            Err(Error::IllegalOpcode {
                pc: 0,
                instruction: 0
            })
        );
    }
}
