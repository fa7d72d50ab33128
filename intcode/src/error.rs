use crate::{Status, Word};

/// Everything that can go wrong while loading or running an Intcode program.
///
/// None of these are retried. When an instruction fails, the engine is left
/// exactly as it was before that instruction started, so it can be inspected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A token of program text is not a base-10 integer.
    #[error("item {index} of the program text, {token:?}, is not an integer")]
    Parse { index: usize, token: String },
    #[error("attempted to access negative address {0}")]
    NegativeAddress(Word),
    #[error("illegal opcode in instruction {instruction} at {pc}")]
    IllegalOpcode { pc: Word, instruction: Word },
    /// A mode digit other than 0, 1 or 2.
    #[error("illegal addressing mode {mode} in instruction {instruction} at {pc}")]
    IllegalMode {
        pc: Word,
        instruction: Word,
        mode: Word,
    },
    /// Immediate mode was used for a parameter that gets written to.
    #[error("instruction {instruction} at {pc} writes to an immediate parameter")]
    InvalidWriteTarget { pc: Word, instruction: Word },
    #[error("no output is pending")]
    EmptyOutput,
    #[error("cannot step a halted engine (stopped at {pc})")]
    HaltedEngine { pc: Word },
    /// A pipeline stage that was expected to run to completion stopped early.
    #[error("pipeline stage {stage} stopped with status {status:?} instead of halting")]
    StageNotHalted { stage: usize, status: Status },
    #[error("pipeline deadlocked: every stage is waiting for input (last visited stage {stage})")]
    Deadlock { stage: usize },
    #[error("pipeline has no stages")]
    EmptyPipeline,
}

pub type Result<T> = std::result::Result<T, Error>;
