use std::fmt::{Display, Formatter, Result as FmtResult};

use super::{Error, Memory, Result, Word};

/// The most parameters any instruction takes.
pub const MAX_PARAMETERS: usize = 3;

/// How a parameter word is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The parameter is the address of the value.
    Position,
    /// The parameter is the value. Can't be written to.
    Immediate,
    /// The parameter is added to the relative base to get the address of the value.
    Relative,
}

impl Mode {
    fn from_digit(digit: Word) -> Option<Mode> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustRelativeBase,
    Halt,
}

impl Opcode {
    fn from_number(number: Word) -> Option<Opcode> {
        Some(match number {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustRelativeBase,
            99 => Opcode::Halt,
            _ => return None,
        })
    }
    pub fn parameter_count(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustRelativeBase => 1,
            Opcode::Halt => 0,
        }
    }
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustRelativeBase => "ARB",
            Opcode::Halt => "HLT",
        }
    }
}

/// One parameter word, together with the mode it was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub mode: Mode,
    pub raw: Word,
}

impl Parameter {
    /// The address this parameter refers to, or `None` for an immediate.
    pub fn get_address(&self, relative_base: Word) -> Option<Word> {
        match self.mode {
            Mode::Position => Some(self.raw),
            Mode::Immediate => None,
            Mode::Relative => Some(relative_base.wrapping_add(self.raw)),
        }
    }
    pub fn get_value<M: Memory>(&self, relative_base: Word, memory: &M) -> Result<Word> {
        match self.get_address(relative_base) {
            Some(address) => memory.read_word(address),
            None => Ok(self.raw),
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self.mode {
            Mode::Position => write!(fmt, "[{}]", self.raw),
            Mode::Immediate => write!(fmt, "#{}", self.raw),
            Mode::Relative if self.raw < 0 => write!(fmt, "[rb{}]", self.raw),
            Mode::Relative => write!(fmt, "[rb+{}]", self.raw),
        }
    }
}

/// A fully decoded instruction: what to do, and every parameter with its mode
/// already picked apart from the packed instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The packed word this was decoded from.
    pub word: Word,
    pub opcode: Opcode,
    parameters: [Parameter; MAX_PARAMETERS],
}

impl Instruction {
    /// Decode the instruction at `pc`, reading as many parameter words after
    /// it as the opcode needs.
    pub fn fetch<M: Memory>(pc: Word, memory: &M) -> Result<Instruction> {
        let word = memory.read_word(pc)?;
        let illegal_opcode = Error::IllegalOpcode {
            pc,
            instruction: word,
        };
        if word < 0 {
            return Err(illegal_opcode);
        }
        let opcode = Opcode::from_number(word % 100).ok_or(illegal_opcode)?;
        let mut parameters = [Parameter {
            mode: Mode::Position,
            raw: 0,
        }; MAX_PARAMETERS];
        // 1002 -> 10 -> modes are 0 (first), 1 (second), 0 (third, absent)
        let mut mode_digits = word / 100;
        for (n, parameter) in parameters
            .iter_mut()
            .take(opcode.parameter_count())
            .enumerate()
        {
            let digit = mode_digits % 10;
            mode_digits /= 10;
            parameter.mode = Mode::from_digit(digit).ok_or(Error::IllegalMode {
                pc,
                instruction: word,
                mode: digit,
            })?;
            parameter.raw = memory.read_word(pc.wrapping_add(1 + n as Word))?;
        }
        Ok(Instruction {
            word,
            opcode,
            parameters,
        })
    }
    /// `index` must be below [`MAX_PARAMETERS`].
    pub(crate) fn parameter(&self, index: usize) -> Parameter {
        self.parameters[index]
    }
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters[..self.opcode.parameter_count()]
    }
    /// How far the program counter moves when this instruction doesn't jump.
    pub fn length(&self) -> Word {
        1 + self.opcode.parameter_count() as Word
    }
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.opcode.mnemonic())?;
        for (n, parameter) in self.parameters().iter().enumerate() {
            let separator = if n == 0 { " " } else { ", " };
            write!(fmt, "{separator}{parameter}")?;
        }
        Ok(())
    }
}
