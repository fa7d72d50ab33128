//! Chains of engines, each feeding its output into the next one's input.

use crate::{DenseMemory, Error, Memory, Result, Status, Vm, Word};

/// How the stages of a [`Pipeline`] are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiring {
    /// Each stage runs to completion once, in order; the last stage's output
    /// is the answer.
    Linear,
    /// The last stage's output goes back into the first stage, round and
    /// round until the last stage halts.
    Feedback,
}

/// An ordered ring of engines. Each engine owns its own memory and queues;
/// the pipeline only moves values between them.
#[derive(Debug, Clone)]
pub struct Pipeline<M: Memory = DenseMemory> {
    stages: Vec<Vm<M>>,
}

impl Pipeline<DenseMemory> {
    /// One fresh copy of `program` per phase, each given its phase as its
    /// first input.
    pub fn with_phases(program: &[Word], phases: &[Word]) -> Pipeline {
        let prototype = Vm::new(program);
        let stages = phases
            .iter()
            .map(|&phase| {
                let mut stage = prototype.clone();
                stage.push_input(phase);
                stage
            })
            .collect();
        Pipeline { stages }
    }
}

impl<M: Memory> Pipeline<M> {
    pub fn new(stages: Vec<Vm<M>>) -> Pipeline<M> {
        Pipeline { stages }
    }

    pub fn get_stages(&self) -> &[Vm<M>] {
        &self.stages
    }

    pub fn run(&mut self, wiring: Wiring, initial_input: Word) -> Result<Word> {
        match wiring {
            Wiring::Linear => self.run_linear(initial_input),
            Wiring::Feedback => self.run_feedback_loop(initial_input),
        }
    }

    /// Run every stage to completion in turn, handing each stage's final
    /// output to the next.
    pub fn run_linear(&mut self, initial_input: Word) -> Result<Word> {
        if self.stages.is_empty() {
            return Err(Error::EmptyPipeline);
        }
        let mut signal = initial_input;
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.push_input(signal);
            let status = stage.run()?;
            if status != Status::Halted {
                return Err(Error::StageNotHalted {
                    stage: index,
                    status,
                });
            }
            signal = stage
                .drain_output()
                .last()
                .copied()
                .ok_or(Error::EmptyOutput)?;
            log::debug!("stage {index} produced {signal}");
        }
        Ok(signal)
    }

    /// Pass values around the ring one at a time until the last stage halts,
    /// and return the last thing it output.
    ///
    /// If a whole lap goes by with nobody outputting or halting, every stage
    /// is stuck waiting on another and this fails with [`Error::Deadlock`].
    pub fn run_feedback_loop(&mut self, initial_input: Word) -> Result<Word> {
        let count = self.stages.len();
        let last = count.checked_sub(1).ok_or(Error::EmptyPipeline)?;
        self.stages[0].push_input(initial_input);
        let mut last_output = None;
        let mut current = 0;
        let mut idle_visits = 0;
        loop {
            let stage = &mut self.stages[current];
            let was_halted = stage.get_status() == Status::Halted;
            match stage.run_until_output()? {
                Status::AfterOutput => {
                    let value = stage.consume_output()?;
                    if current == last {
                        last_output = Some(value);
                    }
                    let next = (current + 1) % count;
                    log::debug!("stage {current} -> stage {next}: {value}");
                    self.stages[next].push_input(value);
                    idle_visits = 0;
                }
                Status::Halted if current == last => break,
                Status::Halted if !was_halted => idle_visits = 0,
                Status::Halted | Status::AwaitingInput | Status::Ready => idle_visits += 1,
            }
            if idle_visits >= count {
                log::warn!("no stage can make progress; giving up at stage {current}");
                return Err(Error::Deadlock { stage: current });
            }
            current = (current + 1) % count;
        }
        last_output.ok_or(Error::EmptyOutput)
    }
}
