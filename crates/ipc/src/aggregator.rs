use thiserror::Error;

/// Errors that can occur when computing IPC
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// The instruction and cycle sequences do not have one entry per core each
    #[error("instruction and cycle counts differ in length ({instructions} vs {cycles})")]
    MissingInput { instructions: usize, cycles: usize },
}

/// Instruction and cycle counters for every core at one point in time.
///
/// Index `k` of both sequences refers to core `k`. The two sequences always
/// have the same length; [`CoreStatsSnapshot::new`] rejects anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreStatsSnapshot {
    instructions: Vec<f64>,
    cycles: Vec<f64>,
}

impl CoreStatsSnapshot {
    /// Creates a snapshot from per-core instruction and cycle counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingInput`] if the sequences differ in length.
    pub fn new(instructions: Vec<f64>, cycles: Vec<f64>) -> Result<Self, Error> {
        check_lengths(&instructions, &cycles)?;
        Ok(Self {
            instructions,
            cycles,
        })
    }

    /// Number of cores in the snapshot
    pub fn num_cores(&self) -> usize {
        self.instructions.len()
    }

    pub fn instructions(&self) -> &[f64] {
        &self.instructions
    }

    pub fn cycles(&self) -> &[f64] {
        &self.cycles
    }

    /// Computes the per-core IPC of this snapshot
    pub fn ipc(&self) -> IpcVector {
        ratios(&self.instructions, &self.cycles)
    }
}

/// Per-core IPC values, aligned by index with the snapshot they came from.
///
/// A core without a defined IPC holds `f64::NAN`.
#[derive(Debug, Clone, Default)]
pub struct IpcVector {
    values: Vec<f64>,
}

impl IpcVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw values, NaN marking undefined entries
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Returns the IPC of a core, or `None` if the core is out of range or its
    /// IPC is undefined
    pub fn get(&self, core: usize) -> Option<f64> {
        self.values.get(core).copied().filter(|value| !value.is_nan())
    }

    /// Returns true if the core's IPC is the undefined sentinel
    pub fn is_undefined(&self, core: usize) -> bool {
        self.values.get(core).is_some_and(|value| value.is_nan())
    }

    /// Indices of the cores whose IPC is undefined, in ascending order
    pub fn undefined_cores(&self) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_nan())
            .map(|(core, _)| core)
    }
}

/// Number of cores with a defined IPC and their mean IPC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateResult {
    /// Number of cores that contributed to the average
    pub valid_count: usize,
    /// Mean IPC over the valid cores, `None` when `valid_count` is zero
    pub average_ipc: Option<f64>,
}

impl AggregateResult {
    /// Returns true if at least one core had a defined IPC
    pub fn has_valid_data(&self) -> bool {
        self.valid_count > 0
    }
}

/// Computes the IPC of every core.
///
/// `result[k] = instructions[k] / cycles[k]`. A core with zero cycles gets the
/// NaN sentinel rather than an error.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] if the sequences differ in length.
///
/// # Examples
///
/// ```
/// use ipc::compute_ipc;
///
/// let ipc = compute_ipc(&[100.0, 200.0, 0.0], &[50.0, 0.0, 10.0]).unwrap();
/// assert_eq!(ipc.get(0), Some(2.0));
/// assert!(ipc.is_undefined(1));
/// assert_eq!(ipc.get(2), Some(0.0));
/// ```
pub fn compute_ipc(instructions: &[f64], cycles: &[f64]) -> Result<IpcVector, Error> {
    check_lengths(instructions, cycles)?;
    Ok(ratios(instructions, cycles))
}

/// Averages the defined entries of an [`IpcVector`].
///
/// Undefined entries are excluded from both the count and the sum. If none
/// remain, the average is `None`.
///
/// # Examples
///
/// ```
/// use ipc::{aggregate, compute_ipc};
///
/// let ipc = compute_ipc(&[100.0, 200.0, 0.0], &[50.0, 0.0, 10.0]).unwrap();
/// let result = aggregate(&ipc);
/// assert_eq!(result.valid_count, 2);
/// assert_eq!(result.average_ipc, Some(1.0));
///
/// let idle = compute_ipc(&[10.0], &[0.0]).unwrap();
/// assert_eq!(aggregate(&idle).average_ipc, None);
/// ```
pub fn aggregate(ipc: &IpcVector) -> AggregateResult {
    let mut valid_count = 0usize;
    let mut sum = 0.0f64;

    for &value in &ipc.values {
        if value.is_nan() {
            continue;
        }
        valid_count += 1;
        sum += value;
    }

    let average_ipc = if valid_count == 0 {
        None
    } else {
        Some(sum / valid_count as f64)
    };

    AggregateResult {
        valid_count,
        average_ipc,
    }
}

fn check_lengths(instructions: &[f64], cycles: &[f64]) -> Result<(), Error> {
    if instructions.len() != cycles.len() {
        return Err(Error::MissingInput {
            instructions: instructions.len(),
            cycles: cycles.len(),
        });
    }
    Ok(())
}

// Callers guarantee equal lengths.
fn ratios(instructions: &[f64], cycles: &[f64]) -> IpcVector {
    let mut values = Vec::with_capacity(instructions.len());
    for (&instrs, &elapsed) in instructions.iter().zip(cycles) {
        if elapsed == 0.0 {
            values.push(f64::NAN);
        } else {
            values.push(instrs / elapsed);
        }
    }
    IpcVector { values }
}
