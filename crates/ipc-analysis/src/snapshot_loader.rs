use anyhow::{anyhow, Context, Result};
use arrow_array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, RecordBatch,
    UInt32Array, UInt64Array,
};
use arrow_schema::DataType;
use ipc::CoreStatsSnapshot;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Names of the columns holding per-core counters in a statistics file
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub phase: String,
    pub core: String,
    pub instructions: String,
    pub cycles: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            phase: "phase".to_string(),
            core: "core".to_string(),
            instructions: "instrs".to_string(),
            cycles: "cycles".to_string(),
        }
    }
}

/// The last snapshot recorded in a statistics file
#[derive(Debug, Clone)]
pub struct FinalSnapshot {
    pub phase: i64,
    pub stats: CoreStatsSnapshot,
}

/// Counters collected for the highest phase seen so far, keyed by raw core index.
///
/// Problems with the rows are only reported if this phase turns out to be the
/// final one.
struct PhaseRows {
    phase: i64,
    cores: BTreeMap<i64, (f64, f64)>,
    duplicate_core: Option<i64>,
}

impl PhaseRows {
    fn new(phase: i64) -> Self {
        Self {
            phase,
            cores: BTreeMap::new(),
            duplicate_core: None,
        }
    }
}

/// Reads a statistics file and returns the counters of its final snapshot.
///
/// Rows belonging to earlier phases are discarded. The cores of the final
/// snapshot must be numbered `0..N-1` with no gaps or duplicates. If the file
/// carries a `num_cores` metadata entry, N must match it.
pub fn load_final_snapshot<T: ChunkReader + 'static>(
    builder: ParquetRecordBatchReaderBuilder<T>,
    columns: &ColumnNames,
) -> Result<FinalSnapshot> {
    let expected_cores = expected_num_cores(&builder)?;

    let arrow_reader = builder
        .build()
        .with_context(|| "Failed to build Arrow reader")?;

    let mut latest: Option<PhaseRows> = None;
    let mut rows_read = 0usize;

    for batch in arrow_reader {
        let batch = batch.with_context(|| "Failed to read record batch")?;
        rows_read += batch.num_rows();
        process_record_batch(&batch, columns, &mut latest)?;
    }

    let latest = latest.ok_or_else(|| anyhow!("Statistics file contains no snapshots"))?;
    log::debug!(
        "Read {} rows, final snapshot is phase {} with {} cores",
        rows_read,
        latest.phase,
        latest.cores.len()
    );

    if let Some(core) = latest.duplicate_core {
        return Err(anyhow!("Duplicate core {} in phase {}", core, latest.phase));
    }

    let num_cores = latest.cores.len();
    if let Some(expected) = expected_cores {
        if num_cores != expected {
            return Err(anyhow!(
                "Final snapshot has {} cores but file metadata declares num_cores={}",
                num_cores,
                expected
            ));
        }
    }

    let mut instructions = Vec::with_capacity(num_cores);
    let mut cycles = Vec::with_capacity(num_cores);
    // BTreeMap iterates in core order, so any gap shows up as a key mismatch
    for (position, (core, (instrs, elapsed))) in latest.cores.into_iter().enumerate() {
        let core = usize::try_from(core)
            .map_err(|_| anyhow!("Invalid core index {} in phase {}", core, latest.phase))?;
        if core != position {
            return Err(anyhow!(
                "Core {} missing from phase {} (found core {} instead)",
                position,
                latest.phase,
                core
            ));
        }
        instructions.push(instrs);
        cycles.push(elapsed);
    }

    let stats = CoreStatsSnapshot::new(instructions, cycles)
        .with_context(|| "Failed to assemble core statistics")?;

    Ok(FinalSnapshot {
        phase: latest.phase,
        stats,
    })
}

fn expected_num_cores<T: ChunkReader + 'static>(
    builder: &ParquetRecordBatchReaderBuilder<T>,
) -> Result<Option<usize>> {
    let Some(key_value_metadata) = builder.metadata().file_metadata().key_value_metadata() else {
        return Ok(None);
    };

    let Some(entry) = key_value_metadata.iter().find(|kv| kv.key == "num_cores") else {
        return Ok(None);
    };

    let value = entry
        .value
        .as_ref()
        .ok_or_else(|| anyhow!("num_cores value is empty"))?;

    value
        .parse::<usize>()
        .map(Some)
        .with_context(|| format!("Failed to parse num_cores as integer: {}", value))
}

fn process_record_batch(
    batch: &RecordBatch,
    columns: &ColumnNames,
    latest: &mut Option<PhaseRows>,
) -> Result<()> {
    let phase_col = column(batch, &columns.phase)?;
    let core_col = column(batch, &columns.core)?;
    let phases = index_values(phase_col, &columns.phase)?;
    let cores = index_values(core_col, &columns.core)?;
    let instructions = counter_values(column(batch, &columns.instructions)?, &columns.instructions)?;
    let cycles = counter_values(column(batch, &columns.cycles)?, &columns.cycles)?;

    for row in 0..batch.num_rows() {
        let phase = phases[row]
            .ok_or_else(|| anyhow!("{} is null at row {}", columns.phase, row))?;
        let core = cores[row].ok_or_else(|| anyhow!("{} is null at row {}", columns.core, row))?;

        match latest.as_ref().map(|rows| rows.phase.cmp(&phase)) {
            Some(Ordering::Greater) => continue,
            Some(Ordering::Equal) => {}
            Some(Ordering::Less) | None => *latest = Some(PhaseRows::new(phase)),
        }
        let current = latest.get_or_insert_with(|| PhaseRows::new(phase));

        if current
            .cores
            .insert(core, (instructions[row], cycles[row]))
            .is_some()
        {
            current.duplicate_core.get_or_insert(core);
        }
    }

    Ok(())
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("{} column not found", name))
}

/// Reads an integer column, `None` marking nulls
fn index_values(array: &ArrayRef, name: &str) -> Result<Vec<Option<i64>>> {
    let values = match array.data_type() {
        DataType::Int32 => downcast::<Int32Array>(array, name)?
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        DataType::Int64 => downcast::<Int64Array>(array, name)?.iter().collect(),
        DataType::UInt32 => downcast::<UInt32Array>(array, name)?
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        DataType::UInt64 => downcast::<UInt64Array>(array, name)?
            .iter()
            .map(|v| {
                v.map(|v| {
                    i64::try_from(v).map_err(|_| anyhow!("{} value {} is out of range", name, v))
                })
                .transpose()
            })
            .collect::<Result<_>>()?,
        other => {
            return Err(anyhow!(
                "{} column has unsupported type {}, expected an integer",
                name,
                other
            ))
        }
    };
    Ok(values)
}

/// Reads a counter column as f64, nulls becoming NaN
fn counter_values(array: &ArrayRef, name: &str) -> Result<Vec<f64>> {
    let values = match array.data_type() {
        DataType::Int32 => downcast::<Int32Array>(array, name)?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Int64 => downcast::<Int64Array>(array, name)?
            .iter()
            .map(|v| v.map_or(f64::NAN, |v| v as f64))
            .collect(),
        DataType::UInt32 => downcast::<UInt32Array>(array, name)?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::UInt64 => downcast::<UInt64Array>(array, name)?
            .iter()
            .map(|v| v.map_or(f64::NAN, |v| v as f64))
            .collect(),
        DataType::Float32 => downcast::<Float32Array>(array, name)?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Float64 => downcast::<Float64Array>(array, name)?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        other => {
            return Err(anyhow!(
                "{} column has unsupported type {}, expected a number",
                name,
                other
            ))
        }
    };
    Ok(values)
}

fn downcast<'a, A: Array + 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        anyhow!(
            "{} column could not be read as {}",
            name,
            array.data_type()
        )
    })
}
