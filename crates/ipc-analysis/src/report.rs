use ipc::{AggregateResult, IpcVector};
use std::fmt;

/// Human-readable summary of one snapshot's IPC
pub struct Report<'a> {
    phase: i64,
    ipc: &'a IpcVector,
    result: AggregateResult,
}

impl<'a> Report<'a> {
    pub fn new(phase: i64, ipc: &'a IpcVector, result: AggregateResult) -> Self {
        Self { phase, ipc, result }
    }

    /// Logs which cores were left out of the average
    pub fn log_exclusions(&self) {
        for core in self.ipc.undefined_cores() {
            log::debug!("Core {} has no defined IPC, excluded from average", core);
        }

        if !self.result.has_valid_data() {
            log::warn!(
                "No core in phase {} has a defined IPC, average is undefined",
                self.phase
            );
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Snapshot phase: {} ({} cores)", self.phase, self.ipc.len())?;
        writeln!(f, "Per-core IPC:")?;
        for core in 0..self.ipc.len() {
            match self.ipc.get(core) {
                Some(value) => writeln!(f, "  core {:>3}: {:.4}", core, value)?,
                None => writeln!(f, "  core {:>3}: n/a", core)?,
            }
        }
        writeln!(f, "Valid cores: {}", self.result.valid_count)?;
        match self.result.average_ipc {
            Some(average) => write!(f, "Average IPC: {:.4}", average),
            None => write!(f, "Average IPC: undefined (no core has a defined IPC)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc::{aggregate, compute_ipc};

    #[test]
    fn test_report_with_valid_cores() {
        let ipc = compute_ipc(&[100.0, 200.0, 0.0], &[50.0, 0.0, 10.0]).unwrap();
        let result = aggregate(&ipc);
        let report = Report::new(7, &ipc, result).to_string();

        assert_eq!(
            report,
            "Snapshot phase: 7 (3 cores)\n\
             Per-core IPC:\n  \
             core   0: 2.0000\n  \
             core   1: n/a\n  \
             core   2: 0.0000\n\
             Valid cores: 2\n\
             Average IPC: 1.0000"
        );
    }

    #[test]
    fn test_report_without_valid_cores() {
        let ipc = compute_ipc(&[10.0], &[0.0]).unwrap();
        let result = aggregate(&ipc);
        let report = Report::new(0, &ipc, result).to_string();

        assert!(report.contains("Valid cores: 0"));
        assert!(report.contains("Average IPC: undefined (no core has a defined IPC)"));
        assert!(!report.contains("Average IPC: 0"));
    }

    #[test]
    fn test_report_with_missing_counters_and_no_cores() {
        let missing = compute_ipc(&[f64::NAN, 4.0], &[2.0, f64::NAN]).unwrap();
        let report = Report::new(1, &missing, aggregate(&missing)).to_string();
        assert!(report.contains("core   0: n/a"));
        assert!(report.ends_with("Average IPC: undefined (no core has a defined IPC)"));

        let empty = compute_ipc(&[], &[]).unwrap();
        let report = Report::new(2, &empty, aggregate(&empty)).to_string();
        assert!(report.starts_with("Snapshot phase: 2 (0 cores)"));
        assert!(report.ends_with("Average IPC: undefined (no core has a defined IPC)"));
    }

    #[test]
    fn test_log_exclusions() {
        testing_logger::setup();

        let ipc = compute_ipc(&[4.0, 1.0, 9.0], &[2.0, 0.0, 3.0]).unwrap();
        let report = Report::new(3, &ipc, aggregate(&ipc));
        report.log_exclusions();

        testing_logger::validate(|captured_logs| {
            assert_eq!(captured_logs.len(), 1);
            assert_eq!(captured_logs[0].level, log::Level::Debug);
            assert_eq!(
                captured_logs[0].body,
                "Core 1 has no defined IPC, excluded from average"
            );
        });
    }

    #[test]
    fn test_log_exclusions_warns_without_valid_data() {
        testing_logger::setup();

        let ipc = compute_ipc(&[], &[]).unwrap();
        let report = Report::new(12, &ipc, aggregate(&ipc));
        report.log_exclusions();

        testing_logger::validate(|captured_logs| {
            assert_eq!(captured_logs.len(), 1);
            assert_eq!(captured_logs[0].level, log::Level::Warn);
            assert_eq!(
                captured_logs[0].body,
                "No core in phase 12 has a defined IPC, average is undefined"
            );
        });
    }
}
