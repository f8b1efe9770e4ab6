/// Per-task summary of a log.
///
/// Consecutive events from the same task form a run. Each run reports its
/// time span and how many page reads, page writes and block erases it
/// issued. Cache hits extend a run but are not counted.
use std::fmt;
use std::time::Duration;

use flashmon_monitor::EventKind;

use crate::trace::TraceLine;

pub const HEADER: &str = "# <start time> -> <end time> (<duration>) : [<task>], \
                          R/W/E : <page reads>/<page writes>/<block erases>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    /// Empty for events captured without a task name.
    pub task: String,
    pub start: Duration,
    pub end: Duration,
    pub reads: usize,
    pub writes: usize,
    pub erases: usize,
}

impl TaskRun {
    fn open(line: &TraceLine) -> Self {
        let mut run = Self {
            task: line.task.clone().unwrap_or_default(),
            start: line.timestamp,
            end: line.timestamp,
            reads: 0,
            writes: 0,
            erases: 0,
        };
        run.add(line);
        run
    }

    fn add(&mut self, line: &TraceLine) {
        self.end = line.timestamp;
        match line.kind {
            EventKind::Read => self.reads += 1,
            EventKind::Write => self.writes += 1,
            EventKind::Erase => self.erases += 1,
            EventKind::CacheHit => {}
        }
    }

    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

impl fmt::Display for TaskRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6} -> {:.6} ({:.6}) : [{}], R/W/E : {}/{}/{}",
            self.start.as_secs_f64(),
            self.end.as_secs_f64(),
            self.duration().as_secs_f64(),
            self.task,
            self.reads,
            self.writes,
            self.erases
        )
    }
}

/// Split `lines` into runs of one task, the last run included.
pub fn task_runs(lines: &[TraceLine]) -> Vec<TaskRun> {
    let mut runs: Vec<TaskRun> = Vec::new();
    for line in lines {
        let task = line.task.as_deref().unwrap_or("");
        if let Some(run) = runs.last_mut().filter(|run| run.task == task) {
            run.add(line);
            continue;
        }
        runs.push(TaskRun::open(line));
    }
    runs
}
