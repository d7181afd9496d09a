//! `flowview replay`: feed a JSON lines file of delta batches through a view

use anyhow::Context;
use flowview_delta::{drive, Alert, AlertSink, DriveSummary, SyncConfig, TracingAlertSink, WorkflowView};
use flowview_model::{Deltas, EntityKind, StateTally, TaskState};
use futures::channel::mpsc;
use futures::SinkExt;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Batches parsed ahead of the applicator
const BATCH_BUFFER: usize = 64;

/// Parsed `replay` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReplayOptions {
    pub(crate) file: PathBuf,
    pub(crate) config: Option<PathBuf>,
    pub(crate) json: bool,
}

/// Replay the file and render the final state
pub(crate) async fn run(options: &ReplayOptions) -> anyhow::Result<String> {
    ensure_readable(&options.file)?;
    let config = match &options.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };

    let alerts = CountingAlertSink::default();
    let mut view = WorkflowView::new(config, Box::new(alerts.clone()));

    let (sender, receiver) = mpsc::channel(BATCH_BUFFER);
    let reader = tokio::spawn(read_batches(options.file.clone(), sender));

    let summary = drive(&mut view, receiver)
        .await
        .context("replay stopped on a fatal error")?;
    reader.await.context("batch reader failed")??;

    let report = ReplayReport::new(&view, summary, alerts.count());
    if options.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(report.to_string())
    }
}

/// Parse one batch per non-blank line and send it on
async fn read_batches(path: PathBuf, mut batches: mpsc::Sender<Deltas>) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut number = 0usize;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let deltas: Deltas = serde_json::from_str(&line)
            .with_context(|| format!("{}:{number}: invalid delta batch", path.display()))?;
        if batches.send(deltas).await.is_err() {
            // applicator stopped
            break;
        }
    }
    tracing::debug!("Read {} lines from {}", number, path.display());
    Ok(())
}

/// Logs alerts and counts them
#[derive(Debug, Clone, Default)]
struct CountingAlertSink {
    count: Arc<AtomicUsize>,
}

impl CountingAlertSink {
    fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl AlertSink for CountingAlertSink {
    fn alert(&self, alert: Alert) {
        self.count.fetch_add(1, Ordering::Relaxed);
        TracingAlertSink.alert(alert);
    }
}

#[derive(Debug, Serialize)]
struct PointReport {
    id: String,
    point: String,
    state: Option<TaskState>,
    totals: StateTally,
}

/// Final state of a replay
#[derive(Debug, Serialize)]
pub(crate) struct ReplayReport {
    workflow: Option<String>,
    status: Option<String>,
    stream: DriveSummary,
    cycle_points: usize,
    families: usize,
    tasks: usize,
    jobs: usize,
    tallies: Vec<PointReport>,
    table_rows: Option<usize>,
    alerts: usize,
}

impl ReplayReport {
    fn new(view: &WorkflowView, stream: DriveSummary, alerts: usize) -> Self {
        let tree = view.tree();
        Self {
            workflow: tree.workflow().map(|root| root.id.to_string()),
            status: tree.workflow().and_then(|root| root.status.clone()),
            stream,
            cycle_points: tree.count(EntityKind::CyclePoint),
            families: tree.count(EntityKind::FamilyProxy),
            tasks: tree.count(EntityKind::TaskProxy),
            jobs: tree.count(EntityKind::Job),
            tallies: tree
                .cycle_points()
                .map(|point| PointReport {
                    id: point.id.to_string(),
                    point: point.point.clone(),
                    state: point.state,
                    totals: point.state_totals.clone(),
                })
                .collect(),
            table_rows: view.table().map(flowview_delta::TaskTable::len),
            alerts,
        }
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Batches: {} ({} applied, {} discarded, {} item errors)",
            self.stream.batches, self.stream.applied, self.stream.discarded, self.stream.item_errors
        )?;
        match &self.workflow {
            Some(id) => writeln!(
                f,
                "Workflow: {} [{}]",
                id,
                self.status.as_deref().unwrap_or("unknown")
            )?,
            None => writeln!(f, "Workflow: <empty>")?,
        }
        writeln!(
            f,
            "Entities: {} cycle points, {} families, {} tasks, {} jobs",
            self.cycle_points, self.families, self.tasks, self.jobs
        )?;
        for point in &self.tallies {
            let totals: Vec<String> = point
                .totals
                .iter()
                .map(|(state, count)| format!("{}={count}", state.as_str()))
                .collect();
            writeln!(
                f,
                "  {} {}: {}",
                point.point,
                point.state.map_or("-", TaskState::as_str),
                totals.join(" ")
            )?;
        }
        if let Some(rows) = self.table_rows {
            writeln!(f, "Table rows: {rows}")?;
        }
        write!(f, "Alerts: {}", self.alerts)
    }
}

/// Check a path before handing it to the async reader
fn ensure_readable(path: &Path) -> anyhow::Result<()> {
    anyhow::ensure!(path.is_file(), "{} is not a file", path.display());
    Ok(())
}
