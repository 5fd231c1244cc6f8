//! Chart-shaped output handed to whatever renders the analyses.
//!
//! Rendering itself happens outside this crate; [`JsonPresenter`] writes the
//! chart data so a plotting tool can pick it up.

use std::io::Write;

use serde::Serialize;

use crate::metrics::CohortMatrix;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub label: String,
    pub value: f64,
}

/// A labelled scalar series for line charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<Point>,
}

/// A sparse matrix for heatmaps. `cells[row][column]` is `None` where there
/// is no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub value_label: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Heatmap {
    /// Lays out a cohort matrix with cohorts as rows and periods as columns.
    pub fn from_matrix(
        matrix: &CohortMatrix,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        value_label: impl Into<String>,
    ) -> Self {
        let cohorts = matrix.cohorts();
        let periods = matrix.periods();
        let cells = cohorts
            .iter()
            .map(|&cohort| periods.iter().map(|&period| matrix.get(cohort, period)).collect())
            .collect();

        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            value_label: value_label.into(),
            rows: cohorts.iter().map(ToString::to_string).collect(),
            columns: periods.iter().map(ToString::to_string).collect(),
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Line(LineSeries),
    Heatmap(Heatmap),
}

/// Consumer of finished charts.
pub trait Presenter {
    fn present(&mut self, chart: &Chart) -> serde_json::Result<()>;
}

/// Writes each chart as a pretty-printed JSON document.
pub struct JsonPresenter<W: Write> {
    writer: W,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn present(&mut self, chart: &Chart) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, chart)?;
        self.writer.write_all(b"\n").map_err(serde_json::Error::io)
    }
}

/// Text progress bar such as `[■■■□□□□□]`.
pub fn progress_bar(current: usize, total: usize) -> String {
    let done = current.min(total);
    format!("[{}{}]", "■".repeat(done), "□".repeat(total - done))
}
