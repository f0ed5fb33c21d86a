//! Acoustic scoring interface consumed by the search.

use crate::error::{DecodeError, GraphError, Result};
use crate::fst::Label;
use ndarray::{Array2, ArrayView2, Axis};
use std::path::Path;

/// Acoustic scores for the frames decoded so far.
///
/// Costs are tropical: lower is better, `f32::INFINITY` forbids the label.
pub trait Scorer {
    /// Acoustic cost of `ilabel` at `frame`.
    fn acoustic_cost(&mut self, frame: usize, ilabel: Label) -> f32;

    /// Number of frames that can currently be scored.
    fn num_frames_ready(&self) -> usize;

    /// Whether `frame` is the last frame currently available.
    fn is_last_frame(&self, frame: usize) -> bool {
        frame + 1 >= self.num_frames_ready()
    }
}

impl<S: Scorer + ?Sized> Scorer for &mut S {
    fn acoustic_cost(&mut self, frame: usize, ilabel: Label) -> f32 {
        (**self).acoustic_cost(frame, ilabel)
    }

    fn num_frames_ready(&self) -> usize {
        (**self).num_frames_ready()
    }
}

/// Caps the frames a scorer reports as ready.
///
/// Lets a caller advance the search by at most `max_frames` at a time.
pub struct FrameBudget<S> {
    inner: S,
    limit: usize,
}

impl<S: Scorer> FrameBudget<S> {
    /// Allow frames up to (excluding) `start + max_frames`.
    pub fn new(inner: S, start: usize, max_frames: usize) -> Self {
        Self {
            inner,
            limit: start.saturating_add(max_frames),
        }
    }
}

impl<S: Scorer> Scorer for FrameBudget<S> {
    fn acoustic_cost(&mut self, frame: usize, ilabel: Label) -> f32 {
        self.inner.acoustic_cost(frame, ilabel)
    }

    fn num_frames_ready(&self) -> usize {
        self.inner.num_frames_ready().min(self.limit)
    }
}

/// Scorer over a matrix of log-likelihoods, one row per frame.
///
/// Input label `i` reads column `i - 1`. The cost is the negated,
/// scaled log-likelihood. Frames can be appended while decoding.
#[derive(Clone, Debug)]
pub struct MatrixScorer {
    loglikes: Array2<f32>,
    acoustic_scale: f32,
}

impl MatrixScorer {
    pub fn new(loglikes: Array2<f32>, acoustic_scale: f32) -> Self {
        Self {
            loglikes,
            acoustic_scale,
        }
    }

    /// Empty scorer expecting rows of `num_labels` columns.
    pub fn empty(num_labels: usize, acoustic_scale: f32) -> Self {
        Self::new(Array2::zeros((0, num_labels)), acoustic_scale)
    }

    pub fn num_labels(&self) -> usize {
        self.loglikes.ncols()
    }

    /// Append frames at the end.
    pub fn push_frames(&mut self, frames: ArrayView2<f32>) -> Result<()> {
        if self.loglikes.nrows() == 0 {
            self.loglikes = frames.to_owned();
            return Ok(());
        }

        if frames.ncols() != self.loglikes.ncols() {
            return Err(DecodeError::ScoreDimension {
                expected: self.loglikes.ncols(),
                got: frames.ncols(),
            }
            .into());
        }

        self.loglikes
            .append(Axis(0), frames)
            .map_err(|e| DecodeError::Shape(e.to_string()))?;
        Ok(())
    }

    pub fn loglikes(&self) -> &Array2<f32> {
        &self.loglikes
    }
}

impl Scorer for MatrixScorer {
    fn acoustic_cost(&mut self, frame: usize, ilabel: Label) -> f32 {
        let Some(column) = (ilabel as usize).checked_sub(1) else {
            return 0.0;
        };

        self.loglikes
            .get((frame, column))
            .map_or(f32::INFINITY, |&ll| -self.acoustic_scale * ll)
    }

    fn num_frames_ready(&self) -> usize {
        self.loglikes.nrows()
    }
}

/// Parse a text matrix.
///
/// Rows are whitespace-separated numbers, one frame per line. Kaldi-style
/// framing (`key [` … `]`) is accepted and ignored.
pub fn parse_text_matrix(text: &str) -> Result<Array2<f32>> {
    let mut data = Vec::new();
    let mut cols = None;
    let mut rows = 0;

    for (i, line) in text.lines().enumerate() {
        let lineno = i + 1;
        let mut row = Vec::new();

        for field in line.split_whitespace() {
            match field {
                "[" | "]" => continue,
                _ => match field.parse::<f32>() {
                    Ok(v) => row.push(v),
                    // utterance key before the opening bracket
                    Err(_) if row.is_empty() && line.contains('[') => continue,
                    Err(e) => {
                        return Err(GraphError::parse(lineno, format!("bad value {field:?}: {e}")).into());
                    }
                },
            }
        }

        if row.is_empty() {
            continue;
        }

        match cols {
            None => cols = Some(row.len()),
            Some(n) if n != row.len() => {
                return Err(GraphError::parse(
                    lineno,
                    format!("expected {n} columns, got {}", row.len()),
                )
                .into());
            }
            Some(_) => {}
        }

        data.extend(row);
        rows += 1;
    }

    let cols = cols.unwrap_or(0);
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| DecodeError::Shape(e.to_string()).into())
}

/// Read a text matrix from a file.
pub fn read_text_matrix(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let text = std::fs::read_to_string(path)?;
    parse_text_matrix(&text)
}
