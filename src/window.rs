// src/window.rs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// Sizing and stride of the sliding windows, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowParams {
    pub min_size: usize,
    pub max_size: usize,
    pub size_step: usize,
    pub stride: usize,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            min_size: 35,
            max_size: 35,
            size_step: 1,
            stride: 25,
        }
    }
}

impl WindowParams {
    pub fn new(min_size: usize, max_size: usize, size_step: usize, stride: usize) -> Self {
        Self {
            min_size,
            max_size,
            size_step,
            stride,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            return Err(Error::InvalidWindowParams("min_size must be > 0".to_string()));
        }
        if self.size_step == 0 {
            return Err(Error::InvalidWindowParams("size_step must be > 0".to_string()));
        }
        if self.stride == 0 {
            return Err(Error::InvalidWindowParams("stride must be > 0".to_string()));
        }
        if self.min_size > self.max_size {
            return Err(Error::InvalidWindowParams(format!(
                "min_size ({}) cannot exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

/// Half-open range `[start, end)` over a file's normalized lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a, T>(&self, lines: &'a [T]) -> &'a [T] {
        &lines[self.start..self.end]
    }
}

/// Lazily yields every window of a file: growing sizes, and for each size,
/// growing start offsets. The order decides which window a short-circuit scan
/// stops on.
///
/// Both size bounds are clamped to the file length, so a file shorter than
/// `min_size` still gets exactly one window covering all of it.
pub fn generate(total_lines: usize, params: &WindowParams) -> Windows {
    Windows {
        total_lines,
        size: params.min_size.min(total_lines),
        max_size: params.max_size.min(total_lines),
        size_step: params.size_step.max(1),
        stride: params.stride.max(1),
        start: 0,
        done: total_lines == 0,
    }
}

/// Closed-form number of windows `generate` yields.
pub fn window_count(total_lines: usize, params: &WindowParams) -> usize {
    if total_lines == 0 {
        return 0;
    }
    let min = params.min_size.min(total_lines);
    let max = params.max_size.min(total_lines);
    let stride = params.stride.max(1);

    (min..=max)
        .step_by(params.size_step.max(1))
        .map(|size| (total_lines - size) / stride + 1)
        .sum()
}

#[derive(Debug, Clone)]
pub struct Windows {
    total_lines: usize,
    size: usize,
    max_size: usize,
    size_step: usize,
    stride: usize,
    start: usize,
    done: bool,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        while !self.done {
            if self.size > self.max_size {
                self.done = true;
                break;
            }

            if let Some(end) = self.start.checked_add(self.size) {
                if end <= self.total_lines {
                    let window = Window { start: self.start, end };
                    self.start = self.start.saturating_add(self.stride);
                    return Some(window);
                }
            }

            self.start = 0;
            match self.size.checked_add(self.size_step) {
                Some(next) => self.size = next,
                None => self.done = true,
            }
        }
        None
    }
}

impl FusedIterator for Windows {}
