//! Whole-batch composites: per-pixel max, per-pixel mean and the heatmap overlay.

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("size mismatch: base is {base_w}x{base_h}x{base_c}, heatmap is {heat_w}x{heat_h}x{heat_c}")]
    SizeMismatch {
        base_w: u32,
        base_h: u32,
        base_c: u8,
        heat_w: u32,
        heat_h: u32,
        heat_c: u8,
    },
}

/// Running max and sum over frames that share the first frame's size.
///
/// Frames are folded in one at a time so a batch never has to be held in
/// memory. Incompatible frames are rejected with a warning.
pub struct FrameStack {
    first: Frame,
    max: Vec<u8>,
    sums: Vec<u64>,
    count: u64,
}

impl FrameStack {
    pub fn new(first: Frame) -> Self {
        let max = first.data().to_vec();
        let sums = first.data().iter().map(|&v| v as u64).collect();
        Self {
            first,
            max,
            sums,
            count: 1,
        }
    }

    /// Folds `frame` in. Returns `false` if it was skipped.
    pub fn push(&mut self, frame: &Frame) -> bool {
        if !frame.same_size(&self.first) || frame.channels() != self.first.channels() {
            log::warn!(
                "Skipping {} ({}x{}): size differs from {}x{}",
                frame.name(),
                frame.width(),
                frame.height(),
                self.first.width(),
                self.first.height()
            );
            return false;
        }
        for ((m, s), &v) in self.max.iter_mut().zip(self.sums.iter_mut()).zip(frame.data()) {
            *m = (*m).max(v);
            *s += v as u64;
        }
        self.count += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn first(&self) -> &Frame {
        &self.first
    }

    /// Per-pixel, per-channel maximum.
    pub fn max(&self) -> Frame {
        self.shaped(self.max.clone())
    }

    /// Per-pixel, per-channel mean, truncated to an integer.
    pub fn mean(&self) -> Frame {
        let data = self.sums.iter().map(|&s| (s / self.count) as u8).collect();
        self.shaped(data)
    }

    fn shaped(&self, data: Vec<u8>) -> Frame {
        Frame::new(
            data,
            self.first.width(),
            self.first.height(),
            self.first.channels(),
            0,
        )
    }
}

fn stack(frames: &[Frame]) -> Option<FrameStack> {
    let (first, rest) = frames.split_first()?;
    let mut stack = FrameStack::new(first.clone());
    for f in rest {
        stack.push(f);
    }
    Some(stack)
}

/// Per-pixel, per-channel maximum. `None` for an empty batch.
pub fn max_projection(frames: &[Frame]) -> Option<Frame> {
    stack(frames).map(|s| s.max())
}

/// Per-pixel, per-channel mean, truncated to an integer. `None` for an empty batch.
pub fn mean_stack(frames: &[Frame]) -> Option<Frame> {
    stack(frames).map(|s| s.mean())
}

/// `alpha * heat + (1 - alpha) * base`, rounded. `alpha` is clamped to `[0, 1]`.
pub fn overlay(base: &Frame, heat: &Frame, alpha: f64) -> Result<Frame, CompositeError> {
    if !base.same_size(heat) || base.channels() != heat.channels() {
        return Err(CompositeError::SizeMismatch {
            base_w: base.width(),
            base_h: base.height(),
            base_c: base.channels(),
            heat_w: heat.width(),
            heat_h: heat.height(),
            heat_c: heat.channels(),
        });
    }
    let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    let data = base
        .data()
        .iter()
        .zip(heat.data())
        .map(|(&b, &h)| (alpha * h as f64 + (1.0 - alpha) * b as f64).round().clamp(0.0, 255.0) as u8)
        .collect();
    Ok(Frame::new(data, base.width(), base.height(), base.channels(), base.index()))
}
