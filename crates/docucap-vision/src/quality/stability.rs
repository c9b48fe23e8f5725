// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temporal corner stability tracking.

use std::collections::VecDeque;

use docucap_core::config::QualityConfig;
use docucap_core::geometry::CornerSet;

/// Scores how still the tracked quadrilateral is across recent frames.
///
/// Keeps a bounded FIFO of corner sets. Until `warmup` sets have been
/// recorded every observation scores 0; after that the score falls linearly
/// with the mean corner displacement against every retained set, reaching 0
/// at `max_displacement` pixels.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    history: VecDeque<CornerSet>,
    window: usize,
    warmup: usize,
    max_displacement: f32,
}

impl StabilityTracker {
    pub fn new(window: usize, warmup: usize, max_displacement: f32) -> Self {
        let window = window.max(1);
        Self {
            history: VecDeque::with_capacity(window + 1),
            window,
            warmup: warmup.min(window),
            max_displacement,
        }
    }

    pub fn from_config(config: &QualityConfig) -> Self {
        Self::new(
            config.stability_window,
            config.stability_warmup,
            config.stability_max_displacement,
        )
    }

    /// Record `corners` and return the stability score for this frame.
    pub fn observe(&mut self, corners: &CornerSet) -> f32 {
        if self.history.len() < self.warmup {
            self.push(*corners);
            return 0.0;
        }

        let score = match self.mean_displacement(corners) {
            Some(avg) => (1.0 - avg / self.max_displacement).max(0.0),
            None => 0.0,
        };
        self.push(*corners);
        score
    }

    /// Mean per-corner distance from `corners` to every retained set.
    pub fn mean_displacement(&self, corners: &CornerSet) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        let total: f32 = self
            .history
            .iter()
            .flat_map(|prev| {
                prev.points()
                    .iter()
                    .zip(corners.points())
                    .map(|(a, b)| a.distance(b))
            })
            .sum();
        Some(total / (self.history.len() * 4) as f32)
    }

    fn push(&mut self, corners: CornerSet) {
        self.history.push_back(corners);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Retained corner sets, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CornerSet> {
        self.history.iter()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}
