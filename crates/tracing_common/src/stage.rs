// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Pipeline stage tracking for tracing

use std::time::Instant;

use tracing::{Span, debug, info_span};

/// Tracks a single pipeline stage, entered for as long as it is alive
pub struct Stage {
    name: &'static str,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl Stage {
    pub fn begin(name: &'static str) -> Self {
        debug!(stage = name, event_type = "stage_start", "Starting stage: {name}");

        Self {
            name,
            started: Instant::now(),
            _span: create_stage_span(name).entered(),
        }
    }

    pub fn finish(self) {
        debug!(
            stage = self.name,
            duration_ms = self.started.elapsed().as_millis() as u64,
            event_type = "stage_completed",
            "Stage completed: {}",
            self.name
        );
    }
}

pub fn create_stage_span(name: &str) -> Span {
    info_span!("stage", name)
}
