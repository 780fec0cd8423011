// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reassembles fragmented tool-call deltas into complete calls.
//!
//! Providers stream tool calls in pieces keyed by a per-call index: the
//! id and name usually arrive on the first fragment, the JSON arguments
//! trickle in over many. Fragments are concatenated per index and the
//! arguments string is handed on only once the stream has finished.

use std::collections::BTreeMap;

use kontor_core::{ToolCall, new_id};

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Per-index buffers for one streaming response.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: BTreeMap<usize, PendingCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one delta into the buffer for its index.
    pub fn push(&mut self, index: usize, id: Option<String>, name: Option<String>, arguments: &str) {
        let entry = self.pending.entry(index).or_default();
        if let Some(id) = id {
            entry.id = Some(id);
        }
        if let Some(name) = name {
            entry.name = Some(name);
        }
        entry.arguments.push_str(arguments);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Completed calls in index order. Calls that never received a name
    /// are dropped; a missing id gets a synthesized one so the tool
    /// result can still be correlated.
    pub fn finish(self) -> Vec<ToolCall> {
        self.pending
            .into_values()
            .filter_map(|pending| {
                let name = pending.name?;
                Some(ToolCall {
                    id: pending.id.unwrap_or_else(new_id),
                    name,
                    arguments: if pending.arguments.is_empty() {
                        "{}".to_string()
                    } else {
                        pending.arguments
                    },
                })
            })
            .collect()
    }
}
