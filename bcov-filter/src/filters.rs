use std::collections::BTreeSet;

use bcov_ir::{InsnId, MethodBody};

use crate::synchronized::match_synchronized;
use crate::try_with_resources::match_try_with_resources;

/// Receiver of instructions the coverage engine should not count.
pub trait FilterOutput {
    fn ignore(&mut self, insn: InsnId);
}

impl<F: FnMut(InsnId)> FilterOutput for F {
    fn ignore(&mut self, insn: InsnId) {
        self(insn)
    }
}

/// Ordered set of ignored instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredInsns {
    insns: BTreeSet<InsnId>,
}

impl IgnoredInsns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, insn: InsnId) -> bool {
        self.insns.contains(&insn)
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Contiguous runs as inclusive `(first, last)` pairs.
    pub fn spans(&self) -> Vec<(InsnId, InsnId)> {
        let mut spans: Vec<(InsnId, InsnId)> = Vec::new();
        for &id in &self.insns {
            match spans.last_mut() {
                Some((_, last)) if last.0 + 1 == id.0 => *last = id,
                _ => spans.push((id, id)),
            }
        }
        spans
    }
}

impl FilterOutput for IgnoredInsns {
    fn ignore(&mut self, insn: InsnId) {
        self.insns.insert(insn);
    }
}

/// Which filters run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub try_with_resources: bool,
    pub synchronized: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            try_with_resources: true,
            synchronized: true,
        }
    }
}

/// Runs the enabled filters over method bodies.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    config: FilterConfig,
}

impl Filters {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> FilterConfig {
        self.config
    }

    /// Report every instruction of every recognised span to `output`,
    /// span by span in forward order.
    pub fn filter(&self, method: &MethodBody, output: &mut dyn FilterOutput) {
        if self.config.try_with_resources {
            filter_try_with_resources(method, output);
        }
        if self.config.synchronized {
            filter_synchronized(method, output);
        }
    }
}

fn ignore_span(method: &MethodBody, from: InsnId, to: InsnId, output: &mut dyn FilterOutput) {
    log::debug!("{}{}: ignoring {}..={}", method.name, method.desc, from.0, to.0);
    for id in method.insns.range(from, to) {
        output.ignore(id);
    }
}

fn filter_try_with_resources(method: &MethodBody, output: &mut dyn FilterOutput) {
    for from in method.insns.ids() {
        if let Some(to) = match_try_with_resources(&method.insns, from) {
            ignore_span(method, from, to, output);
        }
    }
}

fn filter_synchronized(method: &MethodBody, output: &mut dyn FilterOutput) {
    for tc in &method.try_catch_blocks {
        let Some(to) = match_synchronized(&method.insns, tc) else {
            continue;
        };
        // The span starts at the handler label itself.
        if let Some(from) = method.handler_position(tc) {
            ignore_span(method, from, to, output);
        }
    }
}
