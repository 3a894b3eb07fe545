// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-sink fan-out for child output streams.
//!
//! The same byte stream goes to up to three consumers: the operator log,
//! a bounded diagnostic tail, and the model-specific parser. Each sink is
//! independent and buffers on its own.

use herd_adapters::model::LineBuffer;
use herd_adapters::StreamSink;
use herd_core::InstanceId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Writes every chunk to each of its sinks, in order.
pub struct TeeSink {
    sinks: Vec<Box<dyn StreamSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Box<dyn StreamSink>>) -> Self {
        Self { sinks }
    }
}

impl StreamSink for TeeSink {
    fn push(&mut self, chunk: &[u8]) {
        for sink in &mut self.sinks {
            sink.push(chunk);
        }
    }
}

/// Bounded tail of a byte stream, shared with whoever reports crashes.
///
/// Keeps the most recent `cap` bytes; older bytes fall off the front.
#[derive(Clone)]
pub struct SharedTail {
    cap: usize,
    buf: Arc<Mutex<VecDeque<u8>>>,
}

impl SharedTail {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// The retained tail, lossily decoded.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock();
        let bytes: Vec<u8> = buf.iter().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl StreamSink for SharedTail {
    fn push(&mut self, chunk: &[u8]) {
        let mut buf = self.buf.lock();
        buf.extend(chunk.iter().copied());
        while buf.len() > self.cap {
            buf.pop_front();
        }
    }
}

/// Forwards child output to the operator log, line by line.
pub struct ConsoleSink {
    instance: InstanceId,
    stream: &'static str,
    lines: LineBuffer,
}

impl ConsoleSink {
    pub fn new(instance: InstanceId, stream: &'static str) -> Self {
        Self {
            instance,
            stream,
            lines: LineBuffer::new(),
        }
    }
}

impl StreamSink for ConsoleSink {
    fn push(&mut self, chunk: &[u8]) {
        let instance = &self.instance;
        let stream = self.stream;
        self.lines.push(chunk, |line| {
            tracing::debug!(instance = %instance, stream, line, "child output");
        });
    }
}

#[cfg(test)]
#[path = "tee_tests.rs"]
mod tests;
