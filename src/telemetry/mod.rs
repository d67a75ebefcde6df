//! 追踪接口：编排器在每轮请求与每次工具调用时开启子 span。
//!
//! Tracer/span contract consumed by the orchestrator.
//!
//! A run opens one root span on the caller's [`Tracer`]; every turn and every tool call
//! opens a child of that root. Every span is ended on every path except one: when the
//! provider fails with a transport error, the open turn span and the root span are left
//! un-ended instead of being closed with a made-up status.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Tracer`] / [`Span`] | Contract implemented by the caller's tracing backend |
//! | [`NoopTracer`] | Default when the caller supplies nothing |
//! | [`InMemoryTracer`] | Records every span, for tests and debugging |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Run,
    Llm,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
}

/// One open unit of work.
pub trait Span: Send + Sync {
    /// Open a nested span.
    fn start_span(&self, name: &str, kind: SpanKind) -> Box<dyn Span>;

    fn set_result(&self, result: Value);

    /// Close the span. Only the first call counts.
    fn end(&self, status: SpanStatus);
}

pub trait Tracer: Send + Sync {
    fn start_span(&self, name: &str, kind: SpanKind) -> Box<dyn Span>;
}

/// Tracer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

impl Tracer for NoopTracer {
    fn start_span(&self, _name: &str, _kind: SpanKind) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }
}

impl Span for NoopSpan {
    fn start_span(&self, _name: &str, _kind: SpanKind) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }

    fn set_result(&self, _result: Value) {}

    fn end(&self, _status: SpanStatus) {}
}

/// A span as recorded by [`InMemoryTracer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub id: usize,
    pub parent: Option<usize>,
    pub name: String,
    pub kind: SpanKind,
    pub result: Option<Value>,
    /// `None` while the span is still open.
    pub status: Option<SpanStatus>,
}

impl SpanRecord {
    pub fn is_open(&self) -> bool {
        self.status.is_none()
    }
}

/// Tracer keeping every span in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracer {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl InMemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Vec<SpanRecord>> {
        lock(&self.spans)
    }

    /// Snapshot of all spans in creation order.
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.store().clone()
    }

    pub fn spans_of_kind(&self, kind: SpanKind) -> Vec<SpanRecord> {
        self.store()
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }

    pub fn children_of(&self, id: usize) -> Vec<SpanRecord> {
        self.store()
            .iter()
            .filter(|s| s.parent == Some(id))
            .cloned()
            .collect()
    }

    /// Spans that were never ended.
    pub fn open_spans(&self) -> Vec<SpanRecord> {
        self.store().iter().filter(|s| s.is_open()).cloned().collect()
    }

    pub fn clear(&self) {
        self.store().clear();
    }

    fn open(&self, parent: Option<usize>, name: &str, kind: SpanKind) -> Box<dyn Span> {
        let mut spans = self.store();
        let id = spans.len();
        spans.push(SpanRecord {
            id,
            parent,
            name: name.to_string(),
            kind,
            result: None,
            status: None,
        });
        Box::new(InMemorySpan {
            id,
            tracer: self.clone(),
        })
    }
}

impl Tracer for InMemoryTracer {
    fn start_span(&self, name: &str, kind: SpanKind) -> Box<dyn Span> {
        self.open(None, name, kind)
    }
}

struct InMemorySpan {
    id: usize,
    tracer: InMemoryTracer,
}

impl Span for InMemorySpan {
    fn start_span(&self, name: &str, kind: SpanKind) -> Box<dyn Span> {
        self.tracer.open(Some(self.id), name, kind)
    }

    fn set_result(&self, result: Value) {
        if let Some(record) = self.tracer.store().get_mut(self.id) {
            record.result = Some(result);
        }
    }

    fn end(&self, status: SpanStatus) {
        if let Some(record) = self.tracer.store().get_mut(self.id) {
            record.status.get_or_insert(status);
        }
    }
}

// A panic while holding the lock leaves the records intact; keep using them.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_tracer_records_hierarchy() {
        let tracer = InMemoryTracer::new();
        let root = tracer.start_span("run", SpanKind::Run);
        let turn = root.start_span("turn 1", SpanKind::Llm);
        let tool = root.start_span("tool web_search", SpanKind::Tool);
        turn.set_result(json!({"finish_reason": "function_call"}));
        turn.end(SpanStatus::Ok);
        tool.end(SpanStatus::Error);

        let spans = tracer.spans();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].parent, Some(0));
        assert_eq!(spans[2].parent, Some(0));
        assert_eq!(spans[1].result, Some(json!({"finish_reason": "function_call"})));
        assert_eq!(spans[2].status, Some(SpanStatus::Error));
        assert_eq!(tracer.children_of(0).len(), 2);

        let open = tracer.open_spans();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].kind, SpanKind::Run);
    }

    #[test]
    fn test_first_end_wins() {
        let tracer = InMemoryTracer::new();
        let span = tracer.start_span("run", SpanKind::Run);
        span.end(SpanStatus::Error);
        span.end(SpanStatus::Ok);
        assert_eq!(tracer.spans()[0].status, Some(SpanStatus::Error));
    }

    #[test]
    fn test_noop_tracer_accepts_everything() {
        let span = NoopTracer.start_span("run", SpanKind::Run);
        let child = span.start_span("turn", SpanKind::Llm);
        child.set_result(json!(null));
        child.end(SpanStatus::Ok);
        span.end(SpanStatus::Ok);
    }
}
