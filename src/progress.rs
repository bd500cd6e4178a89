//! Progress/log channel.
//!
//! Pipeline progress is pushed to an optional sink owned by the caller.
//! A sink that fails is logged and ignored; it never affects control flow.

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub trait ProgressSink: Send + Sync {
    fn send(&self, line: &str) -> Result<()>;
}

/// Forward progress lines to a channel, e.g. a chat notifier task.
impl ProgressSink for UnboundedSender<String> {
    fn send(&self, line: &str) -> Result<()> {
        UnboundedSender::send(self, line.to_string())
            .map_err(|_| anyhow::anyhow!("progress receiver dropped"))
    }
}

/// Adapts a plain closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn send(&self, line: &str) -> Result<()> {
        (self.0)(line);
        Ok(())
    }
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn send(&self, _line: &str) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn emit(sink: Option<&dyn ProgressSink>, line: &str) {
    if let Some(sink) = sink {
        if let Err(e) = sink.send(line) {
            debug!("Progress sink rejected line: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_sink_receives_lines() {
        let seen = Mutex::new(Vec::new());
        let sink = FnSink(|line: &str| seen.lock().unwrap().push(line.to_string()));
        emit(Some(&sink), "hello");
        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn closed_channel_is_swallowed() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        drop(rx);
        assert!(ProgressSink::send(&tx, "lost").is_err());
        emit(Some(&tx), "lost");
        emit(Some(&NoopSink), "ignored");
        emit(None, "nowhere");
    }
}
