//! Printing store notices as one-line messages.
//!
//! The stores publish [`Notice`]s on the event bus; a background task
//! subscribed to the bus writes each one to a terminal sink. Other events
//! are ignored here.

use std::io::Write;
use std::time::Duration;

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use docchat_core::event::EventBus;
use docchat_types::event::{Notice, NoticeLevel, StoreEvent};

/// How long exit waits for queued notices once the bus has closed.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// One styled line for `notice`, without a trailing newline.
pub fn format_notice(notice: &Notice) -> String {
    let marker = match notice.level {
        NoticeLevel::Info => style("i").blue().bold(),
        NoticeLevel::Success => style("✓").green().bold(),
        NoticeLevel::Error => style("!").red().bold(),
    };
    format!("  {marker} {}", notice.text)
}

/// Print every notice published on `bus` to `sink` until the bus closes.
pub fn spawn_notice_printer<W>(bus: &EventBus, mut sink: W) -> JoinHandle<()>
where
    W: Write + Send + 'static,
{
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StoreEvent::Notice(notice)) => {
                    let _ = writeln!(sink, "{}", format_notice(&notice));
                    let _ = sink.flush();
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "notice printer lagged behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Wait for `printer` to write the notices still queued on the bus.
///
/// Every bus sender must already be dropped, otherwise this only returns
/// after the timeout.
pub async fn finish_notice_printer(printer: JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_TIMEOUT, printer).await.is_err() {
        tracing::debug!("notice printer still running at exit");
    }
}
