//! Stream-backed producer: runs the segmenter over a byte stream and pushes
//! each line into the engine-owned input queue.

use std::io::{BufReader, Read};
use std::ops::ControlFlow;

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{Span, debug};

use super::queue::CancelToken;
use crate::segment::{SegmentEnd, for_each_line};

/// Spawn the producer thread.
///
/// The returned receiver yields exactly one [`SegmentEnd`]. It is sent before
/// the input sender is dropped, so by the time the workers observe the input
/// closed the outcome is already available.
pub(crate) fn spawn_producer<R>(
    reader: R,
    input: Sender<String>,
    cancel: CancelToken,
    run_span: Span,
) -> std::io::Result<Receiver<SegmentEnd>>
where
    R: Read + Send + 'static,
{
    let (end_tx, end_rx) = crossbeam_channel::bounded(1);

    std::thread::Builder::new()
        .name("fanreduce-producer".to_string())
        .spawn(move || {
            let _enter = run_span.enter();

            let end = for_each_line(BufReader::new(reader), |line| {
                if cancel.is_cancelled() {
                    return ControlFlow::Break(());
                }
                select! {
                    send(input, line) -> res => match res {
                        Ok(()) => ControlFlow::Continue(()),
                        // No worker left to receive.
                        Err(_) => ControlFlow::Break(()),
                    },
                    recv(cancel.signal()) -> _ => ControlFlow::Break(()),
                }
            });

            debug!(lines = end.lines(), "producer finished");
            let _ = end_tx.send(end);

            // Closes the input queue. This is the only sender.
            drop(input);
        })?;

    Ok(end_rx)
}
