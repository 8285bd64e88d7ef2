use std::io;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::cli::Settings;
use crate::record::RecordFormatter;
use crate::transport::RecordSink;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendSummary {
    pub records: u64,
    pub bytes: u64,
    pub failed: u64,
}

impl std::fmt::Display for SendSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sent {} records, {} bytes. Failed writes: {}",
            self.records, self.bytes, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The configured number of records went out.
    Completed(SendSummary),
    /// The run was cancelled by a shutdown signal.
    Interrupted(SendSummary),
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to write record {id}")]
    Write {
        id: u64,
        #[source]
        source: io::Error,
    },
}

// The sender owns the sink for the whole run and is the only one closing it.
pub struct Sender<S, R> {
    settings: Settings,
    sink: S,
    formatter: RecordFormatter<R>,
    cancel: CancellationToken,
}

impl<S: RecordSink, R: Rng> Sender<S, R> {
    pub fn new(settings: Settings, sink: S, rng: R, cancel: CancellationToken) -> Self {
        let formatter = RecordFormatter::new(settings.size, &settings.pairs, rng);
        Self {
            settings,
            sink,
            formatter,
            cancel,
        }
    }

    /// Sends records until the count is reached, a write fails fatally, or the token is
    /// cancelled. The sink is closed once on the way out in every case.
    pub async fn run(mut self) -> Result<Outcome, SendError> {
        let result = self.send_loop().await;
        if let Err(err) = self.sink.close().await {
            tracing::debug!("Error closing connection: {}", err);
        }
        result
    }

    async fn send_loop(&mut self) -> Result<Outcome, SendError> {
        let mut summary = SendSummary::default();
        // Ids are 1-based and grow by one per iteration, whether or not the write succeeds,
        // so a listener can spot dropped records by the gaps.
        let mut id: u64 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Outcome::Interrupted(summary));
            }
            id += 1;
            let record = self.formatter.format(id);
            if self.settings.verbosity > 0 {
                tracing::info!("{}", record);
            }
            let mut line = record.into_bytes();
            line.push(b'\n');

            // We race the write against the cancellation token: a write to a TCP peer that
            // stopped reading can block for as long as the kernel buffers stay full, and we
            // don't want a Ctrl-C to wait on that. A signal arriving mid-write drops the
            // write, and the record is neither counted nor retried.
            let written = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(Outcome::Interrupted(summary)),
                res = self.sink.write_line(&line) => res,
            };
            summary.records += 1;
            let n = match written {
                Ok(n) => n,
                Err(source) if self.settings.exit_on_write_error => {
                    return Err(SendError::Write { id, source })
                }
                Err(err) => {
                    // Not fatal by default, so a listener can be started after the sender.
                    tracing::warn!("{}", err);
                    summary.failed += 1;
                    0
                }
            };
            summary.bytes += n as u64;
            if self.settings.verbosity > 1 {
                tracing::info!("wrote {} bytes", n);
            }

            if self.settings.count > 0 && id >= self.settings.count {
                return Ok(Outcome::Completed(summary));
            }

            // The interval wait is the only place the loop otherwise sits idle, so it's also
            // raced against the token. There is no wait after the last record: the loop
            // returned above once the count was reached.
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(Outcome::Interrupted(summary)),
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }
}
