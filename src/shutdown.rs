use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `token` on the first Ctrl-C, or SIGTERM on Unix. The sender watches the token
/// between records and while waiting out the interval.
pub fn listen(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_signal() => match res {
                Ok(()) => {
                    tracing::debug!("Shutdown signal received");
                    token.cancel();
                }
                Err(err) => {
                    // The OS refused to register the handler. The run goes on, it just
                    // can't be stopped gracefully.
                    tracing::debug!("{}", err);
                }
            },
            // Nothing left to listen for once the run is over.
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
