use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels the monitor on Ctrl-C, or returns once something else cancelled it.
///
/// Detached processes on Windows never see the signal, `screenbreak stop` terminates them
/// instead.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Received interrupt, shutting down");
                cancelation.cancel();
            }
            Err(e) => {
                error!("Failed to listen for interrupt {e:?}");
                cancelation.cancelled().await;
            }
        },
        _ = cancelation.cancelled() => (),
    };
}
