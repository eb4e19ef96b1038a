//utils for graceful shutdown of the sync loop
use tokio::signal;
use tokio_util::sync::CancellationToken;

pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let tc = token.clone();
    //spawn once to listen for ctrl-c
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received ctrl-c, finishing current request");
                tc.cancel();
            }
            Err(err) => tracing::warn!("failed to install ctrl+C handler: {}", err),
        }
    });
    token
}
