use anyhow::Result;

/// The monitor only ever needs one thread: desktop queries and the state machine run on the poll
/// loop and speech children are awaited by tasks on the same thread.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
