use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Runtime behind every Azure, pricing and worker-pool future. Created on
/// first use so `--init/--print/--check` never start it.
pub static GLOBAL_RUNTIME: Lazy<Arc<Runtime>> = Lazy::new(|| {
    Arc::new(
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("azcost-worker")
            .build()
            .expect("Failed to create tokio runtime"),
    )
});

/// Run an estimation step to completion from the synchronous CLI.
/// Must not be called from inside the runtime itself.
pub fn block_on<F, T>(future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    GLOBAL_RUNTIME.block_on(future)
}
