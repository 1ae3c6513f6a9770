use std::io;

use tokio::runtime::{Builder, Runtime};

/// Build the reactor runtime: one worker per core when `multicore`, a
/// single-threaded event loop otherwise.
pub fn build_runtime(multicore: bool) -> io::Result<Runtime> {
    let mut builder = if multicore {
        Builder::new_multi_thread()
    } else {
        Builder::new_current_thread()
    };
    builder.enable_all().thread_name("relay-worker").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_core_runtime_runs_tasks() {
        let rt = build_runtime(false).unwrap();
        let value = rt.block_on(async { tokio::spawn(async { 7 }).await.unwrap() });
        assert_eq!(value, 7);
    }

    #[test]
    fn multicore_runtime_runs_tasks() {
        let rt = build_runtime(true).unwrap();
        let value = rt.block_on(async { tokio::spawn(async { 11 }).await.unwrap() });
        assert_eq!(value, 11);
    }
}
