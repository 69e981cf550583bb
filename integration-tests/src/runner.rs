use super::*;
use std::thread::JoinHandle;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

/// Runs a server on its own thread and runtime, until dropped.
pub struct Runner {
    name: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl Runner {
    pub fn spawn<F, Fut>(name: &str, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let (tx, rx) = oneshot::channel::<()>();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || -> anyhow::Result<()> {
                let runtime = Runtime::new()?;
                runtime.block_on(async {
                    select! {
                        result = f() => result,
                        _ = rx => Ok(()),
                    }
                })
            })
            .expect("spawn runner thread");

        Self {
            name: name.to_string(),
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // the server may already be gone
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::warn!("{} failed: {err}", self.name),
                Err(_) => log::warn!("{} panicked", self.name),
            }
        }
    }
}
