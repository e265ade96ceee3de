use super::mem::MemStorage;
use crate::util::comparator::Comparator;
use crate::{Error, Result};
use crossbeam_channel::{bounded, unbounded, Sender};
use slog::{info, warn, Logger};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

enum Message {
    EvictAll,
    EvictRandom(usize),
    /// Acknowledged once every earlier message has been handled.
    Sync(Sender<()>),
    Shutdown,
}

/// A background thread evicting pages of a `MemStorage` on request, so
/// eviction can race with cursor traversal.
pub struct Evictor {
    sender: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl Evictor {
    pub fn spawn<C: Comparator + 'static>(
        storage: Arc<MemStorage<C>>,
        logger: Logger,
    ) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("boundkv-evictor".to_owned())
            .spawn(move || {
                info!(logger, "evictor started");
                for msg in receiver.iter() {
                    let res = match msg {
                        Message::EvictAll => storage.evict_all(),
                        Message::EvictRandom(n) => storage.evict_random(n),
                        Message::Sync(ack) => {
                            let _ = ack.send(());
                            continue;
                        }
                        Message::Shutdown => break,
                    };
                    if let Err(e) = res {
                        warn!(logger, "background eviction failed"; "error" => %e);
                    }
                }
                info!(logger, "evictor stopped");
            })?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    pub fn evict_all(&self) -> Result<()> {
        self.send(Message::EvictAll)
    }

    pub fn evict_random(&self, n: usize) -> Result<()> {
        self.send(Message::EvictRandom(n))
    }

    /// Blocks until every request sent so far has been handled.
    pub fn sync(&self) -> Result<()> {
        let (ack, done) = bounded(1);
        self.send(Message::Sync(ack))?;
        done.recv()
            .map_err(|_| Error::InvalidArgument("evictor stopped".to_owned()))
    }

    fn send(&self, msg: Message) -> Result<()> {
        self.sender
            .send(msg)
            .map_err(|_| Error::InvalidArgument("evictor stopped".to_owned()))
    }
}

impl Drop for Evictor {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
