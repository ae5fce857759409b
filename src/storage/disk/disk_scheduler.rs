use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::common::{PageId, Result, StrataError, PAGE_SIZE};

use super::DiskManager;

type PageBuf = Box<[u8; PAGE_SIZE]>;

/// A disk I/O request handed to the worker thread. Buffers are owned
/// by the request and travel back through the ack channel, so there is
/// no pointer lifetime to reason about.
enum DiskRequest {
    Read {
        page_id: PageId,
        buf: PageBuf,
        ack: Sender<Result<PageBuf>>,
    },
    Write {
        page_id: PageId,
        buf: PageBuf,
        ack: Sender<Result<()>>,
    },
}

/// DiskScheduler funnels page I/O through a single background worker,
/// decoupling request submission from the disk manager's blocking
/// calls. The buffer pool only uses the synchronous wrappers.
pub struct DiskScheduler {
    disk_manager: Arc<DiskManager>,
    request_tx: Sender<DiskRequest>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (request_tx, request_rx) = bounded::<DiskRequest>(64);
        let shutdown = Arc::new(AtomicBool::new(false));

        let dm = Arc::clone(&disk_manager);
        let stop = Arc::clone(&shutdown);
        let worker = thread::spawn(move || Self::run_worker(dm, request_rx, stop));

        Self {
            disk_manager,
            request_tx,
            shutdown,
            worker: Some(worker),
        }
    }

    /// Reads `page_id` into `data`, blocking until the worker is done.
    pub fn read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let mut buf: PageBuf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);
        let (ack_tx, ack_rx) = bounded(1);
        self.submit(DiskRequest::Read {
            page_id,
            buf,
            ack: ack_tx,
        })?;

        let buf = ack_rx
            .recv()
            .map_err(|e| StrataError::Channel(e.to_string()))??;
        data.copy_from_slice(&buf[..]);
        Ok(())
    }

    /// Writes `data` to `page_id`, blocking until the worker is done.
    pub fn write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let mut buf: PageBuf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);
        let (ack_tx, ack_rx) = bounded(1);
        self.submit(DiskRequest::Write {
            page_id,
            buf,
            ack: ack_tx,
        })?;

        ack_rx
            .recv()
            .map_err(|e| StrataError::Channel(e.to_string()))?
    }

    fn submit(&self, request: DiskRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|e| StrataError::DiskScheduler(format!("failed to queue request: {e}")))
    }

    fn run_worker(
        disk_manager: Arc<DiskManager>,
        requests: Receiver<DiskRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Drain whatever is still queued before exiting.
                while let Ok(request) = requests.try_recv() {
                    Self::process(&disk_manager, request);
                }
                break;
            }

            match requests.recv_timeout(std::time::Duration::from_millis(100)) {
                Ok(request) => Self::process(&disk_manager, request),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process(disk_manager: &DiskManager, request: DiskRequest) {
        match request {
            DiskRequest::Read {
                page_id,
                mut buf,
                ack,
            } => {
                let result = disk_manager
                    .read_page(page_id, &mut buf[..])
                    .map(move |()| buf);
                let _ = ack.send(result);
            }
            DiskRequest::Write { page_id, buf, ack } => {
                let _ = ack.send(disk_manager.write_page(page_id, &buf[..]));
            }
        }
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
