use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How the target treats each accepted connection.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    /// Reply `ok` to the first bytes received, after `delay`
    Reply { delay: Duration },
    /// Read everything, never answer
    Silent,
    /// Close right after accept
    Drop,
    /// Close the first `n` connections, reply to the rest
    DropFirst(u64),
}

pub struct TestServer {
    addr: SocketAddr,
    accepted: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connections accepted so far
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Binds a random local port and serves `mode` on the current runtime.
pub async fn spawn_test_server(mode: Mode) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU64::new(0));

    let handle = tokio::spawn(serve(listener, mode, accepted.clone()));

    TestServer { addr, accepted, handle }
}

async fn serve(listener: TcpListener, mode: Mode, accepted: Arc<AtomicU64>) {
    loop {
        let Ok((socket, _)) = listener.accept().await else {
            continue;
        };
        let n = accepted.fetch_add(1, Ordering::Relaxed) + 1;
        match mode {
            Mode::Drop => drop(socket),
            Mode::DropFirst(first) if n <= first => drop(socket),
            Mode::DropFirst(_) => {
                tokio::spawn(answer(socket, Some(Duration::ZERO)));
            }
            Mode::Reply { delay } => {
                tokio::spawn(answer(socket, Some(delay)));
            }
            Mode::Silent => {
                tokio::spawn(answer(socket, None));
            }
        }
    }
}

// Keeps reading until the client hangs up so the reply is never cut off by a reset.
async fn answer(mut socket: TcpStream, reply_after: Option<Duration>) {
    let mut buf = [0u8; 8192];
    let mut replied = reply_after.is_none();
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        if !replied {
            if let Some(delay) = reply_after {
                tokio::time::sleep(delay).await;
            }
            if socket.write_all(b"ok").await.is_err() {
                return;
            }
            replied = true;
        }
    }
}

/// An address nothing listens on: bound once to get a free port, then released.
pub fn refused_address() -> SocketAddr {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// A target running on its own thread and runtime, for blocking tests that
/// drive the binary.
pub struct BackgroundServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

pub fn spawn_background_server(mode: Mode) -> BackgroundServer {
    let (addr_tx, addr_rx) = std::sync::mpsc::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let thread = std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let server = spawn_test_server(mode).await;
            addr_tx.send(server.addr).unwrap();
            let _ = shutdown_rx.await;
        });
    });

    let addr = addr_rx.recv().expect("test server failed to start");
    BackgroundServer {
        addr,
        shutdown: Some(shutdown_tx),
        thread: Some(thread),
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
