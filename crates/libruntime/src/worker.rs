use std::convert::Infallible;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use libconfig::LoadConfig;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use crate::events::{Event, EventSink};
use crate::retry::RetryPolicy;
use crate::slot::SampleSink;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("connect: {0}")]
    Connect(io::Error),
    #[error("write: {0}")]
    Write(io::Error),
    #[error("read: {0}")]
    Read(io::Error),
    #[error("connection closed before any response byte")]
    Closed,
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleErrorKind {
    Connect,
    Write,
    Read,
    Closed,
    Timeout,
}

impl CycleError {
    pub fn kind(&self) -> CycleErrorKind {
        match self {
            CycleError::Connect(_) => CycleErrorKind::Connect,
            CycleError::Write(_) => CycleErrorKind::Write,
            CycleError::Read(_) => CycleErrorKind::Read,
            CycleError::Closed => CycleErrorKind::Closed,
            CycleError::Timeout(_) => CycleErrorKind::Timeout,
        }
    }
}

impl fmt::Display for CycleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleErrorKind::Connect => "connect",
            CycleErrorKind::Write => "write",
            CycleErrorKind::Read => "read",
            CycleErrorKind::Closed => "closed",
            CycleErrorKind::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// What every cycle does, shared by all workers.
#[derive(Debug)]
pub struct CycleSpec {
    pub address: String,
    pub payload: Vec<u8>,
    /// Covers connect, write and read together
    pub timeout: Option<Duration>,
    pub read_buffer: usize,
}

impl From<&LoadConfig> for CycleSpec {
    fn from(config: &LoadConfig) -> Self {
        CycleSpec {
            address: config.target.address(),
            payload: config.payload.bytes(),
            timeout: config.timeout(),
            read_buffer: config.read_buffer,
        }
    }
}

pub struct Worker {
    id: usize,
    spec: Arc<CycleSpec>,
    retry: RetryPolicy,
    sink: SampleSink,
    events: EventSink<Event>,
}

impl Worker {
    pub fn new(
        id: usize,
        spec: Arc<CycleSpec>,
        retry: RetryPolicy,
        sink: SampleSink,
        events: EventSink<Event>,
    ) -> Self {
        Self { id, spec, retry, sink, events }
    }

    /// Runs cycles back to back until the task is dropped. A failed cycle is
    /// abandoned and the next one starts with its own clock.
    pub async fn run(mut self) -> Infallible {
        let mut buf = vec![0u8; self.spec.read_buffer];
        loop {
            match self.cycle(&mut buf).await {
                Ok((elapsed, stream)) => {
                    self.sink.deliver(elapsed);
                    drop(stream);
                    self.retry.on_success();
                }
                Err(err) => {
                    self.events.offer(|| Event::CycleFailed {
                        worker: self.id,
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                    match self.retry.on_failure() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        // a refused local connect can fail without ever yielding
                        None => tokio::task::yield_now().await,
                    }
                }
            }
        }
    }

    /// One connect, send, receive round. Returns the elapsed time and the
    /// still open stream so it is closed only after the sample is handed off.
    pub async fn cycle(&self, buf: &mut [u8]) -> Result<(Duration, TcpStream), CycleError> {
        let started = Instant::now();
        let stream = match self.spec.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(buf))
                .await
                .map_err(|_| CycleError::Timeout(limit))??,
            None => self.exchange(buf).await?,
        };
        Ok((started.elapsed(), stream))
    }

    async fn exchange(&self, buf: &mut [u8]) -> Result<TcpStream, CycleError> {
        let mut stream = TcpStream::connect(self.spec.address.as_str())
            .await
            .map_err(CycleError::Connect)?;

        stream
            .write_all(&self.spec.payload)
            .await
            .map_err(CycleError::Write)?;

        // content is not inspected, any bytes count as a response
        match stream.read(buf).await {
            Ok(0) => Err(CycleError::Closed),
            Ok(_) => Ok(stream),
            Err(e) => Err(CycleError::Read(e)),
        }
    }
}
