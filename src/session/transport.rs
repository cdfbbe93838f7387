use crate::error::TransportError;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// An established connection carrying one request/response pair at a time.
pub trait Link: Send {
    fn exchange<'a>(&'a mut self, request: &'a Request) -> PortFuture<'a, Response>;
}

/// Opens links to the server.
pub trait Connector: Send + Sync {
    fn connect(&self) -> PortFuture<'_, Box<dyn Link>>;

    fn describe(&self) -> String;
}

/// Newline-delimited JSON over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> PortFuture<'_, Box<dyn Link>> {
        Box::pin(async move {
            let stream = TcpStream::connect(self.addr.as_str())
                .await
                .map_err(|e| TransportError::Io(format!("{}: {e}", self.addr)))?;
            stream
                .set_nodelay(true)
                .map_err(|e| TransportError::Io(e.to_string()))?;
            Ok(Box::new(TcpLink::new(stream)) as Box<dyn Link>)
        })
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

pub struct TcpLink {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl TcpLink {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
        }
    }
}

impl Link for TcpLink {
    fn exchange<'a>(&'a mut self, request: &'a Request) -> PortFuture<'a, Response> {
        Box::pin(async move {
            let mut frame =
                serde_json::to_vec(request).map_err(|e| TransportError::Codec(e.to_string()))?;
            frame.push(b'\n');
            self.writer
                .write_all(&frame)
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;
            self.writer
                .flush()
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;

            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .map_err(|e| TransportError::Io(e.to_string()))?;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            serde_json::from_str::<Response>(self.line.trim_end())
                .map_err(|e| TransportError::Codec(e.to_string()))
        })
    }
}
