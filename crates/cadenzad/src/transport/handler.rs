//! Accepted connection streams and the trait that serves them.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the listener.
#[derive(Debug)]
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Opens a second handle onto the same socket, so one thread can read
    /// while another writes.
    pub(crate) fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    /// Bounds how long a read may block; `None` blocks forever.
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    /// Closes both directions, waking any thread blocked on a read.
    pub(crate) fn shutdown(&self) -> io::Result<()> {
        let result = match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }

    /// Human-readable description of the remote end, for logs.
    pub(crate) fn peer(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| "tcp:unknown".to_owned(), |addr| addr.to_string()),
            #[cfg(unix)]
            Self::Unix(_) => "unix".to_owned(),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Serves accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one connection until it closes. Implementations should avoid
    /// panicking; each call runs on its own thread.
    fn handle(&self, stream: ConnectionStream);
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    fn pair() -> (ConnectionStream, TcpStream) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let client = TcpStream::connect(addr).expect("connect client");
        let (server, _) = listener.accept().expect("accept connection");
        (ConnectionStream::Tcp(server), client)
    }

    #[test]
    fn clones_share_the_socket() {
        let (server, mut client) = pair();
        let mut writer = server.try_clone().expect("clone stream");
        writer.write_all(b"OK\n").expect("write");
        let mut buffer = [0_u8; 3];
        client.read_exact(&mut buffer).expect("read");
        assert_eq!(&buffer, b"OK\n");
        assert!(server.peer().starts_with("127.0.0.1:"));
    }

    #[test]
    fn reads_time_out_when_configured() {
        let (mut server, _client) = pair();
        server
            .set_read_timeout(Some(Duration::from_millis(20)))
            .expect("set timeout");
        let error = server.read(&mut [0_u8; 8]).expect_err("read should time out");
        assert!(matches!(
            error.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn shutdown_ends_blocked_reads() {
        let (server, _client) = pair();
        let mut reader = server.try_clone().expect("clone stream");
        server.shutdown().expect("shutdown");
        assert_eq!(reader.read(&mut [0_u8; 8]).expect("read after shutdown"), 0);
    }
}
