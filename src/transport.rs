//! TCP transport to the machine.
//!
//! The machine accepts one TCP connection, greets it with `*HELLO*` and then
//! answers exactly one frame per request. [`Transport`] is the seam used by
//! [`crate::client::Machine`], so the settings can be driven by anything
//! that sends a frame and returns the response.
use crate::{protocol as proto, Error, Result};
use log::*;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sends one raw frame and blocks until the raw response arrived.
pub trait Transport {
    /// A response that doesn't arrive in time must be reported as an
    /// `io::Error` for which [`is_timeout`] is `true`.
    fn send_and_receive(&mut self, frame: &[u8]) -> io::Result<Vec<u8>>;
}

/// Returns `true` if the I/O error is a read or write timeout.
///
/// Depending on the platform a socket timeout surfaces as `TimedOut` or `WouldBlock`.
pub fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Where and how to connect to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectionConfig {
    /// Host name or IP address of the machine.
    pub host: String,
    pub port: u16,
    /// Timeout for connecting and for every request attempt.
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub timeout: Duration,
    /// Number of attempts per request when the machine doesn't answer in time.
    pub retries: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: proto::DEFAULT_HOST.to_string(),
            port: proto::DEFAULT_PORT,
            timeout: proto::DEFAULT_TIMEOUT,
            retries: proto::DEFAULT_RETRIES,
        }
    }
}

impl ConnectionConfig {
    /// `host:port` as used for name resolution.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Blocking TCP connection to the machine.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connects to the machine and waits for its greeting.
    ///
    /// # Errors
    ///
    /// * [`Error::Connection`] if the address can't be resolved, the
    ///   connection is refused or the machine doesn't greet in time.
    /// * [`Error::Handshake`] if the greeting is not `*HELLO*`.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let address = config.address();
        info!("Connecting to {address}…");

        let connection_error = |source| Error::Connection {
            address: address.clone(),
            source,
        };
        let stream = Self::open(&address, config.timeout).map_err(connection_error)?;
        let mut transport = Self { stream };

        let greeting = transport
            .receive(|data| {
                data.len() >= proto::HANDSHAKE.len()
                    || !proto::HANDSHAKE.as_bytes().starts_with(data)
            })
            .map_err(connection_error)?;
        let greeting = String::from_utf8_lossy(&greeting);
        if greeting != proto::HANDSHAKE {
            error!("Machine didn't say hello (\"{greeting}\"), connection failed");
            return Err(Error::Handshake(greeting.into_owned()));
        }

        info!("Connected to {address}");
        Ok(transport)
    }

    fn open(address: &str, timeout: Duration) -> io::Result<TcpStream> {
        let mut last_error = None;
        for socket_addr in address.to_socket_addrs()? {
            match Self::open_socket(&socket_addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    debug!("Connecting to {socket_addr} failed: {err}");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{address} doesn't resolve to any socket address"),
            )
        }))
    }

    fn open_socket(socket_addr: &SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(socket_addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Reads until `is_complete` accepts the received data.
    ///
    /// A response may arrive in several TCP segments. The read timeout
    /// applies to every single read.
    fn receive(&mut self, is_complete: impl Fn(&[u8]) -> bool) -> io::Result<Vec<u8>> {
        let mut received = Vec::new();
        let mut buffer = [0; proto::BUFFER_SIZE];
        loop {
            trace!("Reading…");
            let count = self.stream.read(&mut buffer)?;
            if count == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by machine",
                ));
            }
            received.extend_from_slice(&buffer[..count]);
            if is_complete(&received) {
                break;
            }
            trace!("Received {} byte(s) so far, waiting for more", received.len());
        }
        debug!(
            "Received raw message is \"{}\"",
            String::from_utf8_lossy(&received)
        );
        Ok(received)
    }

    /// Sets the timeout for every following request attempt.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// The currently configured request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.stream.read_timeout().ok().flatten()
    }

    /// Closes the connection.
    pub fn disconnect(self) -> Result<()> {
        info!("Disconnecting…");
        match self.stream.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl Transport for TcpTransport {
    fn send_and_receive(&mut self, frame: &[u8]) -> io::Result<Vec<u8>> {
        self.stream.write_all(frame)?;
        self.stream.flush()?;
        self.receive(|data| {
            proto::expected_frame_length(data).is_some_and(|length| data.len() >= length)
        })
    }
}

/// In-memory transport replaying a fixed request/response script.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// What the scripted machine does for one expected request.
    #[derive(Debug)]
    pub(crate) enum Reply {
        Frame(&'static str),
        Timeout,
        Closed,
    }

    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        script: VecDeque<(&'static str, Reply)>,
        pub(crate) sent: Vec<String>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: impl IntoIterator<Item = (&'static str, Reply)>) -> Self {
            Self {
                script: script.into_iter().collect(),
                sent: Vec::new(),
            }
        }

        /// A single request answered with a single frame.
        pub(crate) fn exchange(request: &'static str, response: &'static str) -> Self {
            Self::new([(request, Reply::Frame(response))])
        }

        pub(crate) fn is_exhausted(&self) -> bool {
            self.script.is_empty()
        }
    }

    impl Transport for ScriptedTransport {
        fn send_and_receive(&mut self, frame: &[u8]) -> io::Result<Vec<u8>> {
            let frame = String::from_utf8_lossy(frame).into_owned();
            self.sent.push(frame.clone());
            let (expected, reply) = self
                .script
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request \"{frame}\""));
            assert_eq!(frame, expected);
            match reply {
                Reply::Frame(response) => Ok(response.as_bytes().to_vec()),
                Reply::Timeout => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
                Reply::Closed => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by machine",
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::net::TcpListener;
    use std::thread;

    /// Serves one connection: sends `greeting`, then answers every request
    /// with the matching entry of `responses` until the client disconnects.
    fn serve(greeting: &'static str, responses: Vec<&'static str>) -> (ConnectionConfig, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(greeting.as_bytes()).unwrap();
            let mut requests = Vec::new();
            let mut responses = responses.into_iter();
            let mut buffer = [0u8; 64];
            loop {
                let count = match stream.read(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(count) => count,
                };
                requests.push(String::from_utf8_lossy(&buffer[..count]).into_owned());
                if let Some(response) = responses.next() {
                    stream.write_all(response.as_bytes()).unwrap();
                }
            }
            requests
        });
        let config = ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_millis(500),
            retries: 2,
        };
        (config, handle)
    }

    #[test]
    fn default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.address(), "192.168.1.1:1774");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn connect_and_exchange() {
        let (config, server) = serve("*HELLO*", vec!["r000100010054"]);
        let mut transport = TcpTransport::connect(&config).unwrap();
        assert_eq!(transport.timeout(), Some(Duration::from_millis(500)));

        let response = transport.send_and_receive(b"r00010001F4").unwrap();
        assert_eq!(response, b"r000100010054");

        transport.disconnect().unwrap();
        assert_eq!(server.join().unwrap(), vec!["r00010001F4".to_string()]);
    }

    /// Serves one connection, writing the greeting and every response in
    /// the given pieces with a pause in between.
    fn serve_in_pieces(pieces: Vec<Vec<String>>) -> (ConnectionConfig, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buffer = [0u8; 64];
            for (i, message) in pieces.into_iter().enumerate() {
                // The first message is the greeting, every other one answers a request.
                if i > 0 && matches!(stream.read(&mut buffer), Ok(0) | Err(_)) {
                    return;
                }
                for piece in message {
                    stream.write_all(piece.as_bytes()).unwrap();
                    stream.flush().unwrap();
                    thread::sleep(Duration::from_millis(50));
                }
            }
            let _ = stream.read(&mut buffer);
        });
        let config = ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_millis(500),
            retries: 1,
        };
        (config, handle)
    }

    #[test]
    fn response_in_pieces() {
        let (config, server) = serve_in_pieces(vec![
            vec!["*HEL".to_string(), "LO*".to_string()],
            vec!["r0001000100".to_string(), "54".to_string()],
            vec!["w0001".to_string(), "0001OK93".to_string()],
        ]);
        let mut transport = TcpTransport::connect(&config).unwrap();

        let response = transport.send_and_receive(b"r00010001F4").unwrap();
        assert_eq!(response, b"r000100010054");
        let response = transport.send_and_receive(b"w00010001015A").unwrap();
        assert_eq!(response, b"w00010001OK93");

        transport.disconnect().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn response_longer_than_buffer() {
        // 600 bytes of data make a frame of 1211 characters
        let body = format!("rB0000258{}", "41".repeat(600));
        let frame = format!("{body}{}", proto::checksum(&body));
        let (first, second) = frame.split_at(700);
        let (config, server) = serve_in_pieces(vec![
            vec!["*HELLO*".to_string()],
            vec![first.to_string(), second.to_string()],
        ]);
        let mut machine = crate::client::Machine::connect(&config).unwrap();

        assert_eq!(
            machine.read_raw(0xB000, 600).unwrap(),
            proto::Payload::Data(vec![0x41; 600])
        );

        machine.disconnect().unwrap();
        server.join().unwrap();
    }

    #[test]
    fn connect_without_hello() {
        let (config, server) = serve("*GOODBYE*", vec![]);
        assert_matches!(
            TcpTransport::connect(&config),
            Err(Error::Handshake(greeting)) if greeting == "*GOODBYE*"
        );
        server.join().unwrap();
    }

    #[test]
    fn connect_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_millis(500),
            retries: 1,
        };
        let err = TcpTransport::connect(&config).unwrap_err();
        assert!(err.is_domain());
        assert_matches!(err, Error::Connection { .. });
    }

    #[test]
    fn response_timeout() {
        let (config, server) = serve("*HELLO*", vec![]);
        let mut transport = TcpTransport::connect(&config).unwrap();
        transport.set_timeout(Duration::from_millis(50)).unwrap();

        let err = transport.send_and_receive(b"r00010001F4").unwrap_err();
        assert!(is_timeout(&err));

        transport.disconnect().unwrap();
        server.join().unwrap();
    }
}
