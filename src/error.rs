use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// The configured host could not be resolved in time.
    Resolution { host: String, reason: String },
    /// The socket refused a datagram, or there was nowhere to send it.
    Transmit(String),
    /// A configuration value is missing or out of range.
    Configuration(String),
    /// Bytes that do not form a valid DDP packet.
    #[cfg(test)]
    MalformedPacket(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Resolution { host, reason } => {
                write!(f, "cannot resolve {}: {}", host, reason)
            }
            Error::Transmit(msg) => write!(f, "transmit failed: {}", msg),
            Error::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            #[cfg(test)]
            Error::MalformedPacket(msg) => write!(f, "malformed packet: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transmit(err.to_string())
    }
}
