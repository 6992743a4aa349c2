use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[cfg(feature = "cli")]
    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection to {addr} timed out after {}s", .timeout.as_secs())]
    Timeout { addr: String, timeout: Duration },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("DNS name error: {0}")]
    DnsName(String),

    #[error("Failed to close connection: {0}")]
    Close(String),

    #[error("Invalid certificate chain: {0}")]
    InvalidChain(String),

    #[error("Certificate parsing error: {0}")]
    CertParse(String),

    #[error("PEM parsing error: {0}")]
    Pem(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<rustls::Error> for Error {
    fn from(err: rustls::Error) -> Self {
        Error::Tls(err.to_string())
    }
}

impl From<x509_parser::error::X509Error> for Error {
    fn from(err: x509_parser::error::X509Error) -> Self {
        Error::CertParse(err.to_string())
    }
}

impl From<x509_parser::nom::Err<x509_parser::error::X509Error>> for Error {
    fn from(err: x509_parser::nom::Err<x509_parser::error::X509Error>) -> Self {
        Error::CertParse(err.to_string())
    }
}

impl From<pem::PemError> for Error {
    fn from(err: pem::PemError) -> Self {
        Error::Pem(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
