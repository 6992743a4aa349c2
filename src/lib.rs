//! getcerts - fetch a remote TLS certificate chain and split it into PEM files
//!
//! Connects to a host, completes a TLS handshake with SNI set to the target
//! domain, then writes the peer's leaf certificate(s) and intermediate
//! certificate(s) to two separate PEM files.
//!
//! # Examples
//!
//! ```no_run
//! use getcerts::{Options, OutputPaths, Target};
//!
//! let options = Options::new(
//!     Target::new("example.com").with_port(443),
//!     OutputPaths::new("leaf.pem", "intermediate.pem"),
//! );
//!
//! let written = getcerts::run(&options).unwrap();
//! println!("{} certificate(s) written", written.total());
//! ```
//!
//! ## Strict two-certificate chains
//!
//! ```no_run
//! use getcerts::{ClassifyPolicy, Options, OutputPaths, Target};
//!
//! let options = Options::new(
//!     Target::new("example.com"),
//!     OutputPaths::new("leaf.pem", "intermediate.pem"),
//! )
//! .with_policy(ClassifyPolicy::SubjectMatch {
//!     expected_issuer: "CN=R3,O=Let's Encrypt,C=US".to_string(),
//! });
//!
//! getcerts::run(&options).unwrap();
//! ```

pub mod chain;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod output;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};

pub use chain::{classify, ClassifiedChain, PeerCertificate, RoleGroup};
pub use fetch::fetch_peer_chain;
pub use output::write_classified;
pub use types::{CertRole, ClassifyPolicy, Options, OutputPaths, Target, TlsOptions};

/// Fetches the chain, classifies it and writes both output files. Nothing is
/// written unless classification succeeds.
pub fn run(options: &Options) -> Result<ClassifiedChain> {
    let certs = fetch_peer_chain(&options.target, &options.tls)?;
    let classified = classify(&certs, &options.policy, &options.target.domain)?;
    write_classified(&classified, &options.outputs)?;
    Ok(classified)
}
