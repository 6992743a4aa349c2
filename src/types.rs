use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The remote peer: the logical domain used for SNI, plus where to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub domain: String,
    pub ip: Option<String>,
    pub port: u16,
}

impl Target {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ip: None,
            port: DEFAULT_PORT,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Host part of the socket address. The IP override wins over the domain.
    pub fn host(&self) -> &str {
        self.ip.as_deref().unwrap_or(&self.domain)
    }

    /// `host:port`, bracketing bare IPv6 literals.
    pub fn address(&self) -> String {
        let host = self.host();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Accept any peer certificate. Dangerous; only for inspecting broken or
    /// private deployments.
    pub insecure_skip_verify: bool,
    /// Extra PEM bundles trusted on top of the platform roots.
    pub ca_files: Vec<PathBuf>,
    pub timeout: Duration,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            insecure_skip_verify: false,
            ca_files: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertRole {
    Leaf,
    Intermediate,
}

impl CertRole {
    pub const ALL: [CertRole; 2] = [CertRole::Leaf, CertRole::Intermediate];

    pub fn name(&self) -> &'static str {
        match self {
            CertRole::Leaf => "leaf",
            CertRole::Intermediate => "intermediate",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CertRole::Leaf => "Leaf",
            CertRole::Intermediate => "Intermediate",
        }
    }
}

impl fmt::Display for CertRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub leaf: PathBuf,
    pub intermediate: PathBuf,
}

impl OutputPaths {
    pub fn new(leaf: impl Into<PathBuf>, intermediate: impl Into<PathBuf>) -> Self {
        Self {
            leaf: leaf.into(),
            intermediate: intermediate.into(),
        }
    }

    pub fn path_for(&self, role: CertRole) -> &Path {
        match role {
            CertRole::Leaf => &self.leaf,
            CertRole::Intermediate => &self.intermediate,
        }
    }
}

/// How fetched certificates are sorted into leaf and intermediate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassifyPolicy {
    /// CA-flagged certificates are intermediates, everything else is a leaf.
    /// Any number of certificates per role.
    #[default]
    CaFlag,
    /// Exactly two certificates: one whose subject CN is the target domain,
    /// and one CA whose subject equals `expected_issuer` (RFC 4514 form).
    SubjectMatch { expected_issuer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub target: Target,
    pub outputs: OutputPaths,
    pub tls: TlsOptions,
    pub policy: ClassifyPolicy,
}

impl Options {
    pub fn new(target: Target, outputs: OutputPaths) -> Self {
        Self {
            target,
            outputs,
            tls: TlsOptions::default(),
            policy: ClassifyPolicy::default(),
        }
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_policy(mut self, policy: ClassifyPolicy) -> Self {
        self.policy = policy;
        self
    }
}
