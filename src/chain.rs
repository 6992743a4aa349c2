use crate::encoding::encode_certificate;
use crate::error::{Error, Result};
use crate::types::{CertRole, ClassifyPolicy};
use log::{debug, error};
use x509_parser::prelude::*;

/// A certificate as presented by the peer, with the fields classification
/// looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    pub der: Vec<u8>,
    pub is_ca: bool,
    /// Subject in RFC 4514 form, most specific RDN first.
    pub subject: String,
    pub common_name: Option<String>,
}

impl PeerCertificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (_, x509) = X509Certificate::from_der(&der)
            .map_err(|e| Error::CertParse(format!("Failed to parse certificate: {}", e)))?;

        let is_ca = x509
            .basic_constraints()
            .ok()
            .flatten()
            .map(|bc| bc.value.ca)
            .unwrap_or(false);

        let subject = format_dn(x509.subject());
        let common_name = x509
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_string);

        drop(x509);
        Ok(Self {
            der,
            is_ca,
            subject,
            common_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGroup {
    pub role: CertRole,
    pub pem: String,
    pub count: usize,
}

/// PEM text per role, always holding one group for each role in
/// `CertRole::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedChain {
    groups: Vec<RoleGroup>,
}

impl ClassifiedChain {
    fn empty() -> Self {
        Self {
            groups: CertRole::ALL
                .iter()
                .map(|&role| RoleGroup {
                    role,
                    pem: String::new(),
                    count: 0,
                })
                .collect(),
        }
    }

    fn push(&mut self, role: CertRole, cert: &PeerCertificate) {
        if let Some(group) = self.groups.iter_mut().find(|g| g.role == role) {
            group.pem.push_str(&encode_certificate(&cert.der));
            group.count += 1;
        }
    }

    pub fn groups(&self) -> &[RoleGroup] {
        &self.groups
    }

    pub fn pem(&self, role: CertRole) -> &str {
        self.group(role).map(|g| g.pem.as_str()).unwrap_or("")
    }

    pub fn count(&self, role: CertRole) -> usize {
        self.group(role).map(|g| g.count).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    fn group(&self, role: CertRole) -> Option<&RoleGroup> {
        self.groups.iter().find(|g| g.role == role)
    }
}

pub fn classify(
    certs: &[PeerCertificate],
    policy: &ClassifyPolicy,
    domain: &str,
) -> Result<ClassifiedChain> {
    match policy {
        ClassifyPolicy::CaFlag => Ok(classify_by_ca_flag(certs)),
        ClassifyPolicy::SubjectMatch { expected_issuer } => {
            classify_by_subject(certs, domain, expected_issuer)
        }
    }
}

fn classify_by_ca_flag(certs: &[PeerCertificate]) -> ClassifiedChain {
    let mut classified = ClassifiedChain::empty();
    for cert in certs {
        let role = if cert.is_ca {
            CertRole::Intermediate
        } else {
            CertRole::Leaf
        };
        debug!("{} certificate: {}", role, cert.subject);
        classified.push(role, cert);
    }
    classified
}

fn classify_by_subject(
    certs: &[PeerCertificate],
    domain: &str,
    expected_issuer: &str,
) -> Result<ClassifiedChain> {
    if certs.len() != 2 {
        return Err(Error::InvalidChain(format!(
            "expected exactly 2 certificates, peer presented {}",
            certs.len()
        )));
    }

    let mut classified = ClassifiedChain::empty();
    let mut unmatched = 0;
    for cert in certs {
        if cert.common_name.as_deref() == Some(domain) {
            classified.push(CertRole::Leaf, cert);
        } else if cert.subject == expected_issuer && cert.is_ca {
            classified.push(CertRole::Intermediate, cert);
        } else {
            error!(
                "Unexpected certificate: subject={:?} is_ca={}",
                cert.subject, cert.is_ca
            );
            unmatched += 1;
        }
    }

    if unmatched > 0 {
        return Err(Error::InvalidChain(format!(
            "{} certificate(s) matched neither CN={} nor {}",
            unmatched, domain, expected_issuer
        )));
    }

    for role in CertRole::ALL {
        if classified.count(role) != 1 {
            return Err(Error::InvalidChain(format!(
                "expected one {} certificate, found {}",
                role,
                classified.count(role)
            )));
        }
    }

    Ok(classified)
}

/// Renders a name the way RFC 4514 does: RDNs in reverse order, joined by
/// `,`, multi-valued RDNs joined by `+`.
fn format_dn(dn: &X509Name) -> String {
    let mut rdns = Vec::new();

    for rdn in dn.iter() {
        let attrs: Vec<String> = rdn
            .iter()
            .map(|attr| {
                let oid = attr.attr_type().to_id_string();
                let name = match oid.as_str() {
                    "2.5.4.3" => "CN",
                    "2.5.4.10" => "O",
                    "2.5.4.11" => "OU",
                    "2.5.4.6" => "C",
                    "2.5.4.7" => "L",
                    "2.5.4.8" => "ST",
                    "2.5.4.9" => "STREET",
                    "2.5.4.5" => "SERIALNUMBER",
                    "2.5.4.17" => "POSTALCODE",
                    _ => oid.as_str(),
                };
                let value = match attr.as_str() {
                    Ok(s) => escape_dn_value(s),
                    Err(_) => format!("#{}", hex(attr.attr_value().data)),
                };
                format!("{}={}", name, value)
            })
            .collect();
        rdns.push(attrs.join("+"));
    }

    rdns.reverse();
    rdns.join(",")
}

fn escape_dn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == ' ' || c == '#'))
            || (i == last && c == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::decode_certificates;
    use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};

    fn make_cert(cn: &str, org: Option<&str>, is_ca: bool) -> PeerCertificate {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        let mut dn = DistinguishedName::new();
        if let Some(o) = org {
            dn.push(DnType::OrganizationName, o);
        }
        dn.push(DnType::CommonName, cn);
        params.distinguished_name = dn;
        if is_ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        }
        let cert = params.self_signed(&key).unwrap();
        PeerCertificate::from_der(cert.der().to_vec()).unwrap()
    }

    fn strict(issuer: &str) -> ClassifyPolicy {
        ClassifyPolicy::SubjectMatch {
            expected_issuer: issuer.to_string(),
        }
    }

    #[test]
    fn test_parse_extracts_subject_and_ca_flag() {
        let ca = make_cert("Test Intermediate", Some("Example Org"), true);
        assert!(ca.is_ca);
        assert_eq!(ca.subject, "CN=Test Intermediate,O=Example Org");
        assert_eq!(ca.common_name.as_deref(), Some("Test Intermediate"));

        let leaf = make_cert("example.com", None, false);
        assert!(!leaf.is_ca);
        assert_eq!(leaf.subject, "CN=example.com");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = PeerCertificate::from_der(vec![0x30, 0x03, 0x01, 0x02]);
        assert!(matches!(result, Err(Error::CertParse(_))));
    }

    #[test]
    fn test_ca_flag_partition_preserves_counts_and_order() {
        let leaf = make_cert("example.com", None, false);
        let int1 = make_cert("Intermediate A", None, true);
        let int2 = make_cert("Intermediate B", None, true);
        let certs = vec![leaf.clone(), int1.clone(), int2.clone()];

        let classified = classify(&certs, &ClassifyPolicy::CaFlag, "example.com").unwrap();

        assert_eq!(classified.total(), certs.len());
        assert_eq!(classified.count(CertRole::Leaf), 1);
        assert_eq!(classified.count(CertRole::Intermediate), 2);
        assert_eq!(
            decode_certificates(classified.pem(CertRole::Intermediate)).unwrap(),
            vec![int1.der, int2.der]
        );
        assert_eq!(
            decode_certificates(classified.pem(CertRole::Leaf)).unwrap(),
            vec![leaf.der]
        );
    }

    #[test]
    fn test_ca_flag_partition_tolerates_empty_roles() {
        let leaf = make_cert("example.com", None, false);
        let classified = classify(&[leaf], &ClassifyPolicy::CaFlag, "example.com").unwrap();
        assert_eq!(classified.pem(CertRole::Intermediate), "");
        assert_eq!(classified.groups().len(), 2);

        let empty = classify(&[], &ClassifyPolicy::CaFlag, "example.com").unwrap();
        assert_eq!(empty.total(), 0);
    }

    #[test]
    fn test_subject_match_accepts_expected_pair() {
        let leaf = make_cert("example.com", None, false);
        let int = make_cert("R3", Some("Let's Encrypt"), true);
        let policy = strict("CN=R3,O=Let's Encrypt");

        let classified = classify(&[leaf.clone(), int.clone()], &policy, "example.com").unwrap();

        assert_eq!(classified.count(CertRole::Leaf), 1);
        assert_eq!(classified.count(CertRole::Intermediate), 1);
        assert_eq!(classified.pem(CertRole::Leaf), encode_certificate(&leaf.der));
        assert_eq!(
            classified.pem(CertRole::Intermediate),
            encode_certificate(&int.der)
        );
    }

    #[test]
    fn test_subject_match_rejects_three_certificates() {
        let leaf = make_cert("example.com", None, false);
        let int = make_cert("R3", None, true);
        let root = make_cert("Root", None, true);

        let result = classify(&[leaf, int, root], &strict("CN=R3"), "example.com");
        assert!(matches!(result, Err(Error::InvalidChain(_))));
    }

    #[test]
    fn test_subject_match_rejects_unmatched_subjects() {
        let a = make_cert("other.example", None, false);
        let b = make_cert("Some Other CA", None, true);

        let result = classify(&[a, b], &strict("CN=R3"), "example.com");
        assert!(matches!(result, Err(Error::InvalidChain(_))));
    }

    #[test]
    fn test_subject_match_requires_ca_flag_on_issuer() {
        let leaf = make_cert("example.com", None, false);
        let not_ca = make_cert("R3", None, false);

        let result = classify(&[leaf, not_ca], &strict("CN=R3"), "example.com");
        assert!(matches!(result, Err(Error::InvalidChain(_))));
    }

    #[test]
    fn test_subject_match_rejects_two_leaves() {
        let a = make_cert("example.com", None, false);
        let b = make_cert("example.com", None, false);

        let result = classify(&[a, b], &strict("CN=R3"), "example.com");
        assert!(matches!(result, Err(Error::InvalidChain(_))));
    }

    #[test]
    fn test_escape_dn_value() {
        assert_eq!(escape_dn_value("Acme, Inc."), "Acme\\, Inc.");
        assert_eq!(escape_dn_value("#tag"), "\\#tag");
        assert_eq!(escape_dn_value(" padded "), "\\ padded\\ ");
        assert_eq!(escape_dn_value("plain"), "plain");
    }
}
