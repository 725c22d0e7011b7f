//! Call Authentication
//!
//! Resolves the caller's identity from the transport. Plaintext and one-way
//! TLS callers resolve to the empty subject. Callers that presented a client
//! certificate (verified by the TLS layer against the configured CA) resolve
//! to the leaf certificate's common name. A request without any connection
//! info means the listener was wired incorrectly and is rejected.
//!
//! Authentication never denies a known peer; access decisions belong to the
//! [`Authorizer`](crate::application::ports::Authorizer).

use tonic::transport::server::{TcpConnectInfo, TlsConnectInfo};
use tonic::{Request, Status};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Message returned when a call carries no connection info.
pub const UNKNOWN_PEER: &str = "couldn't find peer info";

/// Caller identity attached to every authenticated request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallIdentity {
    /// Leaf certificate common name, or empty for anonymous callers.
    pub subject: String,
}

impl CallIdentity {
    /// Identity for `subject`.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    /// True when no client certificate identified the caller.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.subject.is_empty()
    }
}

/// Transport information about the caller, as found on the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerInfo {
    /// No connection info at all.
    Unknown,
    /// Plain TCP.
    Plain,
    /// TLS, with the client's DER certificate chain if one was presented.
    Tls {
        /// Leaf first.
        peer_certs: Option<Vec<Vec<u8>>>,
    },
}

impl PeerInfo {
    /// Read peer info from request extensions.
    pub fn from_request<T>(request: &Request<T>) -> Self {
        let extensions = request.extensions();
        if let Some(tls) = extensions.get::<TlsConnectInfo<TcpConnectInfo>>() {
            Self::Tls {
                peer_certs: tls
                    .peer_certs()
                    .map(|certs| certs.iter().map(|c| c.as_ref().to_vec()).collect()),
            }
        } else if extensions.get::<TcpConnectInfo>().is_some() {
            Self::Plain
        } else {
            Self::Unknown
        }
    }
}

/// Resolve a caller identity from peer info.
pub fn resolve_identity(peer: &PeerInfo) -> Result<CallIdentity, Status> {
    match peer {
        PeerInfo::Unknown => Err(Status::unknown(UNKNOWN_PEER)),
        PeerInfo::Plain => Ok(CallIdentity::default()),
        PeerInfo::Tls { peer_certs } => match peer_certs.as_deref() {
            Some([leaf, ..]) => common_name(leaf).map(CallIdentity::new),
            _ => Ok(CallIdentity::default()),
        },
    }
}

/// Common name of a DER certificate, empty if it has none.
pub fn common_name(der: &[u8]) -> Result<String, Status> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Status::unauthenticated(format!("invalid client certificate: {e}")))?;

    Ok(cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string())
}

/// Interceptor attaching [`CallIdentity`] to the request.
pub fn authenticate(mut request: Request<()>) -> Result<Request<()>, Status> {
    let identity = resolve_identity(&PeerInfo::from_request(&request))?;
    tracing::debug!(subject = %identity.subject, "caller authenticated");
    request.extensions_mut().insert(identity);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, KeyPair};

    fn certificate(common_name: Option<&str>) -> Vec<u8> {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["client.local".to_string()]).unwrap();
        params.distinguished_name = rcgen::DistinguishedName::new();
        if let Some(cn) = common_name {
            params.distinguished_name.push(DnType::CommonName, cn);
        }
        params.distinguished_name.push(DnType::OrganizationName, "test");
        params.self_signed(&key).unwrap().der().to_vec()
    }

    #[test]
    fn missing_peer_info_is_rejected() {
        let err = authenticate(Request::new(())).unwrap_err();

        assert_eq!(err.code(), tonic::Code::Unknown);
        assert_eq!(err.message(), UNKNOWN_PEER);
    }

    #[test]
    fn plaintext_peer_is_anonymous() {
        let mut request = Request::new(());
        request.extensions_mut().insert(TcpConnectInfo {
            local_addr: "127.0.0.1:8081".parse().ok(),
            remote_addr: "127.0.0.1:50000".parse().ok(),
        });

        let request = authenticate(request).unwrap();

        let identity = request.extensions().get::<CallIdentity>().unwrap();
        assert!(identity.is_anonymous());
    }

    #[test]
    fn one_way_tls_is_anonymous() {
        let no_certs = resolve_identity(&PeerInfo::Tls { peer_certs: None }).unwrap();
        let empty_chain = resolve_identity(&PeerInfo::Tls {
            peer_certs: Some(vec![]),
        })
        .unwrap();

        assert!(no_certs.is_anonymous());
        assert!(empty_chain.is_anonymous());
    }

    #[test]
    fn client_certificate_resolves_to_leaf_common_name() {
        let peer = PeerInfo::Tls {
            peer_certs: Some(vec![certificate(Some("alice")), certificate(Some("issuer"))]),
        };

        assert_eq!(resolve_identity(&peer).unwrap(), CallIdentity::new("alice"));
    }

    #[test]
    fn certificate_without_common_name_is_anonymous() {
        assert_eq!(common_name(&certificate(None)).unwrap(), "");
    }

    #[test]
    fn garbage_certificate_is_unauthenticated() {
        let peer = PeerInfo::Tls {
            peer_certs: Some(vec![vec![1, 2, 3]]),
        };

        let err = resolve_identity(&peer).unwrap_err();

        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }
}
