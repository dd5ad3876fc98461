//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// On-disk configuration: a TOML file, following `holo-daemon`'s choice of
// format (the wire protocol's own INI-style config on the original system
// is out of scope; this is the one concrete format this binary needs).
//

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// PEM-encoded private key, paired with the certificate of the same
    /// name with a `.crt` extension.
    pub private_key_file: String,
    #[serde(default)]
    pub listen_addresses: Vec<String>,
    #[serde(default)]
    pub peers: Vec<PeerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerEntry {
    pub name: String,
    /// Hex-encoded 32-byte fingerprint, or the literal `"any"` for a
    /// wildcard listen entry. Only meaningful for `role = "server"` or
    /// `"peer"`; a `"client"` entry always expects an exact fingerprint.
    pub fingerprint: String,
    pub role: PeerRole,
    /// `host:port` to dial. Required for `client`/`peer`, ignored for a
    /// listen-only `server` entry.
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    Peer,
    Client,
    Server,
}

impl PeerRole {
    pub fn dials_out(self) -> bool {
        matches!(self, PeerRole::Peer | PeerRole::Client)
    }

    pub fn accepts_in(self) -> bool {
        matches!(self, PeerRole::Peer | PeerRole::Server)
    }
}

#[derive(Debug)]
pub enum Error {
    Read(std::io::Error),
    Parse(toml::de::Error),
    MissingAddress { peer: String },
    WildcardFingerprintDialsOut { peer: String },
    BadFingerprint { peer: String },
}

impl Config {
    pub fn load(path: &str) -> Result<Config, Error> {
        let text = std::fs::read_to_string(path).map_err(Error::Read)?;
        let config: Config = toml::from_str(&text).map_err(Error::Parse)?;
        for peer in &config.peers {
            if peer.role.dials_out() {
                if peer.address.is_none() {
                    return Err(Error::MissingAddress {
                        peer: peer.name.clone(),
                    });
                }
                if peer.fingerprint == "any" {
                    return Err(Error::WildcardFingerprintDialsOut {
                        peer: peer.name.clone(),
                    });
                }
                if peer.fingerprint.parse::<dvpn_id::NodeId>().is_err() {
                    return Err(Error::BadFingerprint {
                        peer: peer.name.clone(),
                    });
                }
            } else if peer.fingerprint != "any"
                && peer.fingerprint.parse::<dvpn_id::NodeId>().is_err()
            {
                return Err(Error::BadFingerprint {
                    peer: peer.name.clone(),
                });
            }
        }
        Ok(config)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Read(e) => write!(f, "failed to read configuration file: {e}"),
            Error::Parse(e) => write!(f, "failed to parse configuration file: {e}"),
            Error::MissingAddress { peer } => {
                write!(f, "peer '{peer}' dials out but has no address")
            }
            Error::WildcardFingerprintDialsOut { peer } => {
                write!(f, "peer '{peer}' dials out but has a wildcard fingerprint")
            }
            Error::BadFingerprint { peer } => {
                write!(f, "peer '{peer}' has a malformed fingerprint")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(text: &str) -> String {
        let path = std::env::temp_dir().join(format!(
            "dvpn-test-{}-{}.toml",
            std::process::id(),
            text.len()
        ));
        std::fs::write(&path, text).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn client_role_without_address_is_rejected() {
        let path = write_config(
            r#"
            private_key_file = "node.key"

            [[peers]]
            name = "alice"
            fingerprint = "0000000000000000000000000000000000000000000000000000000000000000"
            role = "client"
        "#,
        );
        assert!(matches!(Config::load(&path), Err(Error::MissingAddress { .. })));
    }

    #[test]
    fn client_role_with_malformed_fingerprint_is_rejected() {
        let path = write_config(
            r#"
            private_key_file = "node.key"

            [[peers]]
            name = "alice"
            fingerprint = "zz"
            role = "client"
            address = "vpn.example.com:19275"
        "#,
        );
        assert!(matches!(Config::load(&path), Err(Error::BadFingerprint { .. })));
    }

    #[test]
    fn client_role_with_wildcard_fingerprint_is_rejected() {
        let path = write_config(
            r#"
            private_key_file = "node.key"

            [[peers]]
            name = "alice"
            fingerprint = "any"
            role = "client"
            address = "vpn.example.com:19275"
        "#,
        );
        assert!(matches!(
            Config::load(&path),
            Err(Error::WildcardFingerprintDialsOut { .. })
        ));
    }

    #[test]
    fn server_role_with_wildcard_fingerprint_is_accepted() {
        let path = write_config(
            r#"
            private_key_file = "node.key"
            listen_addresses = ["[::]:19275"]

            [[peers]]
            name = "guest"
            fingerprint = "any"
            role = "server"
        "#,
        );
        let config = Config::load(&path).unwrap();
        assert!(config.peers[0].role.accepts_in());
    }

    #[test]
    fn server_role_does_not_dial() {
        assert!(!PeerRole::Server.dials_out());
        assert!(PeerRole::Server.accepts_in());
    }
}
