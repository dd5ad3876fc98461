//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// Loads this node's long-term key pair and derives its node ID from it.
//

use std::io::BufReader;

use dvpn_id::NodeId;
use rustls_pemfile::{certs, private_key};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::Error;

/// `key_path` names the PEM private key; the matching certificate is the
/// same path with a `.key` suffix swapped for `.crt` (or `.crt` appended if
/// `key_path` has no `.key` suffix).
pub fn load(key_path: &str) -> Result<(CertificateDer<'static>, PrivateKeyDer<'static>, NodeId), Error> {
    let cert_path = match key_path.strip_suffix(".key") {
        Some(stem) => format!("{stem}.crt"),
        None => format!("{key_path}.crt"),
    };

    let cert_der = {
        let file = std::fs::File::open(&cert_path)?;
        let mut reader = BufReader::new(file);
        let mut ders = certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
        ders.pop().ok_or_else(|| {
            Error::Identity(format!("no certificate found in {cert_path}"))
        })?
    };

    let key_der = {
        let file = std::fs::File::open(key_path)?;
        let mut reader = BufReader::new(file);
        private_key(&mut reader)?.ok_or_else(|| {
            Error::Identity(format!("no private key found in {key_path}"))
        })?
    };

    let node_id = NodeId::from_certificate_der(cert_der.as_ref()).map_err(|e| {
        Error::Identity(format!(
            "certificate in {cert_path} has no usable public key: {e:?}"
        ))
    })?;

    Ok((cert_der, key_der, node_id))
}
