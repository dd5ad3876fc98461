//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-lsa: the link-state advertisement record and its wire codec.
//

pub mod attr;
pub mod codec;
pub mod consts;
pub mod error;
pub mod lsa;

pub use attr::LsaAttr;
pub use consts::PeerType;
pub use error::DecodeError;
pub use lsa::Lsa;
