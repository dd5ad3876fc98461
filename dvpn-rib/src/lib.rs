//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-rib: Adj-RIB-In/Out and Loc-RIB.
//

pub mod adj_rib;
pub mod error;
pub mod event;
pub mod loc_rib;

pub use adj_rib::AdjRibTable;
pub use error::Error;
pub use event::RibEvent;
pub use loc_rib::LocRib;
