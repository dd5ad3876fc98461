//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-util: small runtime helpers shared by the networking and session
// crates.
//

pub mod backoff;
pub mod task;

pub use backoff::Backoff;
pub use task::{Task, TimeoutTask};
