//
// Copyright (c) The dvpn Contributors
//
// SPDX-License-Identifier: MIT
//

//
// dvpn-session: the peer session actor — record framing, demultiplexing,
// and the rx-timeout/keepalive timers that run once a connection has been
// authenticated by dvpn-net.
//

pub mod error;
pub mod record;
pub mod session;
pub mod state;

pub use error::Error;
pub use session::{Command, Session, SessionHandle, Update};
pub use state::{SessionEvent, SessionState};
