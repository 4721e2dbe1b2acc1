//! Email delivery: pure HTML rendering, the SMTP transport seam, and the
//! channel that ties them to the user/project facades.

pub mod channel;
pub mod renderer;
pub mod transport;
