pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod ports;
pub mod recording;
pub mod session;
pub mod state;
pub mod timers;
pub mod violation;

pub use clock::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use ports::*;
pub use session::*;
pub use state::*;
pub use timers::*;
pub use violation::*;
