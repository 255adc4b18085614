mod guard;
#[cfg(test)]
mod tests;

pub use guard::{SessionGuard, REFRESH_OVERLAY_MESSAGE};
