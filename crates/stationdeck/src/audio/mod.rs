//! Audio subsystem
//!
//! Opens the output device and plays resolved streams through rodio.

pub mod handle;
pub mod output;

pub use handle::RodioHandle;
pub use output::RodioPlayer;
