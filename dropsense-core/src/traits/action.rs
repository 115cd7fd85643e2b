//! Alert Output Trait
//!
//! Playback is synchronous: the main loop is blocked for the duration of the
//! alert. Keeping it behind [`ActionTrigger`] lets a platform substitute a
//! non-blocking implementation without touching the state machine.

use crate::errors::PlaybackError;

/// Plays an alert asset to completion
pub trait ActionTrigger {
    /// Play `asset` and return when playback has finished or failed
    ///
    /// Implementations must leave the output peripheral deinitialized on
    /// every return path.
    fn play(&mut self, asset: &str) -> Result<(), PlaybackError>;
}

impl<T: ActionTrigger + ?Sized> ActionTrigger for &mut T {
    fn play(&mut self, asset: &str) -> Result<(), PlaybackError> {
        (**self).play(asset)
    }
}
