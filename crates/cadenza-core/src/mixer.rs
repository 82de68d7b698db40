//! Volume and mute control.

/// Mixer primitives; `None` means the value is unknown.
pub trait Mixer: Send {
    /// Volume in percent.
    fn volume(&self) -> Option<u8>;
    /// Sets the volume in percent; values above 100 are clamped.
    fn set_volume(&mut self, volume: u8) -> bool;
    /// Mute flag.
    fn mute(&self) -> Option<bool>;
    /// Sets the mute flag.
    fn set_mute(&mut self, mute: bool) -> bool;
}

/// Mixer that only remembers the requested values.
#[derive(Debug, Clone, Copy)]
pub struct SoftwareMixer {
    volume: u8,
    muted: bool,
}

impl Default for SoftwareMixer {
    fn default() -> Self {
        Self {
            volume: 100,
            muted: false,
        }
    }
}

impl Mixer for SoftwareMixer {
    fn volume(&self) -> Option<u8> {
        Some(self.volume)
    }

    fn set_volume(&mut self, volume: u8) -> bool {
        self.volume = volume.min(100);
        true
    }

    fn mute(&self) -> Option<bool> {
        Some(self.muted)
    }

    fn set_mute(&mut self, mute: bool) -> bool {
        self.muted = mute;
        true
    }
}
