//! Platform ABI facts: pointer width and C `long` width.
//!
//! Every platform-variable C type resolves through a [`Platform`]. The host
//! platform is fixed at compile time; other platforms can be described
//! explicitly to compute layouts for a foreign target.

use std::fmt;

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("schism-ffi supports only 32-bit and 64-bit pointer widths");

/// Width of a platform-variable integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// 4 bytes.
    W32,
    /// 8 bytes.
    W64,
}

impl Width {
    /// Width in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }

    /// Width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            Width::W32 => 32,
            Width::W64 => 64,
        }
    }

    /// Map a byte count to a width; only 4 and 8 are valid.
    pub const fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            4 => Some(Width::W32),
            8 => Some(Width::W64),
            _ => None,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// The two ABI facts everything above this module depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pointer_width: Width,
    long_width: Width,
}

impl Platform {
    /// 32-bit pointers, 32-bit `long`.
    pub const ILP32: Platform = Platform::pair(Width::W32, Width::W32);

    /// 64-bit pointers, 64-bit `long` (Linux, macOS, BSDs).
    pub const LP64: Platform = Platform::pair(Width::W64, Width::W64);

    /// 64-bit pointers, 32-bit `long` (64-bit Windows).
    pub const LLP64: Platform = Platform::pair(Width::W64, Width::W32);

    const HOST: Platform = if cfg!(target_pointer_width = "32") {
        Platform::ILP32
    } else if cfg!(windows) {
        Platform::LLP64
    } else {
        Platform::LP64
    };

    /// Describe a platform from its two widths.
    ///
    /// `long` is never wider than a pointer, so a 32-bit platform with a
    /// 64-bit `long` is rejected.
    pub const fn new(pointer_width: Width, long_width: Width) -> Option<Self> {
        match (pointer_width, long_width) {
            (Width::W32, Width::W64) => None,
            _ => Some(Self::pair(pointer_width, long_width)),
        }
    }

    const fn pair(pointer_width: Width, long_width: Width) -> Self {
        Self {
            pointer_width,
            long_width,
        }
    }

    /// The platform this crate was compiled for.
    pub const fn host() -> Self {
        Self::HOST
    }

    /// Describe a platform from byte counts, as found in config files.
    pub const fn from_bytes(pointer_bytes: usize, long_bytes: usize) -> Option<Self> {
        match (Width::from_bytes(pointer_bytes), Width::from_bytes(long_bytes)) {
            (Some(pointer_width), Some(long_width)) => Self::new(pointer_width, long_width),
            _ => None,
        }
    }

    pub const fn pointer_width(&self) -> Width {
        self.pointer_width
    }

    pub const fn long_width(&self) -> Width {
        self.long_width
    }

    /// Whether this is the platform the crate runs on.
    pub fn is_host(&self) -> bool {
        *self == Self::HOST
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = match (self.pointer_width, self.long_width) {
            (Width::W32, _) => "ILP32",
            (Width::W64, Width::W64) => "LP64",
            (Width::W64, Width::W32) => "LLP64",
        };
        write!(
            f,
            "{} (pointer {}, long {})",
            model, self.pointer_width, self.long_width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_long;
    use std::mem::size_of;

    #[test]
    fn test_host_matches_compiler() {
        let host = Platform::host();
        assert_eq!(host.pointer_width().bytes(), size_of::<usize>());
        assert_eq!(host.long_width().bytes(), size_of::<c_long>());
        assert!(host.is_host());
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(Platform::from_bytes(8, 4), Some(Platform::LLP64));
        assert_eq!(Platform::from_bytes(4, 4), Some(Platform::ILP32));
        assert_eq!(Platform::from_bytes(8, 8), Some(Platform::LP64));
        assert_eq!(Platform::from_bytes(2, 4), None);
        assert_eq!(Platform::from_bytes(8, 16), None);
        assert_eq!(Platform::from_bytes(4, 8), None);
        assert_eq!(Platform::new(Width::W32, Width::W64), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Platform::LLP64.to_string(),
            "LLP64 (pointer 64-bit, long 32-bit)"
        );
    }
}
