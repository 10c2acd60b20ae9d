// crates/transport/src/platform.rs

/// Naming rules of the system that hosts an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Platform {
    #[default]
    Posix,
    Windows,
}

impl Platform {
    /// Platform of the running process.
    pub const fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    pub const fn separator(self) -> char {
        match self {
            Platform::Posix => '/',
            Platform::Windows => '\\',
        }
    }

    /// Whether names differing only in case refer to the same entry.
    pub const fn folds_case(self) -> bool {
        matches!(self, Platform::Windows)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Posix => "posix",
            Platform::Windows => "nt",
        }
    }
}
