// crates/transport/src/temp.rs
use crate::AbstractPath;

/// Removes a temporary file when dropped.
#[derive(Debug)]
pub struct TempPathGuard<P: AbstractPath> {
    path: Option<P>,
}

impl<P: AbstractPath> TempPathGuard<P> {
    pub fn new(path: P) -> Self {
        Self { path: Some(path) }
    }

    /// Prevent removal of the path on drop.
    pub fn disarm(&mut self) {
        self.path = None;
    }
}

impl<P: AbstractPath> Drop for TempPathGuard<P> {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if path.exists() {
                let _ = path.unlink();
            }
        }
    }
}
