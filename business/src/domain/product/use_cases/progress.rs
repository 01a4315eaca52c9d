/// Observer of the stages of a product write, notified as each one starts.
pub trait WriteProgress: Send + Sync {
    fn uploading(&self) {}
    fn writing(&self) {}
}

/// Ignores every stage.
pub struct NoProgress;

impl WriteProgress for NoProgress {}
