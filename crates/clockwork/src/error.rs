/// Represents all possible errors that can occur in this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The cancellation token fired before the clock had enough waiters.
    #[error("Cancelled while waiting for {required} waiters")]
    Cancelled { required: usize },
}
