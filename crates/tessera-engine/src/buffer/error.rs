/// Failure of a [`DeviceBuffer`](super::DeviceBuffer) edit.
///
/// Range errors are detected before any byte is touched. Allocation failure is
/// not recoverable by this crate and is surfaced to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("records {offset}..{offset}+{count} fall outside a buffer of {len} records")]
    OutOfRange {
        offset: usize,
        count: usize,
        len: usize,
    },

    #[error("out of memory growing `{label}` to {requested_bytes} bytes")]
    OutOfMemory {
        label: &'static str,
        requested_bytes: usize,
    },
}
