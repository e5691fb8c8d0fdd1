use crate::error::Result;

/// Sink writes made for one burst before giving up on the remainder.
///
/// Bounds how long a single oversized burst can hold the sink's write lock.
pub const MAX_WRITE_ATTEMPTS: u32 = 10;

/// Counters describing burst delivery. None of them affect return values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub bursts: u64,
    pub bytes_written: u64,
    /// Bursts delivered only partially
    pub short_bursts: u64,
    /// Short bursts that ran out of attempts rather than hitting a sink error
    pub retries_exhausted: u64,
    pub sink_failures: u64,
}

/// Push `buffer` through `write` in chunks of at most `chunk_limit` bytes.
///
/// Returns the number of bytes the sink accepted. A short count is not an
/// error: the sink either failed, or still had bytes left after
/// [`MAX_WRITE_ATTEMPTS`] writes.
pub fn write_data_burst<F>(
    buffer: &[u8],
    chunk_limit: usize,
    stats: &mut WriteStats,
    mut write: F,
) -> usize
where
    F: FnMut(&[u8]) -> Result<usize>,
{
    let mut total = 0;
    let mut attempts = 0;
    let mut failed = false;

    while attempts < MAX_WRITE_ATTEMPTS {
        let offer = (buffer.len() - total).min(chunk_limit);
        if offer == 0 {
            break;
        }

        match write(&buffer[total..total + offer]) {
            Ok(accepted) => total += accepted.min(offer),
            Err(e) => {
                tracing::warn!("Burst write failed after {} bytes: {}", total, e);
                stats.sink_failures += 1;
                failed = true;
                break;
            }
        }

        attempts += 1;
        if total == buffer.len() {
            break;
        }
    }

    stats.bursts += 1;
    stats.bytes_written += total as u64;
    if total < buffer.len() {
        stats.short_bursts += 1;
        if !failed && attempts == MAX_WRITE_ATTEMPTS {
            stats.retries_exhausted += 1;
        }
        tracing::debug!(
            "Short burst: {} of {} bytes after {} writes",
            total,
            buffer.len(),
            attempts
        );
    }

    total
}
