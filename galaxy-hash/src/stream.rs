//! Streaming MD5 helpers.

use crate::progress::ProgressSink;
use crate::{Result, STREAM_BUFFER_SIZE};
use std::io::Read;

/// Streams `reader` through MD5 in fixed-size chunks, returning the lowercase hex
/// digest without loading the whole input into memory.
///
/// `total_hint` is used only to report progress; pass `0` if unknown.
pub fn md5_hex_stream<R: Read>(
    mut reader: R,
    total_hint: u64,
    progress: Option<&dyn ProgressSink>,
) -> Result<String> {
    let mut context = md5::Context::new();
    let mut buf = [0u8; STREAM_BUFFER_SIZE];
    let mut done = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
        done += n as u64;
        if let Some(sink) = progress {
            sink.on_progress(done, total_hint);
        }
    }

    Ok(hex::encode(context.compute().0))
}

/// Convenience wrapper for hashing an in-memory buffer.
pub fn md5_hex_bytes(bytes: &[u8]) -> String {
    hex::encode(md5::compute(bytes).0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn matches_known_digest() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(md5_hex_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn stream_matches_in_memory() {
        let data = vec![0x5au8; STREAM_BUFFER_SIZE * 3 + 17];
        let expected = md5_hex_bytes(&data);
        let actual = md5_hex_stream(Cursor::new(&data), data.len() as u64, None).unwrap();
        assert_eq!(actual, expected);
    }

    struct Counter(std::sync::atomic::AtomicU64);
    impl ProgressSink for Counter {
        fn on_progress(&self, done: u64, _total: u64) {
            self.0.store(done, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn reports_final_progress() {
        let data = vec![1u8; 100];
        let counter = Counter(std::sync::atomic::AtomicU64::new(0));
        md5_hex_stream(Cursor::new(&data), 100, Some(&counter)).unwrap();
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 100);
    }
}
