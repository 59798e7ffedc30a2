//! Retrying write primitive
//!
//! `write_fully` pushes every byte or reports the first hard error. Interrupts
//! and would-block results are retried in place, iteratively.

use std::io::{self, ErrorKind, Write};

/// Write all of `buf`, resuming after partial writes and transient errors
pub fn write_fully<W: Write + ?Sized>(out: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match out.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "terminal accepted no bytes",
                ))
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Writer that replays a script of outcomes, accepting at most `chunk` bytes per call
    struct Flaky {
        script: VecDeque<Option<ErrorKind>>,
        chunk: usize,
        written: Vec<u8>,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(Some(kind)) = self.script.pop_front() {
                return Err(io::Error::from(kind));
            }
            let n = buf.len().min(self.chunk);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_partial_writes_are_resumed() {
        let mut out = Flaky {
            script: VecDeque::new(),
            chunk: 3,
            written: Vec::new(),
        };
        write_fully(&mut out, b"\x1b[3;4H").unwrap();
        assert_eq!(out.written, b"\x1b[3;4H");
    }

    #[test]
    fn test_transient_errors_are_retried() {
        let mut out = Flaky {
            script: VecDeque::from([
                Some(ErrorKind::Interrupted),
                None,
                Some(ErrorKind::WouldBlock),
                Some(ErrorKind::Interrupted),
            ]),
            chunk: 2,
            written: Vec::new(),
        };
        write_fully(&mut out, b"abcdef").unwrap();
        assert_eq!(out.written, b"abcdef");
    }

    #[test]
    fn test_hard_error_is_surfaced() {
        let mut out = Flaky {
            script: VecDeque::from([None, Some(ErrorKind::BrokenPipe)]),
            chunk: 1,
            written: Vec::new(),
        };
        let err = write_fully(&mut out, b"abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert_eq!(out.written, b"a");
    }

    #[test]
    fn test_zero_length_write_is_an_error() {
        let mut out = Flaky {
            script: VecDeque::new(),
            chunk: 0,
            written: Vec::new(),
        };
        let err = write_fully(&mut out, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }

    #[test]
    fn test_empty_buffer_writes_nothing() {
        let mut out: Vec<u8> = Vec::new();
        write_fully(&mut out, b"").unwrap();
        assert!(out.is_empty());
    }
}
