use bytes::{Bytes, BytesMut};

/// Splits the next line off `src`.
///
/// A line ends at `\n`; one `\r` directly before it is dropped as well. A `\r`
/// anywhere else is part of the line. Returns `None` when no complete line is
/// buffered yet.
pub(crate) fn take_line(src: &mut BytesMut) -> Option<Bytes> {
    let end = src.iter().position(|b| *b == b'\n')?;
    let mut line = src.split_to(end + 1);
    line.truncate(end);
    if line.last() == Some(&b'\r') {
        line.truncate(end - 1);
    }
    Some(line.freeze())
}
