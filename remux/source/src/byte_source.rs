/*!
    The pull-based byte source contract.
*/

/**
    A pull-based origin of container bytes.

    The demuxer calls [`ByteSource::read`] repeatedly to fill its probe
    and packet buffers; returning `Ok(0)` signals end of data. No
    seeking is required or used, so one-way origins (sockets, pipes)
    qualify just as well as files.
*/
pub trait ByteSource: Send {
    /**
        Fill `buf` with the next bytes of the stream.

        Returns the number of bytes written, `Ok(0)` at end of data, or
        an error if the origin failed.
    */
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl<R: std::io::Read + Send> ByteSource for R {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(self, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn readers_are_byte_sources() {
        let mut source = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(ByteSource::read(&mut source, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(ByteSource::read(&mut source, &mut buf).unwrap(), 0);
    }
}
