use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::Duration;
use serialport::SerialPort;
use crate::drivers::AcquisitionError;
/// Anything that yields raw bytes from the front end on demand.
///
/// `read` must not block waiting for data; an empty chunk means nothing is queued.
pub trait ByteSource {
    fn read(&mut self) -> Result<Vec<u8>, AcquisitionError>;
    fn close(&mut self) -> Result<(), AcquisitionError>;
}
impl<B: ByteSource + ?Sized> ByteSource for Box<B> {
    fn read(&mut self) -> Result<Vec<u8>, AcquisitionError> {
        (**self).read()
    }
    fn close(&mut self) -> Result<(), AcquisitionError> {
        (**self).close()
    }
}
/// In-memory source useful for tests and replaying captures.
#[derive(Debug, Default)]
pub struct ManualByteSource {
    queue: VecDeque<Vec<u8>>,
    closed: bool,
}
impl ManualByteSource {
    pub fn new(chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            queue: chunks.into_iter().collect(),
            closed: false,
        }
    }
    /// Splits `bytes` into reads of at most `chunk` bytes.
    pub fn chunked(bytes: &[u8], chunk: usize) -> Self {
        Self::new(bytes.chunks(chunk.max(1)).map(<[u8]>::to_vec))
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
impl ByteSource for ManualByteSource {
    fn read(&mut self) -> Result<Vec<u8>, AcquisitionError> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "source closed").into());
        }
        Ok(self.queue.pop_front().unwrap_or_default())
    }
    fn close(&mut self) -> Result<(), AcquisitionError> {
        self.closed = true;
        Ok(())
    }
}
/// Serial (FTDI virtual COM) link to the front end.
pub struct SerialByteSource {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
}
impl SerialByteSource {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, AcquisitionError> {
        log::info!("Opening serial port {port_name} at {baud_rate} baud");
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(10))
            .open()?;
        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
        })
    }
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
impl ByteSource for SerialByteSource {
    /// Reads exactly what the driver reports as queued.
    fn read(&mut self) -> Result<Vec<u8>, AcquisitionError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))?;
        let queued = port.bytes_to_read()? as usize;
        if queued == 0 {
            return Ok(Vec::new());
        }
        let mut chunk = vec![0u8; queued];
        let read = Read::read(port, &mut chunk)?;
        chunk.truncate(read);
        Ok(chunk)
    }
    fn close(&mut self) -> Result<(), AcquisitionError> {
        if self.port.take().is_some() {
            log::info!("Closed serial port {}", self.port_name);
        }
        Ok(())
    }
}
impl Drop for SerialByteSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn manual_source_drains_then_returns_empty() {
        let mut source = ManualByteSource::chunked(&[1, 2, 3, 4, 5], 2);
        assert_eq!(source.remaining(), 3);
        assert_eq!(source.read().unwrap(), vec![1, 2]);
        assert_eq!(source.read().unwrap(), vec![3, 4]);
        assert_eq!(source.read().unwrap(), vec![5]);
        assert!(source.read().unwrap().is_empty());
    }
    #[test]
    fn reading_after_close_fails() {
        let mut source = ManualByteSource::new(vec![vec![9]]);
        source.close().unwrap();
        assert!(source.is_closed());
        assert!(matches!(source.read(), Err(AcquisitionError::Io(_))));
    }
}
