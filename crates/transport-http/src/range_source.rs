// Seekable byte source over HTTP Range requests

use crate::client::{parse_total_from_content_range, HttpClient};
use playhead_core::{PlayerError, Result};
use std::collections::VecDeque;
use std::io::{Read, Seek, SeekFrom};

/// Chunk size for Range requests (256KB)
const CHUNK_SIZE: usize = 256 * 1024;

/// Maximum cache size (10MB)
const MAX_CACHE_SIZE: usize = 10 * 1024 * 1024;

struct Chunk {
    offset: u64,
    data: Vec<u8>,
}

impl Chunk {
    fn contains(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.offset + self.data.len() as u64
    }
}

/// Remote resource read on demand in fixed-size chunks, with a bounded
/// FIFO cache so the decoder's short backward seeks stay local
pub struct HttpRangeSource {
    url: String,
    client: HttpClient,
    total_size: Option<u64>,
    position: u64,
    cache: VecDeque<Chunk>,
    cached_bytes: usize,
    max_cache_bytes: usize,
}

impl HttpRangeSource {
    /// Connect and learn the resource size. Blocks on the network; call it
    /// from an engine thread. Cancelling the client aborts between requests.
    pub fn open(url: &str, client: HttpClient) -> Result<Self> {
        let mut source = Self {
            url: url.to_string(),
            client,
            total_size: None,
            position: 0,
            cache: VecDeque::new(),
            cached_bytes: 0,
            max_cache_bytes: MAX_CACHE_SIZE,
        };
        source.total_size = source.probe_size()?;

        match source.total_size {
            Some(size) => log::info!(
                "HTTP range source opened: {} ({:.2} MB)",
                source.url,
                size as f64 / 1024.0 / 1024.0
            ),
            None => log::info!("HTTP range source opened: {} (unknown size)", source.url),
        }
        Ok(source)
    }

    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    fn probe_size(&self) -> Result<Option<u64>> {
        // HEAD first; some CDNs reject it, so fall back to a one-byte range
        if let Ok(response) = self.client.head(&self.url) {
            if let Some(len) = response
                .header("Content-Length")
                .and_then(|s| s.parse::<u64>().ok())
            {
                return Ok(Some(len));
            }
        }

        let response = self.client.get_range(&self.url, 0, 0)?;
        if let Some(total) = response
            .header("Content-Range")
            .and_then(parse_total_from_content_range)
        {
            return Ok(Some(total));
        }
        Ok(None)
    }

    fn cached(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let chunk = self.cache.iter().find(|c| c.contains(offset))?;
        let start = (offset - chunk.offset) as usize;
        let end = (start + len).min(chunk.data.len());
        Some(&chunk.data[start..end])
    }

    fn fetch_chunk(&mut self, offset: u64) -> Result<()> {
        let mut end = offset + CHUNK_SIZE as u64 - 1;
        if let Some(total) = self.total_size {
            end = end.min(total.saturating_sub(1));
        }

        log::debug!("Fetching range: bytes={}-{}", offset, end);
        let response = self.client.get_range(&self.url, offset, end)?;

        // A server ignoring Range answers 200 with the whole body from byte 0
        let skip = if response.status() == 200 { offset } else { 0 };

        let mut data = Vec::with_capacity(CHUNK_SIZE);
        response
            .into_reader()
            .take(skip + CHUNK_SIZE as u64)
            .read_to_end(&mut data)
            .map_err(|e| PlayerError::Network(format!("Failed to read response: {}", e)))?;
        if skip > 0 {
            data.drain(..(skip as usize).min(data.len()));
        }

        self.cached_bytes += data.len();
        self.cache.push_back(Chunk { offset, data });
        while self.cached_bytes > self.max_cache_bytes {
            match self.cache.pop_front() {
                Some(evicted) => self.cached_bytes -= evicted.data.len(),
                None => break,
            }
        }
        Ok(())
    }
}

impl Read for HttpRangeSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(total) = self.total_size {
            if self.position >= total {
                return Ok(0);
            }
        }

        if self.cached(self.position, buf.len()).is_none() {
            self.fetch_chunk(self.position)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        }

        let n = match self.cached(self.position, buf.len()) {
            Some(data) => {
                buf[..data.len()].copy_from_slice(data);
                data.len()
            }
            // Server returned nothing for this offset: end of stream
            None => 0,
        };
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeSource {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(pos) => pos,
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "seek before start")
            })?,
            SeekFrom::End(offset) => {
                let total = self.total_size.ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "Cannot seek from end: total size unknown",
                    )
                })?;
                total.checked_add_signed(offset).ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "seek before start")
                })?
            }
        };

        self.position = new_pos;
        Ok(new_pos)
    }
}

impl symphonia::core::io::MediaSource for HttpRangeSource {
    fn is_seekable(&self) -> bool {
        self.total_size.is_some()
    }

    fn byte_len(&self) -> Option<u64> {
        self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpConfig;
    use crate::test_server::{patterned, serve, Behavior};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn client() -> HttpClient {
        HttpClient::new(HttpConfig {
            retry_base_delay: Duration::from_millis(10),
            ..HttpConfig::default()
        })
    }

    fn read_at(source: &mut HttpRangeSource, offset: u64, len: usize) -> Vec<u8> {
        source.seek(SeekFrom::Start(offset)).unwrap();
        let mut buf = vec![0u8; len];
        source.read_exact(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_chunk_contains() {
        let chunk = Chunk {
            offset: 100,
            data: vec![0; 50],
        };
        assert!(chunk.contains(100));
        assert!(chunk.contains(149));
        assert!(!chunk.contains(150));
        assert!(!chunk.contains(99));
    }

    #[test]
    fn test_reads_and_seeks_across_chunks() {
        let body = patterned(CHUNK_SIZE * 2 + 1000);
        let server = serve(body.clone(), Behavior::Ranged);
        let mut source = HttpRangeSource::open(&server.url, client()).unwrap();
        assert_eq!(source.total_size(), Some(body.len() as u64));

        // Straddles the first chunk boundary
        let start = CHUNK_SIZE as u64 - 8;
        assert_eq!(read_at(&mut source, start, 16), body[CHUNK_SIZE - 8..CHUNK_SIZE + 8]);

        source.seek(SeekFrom::End(-5)).unwrap();
        let mut tail = Vec::new();
        source.read_to_end(&mut tail).unwrap();
        assert_eq!(tail, body[body.len() - 5..]);

        source.seek(SeekFrom::Start(0)).unwrap();
        let mut all = Vec::new();
        source.read_to_end(&mut all).unwrap();
        assert_eq!(all, body);
        assert!(source.seek(SeekFrom::Current(-(body.len() as i64) - 1)).is_err());
    }

    #[test]
    fn test_cached_chunks_are_not_refetched() {
        let body = patterned(CHUNK_SIZE + 100);
        let server = serve(body.clone(), Behavior::Ranged);
        let mut source = HttpRangeSource::open(&server.url, client()).unwrap();

        read_at(&mut source, 10, 100);
        let after_first = server.requests();
        assert_eq!(read_at(&mut source, 500, 100), body[500..600]);
        assert_eq!(server.requests(), after_first);
    }

    #[test]
    fn test_cache_evicts_oldest_chunk() {
        let body = patterned(CHUNK_SIZE * 4);
        let server = serve(body.clone(), Behavior::Ranged);
        let mut source = HttpRangeSource::open(&server.url, client()).unwrap();
        source.max_cache_bytes = CHUNK_SIZE * 2;

        for chunk in 0..4 {
            read_at(&mut source, (chunk * CHUNK_SIZE) as u64, 1);
        }
        assert_eq!(source.cache.len(), 2);
        assert_eq!(source.cached_bytes, CHUNK_SIZE * 2);
        assert_eq!(source.cache.front().map(|c| c.offset), Some(2 * CHUNK_SIZE as u64));

        // The first chunk was evicted and has to be fetched again
        let before = server.requests();
        assert_eq!(read_at(&mut source, 3, 4), body[3..7]);
        assert_eq!(server.requests(), before + 1);
    }

    #[test]
    fn test_server_ignoring_range_is_skipped_to_offset() {
        let body = patterned(CHUNK_SIZE + 4096);
        let server = serve(body.clone(), Behavior::IgnoresRange);
        let mut source = HttpRangeSource::open(&server.url, client()).unwrap();
        assert_eq!(source.total_size(), Some(body.len() as u64));

        let offset = CHUNK_SIZE + 100;
        assert_eq!(read_at(&mut source, offset as u64, 32), body[offset..offset + 32]);
    }

    #[test]
    fn test_size_from_content_range_without_head() {
        let body = patterned(5000);
        let server = serve(body.clone(), Behavior::NoHead);
        let mut source = HttpRangeSource::open(&server.url, client()).unwrap();
        assert_eq!(source.total_size(), Some(5000));
        assert_eq!(read_at(&mut source, 4990, 10), body[4990..]);
    }

    #[test]
    fn test_missing_resource_fails_open() {
        let server = serve(Vec::new(), Behavior::NotFound);
        let result = HttpRangeSource::open(&server.url, client());
        assert!(matches!(result, Err(PlayerError::Network(_))));
    }

    #[test]
    fn test_unreachable_host_fails() {
        let client = HttpClient::new(HttpConfig {
            connect_timeout: Duration::from_millis(200),
            max_retries: 0,
            ..Default::default()
        });
        // Port 9 on localhost (discard) is closed on test machines
        let result = HttpRangeSource::open("http://127.0.0.1:9/missing.mp3", client);
        assert!(matches!(result, Err(PlayerError::Network(_))));
    }

    #[test]
    fn test_cancel_aborts_open_against_silent_server() {
        let server = serve(Vec::new(), Behavior::Silent);
        let cancel = Arc::new(AtomicBool::new(false));
        let client = HttpClient::new(HttpConfig {
            read_timeout: Duration::from_millis(300),
            retry_base_delay: Duration::from_secs(30),
            ..HttpConfig::default()
        })
        .with_cancel(cancel.clone());

        let url = server.url.clone();
        let opener = std::thread::spawn(move || HttpRangeSource::open(&url, client));
        std::thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        cancel.store(true, Ordering::Release);

        assert!(opener.join().unwrap().is_err());
        // At most the request on the wire runs to its read timeout
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
