//! File-backed sample producer: the one producer kind spec §6 requires.
//!
//! Reads interleaved 32-bit float I/Q pairs, little-endian, sequentially;
//! EOF terminates the producer (spec §6, "Input file format").

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::actor::{ActorKind, Producer, TERMINATE, WorkResult};
use crate::errors::{Gmr1Error, ResourceError};
use crate::sample::Sample;

pub struct FileSource {
    reader: BufReader<File>,
    exhausted: bool,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Gmr1Error> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|source| {
            Gmr1Error::Resource(ResourceError::FileOpen {
                path: path_ref.display().to_string(),
                source,
            })
        })?;
        Ok(Self {
            reader: BufReader::new(file),
            exhausted: false,
        })
    }
}

impl Producer for FileSource {
    fn kind(&self) -> ActorKind {
        ActorKind::FileSource
    }

    fn produce(&mut self, max_samples: usize, out: &mut Vec<Sample>) -> WorkResult {
        if self.exhausted {
            return TERMINATE;
        }
        if max_samples == 0 {
            return 0;
        }

        let mut buf = vec![0u8; max_samples * 8];
        let mut total_read = 0usize;
        loop {
            match self.reader.read(&mut buf[total_read..]) {
                Ok(0) => break,
                Ok(n) => {
                    total_read += n;
                    if total_read == buf.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }

        let whole_samples = total_read / 8;
        if whole_samples == 0 {
            self.exhausted = true;
            return TERMINATE;
        }

        out.reserve(whole_samples);
        for chunk in buf[..whole_samples * 8].chunks_exact(8) {
            let i = f32::from_le_bytes(chunk[0..4].try_into().unwrap());
            let q = f32::from_le_bytes(chunk[4..8].try_into().unwrap());
            out.push(Sample::new(i, q));
        }

        whole_samples as WorkResult
    }
}
