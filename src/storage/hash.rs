use std::fs;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// Read size for hashing; one MD5 block per read keeps memory flat for large jars.
const CHUNK_SIZE: usize = 128;

/// Compute the lowercase hex MD5 digest of a file's contents.
///
/// The digest depends only on the bytes, so it survives renames and moves
/// inside the plugins directory. That is what reconciliation relies on.
pub fn content_hash(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
