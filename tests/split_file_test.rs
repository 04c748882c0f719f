//! Split file tests against real files on disk.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use splitfile::{ByteSource, OpenMode, SplitFile, SplitFileError, SplitFileOptions, Whence};
use tempfile::NamedTempFile;

const CHUNK_SIZE: u64 = 1024;

fn test_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u32 * 131 + seed as u32 * 7) % 256) as u8)
        .collect()
}

fn temp_file_with(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

fn open_split(file: &NamedTempFile) -> SplitFile {
    SplitFile::open(file.path(), SplitFileOptions::with_chunk_size(CHUNK_SIZE))
        .expect("open split file")
}

#[test]
fn iterator_yields_ceil_chunks() {
    let file = temp_file_with(&test_bytes(2500, 1));
    let mut split = open_split(&file);

    let mut sizes = Vec::new();
    split.begin_iteration().unwrap();
    while let Some(chunk) = split.advance().unwrap() {
        sizes.push(chunk.size().unwrap());
    }
    assert_eq!(split.len().unwrap(), 3);
    assert_eq!(sizes, vec![1024, 1024, 452]);
    assert_eq!(sizes.iter().sum::<u64>(), split.size().unwrap());
}

#[test]
fn data_integrity() {
    let data = test_bytes(10_000, 2);
    let file = temp_file_with(&data);
    let mut split = open_split(&file);

    let mut joined = Vec::new();
    split.begin_iteration().unwrap();
    while let Some(mut chunk) = split.advance().unwrap() {
        joined.extend(chunk.read_bytes(None).unwrap());
    }
    assert_eq!(
        format!("{:x}", md5::compute(&joined)),
        format!("{:x}", md5::compute(&data))
    );
}

#[test]
fn getitem_matches_iteration() {
    let file = temp_file_with(&test_bytes(5000, 3));
    let mut split = open_split(&file);

    let mut iterated = Vec::new();
    split.begin_iteration().unwrap();
    while let Some(mut chunk) = split.advance().unwrap() {
        iterated.push(chunk.read_bytes(None).unwrap());
    }

    let len = split.len().unwrap() as i64;
    for i in 0..len {
        let mut chunk = split.at(i).unwrap();
        assert_eq!(chunk.read_bytes(None).unwrap(), iterated[i as usize]);
        let mut mirrored = split.at(i - len).unwrap();
        assert_eq!(mirrored.read_bytes(None).unwrap(), iterated[i as usize]);
    }
}

#[test]
fn contains_same_and_other_file() {
    let file = temp_file_with(&test_bytes(2500, 4));
    let other_file = temp_file_with(&test_bytes(2500, 5));
    let mut split = open_split(&file);
    let mut other = open_split(&other_file);

    let digest = split.at(2).unwrap().md5().unwrap();
    assert!(split.contains_digest(&digest).unwrap());

    let mut other_chunk = other.at(2).unwrap();
    assert!(!split.contains(&mut other_chunk).unwrap());
}

#[test]
fn chunk_read_matches_container_read() {
    let file = temp_file_with(&test_bytes(3000, 6));
    let mut split = open_split(&file);

    split.begin_iteration().unwrap();
    while let Some(mut chunk) = split.advance().unwrap() {
        let data = chunk.container_mut().unwrap().read_bytes(Some(10)).unwrap();
        chunk.seek_to(0, Whence::Start).unwrap();
        assert_eq!(data, chunk.read_bytes(Some(10)).unwrap());
    }
}

#[test]
fn tell_is_relative_to_window() {
    let file = temp_file_with(&test_bytes(3000, 7));
    let mut split = open_split(&file);

    let mut chunk = split.at(1).unwrap();
    assert_eq!(chunk.tell().unwrap(), 0);
    assert_eq!(chunk.container_mut().unwrap().tell().unwrap(), CHUNK_SIZE);
    chunk.read_bytes(Some(10)).unwrap();
    assert_eq!(chunk.tell().unwrap(), 10);
    assert_eq!(chunk.container_mut().unwrap().tell().unwrap(), CHUNK_SIZE + 10);
}

#[test]
fn chunk_feeds_generic_readers() {
    let data = test_bytes(3000, 8);
    let file = temp_file_with(&data);
    let mut split = open_split(&file);

    let mut chunk = split.at(1).unwrap();
    let mut part = Vec::new();
    std::io::copy(&mut chunk, &mut part).unwrap();
    assert_eq!(part, data[1024..2048].to_vec());

    chunk.seek(SeekFrom::Start(0)).unwrap();
    let mut head = [0u8; 4];
    chunk.read_exact(&mut head).unwrap();
    assert_eq!(head.to_vec(), data[1024..1028].to_vec());
}

#[test]
fn size_follows_appends() {
    let data = test_bytes(1500, 9);
    let mut file = temp_file_with(&data);
    let mut split = open_split(&file);
    assert_eq!(split.len().unwrap(), 2);

    file.write_all(&test_bytes(1000, 10)).unwrap();
    file.flush().unwrap();
    assert_eq!(split.size().unwrap(), 2500);
    assert_eq!(split.len().unwrap(), 3);
}

#[test]
fn read_write_mode_allows_container_writes() {
    let file = temp_file_with(b"0123456789");
    let options = SplitFileOptions::with_chunk_size(4).mode(OpenMode::ReadWrite);
    let mut split = SplitFile::open(file.path(), options).unwrap();
    assert_eq!(split.mode(), OpenMode::ReadWrite);
    assert_eq!(split.path(), Some(file.path()));

    ByteSource::write(&mut split, b"ab").unwrap();
    split.close().unwrap();

    let mut contents = Vec::new();
    File::open(file.path())
        .unwrap()
        .read_to_end(&mut contents)
        .unwrap();
    assert_eq!(contents, b"ab23456789".to_vec());
}

#[test]
fn rejects_paths_that_are_not_regular_files() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SplitFile::open(dir.path(), SplitFileOptions::default()),
        Err(SplitFileError::Config(_))
    ));
    assert!(matches!(
        SplitFile::open(dir.path().join("missing.bin"), SplitFileOptions::default()),
        Err(SplitFileError::Config(_))
    ));
}

#[cfg(unix)]
#[test]
fn rejects_handles_that_are_not_files_or_fifos() {
    let dir = tempfile::tempdir().unwrap();
    let handle = File::open(dir.path()).unwrap();
    assert!(matches!(
        SplitFile::new(handle, SplitFileOptions::default()),
        Err(SplitFileError::Config(_))
    ));
}

#[cfg(unix)]
#[test]
fn rejects_handles_not_open_for_reading() {
    let file = temp_file_with(b"0123456789");
    let write_only = std::fs::OpenOptions::new()
        .write(true)
        .open(file.path())
        .unwrap();
    assert!(matches!(
        SplitFile::new(write_only, SplitFileOptions::with_chunk_size(4)),
        Err(SplitFileError::Config(_))
    ));
}

#[cfg(unix)]
#[test]
fn read_write_mode_needs_a_writable_handle() {
    let file = temp_file_with(b"0123456789");
    let options = SplitFileOptions::with_chunk_size(4).mode(OpenMode::ReadWrite);

    let read_only = File::open(file.path()).unwrap();
    assert!(matches!(
        SplitFile::new(read_only, options),
        Err(SplitFileError::Config(_))
    ));

    let both = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(file.path())
        .unwrap();
    let mut split = SplitFile::new(both, options).unwrap();
    split.write_all(b"ab").unwrap();
    Write::flush(&mut split).unwrap();
    assert_eq!(split.at(0).unwrap().read_bytes(None).unwrap(), b"ab23".to_vec());
}

#[cfg(unix)]
#[test]
fn fifo_handle_is_read_forward() {
    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    let dir = tempfile::tempdir().unwrap();
    let fifo_path = dir.path().join("parts.fifo");
    mkfifo(fifo_path.as_path(), Mode::S_IRUSR | Mode::S_IWUSR).unwrap();

    let writer_path = fifo_path.clone();
    let writer = std::thread::spawn(move || {
        let mut pipe = std::fs::OpenOptions::new()
            .write(true)
            .open(writer_path)
            .unwrap();
        pipe.write_all(b"line1\nline2\ntail").unwrap();
    });

    let handle = File::open(&fifo_path).unwrap();
    let mut split = SplitFile::new(handle, SplitFileOptions::with_chunk_size(4)).unwrap();
    assert!(!split.seekable().unwrap());
    assert_eq!(split.len().unwrap(), 0);

    assert_eq!(split.read_line(None).unwrap(), b"line1\n".to_vec());
    assert_eq!(split.read_line(None).unwrap(), b"line2\n".to_vec());
    writer.join().unwrap();
    assert_eq!(split.read_bytes(None).unwrap(), b"tail".to_vec());
    assert!(split.read_line(None).unwrap().is_empty());
}

#[test]
fn rejects_zero_chunk_size() {
    let file = temp_file_with(b"abc");
    assert!(matches!(
        SplitFile::open(file.path(), SplitFileOptions::with_chunk_size(0)),
        Err(SplitFileError::Config(_))
    ));
}

#[test]
fn handle_is_rewound_on_construction() {
    let file = temp_file_with(&test_bytes(100, 11));
    let mut handle = File::open(file.path()).unwrap();
    handle.seek(SeekFrom::Start(50)).unwrap();

    let mut split = SplitFile::new(handle, SplitFileOptions::with_chunk_size(30)).unwrap();
    assert_eq!(split.position().unwrap(), 0);
    assert_eq!(split.offset(), Some(0));
    assert!(!split.iterating());
    assert!(split.active_chunk().is_none());
}

#[cfg(unix)]
#[test]
fn exposes_raw_descriptor() {
    use std::os::unix::io::AsRawFd;

    let file = temp_file_with(b"abc");
    let handle = File::open(file.path()).unwrap();
    let fd = handle.as_raw_fd();
    let split = SplitFile::new(handle, SplitFileOptions::default()).unwrap();
    assert_eq!(split.as_raw_fd(), fd);
}
