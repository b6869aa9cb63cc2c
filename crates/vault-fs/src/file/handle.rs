//! Open file handles

use std::io;
use std::sync::Arc;
use vault_store::ObjectId;

use super::OpenMode;
use crate::repo::Shared;
use crate::tree::FileState;
use crate::{Error, NormalizedPath, Result};

/// Bytes fetched from storage per step while scanning for a newline
const LINE_CHUNK: usize = 8 * 1024;

/// Reference point for [`FileHandle::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = Error;

    /// `0`, `1` and `2`, as in `SEEK_SET`, `SEEK_CUR` and `SEEK_END`.
    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(Error::invalid_argument(format!(
                "invalid whence ({other}, should be 0, 1 or 2)"
            ))),
        }
    }
}

/// The committed version a handle was opened on.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    version: u64,
    len: u64,
}

/// Snapshot bytes fetched ahead of the cursor by line reads.
#[derive(Debug)]
struct ReadAhead {
    offset: u64,
    data: Vec<u8>,
}

impl ReadAhead {
    /// Buffered bytes from `pos` on, empty when `pos` is outside the buffer.
    fn tail(&self, pos: u64) -> &[u8] {
        pos.checked_sub(self.offset)
            .and_then(|skip| usize::try_from(skip).ok())
            .and_then(|skip| self.data.get(skip..))
            .unwrap_or(&[])
    }
}

#[derive(Debug)]
struct OpenState {
    pos: u64,
    snapshot: Snapshot,
    /// Private copy holding writes not yet committed; replaces the snapshot
    working: Option<Vec<u8>>,
    readahead: Option<ReadAhead>,
    dirty: bool,
}

impl OpenState {
    fn len(&self) -> u64 {
        self.working
            .as_ref()
            .map_or(self.snapshot.len, |buf| buf.len() as u64)
    }
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Any,
    Read,
    Write,
}

fn to_usize(value: u64, path: &NormalizedPath) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::invalid_argument(format!("offset {value} too large for {path}")))
}

/// Zero-extend or shrink `buf` to `len` bytes.
///
/// Growth that cannot be allocated is an error rather than an abort.
fn resize(buf: &mut Vec<u8>, len: usize, path: &NormalizedPath) -> Result<()> {
    if let Some(additional) = len.checked_sub(buf.len()).filter(|&n| n > 0) {
        buf.try_reserve_exact(additional).map_err(|_| {
            Error::invalid_argument(format!("cannot grow {path} to {len} bytes"))
        })?;
    }
    buf.resize(len, 0);
    Ok(())
}

/// An open file in a repository.
///
/// Reads observe the version that was current when the file was opened
/// until the handle writes. Writes go to a private copy that becomes the
/// file's next version on [`flush`](Self::flush) or [`close`](Self::close).
/// Dropping the handle closes it.
#[derive(Debug)]
pub struct FileHandle {
    shared: Arc<Shared>,
    path: NormalizedPath,
    object: ObjectId,
    mode: OpenMode,
    state: Option<OpenState>,
}

impl FileHandle {
    pub(crate) fn new(
        shared: Arc<Shared>,
        path: NormalizedPath,
        mode: OpenMode,
        file: FileState,
        truncate: bool,
    ) -> Self {
        let mut state = OpenState {
            pos: 0,
            snapshot: Snapshot {
                version: file.version,
                len: file.len,
            },
            working: truncate.then(Vec::new),
            readahead: None,
            dirty: truncate,
        };
        if mode.append() {
            state.pos = state.len();
        }
        Self {
            shared,
            path,
            object: file.object,
            mode,
            state: Some(state),
        }
    }

    fn live(&mut self, access: Access) -> Result<(&mut OpenState, &Shared)> {
        let state = self.state.as_mut().ok_or_else(|| Error::ClosedHandle {
            path: self.path.to_string(),
        })?;
        self.shared.ensure_open()?;
        match access {
            Access::Read if !self.mode.readable() => Err(Error::NotReadable {
                path: self.path.to_string(),
            }),
            Access::Write if !self.mode.writable() => Err(Error::NotWritable {
                path: self.path.to_string(),
            }),
            _ => Ok((state, &self.shared)),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn readable(&self) -> bool {
        self.mode.readable()
    }

    pub fn writable(&self) -> bool {
        self.mode.writable()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    /// Current cursor position.
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.live(Access::Any)?.0.pos)
    }

    /// Length of the content as this handle sees it.
    pub fn len(&mut self) -> Result<u64> {
        Ok(self.live(Access::Any)?.0.len())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn current(&self) -> Result<&OpenState> {
        self.state.as_ref().ok_or_else(|| Error::ClosedHandle {
            path: self.path.to_string(),
        })
    }

    fn advance(&mut self, n: usize) {
        if let Some(state) = self.state.as_mut() {
            state.pos += n as u64;
        }
    }

    fn read_range(&self, state: &OpenState, offset: u64, len: usize) -> Result<Vec<u8>> {
        match &state.working {
            Some(buf) => {
                let start = to_usize(offset, &self.path)?.min(buf.len());
                let end = start.saturating_add(len).min(buf.len());
                Ok(buf[start..end].to_vec())
            }
            None => self.shared.read_object(
                &self.path,
                self.object,
                state.snapshot.version,
                offset,
                len,
            ),
        }
    }

    /// Up to one line chunk of content from the cursor on.
    ///
    /// Snapshot reads are served from the read-ahead buffer, so a run of
    /// short lines costs one storage read per chunk instead of per line.
    fn line_chunk(&mut self) -> Result<&[u8]> {
        let state = self.state.as_mut().ok_or_else(|| Error::ClosedHandle {
            path: self.path.to_string(),
        })?;
        let pos = state.pos;
        if let Some(buf) = &state.working {
            let start = to_usize(pos, &self.path)?.min(buf.len());
            let end = start.saturating_add(LINE_CHUNK).min(buf.len());
            return Ok(&buf[start..end]);
        }
        if pos >= state.snapshot.len {
            return Ok(&[][..]);
        }

        let buffered = state
            .readahead
            .as_ref()
            .is_some_and(|ahead| !ahead.tail(pos).is_empty());
        if !buffered {
            let data = self.shared.read_object(
                &self.path,
                self.object,
                state.snapshot.version,
                pos,
                LINE_CHUNK,
            )?;
            state.readahead = Some(ReadAhead { offset: pos, data });
        }
        Ok(state
            .readahead
            .as_ref()
            .map_or(&[][..], |ahead| ahead.tail(pos)))
    }

    /// Read up to `n` bytes, or everything up to the end with `None`.
    ///
    /// Returns an empty buffer at end of content.
    pub fn read(&mut self, n: Option<usize>) -> Result<Vec<u8>> {
        self.live(Access::Read)?;
        let state = self.current()?;
        let remaining = to_usize(state.len().saturating_sub(state.pos), &self.path)?;
        let want = n.map_or(remaining, |n| n.min(remaining));
        if want == 0 {
            return Ok(Vec::new());
        }

        let data = self.read_range(state, state.pos, want)?;
        self.advance(data.len());
        Ok(data)
    }

    /// Read through the next `\n`, or to the end of content.
    ///
    /// Returns an empty buffer only at end of content. Storage is read in
    /// bounded chunks, never the whole file at once.
    pub fn readline(&mut self) -> Result<Vec<u8>> {
        self.live(Access::Read)?;
        let mut line = Vec::new();
        loop {
            let chunk = self.line_chunk()?;
            let newline = chunk.iter().position(|&b| b == b'\n');
            let taken = newline.map_or(chunk.len(), |idx| idx + 1);
            line.extend_from_slice(&chunk[..taken]);
            if taken == 0 {
                break;
            }
            self.advance(taken);
            if newline.is_some() {
                break;
            }
        }
        Ok(line)
    }

    /// Read lines until end of content, or until their total length reaches
    /// `hint`. The line crossing the hint is included. `None` and `Some(0)`
    /// read everything.
    pub fn readlines(&mut self, hint: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let limit = hint.filter(|&h| h > 0);
        let mut lines = Vec::new();
        let mut total = 0usize;
        loop {
            let line = self.readline()?;
            if line.is_empty() {
                break;
            }
            total += line.len();
            lines.push(line);
            if limit.is_some_and(|limit| total >= limit) {
                break;
            }
        }
        Ok(lines)
    }

    /// Lazy iterator over the remaining lines.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines {
            file: self,
            done: false,
        }
    }

    /// Write `data` at the cursor, or at the end in append mode.
    ///
    /// A cursor beyond the end zero-fills the gap. Nothing is committed until
    /// [`flush`](Self::flush) or [`close`](Self::close).
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let path = self.path.clone();
        let object = self.object;
        let append = self.mode.append();
        let (state, shared) = self.live(Access::Write)?;

        let pos = to_usize(state.pos, &path)?;
        let buf = state.working_copy(shared, &path, object)?;
        let start = if append { buf.len() } else { pos };
        let end = start
            .checked_add(data.len())
            .ok_or_else(|| Error::invalid_argument(format!("write past end of {path}")))?;
        if end > buf.len() {
            resize(buf, end, &path)?;
        }
        buf[start..end].copy_from_slice(data);
        state.pos = end as u64;
        state.dirty = true;
        Ok(data.len())
    }

    /// Write each item in order.
    pub fn writelines<I, B>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        for line in lines {
            self.write(line.as_ref())?;
        }
        Ok(())
    }

    /// Move the cursor, returning the new position.
    ///
    /// Seeking past the end is allowed and does not change the content.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let path = self.path.clone();
        let (state, _) = self.live(Access::Any)?;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => state.pos,
            Whence::End => state.len(),
        };
        let pos = base.checked_add_signed(offset).ok_or_else(|| {
            Error::invalid_argument(format!(
                "seek position out of range ({base} {offset:+}) in {path}"
            ))
        })?;
        state.pos = pos;
        Ok(pos)
    }

    /// Resize the content to `size`, or to the cursor with `None`.
    ///
    /// Growing zero-fills. The cursor does not move.
    pub fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
        let path = self.path.clone();
        let object = self.object;
        let (state, shared) = self.live(Access::Write)?;
        let size = size.unwrap_or(state.pos);
        let new_len = to_usize(size, &path)?;
        resize(state.working_copy(shared, &path, object)?, new_len, &path)?;
        state.dirty = true;
        Ok(size)
    }

    /// Commit pending writes as a new version; the handle stays open.
    pub fn flush(&mut self) -> Result<()> {
        let path = self.path.clone();
        let object = self.object;
        let (state, shared) = self.live(Access::Any)?;
        if let (true, Some(buf)) = (state.dirty, &state.working) {
            shared.commit(&path, object, buf)?;
            state.dirty = false;
        }
        Ok(())
    }

    /// Commit pending writes and close the handle.
    ///
    /// Idempotent. The handle is closed even when the commit fails; writes
    /// pending on a handle whose repository was closed are lost and reported
    /// as [`Error::RepoClosed`].
    pub fn close(&mut self) -> Result<()> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };
        let result = match (state.dirty, &state.working) {
            (true, Some(buf)) => self.shared.commit(&self.path, self.object, buf),
            _ => Ok(0),
        };
        if self.mode.writable() {
            self.shared.release_writer(self.object);
        }
        tracing::debug!(path = %self.path, "Closed file");
        result.map(|_| ())
    }
}

impl OpenState {
    /// The private copy, loading the snapshot into it on first use.
    fn working_copy(
        &mut self,
        shared: &Shared,
        path: &NormalizedPath,
        object: ObjectId,
    ) -> Result<&mut Vec<u8>> {
        let buf = match self.working.take() {
            Some(buf) => buf,
            None => {
                let Snapshot { version, len } = self.snapshot;
                shared.read_object(path, object, version, 0, to_usize(len, path)?)?
            }
        };
        self.readahead = None;
        Ok(self.working.insert(buf))
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path, error = %e, "Failed to commit file on drop");
        }
    }
}

/// Iterator over the lines of a [`FileHandle`], see [`FileHandle::lines`].
///
/// Ends at end of content, and after yielding an error.
#[derive(Debug)]
pub struct Lines<'a> {
    file: &'a mut FileHandle,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.file.readline() {
            Ok(line) if line.is_empty() => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Lines<'_> {}

impl io::Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = FileHandle::read(self, Some(buf.len()))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(FileHandle::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(FileHandle::flush(self)?)
    }
}

impl io::Seek for FileHandle {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset out of range")
                })?;
                (offset, Whence::Start)
            }
            io::SeekFrom::Current(offset) => (offset, Whence::Current),
            io::SeekFrom::End(offset) => (offset, Whence::End),
        };
        Ok(FileHandle::seek(self, offset, whence)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Whence::Start)]
    #[case(1, Whence::Current)]
    #[case(2, Whence::End)]
    fn whence_from_int(#[case] value: i32, #[case] expected: Whence) {
        assert_eq!(Whence::try_from(value).unwrap(), expected);
    }

    #[rstest]
    #[case(-1)]
    #[case(3)]
    #[case(42)]
    fn whence_rejects_unknown(#[case] value: i32) {
        assert!(matches!(
            Whence::try_from(value),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn len_follows_the_working_copy() {
        let mut state = OpenState {
            pos: 0,
            snapshot: Snapshot { version: 3, len: 7 },
            working: None,
            readahead: None,
            dirty: false,
        };
        assert_eq!(state.len(), 7);
        state.working = Some(vec![1, 2]);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn read_ahead_tail_is_bounded() {
        let ahead = ReadAhead {
            offset: 10,
            data: b"abcdef".to_vec(),
        };
        assert_eq!(ahead.tail(10), b"abcdef");
        assert_eq!(ahead.tail(13), b"def");
        assert!(ahead.tail(16).is_empty());
        assert!(ahead.tail(9).is_empty());
    }

    #[test]
    fn resize_rejects_impossible_growth() {
        let path = NormalizedPath::validate("/big").unwrap();
        let mut buf = b"abc".to_vec();
        assert!(matches!(
            resize(&mut buf, usize::MAX, &path),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(buf, b"abc");

        resize(&mut buf, 5, &path).unwrap();
        assert_eq!(buf, b"abc\0\0");
        resize(&mut buf, 1, &path).unwrap();
        assert_eq!(buf, b"a");
    }
}
