use std::path::{Path, PathBuf};

/// Ordered list of audio files played one after another, wrapping around.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    files: Vec<PathBuf>,
    current: usize,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<P: Into<PathBuf>>(&mut self, path: P) {
        self.files.push(path.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn current(&self) -> Option<&Path> {
        self.files.get(self.current).map(PathBuf::as_path)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Step to the next file, back to the first after the last one.
    pub fn next(&mut self) -> Option<&Path> {
        if self.files.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.files.len();
        self.current()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for Playlist {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(Into::into).collect(),
            current: 0,
        }
    }
}
