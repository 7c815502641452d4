//! PreviewStore - Preview Frames from the Shared-Memory Ramdisk
//!
//! ## Responsibilities
//!
//! - Locate the newest JPEG frame the output worker wrote into the preview
//!   directory
//! - Trim old frames so the ramdisk does not fill up
//!
//! The directory itself is created and destroyed by the supervisor around
//! output-role starts; this module only reads it. Absence of frames is a
//! normal state (no output running, or the worker has not produced a frame
//! yet), never an error.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::fs;

/// ~30 fps pacing for the MJPEG stream
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Frames kept by cleanup; the worker keeps writing new ones
const MAX_FRAMES_TO_KEEP: usize = 5;

/// PreviewStore instance
pub struct PreviewStore {
    dir: PathBuf,
}

impl PreviewStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Read the newest `frame_*.jpg` in the preview directory.
    /// Returns None when the directory or frames are missing or unreadable —
    /// the directory may be recreated underneath us at any time.
    pub async fn latest_frame(&self) -> Option<Vec<u8>> {
        let frames = self.list_frames().await;
        let (path, _) = frames.into_iter().max_by_key(|(_, mtime)| *mtime)?;
        fs::read(&path).await.ok()
    }

    /// Whether a preview frame is currently available.
    pub async fn available(&self) -> bool {
        self.latest_frame().await.is_some()
    }

    /// Remove the oldest frames, keeping the most recent few.
    pub async fn cleanup_old_frames(&self) {
        let mut frames = self.list_frames().await;
        if frames.len() <= MAX_FRAMES_TO_KEEP {
            return;
        }
        frames.sort_by_key(|(_, mtime)| *mtime);
        let excess = frames.len() - MAX_FRAMES_TO_KEEP;
        for (path, _) in frames.into_iter().take(excess) {
            let _ = fs::remove_file(&path).await;
        }
    }

    async fn list_frames(&self) -> Vec<(PathBuf, SystemTime)> {
        let mut frames = Vec::new();
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return frames;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with("frame_") || !name.ends_with(".jpg") {
                continue;
            }
            if let Ok(meta) = entry.metadata().await {
                if let Ok(mtime) = meta.modified() {
                    frames.push((entry.path(), mtime));
                }
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_frame(dir: &std::path::Path, name: &str, data: &[u8]) {
        fs::write(dir.join(name), data).await.unwrap();
        // keep mtimes strictly ordered even on coarse filesystems
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let store = PreviewStore::new(PathBuf::from("/nonexistent/preview"));
        assert!(store.latest_frame().await.is_none());
        assert!(!store.available().await);
    }

    #[tokio::test]
    async fn test_latest_frame_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreviewStore::new(dir.path().to_path_buf());

        write_frame(dir.path(), "frame_0001.jpg", b"old").await;
        write_frame(dir.path(), "frame_0002.jpg", b"new").await;
        write_frame(dir.path(), "not_a_frame.txt", b"ignored").await;

        assert_eq!(store.latest_frame().await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_cleanup_keeps_newest_frames() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreviewStore::new(dir.path().to_path_buf());

        for i in 0..8 {
            write_frame(dir.path(), &format!("frame_{:04}.jpg", i), b"x").await;
        }
        store.cleanup_old_frames().await;

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "frame_0003.jpg",
                "frame_0004.jpg",
                "frame_0005.jpg",
                "frame_0006.jpg",
                "frame_0007.jpg",
            ]
        );
    }
}
