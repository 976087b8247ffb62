//! Single-pass batch loader.
//!
//! Decodes each listed frame and copies it into one [`FrameStack`]. With
//! more than one job, frames are decoded in windows on a rayon pool and
//! still stored strictly in list order.

use crate::cbf::{DecodedFrame, FrameDecoder, number_gaps};
use crate::core::{FrameShape, FrameStack};
use crate::error::{FrameError, LoaderError, Result};
use crate::loader::config::{ErrorPolicy, LoaderConfig};
use crate::loader::report::{FrameFailure, LoadReport};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Frames decoded per job before they are copied into the stack.
const WINDOW_PER_JOB: usize = 2;

/// Loads lists of CBF frames into a [`FrameStack`].
///
/// # Examples
///
/// ```no_run
/// use cbf_stack::cbf::CbfLibDecoder;
/// use cbf_stack::io::read_file_list;
/// use cbf_stack::loader::{BatchLoader, LoaderConfig};
///
/// let paths = read_file_list("frames.lst", false).unwrap();
/// let loader = BatchLoader::new(CbfLibDecoder::load(None).unwrap(), LoaderConfig::default());
/// let report = loader.load(&paths).unwrap();
/// println!("{} frames of {}", report.stack.len(), report.stack.shape());
/// ```
#[derive(Debug)]
pub struct BatchLoader<D: FrameDecoder> {
    decoder: D,
    config: LoaderConfig,
}

/// Stack under construction.
struct Assembly {
    stack: Option<FrameStack>,
    failures: Vec<FrameFailure>,
    capacity: usize,
}

impl<D: FrameDecoder> BatchLoader<D> {
    /// Creates a loader.
    pub const fn new(decoder: D, config: LoaderConfig) -> Self {
        Self { decoder, config }
    }

    /// The loader configuration.
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Decodes every path and stacks the frames in list order.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the list is empty,
    /// a frame fails under [`ErrorPolicy::Abort`], or no frame loads at all.
    pub fn load<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Result<LoadReport> {
        self.config.validate()?;
        if paths.is_empty() {
            return Err(LoaderError::NoFrames { failed: 0 }.into());
        }

        let started = Instant::now();
        let gaps = number_gaps(paths);
        if let Some((before, after)) = gaps.first() {
            warn!(
                gaps = gaps.len(),
                before, after, "frame numbers are not consecutive"
            );
        }

        info!(
            frames = paths.len(),
            decoder = self.decoder.name(),
            jobs = self.config.jobs,
            "loading frames"
        );

        let mut assembly = Assembly {
            stack: None,
            failures: Vec::new(),
            capacity: paths.len(),
        };

        if self.config.jobs == 1 {
            for (index, path) in paths.iter().enumerate() {
                let decoded = self.decoder.decode(path.as_ref());
                self.store(&mut assembly, index, path.as_ref(), decoded)?;
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()
                .map_err(|e| LoaderError::Pool {
                    reason: e.to_string(),
                })?;
            let window = self.config.jobs * WINDOW_PER_JOB;

            for (chunk_index, chunk) in paths.chunks(window).enumerate() {
                let decoded: Vec<Result<DecodedFrame>> = pool.install(|| {
                    chunk
                        .par_iter()
                        .map(|path| self.decoder.decode(path.as_ref()))
                        .collect()
                });
                for (offset, (path, frame)) in chunk.iter().zip(decoded).enumerate() {
                    self.store(&mut assembly, chunk_index * window + offset, path.as_ref(), frame)?;
                }
            }
        }

        let failed = assembly.failures.len();
        let Some(stack) = assembly.stack else {
            return Err(LoaderError::NoFrames { failed }.into());
        };

        let elapsed = started.elapsed();
        info!(
            frames = stack.len(),
            failed,
            shape = %stack.shape(),
            elapsed_ms = elapsed.as_millis(),
            "loaded stack"
        );

        Ok(LoadReport {
            stack,
            failures: assembly.failures,
            elapsed,
            decoder: self.decoder.name(),
        })
    }

    /// Copies one decoded frame into the stack, or records its failure.
    fn store(
        &self,
        assembly: &mut Assembly,
        index: usize,
        path: &Path,
        decoded: Result<DecodedFrame>,
    ) -> Result<()> {
        let outcome = decoded.and_then(|frame| self.push(assembly, path, &frame));
        match outcome {
            Ok(()) => {
                debug!(frame = index, path = %path.display(), "frame stored");
                Ok(())
            }
            Err(err) => match self.config.policy {
                ErrorPolicy::Abort => Err(LoaderError::FrameFailed {
                    index,
                    path: path.to_string_lossy().to_string(),
                    source: Box::new(err),
                }
                .into()),
                ErrorPolicy::Skip => {
                    warn!(frame = index, path = %path.display(), error = %err, "skipping frame");
                    assembly.failures.push(FrameFailure {
                        index,
                        path: path.to_path_buf(),
                        error: err.to_string(),
                    });
                    Ok(())
                }
            },
        }
    }

    fn push(&self, assembly: &mut Assembly, path: &Path, frame: &DecodedFrame) -> Result<()> {
        let expected = assembly
            .stack
            .as_ref()
            .map(FrameStack::shape)
            .or(self.config.shape);

        let decoded = FrameShape::new(frame.params.dim_fast, frame.params.dim_mid);
        let shape = match (expected, decoded) {
            (Some(expected), Ok(actual)) if expected != actual => {
                return Err(FrameError::ShapeMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                }
                .into());
            }
            (Some(shape), _) => shape,
            (None, decoded) => decoded?,
        };

        // Checked before the stack exists so a bad first frame can't fix its shape
        if frame.pixels.len() != shape.pixel_count() {
            return Err(FrameError::LengthMismatch {
                expected: shape.pixel_count(),
                actual: frame.pixels.len(),
            }
            .into());
        }

        let capacity = assembly.capacity;
        assembly
            .stack
            .get_or_insert_with(|| FrameStack::with_capacity(shape, capacity))
            .push_frame(path, &frame.pixels)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbf::ArrayParameters;
    use crate::error::{CbfError, Error};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Decoder serving frames from memory.
    #[derive(Default)]
    struct MockDecoder {
        frames: HashMap<PathBuf, (usize, usize, Vec<i32>)>,
        calls: Mutex<Vec<PathBuf>>,
    }

    impl MockDecoder {
        fn with_frame(mut self, path: &str, width: usize, height: usize, pixels: Vec<i32>) -> Self {
            self.frames
                .insert(PathBuf::from(path), (width, height, pixels));
            self
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl FrameDecoder for MockDecoder {
        fn decode(&self, path: &Path) -> Result<DecodedFrame> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            let (width, height, pixels) =
                self.frames.get(path).ok_or_else(|| CbfError::Open {
                    path: path.display().to_string(),
                    reason: "No such file or directory".to_string(),
                })?;
            Ok(DecodedFrame {
                pixels: pixels.clone(),
                params: ArrayParameters {
                    elements: pixels.len(),
                    dim_fast: *width,
                    dim_mid: *height,
                    dim_slow: 1,
                    ..Default::default()
                },
            })
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn three_frames() -> MockDecoder {
        MockDecoder::default()
            .with_frame("x_0001.cbf", 2, 2, vec![1, 2, 3, 4])
            .with_frame("x_0002.cbf", 2, 2, vec![5, 6, 7, 8])
            .with_frame("x_0003.cbf", 2, 2, vec![9, 10, 11, 12])
    }

    #[test]
    fn test_load_in_order() {
        let loader = BatchLoader::new(three_frames(), LoaderConfig::default());
        let report = loader
            .load(&["x_0001.cbf", "x_0002.cbf", "x_0003.cbf"])
            .unwrap();

        assert_eq!(report.stack.len(), 3);
        assert_eq!(report.stack.shape(), FrameShape::new(2, 2).unwrap());
        assert_eq!(report.stack.frame(2), Some(&[9, 10, 11, 12][..]));
        assert!(report.failures.is_empty());
        assert_eq!(report.decoder, "mock");
    }

    #[test]
    fn test_abort_stops_at_first_failure() {
        let loader = BatchLoader::new(three_frames(), LoaderConfig::default());
        let err = loader
            .load(&["x_0001.cbf", "missing.cbf", "x_0003.cbf"])
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Loader(LoaderError::FrameFailed { index: 1, .. })
        ));
        assert_eq!(loader.decoder.calls().len(), 2);
    }

    #[test]
    fn test_skip_records_failures() {
        let config = LoaderConfig::default().with_policy(ErrorPolicy::Skip);
        let loader = BatchLoader::new(three_frames(), config);
        let report = loader
            .load(&["missing.cbf", "x_0002.cbf", "x_0003.cbf"])
            .unwrap();

        assert_eq!(report.stack.len(), 2);
        assert_eq!(report.stack.frame(0), Some(&[5, 6, 7, 8][..]));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert!(report.failures[0].error.contains("missing.cbf"));
    }

    #[test]
    fn test_skip_everything_failed() {
        let config = LoaderConfig::default().with_policy(ErrorPolicy::Skip);
        let loader = BatchLoader::new(three_frames(), config);
        let err = loader.load(&["a.cbf", "b.cbf"]).unwrap_err();
        assert!(matches!(
            err,
            Error::Loader(LoaderError::NoFrames { failed: 2 })
        ));
    }

    #[test]
    fn test_empty_input() {
        let loader = BatchLoader::new(three_frames(), LoaderConfig::default());
        let empty: [&str; 0] = [];
        assert!(matches!(
            loader.load(&empty),
            Err(Error::Loader(LoaderError::NoFrames { failed: 0 }))
        ));
        assert!(loader.decoder.calls().is_empty());
    }

    #[test]
    fn test_configured_shape_mismatch() {
        let config = LoaderConfig::default().with_shape(FrameShape::new(1475, 1679).unwrap());
        let loader = BatchLoader::new(three_frames(), config);
        let err = loader.load(&["x_0001.cbf"]).unwrap_err();
        assert!(err.to_string().contains("1475x1679"));
    }

    #[test]
    fn test_shape_taken_from_first_frame() {
        let decoder = three_frames().with_frame("y_0004.cbf", 4, 1, vec![0, 0, 0, 0]);
        let config = LoaderConfig::default().with_policy(ErrorPolicy::Skip);
        let loader = BatchLoader::new(decoder, config);
        let report = loader
            .load(&["x_0001.cbf", "y_0004.cbf", "x_0002.cbf"])
            .unwrap();

        assert_eq!(report.stack.len(), 2);
        assert_eq!(report.failures[0].index, 1);
        assert!(report.failures[0].error.contains("4x1"));
    }

    #[test]
    fn test_pixel_count_must_match_dimensions() {
        let decoder = MockDecoder::default().with_frame("z.cbf", 2, 2, vec![1, 2, 3]);
        let loader = BatchLoader::new(decoder, LoaderConfig::default());
        let err = loader.load(&["z.cbf"]).unwrap_err();
        assert!(err.to_string().contains("3 pixels"));
        let Error::Loader(LoaderError::FrameFailed { source, .. }) = err else {
            panic!("expected frame failure");
        };
        assert!(matches!(
            *source,
            Error::Frame(FrameError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_oversized_dimensions_are_skipped() {
        let huge = 1_usize << (usize::BITS / 2 + 1);
        let decoder = three_frames().with_frame("big.cbf", huge, huge, vec![1, 2, 3, 4]);
        let config = LoaderConfig::default().with_policy(ErrorPolicy::Skip);
        let report = BatchLoader::new(decoder, config)
            .load(&["big.cbf", "x_0001.cbf", "x_0002.cbf"])
            .unwrap();

        assert_eq!(report.stack.len(), 2);
        assert_eq!(report.stack.shape(), FrameShape::new(2, 2).unwrap());
        assert_eq!(report.failures[0].index, 0);
        assert!(report.failures[0].error.contains("too many pixels"));
    }

    #[test]
    fn test_failed_first_frame_does_not_fix_shape() {
        let decoder = three_frames().with_frame("short.cbf", 3, 3, vec![1, 2]);
        let config = LoaderConfig::default().with_policy(ErrorPolicy::Skip);
        let report = BatchLoader::new(decoder, config)
            .load(&["short.cbf", "x_0001.cbf"])
            .unwrap();

        assert_eq!(report.stack.len(), 1);
        assert_eq!(report.stack.shape(), FrameShape::new(2, 2).unwrap());
    }

    /// Log sink shared with a `tracing` subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    #[test]
    fn test_number_gaps_warned_once() {
        let decoder = three_frames()
            .with_frame("x_0005.cbf", 2, 2, vec![0; 4])
            .with_frame("x_0009.cbf", 2, 2, vec![0; 4]);
        let loader = BatchLoader::new(decoder, LoaderConfig::default());

        let (report, logs) = capture_warnings(|| {
            loader.load(&["x_0001.cbf", "x_0002.cbf", "x_0005.cbf", "x_0009.cbf"])
        });

        assert_eq!(report.unwrap().stack.len(), 4);
        assert_eq!(logs.matches("frame numbers are not consecutive").count(), 1);
        assert!(logs.contains("gaps=2"));
        assert!(logs.contains("before=2 after=5"));
    }

    #[test]
    fn test_consecutive_numbers_not_warned() {
        let loader = BatchLoader::new(three_frames(), LoaderConfig::default());
        let (report, logs) =
            capture_warnings(|| loader.load(&["x_0001.cbf", "x_0002.cbf", "x_0003.cbf"]));

        assert!(report.is_ok());
        assert!(!logs.contains("not consecutive"));
    }

    #[test]
    fn test_missing_dimensions() {
        let decoder = MockDecoder::default().with_frame("flat.cbf", 4, 0, vec![1, 2, 3, 4]);
        let loader = BatchLoader::new(decoder, LoaderConfig::default());
        assert!(loader.load(&["flat.cbf"]).is_err());

        // A configured shape covers frames without usable dimensions
        let decoder = MockDecoder::default().with_frame("flat.cbf", 4, 0, vec![1, 2, 3, 4]);
        let config = LoaderConfig::default().with_shape(FrameShape::new(2, 2).unwrap());
        let report = BatchLoader::new(decoder, config).load(&["flat.cbf"]).unwrap();
        assert_eq!(report.stack.len(), 1);
    }

    #[test]
    fn test_parallel_preserves_order() {
        let mut decoder = MockDecoder::default();
        let mut paths = Vec::new();
        for i in 0..25 {
            let path = format!("p_{i:04}.cbf");
            decoder = decoder.with_frame(&path, 1, 1, vec![i]);
            paths.push(path);
        }

        let config = LoaderConfig::default().with_jobs(3);
        let report = BatchLoader::new(decoder, config).load(&paths).unwrap();

        assert_eq!(report.stack.len(), 25);
        assert_eq!(report.stack.pixels(), (0..25).collect::<Vec<i32>>().as_slice());
    }

    #[test]
    fn test_parallel_abort_reports_list_index() {
        let mut decoder = MockDecoder::default();
        let mut paths = Vec::new();
        for i in 0..10 {
            let path = format!("p_{i:04}.cbf");
            if i != 7 {
                decoder = decoder.with_frame(&path, 1, 1, vec![i]);
            }
            paths.push(path);
        }

        let config = LoaderConfig::default().with_jobs(2);
        let err = BatchLoader::new(decoder, config).load(&paths).unwrap_err();
        assert!(matches!(
            err,
            Error::Loader(LoaderError::FrameFailed { index: 7, .. })
        ));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let config = LoaderConfig::default().with_jobs(0);
        let loader = BatchLoader::new(three_frames(), config);
        assert!(matches!(
            loader.load(&["x_0001.cbf"]),
            Err(Error::Config { .. })
        ));
    }
}
