use std::path::PathBuf;
use std::sync::Arc;

use log::{trace, Logger};

use crate::errors::BackendError;

pub trait DurationProber {
    /// Reads the duration, in seconds, from an audio file's metadata.
    fn probe(&self, data: &[u8]) -> Result<f64, BackendError>;

    fn new(ffprobe_path: Option<PathBuf>) -> Self;
}

pub fn make_wrapper(
    logger: Arc<Logger>,
    ffprobe_path: Option<PathBuf>,
) -> impl Fn(&[u8]) -> Result<f64, BackendError> {
    let prober = inner::Prober::new(ffprobe_path);

    move |data: &[u8]| {
        let seconds = prober.probe(data)?;
        trace!(logger, "Probed duration"; "seconds" => seconds);

        Ok(seconds)
    }
}

mod inner {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use lazy_static::lazy_static;
    use serde::Deserialize;

    use crate::errors::BackendError;

    lazy_static! {
        static ref FFPROBE_ARGS: Vec<OsString> = vec![
            OsString::from("-hide_banner"),
            OsString::from("-v"),
            OsString::from("error"),
            OsString::from("-of"),
            OsString::from("json"),
            OsString::from("-show_entries"),
            OsString::from("format=duration"),
        ];
    }

    pub struct Prober {
        ffprobe: PathBuf,
    }

    #[derive(Deserialize)]
    struct FfprobeOutput {
        format: FfprobeFormat,
    }

    #[derive(Deserialize)]
    struct FfprobeFormat {
        duration: String,
    }

    impl super::DurationProber for Prober {
        fn probe(&self, data: &[u8]) -> Result<f64, BackendError> {
            use std::io::Write;
            use std::process::Command;

            use tempfile::NamedTempFile;

            let input_path = {
                let mut input = NamedTempFile::new().map_err(BackendError::TemporaryFileError)?;
                input
                    .write_all(data)
                    .map_err(BackendError::TemporaryFileError)?;
                input.into_temp_path()
            };

            let output = Command::new(&self.ffprobe)
                .args(&[FFPROBE_ARGS.clone(), vec![OsString::from(&input_path)]].concat())
                .output()
                .map_err(BackendError::FfprobeFailed)?;

            let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
                .map_err(BackendError::MalformedFfprobeOutput)?;

            let duration = parsed.format.duration;

            duration
                .parse::<f64>()
                .map_err(|_| BackendError::UnusableDuration(duration))
        }

        fn new(path: Option<PathBuf>) -> Self {
            Prober {
                ffprobe: path.expect("must provide ffprobe path"),
            }
        }
    }
}
