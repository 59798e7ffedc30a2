// Encoder - the image call-out behind DRAW and GETSIZE
//
// Pixel rendering is delegated to an ImageBackend. The default backend runs
// libsixel's img2sixel, copying its sixel stream onto the terminal; natural
// image sizes are read from the file header with the image crate.

use std::ffi::OsString;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use image::ImageReader;
use thiserror::Error;
use tracing::debug;

use crate::config::EncoderConfig;
use crate::protocol::DrawRequest;
use crate::terminal::write_fully;

/// Errors from an encoder call-out
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("failed to forward encoder output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to load image {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Pixel geometry for one encode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeRequest<'a> {
    pub path: &'a Path,
    /// Target size; 0 keeps the natural size on that axis
    pub width: i32,
    pub height: i32,
    /// Clip rectangle inside the scaled image; ignored unless both sides > 0
    pub clip_x: i32,
    pub clip_y: i32,
    pub clip_width: i32,
    pub clip_height: i32,
}

impl<'a> From<&DrawRequest<'a>> for EncodeRequest<'a> {
    fn from(req: &DrawRequest<'a>) -> Self {
        Self {
            path: req.path(),
            width: req.width,
            height: req.height,
            clip_x: req.shift_x,
            clip_y: req.shift_y,
            clip_width: req.view_width,
            clip_height: req.view_height,
        }
    }
}

/// External image collaborator
pub trait ImageBackend {
    /// Render `req` as sixels into `out`
    fn encode(&mut self, req: &EncodeRequest<'_>, out: &mut dyn Write) -> Result<(), EncoderError>;

    /// Natural pixel size of the image at `path`
    fn natural_size(&mut self, path: &Path) -> Result<(u32, u32), EncoderError>;
}

/// Backend running the img2sixel program
#[derive(Debug, Clone)]
pub struct Img2Sixel {
    program: String,
}

impl Img2Sixel {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl From<&EncoderConfig> for Img2Sixel {
    fn from(config: &EncoderConfig) -> Self {
        Self::new(config.program.clone())
    }
}

/// Command-line arguments for one img2sixel run
pub fn build_args(req: &EncodeRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    if req.width > 0 {
        args.push("-w".into());
        args.push(req.width.to_string().into());
    }
    if req.height > 0 {
        args.push("-h".into());
        args.push(req.height.to_string().into());
    }
    if req.clip_width > 0 && req.clip_height > 0 {
        args.push("-c".into());
        args.push(
            format!(
                "{}x{}+{}+{}",
                req.clip_width,
                req.clip_height,
                req.clip_x.max(0),
                req.clip_y.max(0)
            )
            .into(),
        );
    }

    // paths may begin with '-'
    args.push("--".into());
    args.push(req.path.as_os_str().to_owned());
    args
}

impl ImageBackend for Img2Sixel {
    fn encode(&mut self, req: &EncodeRequest<'_>, out: &mut dyn Write) -> Result<(), EncoderError> {
        let args = build_args(req);
        debug!(program = %self.program, ?args, "spawning encoder");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EncoderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let forwarded = match child.stdout.take() {
            Some(mut stdout) => forward(&mut stdout, out),
            None => Ok(()),
        };
        if forwarded.is_err() {
            // a child blocked on a full pipe would never exit
            let _ = child.kill();
        }

        let status = child.wait()?;
        forwarded?;

        if !status.success() {
            return Err(EncoderError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }

    fn natural_size(&mut self, path: &Path) -> Result<(u32, u32), EncoderError> {
        read_dimensions(path).map_err(|source| EncoderError::Metadata {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Header-only dimension read; the format is sniffed from content
fn read_dimensions(path: &Path) -> image::ImageResult<(u32, u32)> {
    ImageReader::open(path)?.with_guessed_format()?.into_dimensions()
}

fn forward(src: &mut dyn Read, out: &mut dyn Write) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        match src.read(&mut buf) {
            Ok(0) => return out.flush(),
            Ok(n) => write_fully(out, &buf[..n])?,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &Path) -> EncodeRequest<'_> {
        EncodeRequest {
            path,
            width: 0,
            height: 0,
            clip_x: 0,
            clip_y: 0,
            clip_width: 0,
            clip_height: 0,
        }
    }

    fn text(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_natural_size() {
        let args = build_args(&request(Path::new("a.png")));
        assert_eq!(text(&args), ["--", "a.png"]);
    }

    #[test]
    fn test_args_scale_and_clip() {
        let req = EncodeRequest {
            width: 320,
            height: 240,
            clip_x: -4,
            clip_y: 8,
            clip_width: 100,
            clip_height: 50,
            ..request(Path::new("-odd.png"))
        };
        assert_eq!(
            text(&build_args(&req)),
            ["-w", "320", "-h", "240", "-c", "100x50+0+8", "--", "-odd.png"]
        );
    }

    #[test]
    fn test_args_partial_clip_is_ignored() {
        let req = EncodeRequest {
            height: 16,
            clip_width: 100,
            ..request(Path::new("a.png"))
        };
        assert_eq!(text(&build_args(&req)), ["-h", "16", "--", "a.png"]);
    }

    #[test]
    fn test_from_draw_request() {
        let line = b"0;1;8;16;320;240;4;2;100;50;/tmp/a.png";
        let parsed = crate::protocol::ParsedCommand::parse(line).unwrap();
        let Some(crate::protocol::Command::Draw(draw)) = parsed.into_command(1024) else {
            panic!("expected a draw command");
        };

        let req = EncodeRequest::from(&draw);
        assert_eq!(req.path, Path::new("/tmp/a.png"));
        assert_eq!((req.width, req.height), (320, 240));
        assert_eq!(
            (req.clip_x, req.clip_y, req.clip_width, req.clip_height),
            (4, 2, 100, 50)
        );
    }

    #[test]
    fn test_encode_forwards_program_output() {
        let mut backend = Img2Sixel::new("echo");
        let req = EncodeRequest {
            width: 64,
            ..request(Path::new("pic.png"))
        };
        let mut out = Vec::new();

        backend.encode(&req, &mut out).unwrap();
        assert_eq!(out, b"-w 64 -- pic.png\n");
    }

    #[test]
    fn test_encode_reports_exit_status() {
        let mut backend = Img2Sixel::new("false");
        let err = backend
            .encode(&request(Path::new("a.png")), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, EncoderError::Failed { .. }));
    }

    #[test]
    fn test_encode_missing_program() {
        let mut backend = Img2Sixel::new("/nonexistent/img2sixel");
        let err = backend
            .encode(&request(Path::new("a.png")), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, EncoderError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/img2sixel"));
    }

    #[test]
    fn test_natural_size_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        image::RgbImage::new(50, 20).save(&path).unwrap();

        let mut backend = Img2Sixel::from(&EncoderConfig::default());
        assert_eq!(backend.program(), "img2sixel");
        assert_eq!(backend.natural_size(&path).unwrap(), (50, 20));
    }

    #[test]
    fn test_natural_size_sniffs_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-extension");
        image::RgbImage::new(7, 9)
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let mut backend = Img2Sixel::new("img2sixel");
        assert_eq!(backend.natural_size(&path).unwrap(), (7, 9));
    }

    #[test]
    fn test_natural_size_missing_file() {
        let mut backend = Img2Sixel::new("img2sixel");
        let err = backend
            .natural_size(Path::new("/nonexistent/pic.png"))
            .unwrap_err();
        assert!(matches!(err, EncoderError::Metadata { .. }));
        assert!(err.to_string().contains("/nonexistent/pic.png"));
    }
}
