//! A camera driven by external programs.
//!
//! The capture program writes one raw image to stdout. The optional
//! convert program reads a raw image on stdin and writes the encoded
//! image to stdout. Both are bounded by a deadline: a program that
//! overruns is killed, and pipes still held open by anything it spawned
//! are abandoned.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{CaptureDevice, CaptureError, EncodeSettings, ImageHandle, RawImage, Result};
use crate::model::ImageFormat;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct CommandCamera {
    command: Vec<String>,
    convert_command: Vec<String>,
    next_id: u64,
    pending: Option<Pending>,
}

/// A triggered capture whose image has not been collected.
struct Pending {
    id: u64,
    run: Running,
}

/// A child process and the threads draining its output pipes.
struct Running {
    program: String,
    child: Child,
    stdout: Receiver<io::Result<Vec<u8>>>,
    stderr: Receiver<io::Result<Vec<u8>>>,
}

impl Running {
    /// Spawns `program`. With `input`, the bytes are fed to its stdin
    /// from a background thread.
    fn spawn(program: &str, args: &[String], input: Option<Vec<u8>>) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if let Some(data) = input
            && let Some(mut stdin) = child.stdin.take()
        {
            let name = program.to_string();
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(&data) {
                    debug!("{name} stopped reading stdin early: {e}");
                }
            });
        }
        let stdout = drain(child.stdout.take().ok_or(CaptureError::EmptyImage)?);
        let stderr = drain(child.stderr.take().ok_or(CaptureError::EmptyImage)?);

        Ok(Self {
            program: program.to_string(),
            child,
            stdout,
            stderr,
        })
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Waits for exit and collects stdout, all before `deadline`.
    fn finish(mut self, deadline: Instant, timeout: Duration) -> Result<Vec<u8>> {
        let status = self.wait_until(deadline, timeout)?;

        if !status.success() {
            let stderr = recv_until(&self.stderr, deadline).unwrap_or_default();
            return Err(CaptureError::Failed {
                program: self.program,
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        match self.stdout.recv_timeout(remaining(deadline)) {
            Ok(bytes) => Ok(bytes?),
            Err(RecvTimeoutError::Timeout) => {
                warn!("{} exited but its output is still open", self.program);
                Err(CaptureError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(io::Error::other("stdout reader panicked").into())
            }
        }
    }

    fn wait_until(&mut self, deadline: Instant, timeout: Duration) -> Result<ExitStatus> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!("{} overran {timeout:?}, killing it", self.program);
                self.kill();
                return Err(CaptureError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });
    rx
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn recv_until(rx: &Receiver<io::Result<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    rx.recv_timeout(remaining(deadline)).ok()?.ok()
}

impl CommandCamera {
    /// `command` must not be empty.
    pub fn new(command: Vec<String>, convert_command: Vec<String>) -> Self {
        Self {
            command,
            convert_command,
            next_id: 0,
            pending: None,
        }
    }

    /// Stops an abandoned capture so it cannot outlive its handle.
    fn abandon_pending(&mut self) {
        if let Some(mut p) = self.pending.take() {
            warn!("abandoning capture {} still in flight", p.id);
            p.run.kill();
        }
    }
}

impl Drop for CommandCamera {
    fn drop(&mut self) {
        self.abandon_pending();
    }
}

/// Replaces `{format}`, `{width}`, `{tile}` and `{quality}` in converter
/// arguments.
fn substitute(arg: &str, format: ImageFormat, settings: &EncodeSettings) -> String {
    arg.replace("{format}", &format.to_string())
        .replace("{width}", &settings.output_width.to_string())
        .replace("{tile}", &settings.tiff_tile_size.to_string())
        .replace("{quality}", &settings.jpeg_quality.to_string())
}

impl CaptureDevice for CommandCamera {
    fn trigger_capture(&mut self) -> Result<ImageHandle> {
        self.abandon_pending();

        let Some((program, args)) = self.command.split_first() else {
            return Err(CaptureError::NotConnected);
        };
        let run = Running::spawn(program, args, None)?;

        self.next_id += 1;
        let id = self.next_id;
        debug!("triggered capture {id} via {program}");
        self.pending = Some(Pending { id, run });
        Ok(ImageHandle(id))
    }

    fn wait_for_image(&mut self, handle: ImageHandle, timeout: Duration) -> Result<RawImage> {
        let pending = match self.pending.take() {
            Some(p) if p.id == handle.0 => p,
            other => {
                self.pending = other;
                return Err(CaptureError::UnknownHandle(handle.0));
            }
        };

        let data = pending.run.finish(Instant::now() + timeout, timeout)?;
        if data.is_empty() {
            return Err(CaptureError::EmptyImage);
        }
        debug!("capture {} delivered {} bytes", handle.0, data.len());
        Ok(RawImage { data })
    }

    fn encode(
        &mut self,
        raw: &RawImage,
        format: ImageFormat,
        settings: &EncodeSettings,
    ) -> Result<Vec<u8>> {
        if format == ImageFormat::Iiq {
            return Ok(raw.data.clone());
        }
        let Some((program, args)) = self.convert_command.split_first() else {
            return Err(CaptureError::UnsupportedFormat(format));
        };
        let args: Vec<String> = args
            .iter()
            .map(|a| substitute(a, format, settings))
            .collect();

        let run = Running::spawn(program, &args, Some(raw.data.clone()))?;
        let output = run.finish(Instant::now() + settings.timeout, settings.timeout)?;
        if output.is_empty() {
            return Err(CaptureError::EmptyImage);
        }
        Ok(output)
    }

    fn describe(&self) -> String {
        self.command.join(" ")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    fn settings() -> EncodeSettings {
        EncodeSettings {
            output_width: 14_204,
            tiff_tile_size: 512,
            jpeg_quality: 90,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn captures_program_stdout() {
        let mut cam = CommandCamera::new(sh("printf RAWDATA"), vec![]);
        let handle = cam.trigger_capture().unwrap();
        let raw = cam.wait_for_image(handle, Duration::from_secs(10)).unwrap();
        assert_eq!(raw.data, b"RAWDATA");
    }

    #[test]
    fn failing_program_reports_stderr() {
        let mut cam = CommandCamera::new(sh("echo 'no body' >&2; exit 3"), vec![]);
        let handle = cam.trigger_capture().unwrap();
        let err = cam
            .wait_for_image(handle, Duration::from_secs(10))
            .unwrap_err();
        match err {
            CaptureError::Failed { stderr, .. } => assert_eq!(stderr, "no body"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_output_is_an_error() {
        let mut cam = CommandCamera::new(sh("true"), vec![]);
        let handle = cam.trigger_capture().unwrap();
        let err = cam
            .wait_for_image(handle, Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, CaptureError::EmptyImage));
    }

    #[test]
    fn slow_program_times_out() {
        let mut cam = CommandCamera::new(sh("sleep 5"), vec![]);
        let handle = cam.trigger_capture().unwrap();
        let err = cam
            .wait_for_image(handle, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Timeout(_)));
    }

    #[test]
    fn output_held_open_by_a_background_child_times_out() {
        let mut cam = CommandCamera::new(sh("printf X; sleep 3 &"), vec![]);
        let handle = cam.trigger_capture().unwrap();
        let started = Instant::now();

        let err = cam
            .wait_for_image(handle, Duration::from_millis(200))
            .unwrap_err();

        assert!(matches!(err, CaptureError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut cam = CommandCamera::new(sh("printf x"), vec![]);
        let handle = cam.trigger_capture().unwrap();
        let err = cam
            .wait_for_image(ImageHandle(handle.0 + 1), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, CaptureError::UnknownHandle(_)));
        // The real handle is still collectable.
        assert!(cam.wait_for_image(handle, Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let mut cam = CommandCamera::new(vec!["/nonexistent/camera-tool".into()], vec![]);
        assert!(matches!(
            cam.trigger_capture(),
            Err(CaptureError::Spawn { .. })
        ));
    }

    #[test]
    fn raw_passthrough_needs_no_converter() {
        let mut cam = CommandCamera::new(sh("true"), vec![]);
        let raw = RawImage {
            data: b"abc".to_vec(),
        };
        assert_eq!(
            cam.encode(&raw, ImageFormat::Iiq, &settings()).unwrap(),
            b"abc"
        );
        assert!(matches!(
            cam.encode(&raw, ImageFormat::Tiff, &settings()),
            Err(CaptureError::UnsupportedFormat(ImageFormat::Tiff))
        ));
    }

    #[test]
    fn converter_gets_substituted_args_and_stdin() {
        let mut cam = CommandCamera::new(
            sh("true"),
            sh("printf '{format}/{width}/{tile}/{quality}:'; cat"),
        );
        let raw = RawImage {
            data: b"abc".to_vec(),
        };

        let tiff = cam.encode(&raw, ImageFormat::Tiff, &settings()).unwrap();
        let jpeg = cam
            .encode(
                &raw,
                ImageFormat::Jpeg,
                &EncodeSettings {
                    jpeg_quality: 75,
                    ..settings()
                },
            )
            .unwrap();

        assert_eq!(tiff, b"tiff/14204/512/90:abc");
        assert_eq!(jpeg, b"jpeg/14204/512/75:abc");
    }

    #[test]
    fn hung_converter_is_killed_at_the_timeout() {
        let mut cam = CommandCamera::new(sh("true"), sh("sleep 3; cat"));
        let raw = RawImage {
            data: b"abc".to_vec(),
        };
        let started = Instant::now();

        let err = cam
            .encode(
                &raw,
                ImageFormat::Tiff,
                &EncodeSettings {
                    timeout: Duration::from_millis(200),
                    ..settings()
                },
            )
            .unwrap_err();

        assert!(matches!(err, CaptureError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn failing_converter_reports_stderr() {
        let mut cam = CommandCamera::new(sh("true"), sh("echo 'bad raw' >&2; exit 1"));
        let raw = RawImage {
            data: b"abc".to_vec(),
        };
        match cam.encode(&raw, ImageFormat::Jpeg, &settings()) {
            Err(CaptureError::Failed { stderr, .. }) => assert_eq!(stderr, "bad raw"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
