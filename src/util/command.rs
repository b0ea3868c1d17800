use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::TaskError;
use crate::types::RunMode;

/// Receives a child's standard output one line at a time while it runs.
pub trait OutputHandler {
    fn on_chunk(&mut self, chunk: &str);
}

/// Where a child's standard output goes.
pub enum StdoutSink<'a> {
    File(File),
    Handler(&'a mut dyn OutputHandler),
    Discard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
}

/// Runs one external command to completion.
///
/// Implementations report failure when the process cannot be spawned or when it
/// writes anything at all to standard error, whatever its exit status.
pub trait CommandRunner {
    fn run(&mut self, cmd: &mut Command, stdout: StdoutSink<'_>) -> Result<CommandOutput, TaskError>;
}

pub struct SystemRunner {
    run_mode: RunMode,
}

impl SystemRunner {
    pub fn new(run_mode: RunMode) -> Self {
        Self { run_mode }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &mut Command, stdout: StdoutSink<'_>) -> Result<CommandOutput, TaskError> {
        maybe_print_command(cmd, self.run_mode);
        let program = cmd.get_program().to_string_lossy().to_string();
        let spawn_err = |source: io::Error| TaskError::Spawn {
            program: program.clone(),
            source,
        };

        let mut stderr_file = tempfile::tempfile().map_err(spawn_err)?;
        cmd.stdin(Stdio::null())
            .stderr(Stdio::from(stderr_file.try_clone().map_err(spawn_err)?));

        let status = match stdout {
            StdoutSink::File(file) => {
                cmd.stdout(Stdio::from(file));
                cmd.spawn().map_err(spawn_err)?.wait()?
            }
            StdoutSink::Discard => {
                cmd.stdout(Stdio::null());
                cmd.spawn().map_err(spawn_err)?.wait()?
            }
            StdoutSink::Handler(handler) => {
                cmd.stdout(Stdio::piped());
                let mut child = cmd.spawn().map_err(spawn_err)?;
                if let Some(out) = child.stdout.take() {
                    let streamed = stream_chunks(out, handler);
                    if let Err(err) = streamed {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(err.into());
                    }
                }
                child.wait()?
            }
        };

        let mut stderr = String::new();
        stderr_file.seek(SeekFrom::Start(0))?;
        stderr_file.read_to_string(&mut stderr)?;
        debug!("{} exited with {:?}", program, status.code());

        if !stderr.is_empty() {
            return Err(TaskError::Stderr {
                program,
                stderr: stderr.trim_end().to_string(),
            });
        }
        Ok(CommandOutput {
            status: status.code(),
        })
    }
}

/// Feeds `reader` to `handler`, splitting on both `\n` and `\r` since transfer
/// tools redraw their progress line with carriage returns.
pub fn stream_chunks<R: Read>(mut reader: R, handler: &mut dyn OutputHandler) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                emit(&mut pending, handler);
            } else {
                pending.push(byte);
            }
        }
    }
    emit(&mut pending, handler);
    Ok(())
}

fn emit(pending: &mut Vec<u8>, handler: &mut dyn OutputHandler) {
    if pending.is_empty() {
        return;
    }
    let line = String::from_utf8_lossy(pending);
    handler.on_chunk(&line);
    pending.clear();
}

pub fn command_line(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| mask_secret(&a.to_string_lossy()))
        .collect();
    format!("{} {}", program, args.join(" "))
}

/// Echoes the command through the log, which stays off the progress bar's stdout.
pub fn maybe_print_command(cmd: &Command, run_mode: RunMode) {
    if !run_mode.verbose {
        return;
    }
    info!("running {}", command_line(cmd));
}

fn mask_secret(arg: &str) -> String {
    match arg.find("--password=") {
        Some(pos) => format!("{}--password=****", &arg[..pos]),
        None => arg.to_string(),
    }
}

/// Quotes one word for a POSIX shell on the far side of an ssh connection.
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl OutputHandler for Collect {
        fn on_chunk(&mut self, chunk: &str) {
            self.0.push(chunk.to_string());
        }
    }

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn stderr_output_fails_even_with_zero_exit() {
        let mut runner = SystemRunner::new(RunMode::default());
        let err = runner
            .run(&mut sh("echo 'deprecated option' >&2; exit 0"), StdoutSink::Discard)
            .expect_err("stderr must fail");
        match err {
            TaskError::Stderr { program, stderr } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "deprecated option");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn nonzero_exit_with_silent_stderr_succeeds() {
        let mut runner = SystemRunner::new(RunMode::default());
        let out = runner
            .run(&mut sh("exit 3"), StdoutSink::Discard)
            .expect("no stderr means success");
        assert_eq!(out.status, Some(3));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let mut runner = SystemRunner::new(RunMode::default());
        let err = runner
            .run(
                &mut Command::new("/nonexistent/rbackup-test-tool"),
                StdoutSink::Discard,
            )
            .expect_err("spawn");
        assert!(matches!(err, TaskError::Spawn { .. }));
    }

    #[test]
    fn stdout_is_written_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.sql");
        let file = File::create(&path).expect("create");
        let mut runner = SystemRunner::new(RunMode::default());
        runner
            .run(&mut sh("printf 'CREATE TABLE t;\\n'"), StdoutSink::File(file))
            .expect("run");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "CREATE TABLE t;\n");
    }

    #[test]
    fn stdout_is_streamed_to_handler() {
        let mut collect = Collect::default();
        let mut runner = SystemRunner::new(RunMode::default());
        runner
            .run(
                &mut sh("printf 'file.txt\\n  10%% 1.00MB/s 0:00:09\\r  100%% 2.00MB/s 0:00:00\\n'"),
                StdoutSink::Handler(&mut collect),
            )
            .expect("run");
        assert_eq!(
            collect.0,
            vec!["file.txt", "  10% 1.00MB/s 0:00:09", "  100% 2.00MB/s 0:00:00"]
        );
    }

    #[test]
    fn stream_chunks_flushes_trailing_partial_line() {
        let mut collect = Collect::default();
        stream_chunks(&b"a\r\nb"[..], &mut collect).expect("stream");
        assert_eq!(collect.0, vec!["a", "b"]);
    }

    #[test]
    fn shell_quote_escapes_metacharacters() {
        assert_eq!(shell_quote("shop_db"), "shop_db");
        assert_eq!(shell_quote("p@ss w;rd"), "'p@ss w;rd'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured_log(run_mode: RunMode, cmd: &Command) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || maybe_print_command(cmd, run_mode));
        let bytes = buffer.0.lock().expect("log buffer").clone();
        String::from_utf8(bytes).expect("utf8 log")
    }

    #[test]
    fn verbose_command_echo_goes_to_log() {
        let mut cmd = Command::new("ssh");
        cmd.arg("app1").arg("--password=secret");
        let verbose = RunMode {
            verbose: true,
            ..RunMode::default()
        };
        let log = captured_log(verbose, &cmd);
        assert!(log.contains("running ssh app1 --password=****"), "log was: {}", log);
        assert!(!log.contains("secret"));

        assert!(captured_log(RunMode::default(), &cmd).is_empty());
    }

    #[test]
    fn command_line_masks_password() {
        let mut cmd = Command::new("ssh");
        cmd.arg("host").arg("--password=secret");
        assert_eq!(command_line(&cmd), "ssh host --password=****");
    }
}
