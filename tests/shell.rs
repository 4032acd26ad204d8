use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdout, Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tempfile::TempDir;

fn spawn_shell(home: &TempDir) -> Child {
    Command::new(env!("CARGO_BIN_EXE_smallsh"))
        .arg("--plain")
        .env("HOME", home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

fn run_shell(input: &str) -> (Output, u32) {
    let home = TempDir::new().unwrap();
    let mut child = spawn_shell(&home);
    let pid = child.id();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    (child.wait_with_output().unwrap(), pid)
}

fn stdout_of(input: &str) -> String {
    let (output, _) = run_shell(input);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stream_lines(stdout: ChildStdout) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Consumes output up to and including the first line containing `needle`.
fn wait_for(lines: &Receiver<String>, needle: &str) -> Vec<String> {
    let mut seen = Vec::new();
    loop {
        let line = lines
            .recv_timeout(Duration::from_secs(10))
            .unwrap_or_else(|_| panic!("timed out waiting for {:?} after {:?}", needle, seen));
        let found = line.contains(needle);
        seen.push(line);
        if found {
            return seen;
        }
    }
}

#[test]
fn test_cd_then_external_pwd() {
    let stdout = stdout_of("cd /tmp\npwd\nexit\n");
    assert!(stdout.contains("/tmp"), "stdout: {}", stdout);
}

#[test]
fn test_false_then_status() {
    let stdout = stdout_of("false\nstatus\nexit\n");
    assert!(stdout.contains("exit value 1"), "stdout: {}", stdout);
}

#[test]
fn test_initial_status_is_zero() {
    let stdout = stdout_of("# nothing yet\n\n   \nstatus\nexit\n");
    assert!(stdout.contains("exit value 0"), "stdout: {}", stdout);
}

#[test]
fn test_exit_code_is_stored() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("seven.sh");
    fs::write(&script, "exit 7\n").unwrap();

    let stdout = stdout_of(&format!("sh {}\nstatus\nexit\n", script.display()));
    assert!(stdout.contains("exit value 7"), "stdout: {}", stdout);
}

#[test]
fn test_signal_termination_is_reported() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("suicide.sh");
    fs::write(&script, "kill -9 $$\n").unwrap();

    let stdout = stdout_of(&format!("sh {}\nstatus\nexit\n", script.display()));
    assert_eq!(
        stdout.matches("terminated by signal 9").count(),
        2,
        "stdout: {}",
        stdout
    );
    assert!(!stdout.contains("exit value 9"));
}

#[test]
fn test_pid_expansion() {
    let (output, pid) = run_shell("echo pid=$$\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("pid={}", pid)), "stdout: {}", stdout);
}

#[test]
fn test_redirection_round_trip() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("out.txt");

    let stdout = stdout_of(&format!(
        "echo hello > {0}\ncat < {0}\nexit\n",
        file.display()
    ));

    assert_eq!(fs::read_to_string(&file).unwrap(), "hello\n");
    assert!(stdout.contains("hello"), "stdout: {}", stdout);
}

#[test]
fn test_missing_input_file_fails_child() {
    let (output, _) = run_shell("cat < /no/such/input/file\nstatus\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/no/such/input/file"), "stderr: {}", stderr);
    assert!(stdout.contains("exit value 1"), "stdout: {}", stdout);
}

#[test]
fn test_unknown_program_exits_one() {
    let (output, _) = run_shell("no_such_program_smallsh_test\nstatus\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no_such_program_smallsh_test"), "stderr: {}", stderr);
    assert!(stdout.contains("exit value 1"), "stdout: {}", stdout);
}

#[test]
fn test_parse_error_keeps_status() {
    let (output, _) = run_shell("false\nls >\nstatus\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("syntax error"), "stderr: {}", stderr);
    assert!(stdout.contains("exit value 1"), "stdout: {}", stdout);
}

#[test]
fn test_cd_failure_is_not_fatal() {
    let (output, _) = run_shell("cd /no/such/dir\nstatus\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/no/such/dir"), "stderr: {}", stderr);
    assert!(stdout.contains("exit value 0"), "stdout: {}", stdout);
    assert!(output.status.success());
}

#[test]
fn test_background_job_is_reported_when_done() {
    let stdout = stdout_of("true &\nsleep 1\nexit\n");

    let pid: u32 = stdout
        .split("background pid is ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|pid| pid.parse().ok())
        .unwrap_or_else(|| panic!("no background pid in {:?}", stdout));
    assert!(
        stdout.contains(&format!("background pid {} is done: exit value 0", pid)),
        "stdout: {}",
        stdout
    );
}

#[test]
fn test_background_output_goes_to_null_device() {
    let stdout = stdout_of("echo should-not-appear &\nsleep 1\nexit\n");
    assert!(!stdout.contains("should-not-appear"), "stdout: {}", stdout);
}

#[test]
fn test_exit_with_running_background_job() {
    let (output, _) = run_shell("sleep 30 &\nexit\n");
    assert!(output.status.success());
}

#[test]
fn test_end_of_input_exits_cleanly() {
    let (output, _) = run_shell("status\n");
    assert!(output.status.success());
}

#[test]
fn test_sigtstp_toggles_foreground_only_mode() {
    let home = TempDir::new().unwrap();
    let mut child = spawn_shell(&home);
    let shell = Pid::from_raw(child.id() as i32);
    let lines = stream_lines(child.stdout.take().unwrap());
    let mut stdin = child.stdin.take().unwrap();

    writeln!(stdin, "status").unwrap();
    wait_for(&lines, "exit value 0");

    kill(shell, Signal::SIGTSTP).unwrap();
    wait_for(&lines, "Entering foreground-only mode");

    writeln!(stdin, "sleep 0 &").unwrap();
    writeln!(stdin, "status").unwrap();
    let seen = wait_for(&lines, "exit value 0");
    assert!(seen.iter().all(|line| !line.contains("background pid is")));

    kill(shell, Signal::SIGTSTP).unwrap();
    wait_for(&lines, "Exiting foreground-only mode");

    writeln!(stdin, "sleep 0 &").unwrap();
    wait_for(&lines, "background pid is");

    writeln!(stdin, "exit").unwrap();
    drop(stdin);
    assert!(child.wait().unwrap().success());
}

#[test]
fn test_sigint_does_not_stop_shell() {
    let home = TempDir::new().unwrap();
    let mut child = spawn_shell(&home);
    let shell = Pid::from_raw(child.id() as i32);
    let lines = stream_lines(child.stdout.take().unwrap());
    let mut stdin = child.stdin.take().unwrap();

    writeln!(stdin, "status").unwrap();
    wait_for(&lines, "exit value 0");

    kill(shell, Signal::SIGINT).unwrap();
    kill(shell, Signal::SIGTERM).unwrap();

    writeln!(stdin, "false").unwrap();
    writeln!(stdin, "status").unwrap();
    wait_for(&lines, "exit value 1");

    writeln!(stdin, "exit").unwrap();
    drop(stdin);
    assert!(child.wait().unwrap().success());
}

fn script(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path.display().to_string()
}

#[test]
fn test_foreground_child_dies_on_sigint() {
    let dir = TempDir::new().unwrap();
    let int = script(&dir, "int.sh", "kill -INT $$\nsleep 5\n");

    let stdout = stdout_of(&format!("sh {}\nstatus\nexit\n", int));
    assert!(stdout.contains("terminated by signal 2"), "stdout: {}", stdout);
}

#[test]
fn test_child_sigterm_is_reset_to_default() {
    let dir = TempDir::new().unwrap();
    let term = script(&dir, "term.sh", "kill -TERM $$\nsleep 5\n");

    let stdout = stdout_of(&format!("sh {}\nstatus\nexit\n", term));
    assert!(stdout.contains("terminated by signal 15"), "stdout: {}", stdout);
}

#[test]
fn test_background_child_ignores_sigint() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("survived");
    let bg = script(
        &dir,
        "bg.sh",
        &format!("kill -INT $$\ntouch {}\n", marker.display()),
    );

    let stdout = stdout_of(&format!("sh {} &\nsleep 1\nexit\n", bg));
    assert!(marker.exists(), "stdout: {}", stdout);
    assert!(stdout.contains("is done: exit value 0"), "stdout: {}", stdout);
}

#[test]
fn test_sigtstp_during_foreground_wait_is_restarted() {
    let home = TempDir::new().unwrap();
    let mut child = spawn_shell(&home);
    let shell = Pid::from_raw(child.id() as i32);
    let lines = stream_lines(child.stdout.take().unwrap());
    let mut stdin = child.stdin.take().unwrap();

    writeln!(stdin, "status").unwrap();
    wait_for(&lines, "exit value 0");

    writeln!(stdin, "sleep 1").unwrap();
    thread::sleep(Duration::from_millis(300));
    kill(shell, Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(100));
    kill(shell, Signal::SIGTSTP).unwrap();

    writeln!(stdin, "status").unwrap();
    let seen = wait_for(&lines, "exit value");
    assert!(seen.iter().any(|line| line.contains("Entering foreground-only mode")));
    assert!(seen.iter().any(|line| line.contains("Exiting foreground-only mode")));
    assert!(seen.last().unwrap().contains("exit value 0"), "seen: {:?}", seen);

    writeln!(stdin, "exit").unwrap();
    drop(stdin);
    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("wait failed"), "stderr: {}", stderr);
    assert!(output.status.success());
}
