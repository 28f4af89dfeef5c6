use std::fs;
use std::io::Write;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn spawn_shell(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_minish"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start minish")
}

fn run_script(script: &str) -> Output {
    let mut child = spawn_shell(&[]);
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn variables_and_status() {
    let output = run_script("x = 5\necho $x\nfalse\necho $?\necho $x and $x\n");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "5\n1\n5 and 5\n");
}

#[test]
fn unbound_reference_reaches_the_executor_literally() {
    let output = run_script("echo '$nothing_here'\n");
    assert_eq!(stdout_of(&output), "$nothing_here\n");
}

#[test]
fn if_and_or() {
    let output = run_script(
        "if true then echo yes else echo no fi\n\
         if false then echo yes else echo no fi\n\
         or false true\necho $?\n\
         or false false\necho $?\n",
    );
    assert_eq!(stdout_of(&output), "yes\nno\n0\n1\n");
}

#[test]
fn condition_output_is_suppressed() {
    let output = run_script("if echo hidden then echo shown else echo no fi\n");
    assert_eq!(stdout_of(&output), "shown\n");
}

#[test]
fn pipeline_status_is_last_stage() {
    let output = run_script("echo a b c | tr a-z A-Z | tr -d ' '\nfalse | true\necho $?\ntrue | false\necho $?\n");
    assert_eq!(stdout_of(&output), "ABC\n0\n1\n");
}

#[test]
fn redirection_overwrite_append_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let err = dir.path().join("err.txt");
    let script = format!(
        "echo one > {out}\necho two >> {out}\necho three | cat >> {out}\nls /nonexistent-minish-path 2> {err}\n",
        out = out.display(),
        err = err.display(),
    );
    let output = run_script(&script);
    assert!(stdout_of(&output).is_empty());
    assert_eq!(fs::read_to_string(&out).unwrap(), "one\ntwo\nthree\n");
    assert!(!fs::read_to_string(&err).unwrap().is_empty());
}

#[test]
fn command_text_reaches_the_executor_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let direct = dir.path().join("direct");
    let piped = dir.path().join("piped");
    let script = format!(
        "printf '%s' 'a    b' > {}\nprintf '%s' 'a    b' | cat > {}\n",
        direct.display(),
        piped.display(),
    );
    run_script(&script);
    assert_eq!(fs::read_to_string(&direct).unwrap(), "a    b");
    assert_eq!(fs::read_to_string(&piped).unwrap(), "a    b");
}

#[test]
fn dollar_prefixed_assignment() {
    let output = run_script("$person = David\necho $person\n");
    assert_eq!(stdout_of(&output), "David\n");
    assert!(stderr_of(&output).is_empty());
}

#[test]
fn repeat_last_command() {
    let output = run_script("echo again\n!!\n");
    assert_eq!(stdout_of(&output), "again\nagain\n");
}

#[test]
fn read_builtin_consumes_the_next_line() {
    let output = run_script("read name\nworld\necho $name\n");
    assert_eq!(stdout_of(&output), "world\n");
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = fs::canonicalize(dir.path()).unwrap();
    let output = run_script(&format!("cd {}\npwd\n", canonical.display()));
    assert_eq!(stdout_of(&output), format!("{}\n", canonical.display()));
}

#[test]
fn quit_stops_reading() {
    let output = run_script("echo before\nquit\necho after\n");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "before\n");
}

#[test]
fn syntax_errors_do_not_stop_the_session() {
    let output = run_script("if true then echo x\necho $?\necho | \necho still here\n");
    assert_eq!(stdout_of(&output), "2\nstill here\n");
    let err = stderr_of(&output);
    assert!(err.contains("syntax error: 'else' not found"), "{err}");
    assert!(err.contains("syntax error: empty command in pipeline"), "{err}");
}

#[test]
fn unknown_executor_is_fatal() {
    let child = spawn_shell(&["--executor", "no-such-shell-for-minish"]);
    let output = child.wait_with_output().unwrap();
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("executor 'no-such-shell-for-minish' not found"));
}

#[test]
fn log_file_receives_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("minish.log");
    let log_arg = log.display().to_string();
    let mut child = spawn_shell(&["--log-file", &log_arg, "--log-level", "info"]);
    child.stdin.take().unwrap().write_all(b"true\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(fs::read_to_string(&log).unwrap().contains("session finished"));
}

#[test]
fn interrupt_is_relayed_to_the_foreground_job() {
    let mut child = spawn_shell(&[]);
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"sleep 30\necho $?\n").unwrap();
    stdin.flush().unwrap();

    // Give the shell time to launch the job before interrupting it.
    thread::sleep(Duration::from_millis(500));
    let started = Instant::now();
    let pid = libc::pid_t::try_from(child.id()).unwrap();
    assert_eq!(unsafe { libc::kill(pid, libc::SIGINT) }, 0);
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(output.status.success(), "the shell itself must survive");
    assert_eq!(stdout_of(&output), "-1\n");
}
