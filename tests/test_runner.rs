use std::path::Path;

use assert_cmd::Command;
use pretty_assertions::assert_eq;

include!(concat!(env!("OUT_DIR"), "/test_files.rs"));

const EXPECT: &str = "// expect: ";
const EXPECT_RUNTIME_ERROR: &str = "// expect runtime error: ";
const EXPECT_ERROR: &str = "// expect error: ";

/// What a script under `tests/data` says it should do, read from its
/// trailing comments.
#[derive(Debug, Default)]
struct Expectations {
    output: Vec<String>,
    runtime_error: Option<String>,
    static_error: Option<String>,
}

fn do_test(filename: &Path) {
    let expected = find_expects(filename);

    let output = Command::cargo_bin("tlox").unwrap().arg(filename).output().unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stdout = stdout.trim_end();

    let stderr = String::from_utf8(output.stderr).unwrap();
    let stderr = stderr.trim_end();

    assert_eq!(expected.output.join("\n"), stdout, "stderr={}", stderr);

    if let Some(message) = &expected.runtime_error {
        assert_eq!(output.status.code(), Some(70), "stderr={}", stderr);
        assert!(stderr.contains(message.as_str()), "stderr={}", stderr);
    } else if let Some(message) = &expected.static_error {
        assert_eq!(output.status.code(), Some(65), "stderr={}", stderr);
        assert!(stderr.contains(message.as_str()), "stderr={}", stderr);
    } else {
        assert!(output.status.success(), "stderr={}", stderr);
    }
}

#[test]
fn warnings_are_reported_once() {
    let output = Command::cargo_bin("tlox")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("./tests/data/warnings/abstract_call.tlox")
        .output()
        .unwrap();

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(output.status.success(), "stderr={}", stderr);
    assert_eq!(stderr.matches("has no body").count(), 1, "stderr={}", stderr);
    assert!(stderr.contains("[line 2] Warning:"), "stderr={}", stderr);
}

fn find_expects(filename: &Path) -> Expectations {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let mut result = Expectations::default();
    for line in content.lines() {
        if let Some((idx, _)) = line.match_indices(EXPECT_RUNTIME_ERROR).last() {
            result.runtime_error = Some(line[idx + EXPECT_RUNTIME_ERROR.len()..].into());
        } else if let Some((idx, _)) = line.match_indices(EXPECT_ERROR).last() {
            result.static_error = Some(line[idx + EXPECT_ERROR.len()..].into());
        } else if let Some((idx, _)) = line.match_indices(EXPECT).last() {
            result.output.push(line[idx + EXPECT.len()..].into());
        }
    }

    result
}
