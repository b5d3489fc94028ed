///! Running a Sic source file from start to finish.
///!
///! Scripts whose name ends in `.sictest` get the unit-test procedures and
///! a summary at the end; their exit code is the number of unexpected
///! failures.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::env::EnvId;
use crate::error::Result;
use crate::eval::Interpreter;
use crate::reader::Reader;
use crate::unit;
use crate::value::Val;

const TEST_SUFFIX: &str = ".sictest";

pub fn is_test_script(path: &Path) -> bool {
    path.to_string_lossy().ends_with(TEST_SUFFIX)
}

/// Run the script at `path` in a fresh root context and return the
/// process exit code. `argv` becomes the script's `argv` list.
///
/// 0 on success, 1 on an error or a test script without tests, 2 if the
/// file cannot be read, and the number of failed tests when a test script
/// has unexpected failures (clamped to 1..=255).
pub fn run_script(interp: &mut Interpreter, path: &Path, argv: &[String]) -> i32 {
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("Unable to open '{}': {err}", path.display());
            return 2;
        }
    };

    let root = interp.new_root_context();
    let test_mode = is_test_script(path);
    info!(path = %path.display(), test_mode, "running script");

    match run_source(interp, root, &src, argv, test_mode) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("ERROR: {}", err.long_message());
            return 1;
        }
    }

    if !test_mode {
        return 0;
    }
    match report(interp, root, path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {}", err.long_message());
            1
        }
    }
}

fn run_source(
    interp: &mut Interpreter,
    root: EnvId,
    src: &str,
    argv: &[String],
    test_mode: bool,
) -> Result<()> {
    if test_mode {
        unit::install_unit(interp, root)?;
    }

    let argv: Vec<Val> = argv.iter().map(|arg| interp.string(arg)).collect();
    let argv = interp.list(&argv);
    interp.set(root, "argv", argv)?;

    let mut reader = Reader::new(src);
    let mut count = 0usize;
    while let Some(expr) = interp.read(&mut reader)? {
        interp.eval(expr, root)?;
        count += 1;
    }
    debug!(expressions = count, "script finished");
    Ok(())
}

fn report(interp: &mut Interpreter, root: EnvId, path: &Path) -> Result<i32> {
    let ran = unit::tests_run(interp, root)?;
    if ran == 0 {
        eprintln!("ERROR: test script '{}' contains no tests.", path.display());
        return Ok(1);
    }

    let failures = unit::failures(interp, root)?;
    let mut summary = format!("Ran {ran} test(s)\n");
    let code = if !unit::success(interp, root)? {
        summary.push_str(&format!("{failures} tests failed!\n"));
        failures.clamp(1, 255) as i32
    } else {
        if failures > 0 {
            summary.push_str("(All failures were expected.)\n");
        }
        0
    };

    let out = interp.output();
    let _ = out.write_all(summary.as_bytes());
    let _ = out.flush();
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_scripts_are_recognised_by_suffix() {
        assert!(is_test_script(&PathBuf::from("a/b/lists.sictest")));
        assert!(!is_test_script(&PathBuf::from("lists.sic")));
        assert!(!is_test_script(&PathBuf::from("sictest")));
    }

    #[test]
    fn missing_file_exits_with_2() {
        let mut interp = Interpreter::new();
        let code = run_script(&mut interp, Path::new("/definitely/not/here.sic"), &[]);
        assert_eq!(code, 2);
    }
}
