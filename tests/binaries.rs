use std::process::{Command, Output};

fn run_probe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sse2-probe"))
        .args(args)
        .output()
        .expect("failed to spawn sse2-probe")
}

#[test]
fn test_probe_is_silent() {
    let output = run_probe(&[]);
    assert!(output.stdout.is_empty(), "stdout: {:?}", output.stdout);
    assert!(output.stderr.is_empty(), "stderr: {:?}", output.stderr);
}

#[test]
fn test_probe_exit_status_is_binary() {
    let code = run_probe(&[]).status.code();
    assert!(matches!(code, Some(0) | Some(1)), "unexpected status {:?}", code);
}

#[test]
fn test_probe_ignores_arguments() {
    let baseline = run_probe(&[]).status.code();
    for args in [&["--help"][..], &["-v", "extra", "--bogus=1"][..], &["1"][..]] {
        let output = run_probe(args);
        assert_eq!(output.status.code(), baseline, "args {:?}", args);
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
    }
}

#[test]
fn test_probe_is_idempotent() {
    let first = run_probe(&[]).status.code();
    for _ in 0..5 {
        assert_eq!(run_probe(&[]).status.code(), first);
    }
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_probe_reports_sse2_on_x86_64() {
    assert_eq!(run_probe(&[]).status.code(), Some(0));
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
#[test]
fn test_probe_reports_unsupported_off_x86() {
    assert_eq!(run_probe(&[]).status.code(), Some(1));
}

#[cfg(target_arch = "x86_64")]
mod report {
    use std::process::Command;

    fn report(args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_cpu_report"))
            .args(args)
            .output()
            .expect("failed to spawn cpu_report")
    }

    #[test]
    fn test_json_report() -> Result<(), Box<dyn std::error::Error>> {
        let output = report(&["--format", "json", "--compare"]);
        assert_eq!(output.status.code(), Some(0));

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(json["sse2"], true);
        assert_eq!(json["runtime"]["sse2"], true);
        assert_eq!(json["vendor"].as_str().map(str::len), Some(12));
        let edx = json["edx_features"].as_array().ok_or("edx_features missing")?;
        assert!(edx.iter().any(|f| f == "sse2"));
        assert!(json.get("missing").is_none());
        Ok(())
    }

    #[test]
    fn test_require_present_feature() {
        let output = report(&["--require", "sse2", "-r", "SSE"]);
        assert_eq!(output.status.code(), Some(0));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("SSE2:           yes"), "{}", stdout);
    }

    #[test]
    fn test_require_missing_feature() -> Result<(), Box<dyn std::error::Error>> {
        // IA64 (EDX bit 30) is never set on x86_64 processors.
        let output = report(&["--require", "ia64", "--format", "json"]);
        assert_eq!(output.status.code(), Some(1));

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(json["missing"], serde_json::json!(["ia64"]));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Missing features: ia64"), "{}", stderr);
        Ok(())
    }

    #[test]
    fn test_require_unknown_feature_is_rejected() {
        let output = report(&["--require", "sse9"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(output.stdout.is_empty());
    }
}
