use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        platform_transport_check(),
        temp_dir_writable_check(),
        shared_memory_check(),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };
    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("pxbridge doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn platform_transport_check() -> CheckResult {
    #[cfg(unix)]
    {
        CheckResult {
            name: "platform_transport".to_string(),
            status: CheckStatus::Pass,
            detail: "Unix domain sockets available".to_string(),
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult {
            name: "platform_transport".to_string(),
            status: CheckStatus::Fail,
            detail: "host control channel requires Unix domain sockets".to_string(),
        }
    }
}

fn temp_dir_writable_check() -> CheckResult {
    #[cfg(unix)]
    {
        use pxbridge::transport::UnixDomainSocket;
        let dir = std::path::PathBuf::from(format!(
            "/tmp/pxbridge-doctor-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        ));
        let _ = std::fs::create_dir_all(&dir);
        let sock = dir.join("doctor.sock");
        let result = UnixDomainSocket::bind(&sock);
        let _ = std::fs::remove_dir_all(&dir);

        match result {
            Ok(_) => CheckResult {
                name: "temp_dir_writable".to_string(),
                status: CheckStatus::Pass,
                detail: "/tmp socket bind succeeded".to_string(),
            },
            Err(err) => CheckResult {
                name: "temp_dir_writable".to_string(),
                status: CheckStatus::Fail,
                detail: format!("/tmp socket bind failed: {err}"),
            },
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult {
            name: "temp_dir_writable".to_string(),
            status: CheckStatus::Skip,
            detail: "temp socket check not implemented on this platform".to_string(),
        }
    }
}

fn shared_memory_check() -> CheckResult {
    #[cfg(unix)]
    {
        use pxbridge::shm::{generate_key, SharedSegment};
        let key = generate_key();
        match SharedSegment::create(&key, 64) {
            Ok(segment) => {
                let attach = SharedSegment::attach_read_only(&key);
                drop(attach);
                drop(segment);
                CheckResult {
                    name: "shared_memory".to_string(),
                    status: CheckStatus::Pass,
                    detail: "segment create/attach/unlink succeeded".to_string(),
                }
            }
            Err(err) => CheckResult {
                name: "shared_memory".to_string(),
                status: CheckStatus::Fail,
                detail: format!("segment create failed: {err}"),
            },
        }
    }

    #[cfg(not(unix))]
    {
        CheckResult {
            name: "shared_memory".to_string(),
            status: CheckStatus::Skip,
            detail: "POSIX shared memory unavailable on this platform".to_string(),
        }
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_output_has_overall_status() {
        let checks = vec![CheckResult {
            name: "x".to_string(),
            status: CheckStatus::Pass,
            detail: "ok".to_string(),
        }];
        let output = DoctorOutput {
            checks,
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
    }
}
