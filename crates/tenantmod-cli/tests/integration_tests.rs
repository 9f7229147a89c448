//! Integration tests for CLI commands
//!
//! Only commands that never reach a cluster are exercised here; cluster
//! behavior is covered by the controller tests against the in-memory mocks.

use std::process::Command;

/// Get the fixtures path
fn fixtures_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/platform")
}

/// Helper to run tenantmod against the fixture configuration and catalog
fn tenantmod(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tenantmod"))
        .arg("--config")
        .arg(format!("{}/config.yaml", fixtures_path()))
        .arg("--catalog")
        .arg(format!("{}/catalog.yaml", fixtures_path()))
        .args(args)
        .env_remove("TENANTMOD_CONFIG")
        .env_remove("TENANTMOD_CATALOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute tenantmod")
}

mod help {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = tenantmod(&["--help"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        for command in ["modules", "tiers", "check-deps", "status", "enable", "disable"] {
            assert!(stdout.contains(command), "missing {} in help", command);
        }
    }
}

mod modules_command {
    use super::*;

    #[test]
    fn test_modules_table() {
        let output = tenantmod(&["modules"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("minio"));
        assert!(stdout.contains("spark"));
        assert!(stdout.contains("requires minio"));
    }

    #[test]
    fn test_modules_json_keeps_catalog_order() {
        let output = tenantmod(&["modules", "--json"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value =
            serde_json::from_str(&stdout).expect("Output should be valid JSON");

        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["minio", "spark", "grafana"]);
        assert_eq!(json[1]["dependencies"][0], "minio");
        assert_eq!(json[1]["chartPath"], "data-lake-baremetal");
    }

    #[test]
    fn test_modules_by_category() {
        let output = tenantmod(&["modules", "--category", "monitoring", "--json"]);

        assert!(output.status.success());
        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "grafana");
    }

    #[test]
    fn test_unknown_category() {
        let output = tenantmod(&["modules", "--category", "quantum"]);

        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_missing_catalog() {
        let output = Command::new(env!("CARGO_BIN_EXE_tenantmod"))
            .arg("--config")
            .arg(format!("{}/config.yaml", fixtures_path()))
            .arg("--catalog")
            .arg("/nonexistent/catalog.yaml")
            .arg("modules")
            .env_remove("TENANTMOD_CONFIG")
            .env_remove("TENANTMOD_CATALOG")
            .output()
            .expect("Failed to execute tenantmod");

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Catalog not found"));
    }
}

mod tiers_command {
    use super::*;

    #[test]
    fn test_tiers_table_marks_default() {
        let output = tenantmod(&["tiers"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("bronze"));
        assert!(stdout.contains("(default)"));
        assert!(stdout.contains("256Gi"));
    }

    #[test]
    fn test_tiers_json() {
        let output = tenantmod(&["tiers", "--json"]);

        assert!(output.status.success());
        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        assert_eq!(json["gold"]["resourceQuota"]["requests.cpu"], "64");
    }
}

mod check_deps_command {
    use super::*;

    #[test]
    fn test_satisfied() {
        let output = tenantmod(&["check-deps", "minio", "spark"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("all dependencies satisfied"));
    }

    #[test]
    fn test_missing_dependency() {
        let output = tenantmod(&["check-deps", "spark"]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("spark requires minio"));
    }

    #[test]
    fn test_unknown_module() {
        let output = tenantmod(&["check-deps", "hdfs"]);

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("hdfs is not in the catalog"));
    }
}

/// Argument checks that must fail before any cluster access
mod preflight {
    use super::*;

    #[test]
    fn test_destructive_cleanup_requires_yes() {
        let output = tenantmod(&["disable", "acme", "minio", "--cleanup", "full"]);

        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("requires --yes"));
    }

    #[test]
    fn test_pvc_cleanup_requires_yes() {
        let output = tenantmod(&["disable", "acme", "minio", "--cleanup", "pvcs"]);

        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_unknown_cleanup_tier_rejected_by_parser() {
        let output = tenantmod(&["disable", "acme", "minio", "--cleanup", "everything"]);

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("unknown cleanup tier"));
    }

    #[test]
    fn test_zero_attempts() {
        let output = tenantmod(&["enable", "acme", "spark", "--attempts", "0"]);

        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_malformed_set() {
        let output = tenantmod(&["enable", "acme", "spark", "--set", "no-equals-sign"]);

        assert_eq!(output.status.code(), Some(2));
    }
}
