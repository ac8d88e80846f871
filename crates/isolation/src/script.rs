//! Generated container build script
//!
//! The script is written once into the writable output mount and invoked as
//! the container entrypoint, so the exact build steps can be replayed
//! outside the container when debugging.

use crate::backend::BuildCommand;

/// Source tree mount point inside the container
pub const CONTAINER_SOURCE_DIR: &str = "/src";

/// Writable output mount point inside the container
pub const CONTAINER_OUTPUT_DIR: &str = "/output";

/// Scratch directory where the backend writes before the copy-out step
pub const CONTAINER_BUILD_DIR: &str = "/tmp/dist";

/// Script file name inside the output mount
pub const SCRIPT_NAME: &str = "build.sh";

/// Single-quote a value for safe embedding in the generated script.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Render the build script for one command.
#[must_use]
pub fn generate_build_script(interpreter: &str, command: &BuildCommand) -> String {
    let python = shell_quote(interpreter);
    let mut lines = vec![
        "set -ex".to_string(),
        String::new(),
        "# Upgrade pip and install build tools".to_string(),
        format!("{python} -m pip install --upgrade pip build auditwheel"),
    ];

    if !command.build_requirements.is_empty() {
        let reqs = command
            .build_requirements
            .iter()
            .map(|r| shell_quote(r))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("{python} -m pip install {reqs}"));
    }

    lines.push(String::new());
    lines.push("# Build the package".to_string());

    let mut build_cmd = format!("{python} -m build");
    if command.build_wheel && !command.build_sdist {
        build_cmd.push_str(" --wheel");
    } else if command.build_sdist && !command.build_wheel {
        build_cmd.push_str(" --sdist");
    }
    for (key, value) in &command.config_settings {
        build_cmd.push_str(" --config-setting=");
        build_cmd.push_str(&shell_quote(&format!("{key}={value}")));
    }
    build_cmd.push_str(" --outdir ");
    build_cmd.push_str(CONTAINER_BUILD_DIR);
    lines.push(build_cmd);

    if command.repair_wheel && command.build_wheel {
        lines.extend([
            String::new(),
            "# Repair wheel for manylinux compatibility".to_string(),
            format!("for whl in {CONTAINER_BUILD_DIR}/*.whl; do"),
            "    if [ -f \"$whl\" ]; then".to_string(),
            format!(
                "        auditwheel repair \"$whl\" --plat auto -w {CONTAINER_OUTPUT_DIR}/ || cp \"$whl\" {CONTAINER_OUTPUT_DIR}/"
            ),
            "    fi".to_string(),
            "done".to_string(),
        ]);
        if command.build_sdist {
            lines.push(format!(
                "cp {CONTAINER_BUILD_DIR}/*.tar.gz {CONTAINER_OUTPUT_DIR}/ 2>/dev/null || true"
            ));
        }
    } else {
        lines.extend([
            String::new(),
            "# Copy artifacts to output".to_string(),
            format!("cp {CONTAINER_BUILD_DIR}/* {CONTAINER_OUTPUT_DIR}/ 2>/dev/null || true"),
        ]);
    }

    lines.extend([String::new(), "# List output".to_string(), format!("ls -la {CONTAINER_OUTPUT_DIR}/")]);

    lines.join("\n")
}
