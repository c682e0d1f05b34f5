//! `hive service` — systemd unit management.

use std::process::Command;

const UNIT_NAME: &str = "hive.service";
const UNIT_PATH: &str = "/etc/systemd/system/hive.service";

/// Render the systemd unit file.
pub fn render_unit(user: &str, working_dir: &str, config_path: &str) -> String {
    let exe_path = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/usr/local/bin/hive".to_string());

    format!(
        "\
[Unit]
Description=hive Slack AI assistant
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
User={user}
WorkingDirectory={working_dir}
ExecStart={exe_path} serve
Environment=HIVE_CONFIG={config_path}
Restart=on-failure
RestartSec=5

# Logging
StandardOutput=journal
StandardError=journal
SyslogIdentifier=hive

# Security hardening
NoNewPrivileges=true
ProtectSystem=strict
ProtectHome=read-only
ReadWritePaths={working_dir}/data
PrivateTmp=true

[Install]
WantedBy=multi-user.target
"
    )
}

/// Write the unit and reload systemd. Returns an error (non-zero exit
/// at the caller) on any failure.
pub fn install(user: &str, working_dir: Option<&str>, config_path: &str) -> anyhow::Result<()> {
    let resolved_working_dir = match working_dir {
        Some(dir) => dir.to_string(),
        None => std::env::current_dir()?.display().to_string(),
    };

    let unit = render_unit(user, &resolved_working_dir, config_path);
    std::fs::write(UNIT_PATH, unit)
        .map_err(|e| anyhow::anyhow!("writing {UNIT_PATH}: {e} (are you root?)"))?;
    println!("wrote {UNIT_PATH}");

    systemctl(&["daemon-reload"])?;
    systemctl(&["enable", UNIT_NAME])?;
    println!("enabled {UNIT_NAME}; start it with: hive service start");
    Ok(())
}

pub fn uninstall() -> anyhow::Result<()> {
    // Stop/disable may fail when the unit was never started; the removal
    // is what matters.
    let _ = systemctl(&["stop", UNIT_NAME]);
    let _ = systemctl(&["disable", UNIT_NAME]);
    std::fs::remove_file(UNIT_PATH)
        .map_err(|e| anyhow::anyhow!("removing {UNIT_PATH}: {e}"))?;
    systemctl(&["daemon-reload"])?;
    println!("removed {UNIT_PATH}");
    Ok(())
}

pub fn systemctl(args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new("systemctl").args(args).status()?;
    if !status.success() {
        anyhow::bail!("systemctl {} exited with {status}", args.join(" "));
    }
    Ok(())
}

/// `hive service logs` — follow the journal.
pub fn logs() -> anyhow::Result<()> {
    let status = Command::new("journalctl")
        .args(["-u", UNIT_NAME, "-f"])
        .status()?;
    if !status.success() {
        anyhow::bail!("journalctl exited with {status}");
    }
    Ok(())
}
