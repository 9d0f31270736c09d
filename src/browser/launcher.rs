use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Find the Chrome/Chromium binary, preferring an explicit path.
pub fn find_chrome_binary(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        bail!("Chrome binary not found at {}", path.display());
    }

    let candidates = chrome_candidates();
    if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::info!("Found Chrome at: {}", path.display());
        return Ok(path);
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium-browser", "chromium"] {
        if let Ok(path) = which::which(name) {
            tracing::info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    bail!(
        "Could not find Chrome or Chromium. Pass --chrome or install one of:\n{}",
        candidates.join("\n")
    )
}

fn chrome_candidates() -> Vec<String> {
    let mut candidates = Vec::new();

    #[cfg(target_os = "macos")]
    {
        candidates.extend([
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".into(),
            "/Applications/Chromium.app/Contents/MacOS/Chromium".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            candidates.push(format!(
                "{}/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                home
            ));
        }
    }

    #[cfg(target_os = "linux")]
    {
        candidates.extend([
            "/usr/bin/google-chrome".into(),
            "/usr/bin/google-chrome-stable".into(),
            "/usr/bin/chromium-browser".into(),
            "/usr/bin/chromium".into(),
            "/snap/bin/chromium".into(),
        ]);
    }

    #[cfg(target_os = "windows")]
    {
        for var in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(dir) = std::env::var(var) {
                candidates.push(format!("{}\\Google\\Chrome\\Application\\chrome.exe", dir));
            }
        }
    }

    candidates
}

/// Chrome flags for a quiet, single-purpose automation profile.
pub fn default_chrome_args() -> Vec<&'static str> {
    vec![
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-background-networking",
        "--disable-default-apps",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-sync",
        "--metrics-recording-only",
    ]
}
