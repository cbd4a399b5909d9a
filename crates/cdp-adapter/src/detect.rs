//! Browser binary discovery

use std::env;
use std::path::{Path, PathBuf};
use which::which;

/// Explicit override; must point at an existing file.
const CHROME_ENV: &str = "AUTOAPPLY_CHROME";
/// Any non-empty value disables the install-location fallback.
const SKIP_INSTALL_DIRS_ENV: &str = "AUTOAPPLY_SKIP_OS_PATHS";

#[cfg(target_os = "windows")]
const BINARY_NAMES: &[&str] = &["chrome.exe", "chromium.exe", "msedge.exe"];
#[cfg(not(target_os = "windows"))]
const BINARY_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
];

/// First Chromium-family binary found via the override, `PATH`, then install locations.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    from_override()
        .or_else(from_search_path)
        .or_else(|| {
            if install_dirs_disabled() {
                None
            } else {
                install_locations().into_iter().find(|path| path.is_file())
            }
        })
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn from_override() -> Option<PathBuf> {
    non_empty_var(CHROME_ENV)
        .map(PathBuf::from)
        .filter(|path| path.exists())
}

fn from_search_path() -> Option<PathBuf> {
    BINARY_NAMES.iter().find_map(|name| which(name).ok())
}

fn install_dirs_disabled() -> bool {
    non_empty_var(SKIP_INSTALL_DIRS_ENV).is_some()
}

#[cfg(target_os = "windows")]
fn install_locations() -> Vec<PathBuf> {
    const SUFFIXES: [&str; 3] = [
        "Google/Chrome/Application/chrome.exe",
        "Chromium/Application/chrome.exe",
        "Microsoft/Edge/Application/msedge.exe",
    ];
    ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
        .into_iter()
        .filter_map(non_empty_var)
        .flat_map(|root| SUFFIXES.map(|suffix| Path::new(&root).join(suffix)))
        .collect()
}

#[cfg(target_os = "macos")]
fn install_locations() -> Vec<PathBuf> {
    [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn install_locations() -> Vec<PathBuf> {
    let bin = Path::new("/usr/bin");
    let mut paths: Vec<PathBuf> = BINARY_NAMES.iter().map(|name| bin.join(name)).collect();
    paths.push(PathBuf::from("/snap/bin/chromium"));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    /// Runs `body` with the given variables set, restoring the previous values afterwards.
    fn with_vars<T>(vars: &[(&str, &str)], body: impl FnOnce() -> T) -> T {
        let saved: Vec<_> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), env::var(key).ok()))
            .collect();
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = body();
        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
        result
    }

    #[test]
    #[serial]
    fn override_wins_when_the_file_exists() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("custom-chrome");
        fs::write(&exe, b"").unwrap();

        let detected = with_vars(&[(CHROME_ENV, exe.to_str().unwrap())], detect_chrome_executable);
        assert_eq!(detected, Some(exe));
    }

    #[test]
    #[serial]
    fn missing_override_falls_through() {
        let dir = tempdir().unwrap();
        let detected = with_vars(
            &[
                (CHROME_ENV, "/definitely/not/here"),
                (SKIP_INSTALL_DIRS_ENV, "1"),
                ("PATH", dir.path().to_str().unwrap()),
            ],
            detect_chrome_executable,
        );
        assert_eq!(detected, None);
    }

    #[test]
    #[serial]
    fn finds_binaries_on_path() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join(BINARY_NAMES[0]);
        fs::write(&exe, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let detected = with_vars(
            &[
                (CHROME_ENV, ""),
                (SKIP_INSTALL_DIRS_ENV, "1"),
                ("PATH", dir.path().to_str().unwrap()),
            ],
            detect_chrome_executable,
        );
        assert_eq!(detected, Some(exe));
    }
}
