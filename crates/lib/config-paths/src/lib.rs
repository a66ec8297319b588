//! Default configuration file paths for imaplar.

use std::path::PathBuf;

use either::Either;

/// Returns an iterator over default configuration file paths.
///
/// The paths are yielded in order of preference:
/// 1. User-specific config directory (XDG standard) - multiple variants
/// 2. User-specific config in home directory (fallback) - multiple variants
/// 3. System-wide config
pub fn defaults() -> impl Iterator<Item = PathBuf> {
    let config_path = dirs::config_dir()
        .into_iter()
        .flat_map(|d| [d.join("imaplar/config.yaml"), d.join("imaplar.yaml")]);
    let home_path = dirs::home_dir()
        .into_iter()
        .flat_map(|d| [d.join(".imaplar.yaml"), d.join(".imaplar/config.yaml")]);
    let system_path = std::iter::once_with(|| PathBuf::from("/etc/imaplar/config.yaml"));

    config_path.chain(home_path).chain(system_path)
}

/// Resolves configuration paths from explicit paths or the defaults.
///
/// Explicit paths (from the command line or the environment) replace the
/// defaults entirely.
pub fn resolve<I>(explicit: I) -> impl Iterator<Item = PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let explicit: Vec<PathBuf> = explicit.into_iter().collect();
    if explicit.is_empty() {
        Either::Right(defaults())
    } else {
        Either::Left(explicit.into_iter())
    }
}
