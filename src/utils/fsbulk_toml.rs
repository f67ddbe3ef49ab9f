//! Load `.fsbulk.toml` from a directory (CLI only). Library callers pass options directly.

use serde::Deserialize;
use std::path::Path;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FsbulkToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    exclude: Option<Vec<String>>,
    verbose: Option<bool>,
    debug: Option<bool>,
    symbolic: Option<bool>,
}

/// Load the settings file from `dir` if present. Returns None if missing or unparsable.
pub(crate) fn load_fsbulk_toml(dir: &Path) -> Option<FsbulkToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_fsbulk_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_fsbulk_toml(s: &str) -> Result<FsbulkToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($file:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $file.$field {
            $opts.$field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &FsbulkToml, opts: &mut Opts) {
    let settings = &file.settings;
    if let Some(ref v) = settings.exclude {
        opts.exclude = v.clone();
    }
    apply_file_opt!(settings, opts, verbose);
    apply_file_opt!(settings, opts, debug);
    apply_file_opt!(settings, opts, symbolic);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_values_apply() {
        let file = parse_fsbulk_toml(
            r#"
            [settings]
            exclude = ["node_modules", ".git"]
            symbolic = true
            "#,
        )
        .unwrap();
        let mut opts = Opts {
            verbose: true,
            ..Opts::default()
        };
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.exclude, vec!["node_modules", ".git"]);
        assert!(opts.symbolic);
        assert!(opts.verbose, "absent keys keep their value");
        assert!(!opts.debug);
    }

    #[test]
    fn test_empty_and_invalid_files() {
        assert!(parse_fsbulk_toml("").is_ok());
        assert!(parse_fsbulk_toml("[settings]\nverbose = \"yes\"").is_err());
    }

    #[test]
    fn test_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_fsbulk_toml(tmp.path()).is_none());
    }
}
