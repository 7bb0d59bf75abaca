use crate::item::{PackageEntry, PackageStatsItem};
use crate::parser::BlockParser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// `  Package [com.android.bluetooth] (41a3c8d0):`
static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Package \[(?P<name>[^\]]+)\] \(").unwrap()
});

static VERSION_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bversionCode=(?P<v>\d+)").unwrap()
});

static VERSION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bversionName=(?P<v>\S+)").unwrap()
});

static FIRST_INSTALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bfirstInstallTime=(?P<v>.*?)\s*$").unwrap()
});

static LAST_UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blastUpdateTime=(?P<v>.*?)\s*$").unwrap()
});

/// Parses the package list printed by `dumpsys package`
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageStatsParser;

impl PackageStatsParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for PackageStatsParser {
    type Output = PackageStatsItem;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<PackageStatsItem> {
        let mut packages: Vec<PackageEntry> = Vec::new();
        let mut names = HashSet::new();
        // Index of the entry being filled, `None` inside a repeated listing
        let mut current: Option<usize> = None;

        for line in lines.iter().map(AsRef::as_ref) {
            if let Some(c) = PACKAGE_RE.captures(line) {
                let name = c["name"].to_string();
                current = if names.insert(name.clone()) {
                    packages.push(PackageEntry {
                        name,
                        version_code: None,
                        version_name: None,
                        first_install_time: None,
                        last_update_time: None,
                    });
                    Some(packages.len() - 1)
                } else {
                    None
                };
                continue;
            }

            let entry = match current {
                Some(idx) => &mut packages[idx],
                None => continue,
            };

            if let Some(c) = VERSION_CODE_RE.captures(line) {
                entry.version_code = entry.version_code.or_else(|| c["v"].parse().ok());
            }
            if let Some(c) = VERSION_NAME_RE.captures(line) {
                entry.version_name.get_or_insert_with(|| c["v"].to_string());
            }
            if let Some(c) = FIRST_INSTALL_RE.captures(line) {
                entry.first_install_time.get_or_insert_with(|| c["v"].to_string());
            }
            if let Some(c) = LAST_UPDATE_RE.captures(line) {
                entry.last_update_time.get_or_insert_with(|| c["v"].to_string());
            }
        }

        (!packages.is_empty()).then_some(PackageStatsItem { packages })
    }
}
