use crate::item::{BugreportHeader, DeviceInfo, SystemPropsItem};
use crate::parser::BlockParser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static RE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>Build|Build fingerprint|Bootloader|Radio|Network|Kernel|Command line|Uptime):\s*(?P<value>.*?)\s*$").unwrap()
});

/// `brand/product/device:release/build_id/incremental:type/tags`
static RE_FINGERPRINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<brand>[^/]+)/[^/]+/[^:/]+:(?P<rel>[^/]+)/(?P<bid>[^/]+)/").unwrap()
});

/// Parses the block printed by dumpstate before the first section
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderParser;

impl HeaderParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for HeaderParser {
    type Output = BugreportHeader;

    fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Option<BugreportHeader> {
        let mut header = BugreportHeader::default();
        let mut found = false;

        for line in lines.iter().map(AsRef::as_ref) {
            let c = match RE_FIELD.captures(line.trim()) {
                Some(c) => c,
                None => continue,
            };
            let value = c["value"].to_string();
            found = true;

            match &c["key"] {
                "Build" => header.build = Some(value),
                "Build fingerprint" => {
                    header.fingerprint = Some(value.trim_matches('\'').to_string())
                }
                "Bootloader" => header.bootloader = Some(value),
                "Radio" => header.radio = Some(value),
                "Network" => header.network = Some(value),
                "Kernel" => header.kernel = Some(value),
                "Uptime" => header.uptime = Some(value),
                "Command line" => header.command_line = parse_command_line(&value),
                _ => {}
            }
        }

        found.then_some(header)
    }
}

/// Split a kernel command line into `key=value` pairs.
/// Flags without `=` map to an empty value.
pub fn parse_command_line(line: &str) -> BTreeMap<String, String> {
    line.split_whitespace()
        .map(|token| match token.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (token.to_string(), String::new()),
        })
        .collect()
}

/// Build device info from system properties, falling back to the
/// fingerprint printed in the report header
pub fn extract_device_info(
    props: Option<&SystemPropsItem>,
    header: Option<&BugreportHeader>,
) -> Option<DeviceInfo> {
    if props.is_none() && header.map_or(true, |h| h.fingerprint.is_none()) {
        return None;
    }

    let prop = |key: &str| {
        props
            .and_then(|p| p.get(key))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut device = DeviceInfo {
        brand: prop("ro.product.brand").unwrap_or_default(),
        model: prop("ro.product.model").unwrap_or_default(),
        android_version: prop("ro.build.version.release").unwrap_or_default(),
        api_level: prop("ro.build.version.sdk")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        build_id: prop("ro.build.id").unwrap_or_default(),
        fingerprint: prop("ro.build.fingerprint")
            .or_else(|| header.and_then(|h| h.fingerprint.clone()))
            .unwrap_or_default(),
        timezone: prop("persist.sys.timezone"),
    };

    if let Some(c) = RE_FINGERPRINT.captures(&device.fingerprint) {
        if device.brand.is_empty() {
            device.brand = c["brand"].to_string();
        }
        if device.android_version.is_empty() {
            device.android_version = c["rel"].to_string();
        }
        if device.build_id.is_empty() {
            device.build_id = c["bid"].to_string();
        }
    }

    Some(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 11] = [
        "========================================================",
        "",
        "Build: IMM76D",
        "Build fingerprint: 'google/soju/crespo:4.0.4/IMM76D/299849:userdebug/test-keys'",
        "Bootloader: I9020XXLC2",
        "Radio: I9020XXKI1",
        "Network: T-Mobile",
        "Kernel: Linux version 3.0.8-gda3f3a5 (build@host) #1 PREEMPT",
        "Command line: console=ttyFIQ0 no_console_suspend androidboot.hardware=herring",
        "",
        "Uptime: up 0 weeks, 0 days, 0 hours, 40 minutes",
    ];

    #[test]
    fn test_parse_header() {
        let header = HeaderParser::new().parse(&HEADER).unwrap();

        assert_eq!(header.build.as_deref(), Some("IMM76D"));
        assert_eq!(
            header.fingerprint.as_deref(),
            Some("google/soju/crespo:4.0.4/IMM76D/299849:userdebug/test-keys")
        );
        assert_eq!(header.bootloader.as_deref(), Some("I9020XXLC2"));
        assert_eq!(header.radio.as_deref(), Some("I9020XXKI1"));
        assert_eq!(header.network.as_deref(), Some("T-Mobile"));
        assert!(header.kernel.as_deref().unwrap().starts_with("Linux version 3.0.8"));
        assert_eq!(
            header.uptime.as_deref(),
            Some("up 0 weeks, 0 days, 0 hours, 40 minutes")
        );
        assert_eq!(header.command_line["androidboot.hardware"], "herring");
        assert_eq!(header.command_line["no_console_suspend"], "");
    }

    #[test]
    fn test_empty_header() {
        assert!(HeaderParser::new().parse(&["", "====="]).is_none());
    }

    #[test]
    fn test_command_line_only() {
        let header = HeaderParser::new()
            .parse(&["Command line: key1=value1 key2="])
            .unwrap();
        assert_eq!(header.command_line.len(), 2);
        assert_eq!(header.command_line["key1"], "value1");
        assert_eq!(header.command_line["key2"], "");
    }

    #[test]
    fn test_parse_command_line() {
        let map = parse_command_line("a=1 b c=x=y");
        assert_eq!(map.len(), 3);
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "");
        assert_eq!(map["c"], "x=y");
    }

    #[test]
    fn test_extract_device_info() {
        let mut props = SystemPropsItem::default();
        for (k, v) in [
            ("ro.product.brand", "google"),
            ("ro.product.model", "Pixel 4a"),
            ("ro.build.version.release", "13"),
            ("ro.build.version.sdk", "33"),
            ("ro.build.id", "TQ3A.230605.012"),
            ("persist.sys.timezone", "America/Los_Angeles"),
        ] {
            props.properties.insert(k.to_string(), v.to_string());
        }
        let header = HeaderParser::new().parse(&HEADER).unwrap();

        let device = extract_device_info(Some(&props), Some(&header)).unwrap();
        assert_eq!(device.brand, "google");
        assert_eq!(device.model, "Pixel 4a");
        assert_eq!(device.android_version, "13");
        assert_eq!(device.api_level, 33);
        assert_eq!(device.build_id, "TQ3A.230605.012");
        assert!(device.fingerprint.contains("crespo"));
        assert_eq!(device.timezone.as_deref(), Some("America/Los_Angeles"));
    }

    #[test]
    fn test_device_info_from_fingerprint_only() {
        let header = HeaderParser::new().parse(&HEADER).unwrap();
        let device = extract_device_info(None, Some(&header)).unwrap();

        assert_eq!(device.brand, "google");
        assert_eq!(device.android_version, "4.0.4");
        assert_eq!(device.build_id, "IMM76D");
        assert_eq!(device.api_level, 0);

        assert!(extract_device_info(None, None).is_none());
    }
}
