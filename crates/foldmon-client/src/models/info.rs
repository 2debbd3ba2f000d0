//! Client `info` message: named sections of key/value pairs.
//!
//! Wire shape:
//!
//! ```text
//! [["FAHClient", ["Version", "7.6.21"], ["OS", "Linux"]],
//!  ["System", ["CPU", "AMD Ryzen 7"], ["CPUs", "16"]]]
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::lenient;

/// One named group of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoSection {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl InfoSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Client and host information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub sections: Vec<InfoSection>,
}

impl Info {
    /// Build from a parsed payload; non-conforming elements are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let sections = value
            .as_array()?
            .iter()
            .filter_map(|section| {
                let items = section.as_array()?;
                let name = items.first()?.as_str()?.to_string();
                let entries = items[1..]
                    .iter()
                    .filter_map(|pair| {
                        let pair = pair.as_array()?;
                        let key = pair.first()?.as_str()?.to_string();
                        let value = pair.get(1).and_then(lenient::text).unwrap_or_default();
                        Some((key, value))
                    })
                    .collect();
                Some(InfoSection { name, entries })
            })
            .collect();
        Some(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&InfoSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Look up `key` inside section `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    pub fn client_version(&self) -> Option<&str> {
        self.get("FAHClient", "Version")
    }

    pub fn os(&self) -> Option<&str> {
        self.get("System", "OS")
            .or_else(|| self.get("FAHClient", "OS"))
    }

    pub fn cpu(&self) -> Option<&str> {
        self.get("System", "CPU")
    }

    pub fn cpu_count(&self) -> Option<u32> {
        self.get("System", "CPUs")?.trim().parse().ok()
    }
}

impl<'de> Deserialize<'de> for Info {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        Info::from_value(&value).ok_or_else(|| D::Error::custom("info payload is not a list"))
    }
}
