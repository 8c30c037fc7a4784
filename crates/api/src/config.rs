//! Types for use when configuring notisync modules.

use crate::*;
use std::sync::Mutex;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> NsResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| NsError::other_src("encode", e))?,
    )
    .map_err(|e| NsError::other_src("decode", e))
}

fn sections_of<M: serde::Serialize>(
    module_config: &M,
) -> NsResult<serde_json::Map<String, serde_json::Value>> {
    match tc(module_config)? {
        serde_json::Value::Object(sections) => Ok(sections),
        _ => Err(NsError::other(
            "module config must serialize to a json object",
        )),
    }
}

/// Notisync configuration.
///
/// This is a json object keyed by module section name. Each module
/// defines a `*ModConfig` struct with a single camelCase field naming its
/// section, so many modules can share one document without knowing about
/// each other. Sections a module does not know about are ignored.
///
/// The inner map sits behind a mutex so the config can still be adjusted
/// (typically in tests) after the [Builder] has been frozen in an `Arc`.
#[derive(Default)]
pub struct Config(Mutex<serde_json::Map<String, serde_json::Value>>);

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.lock().unwrap().fmt(f)
    }
}

impl serde::Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.lock().unwrap().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map: serde_json::Map<String, serde_json::Value> =
            serde::Deserialize::deserialize(deserializer)?;
        Ok(Self(Mutex::new(map)))
    }
}

impl Config {
    /// Load a config from a json document, e.g. the contents of a
    /// config file.
    pub fn from_json(json: &str) -> NsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| NsError::other_src("parse config", e))
    }

    /// Merge the sections of a module config into this config, keeping
    /// any sections of the same name that are already present.
    ///
    /// Factories call this from `default_config`, so values loaded with
    /// [Config::from_json] survive. Properties missing from a kept section
    /// are still defaulted when the section is read back.
    pub fn add_default_module_config<M: serde::Serialize>(
        &self,
        module_config: &M,
    ) -> NsResult<()> {
        let sections = sections_of(module_config)?;
        let mut lock = self.0.lock().unwrap();
        for (name, section) in sections {
            lock.entry(name).or_insert(section);
        }
        Ok(())
    }

    /// Merge the sections of a module config into this config,
    /// overwriting any sections of the same name.
    pub fn set_module_config<M: serde::Serialize>(
        &self,
        module_config: &M,
    ) -> NsResult<()> {
        let sections = sections_of(module_config)?;
        let mut lock = self.0.lock().unwrap();
        for (name, section) in sections {
            lock.insert(name, section);
        }
        Ok(())
    }

    /// Extract a typed module config. Missing sections or properties fall
    /// back to the module defaults, provided the `*ModConfig` type is
    /// `#[serde(default)]`-tolerant.
    pub fn get_module_config<M: serde::de::DeserializeOwned>(
        &self,
    ) -> NsResult<M> {
        let lock = self.0.lock().unwrap();
        tc(&*lock)
    }
}
