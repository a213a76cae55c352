//! Pipeline configuration model.
//!
//! A configuration document has two sections: `transformers`, a mapping of
//! reusable named steps, and `jobs`, an ordered list of pipelines. Every step
//! fragment is resolved through the [`Registry`] while parsing, so an unknown
//! step type rejects the whole document.

use crate::registry::{self, Registry};
use crate::task::alias::processor::Factory as AliasFactory;
use crate::task::transformer::{Transformer, Transformers};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Undecoded configuration subtree handed to a transformer factory.
pub type Fragment = serde_json::Value;

/// Errors raised while parsing a configuration document.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Decoding configuration failed with error: {source}")]
    Decode {
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration layout: {source}")]
    Layout {
        #[source]
        source: serde_json::Error,
    },
    #[error("Registering alias {name} failed with error: {source}")]
    Alias {
        name: String,
        #[source]
        source: registry::Error,
    },
    #[error("Parsing transformer {name} failed with error: {source}")]
    Transformer {
        name: String,
        #[source]
        source: registry::Error,
    },
    #[error("Parsing job [{index}] failed with error: {source}")]
    Job {
        index: usize,
        #[source]
        source: registry::Error,
    },
    #[error("Parsing step [{index}] of job {job} failed with error: {source}")]
    JobStep {
        job: String,
        index: usize,
        #[source]
        source: registry::Error,
    },
}

/// A parsed step together with its context propagation flag.
pub struct TransformerConfig {
    /// Step type name the fragment was resolved with.
    pub kind: String,
    /// Run against the enclosing context instead of a fresh one.
    pub keep_context: bool,
    pub transformer: Box<dyn Transformer>,
}

impl TransformerConfig {
    /// Reads the `type` header of `fragment` and resolves it through `registry`.
    pub fn parse(fragment: &Fragment, registry: &Registry) -> Result<Self, registry::Error> {
        #[derive(Deserialize)]
        struct Header {
            #[serde(rename = "type", default)]
            kind: String,
            #[serde(default, alias = "keep_ctx")]
            keep_context: bool,
        }

        let header: Header = registry::decode("transformer", fragment)?;
        if header.kind.is_empty() {
            return Err(registry::Error::MissingType);
        }
        let transformer = registry.resolve(&header.kind, fragment)?;
        Ok(Self {
            kind: header.kind,
            keep_context: header.keep_context,
            transformer,
        })
    }
}

impl std::fmt::Debug for TransformerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerConfig")
            .field("kind", &self.kind)
            .field("keep_context", &self.keep_context)
            .finish()
    }
}

/// One pipeline and its repetition interval.
#[derive(Debug)]
pub struct JobConfig {
    pub job_name: String,
    /// Pause between passes. Zero runs the job once.
    pub interval: Duration,
    pub steps: Vec<TransformerConfig>,
}

impl JobConfig {
    pub fn parse(index: usize, fragment: &Fragment, registry: &Registry) -> Result<Self, Error> {
        #[derive(Deserialize)]
        struct Raw {
            job_name: String,
            #[serde(default, deserialize_with = "deserialize_interval")]
            interval: Duration,
            #[serde(default)]
            steps: Vec<Fragment>,
        }

        let raw: Raw =
            registry::decode("job", fragment).map_err(|source| Error::Job { index, source })?;
        let steps = raw
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                TransformerConfig::parse(step, registry).map_err(|source| Error::JobStep {
                    job: raw.job_name.clone(),
                    index: i,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            job_name: raw.job_name,
            interval: raw.interval,
            steps,
        })
    }
}

/// Accepts a human readable duration (`"30s"`, `"1h 30m"`) or a number of seconds.
fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Interval {
        Seconds(u64),
        Text(String),
    }

    match Interval::deserialize(deserializer)? {
        Interval::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Interval::Text(text) => {
            humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
        }
    }
}

/// One configuration generation.
pub struct Config {
    /// Named transformers, read-only for the lifetime of the generation.
    pub transformers: Arc<Transformers>,
    pub jobs: Vec<JobConfig>,
    /// Alias names this generation registered in the registry.
    pub aliases: Vec<String>,
}

impl Config {
    /// Decodes YAML (or JSON) bytes and parses them with [`Config::parse`].
    pub fn from_slice(bytes: &[u8], registry: &Registry) -> Result<Self, Error> {
        let tree: Fragment =
            serde_yaml::from_slice(bytes).map_err(|source| Error::Decode { source })?;
        Self::parse(&tree, registry)
    }

    /// Parses a configuration tree.
    ///
    /// Every name under `transformers` is registered as an alias before any
    /// step is resolved, so named transformers and jobs may reference each
    /// other by name regardless of order. When parsing fails the names
    /// registered by this call are removed again.
    pub fn parse(tree: &Fragment, registry: &Registry) -> Result<Self, Error> {
        #[derive(Deserialize, Default)]
        struct Raw {
            #[serde(default)]
            transformers: BTreeMap<String, Fragment>,
            #[serde(default)]
            jobs: Vec<Fragment>,
        }

        let raw = match tree {
            Fragment::Null => Raw::default(),
            tree => Raw::deserialize(tree).map_err(|source| Error::Layout { source })?,
        };

        let mut aliases = Vec::with_capacity(raw.transformers.len());
        for name in raw.transformers.keys() {
            if let Err(source) = registry.register(name, AliasFactory::new(name)) {
                unregister_all(registry, &aliases);
                return Err(Error::Alias {
                    name: name.clone(),
                    source,
                });
            }
            aliases.push(name.clone());
        }

        match Self::parse_sections(&raw.transformers, &raw.jobs, registry) {
            Ok((transformers, jobs)) => {
                debug!(
                    transformers = transformers.len(),
                    jobs = jobs.len(),
                    "parsed configuration"
                );
                Ok(Self {
                    transformers: Arc::new(transformers),
                    jobs,
                    aliases,
                })
            }
            Err(e) => {
                unregister_all(registry, &aliases);
                Err(e)
            }
        }
    }

    fn parse_sections(
        named: &BTreeMap<String, Fragment>,
        jobs: &[Fragment],
        registry: &Registry,
    ) -> Result<(Transformers, Vec<JobConfig>), Error> {
        let mut transformers = Transformers::with_capacity(named.len());
        for (name, fragment) in named {
            let config =
                TransformerConfig::parse(fragment, registry).map_err(|source| {
                    Error::Transformer {
                        name: name.clone(),
                        source,
                    }
                })?;
            transformers.insert(name.clone(), Arc::from(config.transformer));
        }

        let jobs = jobs
            .iter()
            .enumerate()
            .map(|(index, fragment)| JobConfig::parse(index, fragment, registry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((transformers, jobs))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("aliases", &self.aliases)
            .field("jobs", &self.jobs)
            .finish()
    }
}

fn unregister_all(registry: &Registry, names: &[String]) {
    for name in names {
        if !registry.unregister(name) {
            warn!(name = %name, "alias was already unregistered");
        }
    }
}
