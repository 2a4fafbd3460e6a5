//! Objects built from configurations.
use anyhow::Result;
use log::info;
use serde::de::DeserializeOwned;
use std::{fs::File, io::BufReader, path::Path};

/// An object constructed from a serializable configuration.
pub trait Configurable {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Builds the object with the configuration in the YAML file of the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
    {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        info!("Load config from {:?}", path_);
        Self::build(config)
    }
}
