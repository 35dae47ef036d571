//! Loading and saving of vehicles, schedules, driver parameters and results.

use crate::imports::*;

/// On-disk formats, picked from the file extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
    #[cfg(feature = "bincode")]
    Bincode,
}

impl FileFormat {
    #[cfg(feature = "bincode")]
    const EXTENSIONS: &'static str = "yaml, yml, json or bin";
    #[cfg(not(feature = "bincode"))]
    const EXTENSIONS: &'static str = "yaml, yml or json";

    pub fn from_path(filepath: &Path) -> anyhow::Result<Self> {
        let extension = filepath
            .extension()
            .and_then(OsStr::to_str)
            .with_context(|| format!("File extension could not be parsed: {filepath:?}"))?;
        Ok(match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Self::Yaml,
            "json" => Self::Json,
            #[cfg(feature = "bincode")]
            "bin" => Self::Bincode,
            _ => bail!(
                "Unsupported file extension {extension:?}, must be {}",
                Self::EXTENSIONS
            ),
        })
    }
}

pub trait SerdeAPI: Serialize + for<'a> Deserialize<'a> {
    /// Checks and derived quantities, run after every load
    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Writes `self` to `filepath` in the [`FileFormat`] given by its
    /// extension, truncating any existing file
    fn to_file<P: AsRef<Path>>(&self, filepath: P) -> anyhow::Result<()> {
        let filepath = filepath.as_ref();
        let format = FileFormat::from_path(filepath)?;
        let file = File::create(filepath)
            .with_context(|| format!("Could not create file: {filepath:?}"))?;
        match format {
            FileFormat::Yaml => serde_yaml::to_writer(file, self)?,
            FileFormat::Json => serde_json::to_writer_pretty(file, self)?,
            #[cfg(feature = "bincode")]
            FileFormat::Bincode => bincode::serialize_into(file, self)?,
        }
        Ok(())
    }

    /// Reads an object from `filepath` in the [`FileFormat`] given by its
    /// extension and runs [`init`](SerdeAPI::init) on it
    fn from_file<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let format = FileFormat::from_path(filepath)?;
        let file = File::open(filepath).with_context(|| {
            if !filepath.exists() {
                format!("File not found: {filepath:?}")
            } else {
                format!("Could not open file: {filepath:?}")
            }
        })?;
        let parse_context = || format!("Could not parse {filepath:?} as {format:?}");
        let deserialized: Self = match format {
            FileFormat::Yaml => serde_yaml::from_reader(file).with_context(parse_context)?,
            FileFormat::Json => serde_json::from_reader(file).with_context(parse_context)?,
            #[cfg(feature = "bincode")]
            FileFormat::Bincode => bincode::deserialize_from(file).with_context(parse_context)?,
        };
        initialized(deserialized, &format!("{filepath:?}"))
    }

    fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self)?)
    }

    fn from_json<S: AsRef<str>>(json_str: S) -> anyhow::Result<Self> {
        initialized(serde_json::from_str(json_str.as_ref())?, "JSON")
    }

    fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(&self)?)
    }

    fn from_yaml<S: AsRef<str>>(yaml_str: S) -> anyhow::Result<Self> {
        initialized(serde_yaml::from_str(yaml_str.as_ref())?, "YAML")
    }

    #[cfg(feature = "bincode")]
    fn to_bincode(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bincode::serialize(&self)?)
    }

    #[cfg(feature = "bincode")]
    fn from_bincode(encoded: &[u8]) -> anyhow::Result<Self> {
        initialized(bincode::deserialize(encoded)?, "bincode")
    }
}

/// Runs [`SerdeAPI::init`] on a freshly loaded object.  A failure is tagged
/// with the type and source of the object; the underlying [`SimError`], e.g.
/// [`SimError::InvalidVehicle`], remains reachable through `downcast_ref`.
fn initialized<T: SerdeAPI>(mut loaded: T, source: &str) -> anyhow::Result<T> {
    loaded.init().with_context(|| {
        let type_name = std::any::type_name::<T>();
        let type_name = type_name.rsplit("::").next().unwrap_or(type_name);
        format!("invalid {type_name} loaded from {source}")
    })?;
    Ok(loaded)
}
