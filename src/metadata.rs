//! Zarr V3 metadata utilities.
//!
//! The [`Metadata`] structure represents the name/configuration fields in array metadata (data
//! type, chunk grid, chunk key encoding, codecs), which are structured as JSON with a name and
//! optional configuration, or just a string representing the name.
//!
//! [`ArrayMetadata`] and [`GroupMetadata`] are the `zarr.json` documents of array and group nodes.
//! Additionally, this module provides [`AdditionalFields`] for additional fields in array or group
//! metadata, which can be validated.

use derive_more::From;
use serde::{de::DeserializeOwned, ser::SerializeMap, Deserialize, Serialize};
use thiserror::Error;

use crate::array::{ArrayShape, FillValueMetadata};

/// Metadata with a name and optional configuration.
///
/// Can be deserialised from a JSON string or name/configuration map.
/// For example:
/// ```json
/// "bytes"
/// ```
/// or
/// ```json
/// {
///     "name": "bytes",
///     "configuration": {
///       "endian": "little"
///     }
/// }
/// ```
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Metadata {
    name: String,
    configuration: Option<MetadataConfiguration>,
}

/// Configuration metadata.
pub type MetadataConfiguration = serde_json::Map<String, serde_json::Value>;

impl TryFrom<&str> for Metadata {
    type Error = serde_json::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(s)
    }
}

impl core::fmt::Display for Metadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(configuration) = &self.configuration {
            write!(f, "{} {:?}", self.name, configuration)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl serde::Serialize for Metadata {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if let Some(configuration) = &self.configuration {
            let mut s = s.serialize_map(Some(2))?;
            s.serialize_entry("name", &self.name)?;
            s.serialize_entry("configuration", configuration)?;
            s.end()
        } else {
            s.serialize_str(self.name.as_str())
        }
    }
}

impl<'de> serde::Deserialize<'de> for Metadata {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct MetadataNameConfiguration {
            name: String,
            #[serde(default)]
            configuration: Option<MetadataConfiguration>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum MetadataIntermediate {
            Name(String),
            NameConfiguration(MetadataNameConfiguration),
        }

        let metadata = MetadataIntermediate::deserialize(d)?;
        match metadata {
            MetadataIntermediate::Name(name) => Ok(Self {
                name,
                configuration: None,
            }),
            MetadataIntermediate::NameConfiguration(metadata) => Ok(Self {
                name: metadata.name,
                configuration: metadata.configuration,
            }),
        }
    }
}

impl Metadata {
    /// Create metadata from `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }

    /// Create metadata from `name` and `configuration`.
    #[must_use]
    pub fn new_with_configuration(name: &str, configuration: MetadataConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration: Some(configuration),
        }
    }

    /// Convert a serializable configuration to [`Metadata`].
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if `configuration` cannot be converted to [`Metadata`].
    pub fn new_with_serializable_configuration<TConfiguration: serde::Serialize>(
        name: &str,
        configuration: &TConfiguration,
    ) -> Result<Self, serde_json::Error> {
        let configuration = serde_json::to_value(configuration)?;
        let serde_json::Value::Object(configuration) = configuration else {
            return Err(serde::ser::Error::custom(
                "this should not happen, indicates the configuration is not a JSON struct",
            ));
        };
        Ok(Self::new_with_configuration(name, configuration))
    }

    /// Try and convert [`Metadata`] to a serializable configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationInvalidError`] if the metadata cannot be converted.
    pub fn to_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, ConfigurationInvalidError> {
        self.configuration.as_ref().map_or_else(
            || {
                Err(ConfigurationInvalidError::new(
                    &self.name,
                    self.configuration.clone(),
                ))
            },
            |configuration| {
                serde_json::from_value(serde_json::to_value(configuration).unwrap_or_default())
                    .map_err(|_| {
                        ConfigurationInvalidError::new(&self.name, self.configuration.clone())
                    })
            },
        )
    }

    /// Returns the metadata name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metadata configuration.
    #[must_use]
    pub const fn configuration(&self) -> Option<&MetadataConfiguration> {
        self.configuration.as_ref()
    }

    /// Returns true if the configuration is none or an empty map.
    #[must_use]
    pub fn configuration_is_none_or_empty(&self) -> bool {
        self.configuration
            .as_ref()
            .map_or(true, serde_json::Map::is_empty)
    }
}

/// An invalid configuration error.
#[derive(Debug, Error, From)]
#[error("{name} is unsupported, configuration: {configuration:?}")]
pub struct ConfigurationInvalidError {
    name: String,
    configuration: Option<MetadataConfiguration>,
}

impl ConfigurationInvalidError {
    /// Create a new invalid configuration error.
    #[must_use]
    pub fn new(name: &str, configuration: Option<MetadataConfiguration>) -> Self {
        Self {
            name: name.to_string(),
            configuration,
        }
    }

    /// Return the name of the invalid configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An unsupported additional field error.
///
/// An unsupported field in array or group metadata is an unrecognised field without
/// `"must_understand": false`.
#[derive(Debug, Error)]
#[error("unsupported additional field {0} with value {1}")]
pub struct UnsupportedAdditionalFieldError(String, serde_json::Value);

impl UnsupportedAdditionalFieldError {
    /// Return the name of the unsupported additional field.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Return the value of the unsupported additional field.
    #[must_use]
    pub const fn value(&self) -> &serde_json::Value {
        &self.1
    }
}

/// Additional fields in array or group metadata.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default, From)]
pub struct AdditionalFields(serde_json::Map<String, serde_json::Value>);

impl AdditionalFields {
    /// Checks if additional fields are valid.
    ///
    /// # Errors
    ///
    /// Returns an [`UnsupportedAdditionalFieldError`] if an unsupported additional field is identified.
    pub fn validate(&self) -> Result<(), UnsupportedAdditionalFieldError> {
        fn is_unknown_field_allowed(field: &serde_json::Value) -> bool {
            field.as_object().map_or(false, |value| {
                value
                    .get("must_understand")
                    .map_or(false, |must_understand| {
                        must_understand == &serde_json::Value::Bool(false)
                    })
            })
        }

        for (key, value) in &self.0 {
            if !is_unknown_field_allowed(value) {
                return Err(UnsupportedAdditionalFieldError(
                    key.to_string(),
                    value.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Return the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }
}

/// Zarr V3 array metadata (the `zarr.json` document of an array node).
///
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#array-metadata>.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ArrayMetadata {
    /// An integer defining the version of the storage specification to which the array store adheres. Must be `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// A string defining the type of hierarchy node element, must be `array` here.
    pub node_type: monostate::MustBe!("array"),
    /// An array of integers providing the length of each dimension of the Zarr array.
    pub shape: ArrayShape,
    /// The data type of the Zarr array.
    pub data_type: Metadata,
    /// The chunk grid of the Zarr array.
    pub chunk_grid: Metadata,
    /// The mapping from chunk grid cell coordinates to keys in the underlying store.
    pub chunk_key_encoding: Metadata,
    /// Provides an element value to use for uninitialised portions of the Zarr array.
    pub fill_value: FillValueMetadata,
    /// Specifies a list of codecs to be used for encoding and decoding chunks.
    pub codecs: Vec<Metadata>,
    /// Optional user metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// An optional list of dimension names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_names: Option<Vec<Option<String>>>,
    /// Additional fields.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

impl ArrayMetadata {
    /// Create new array metadata.
    #[must_use]
    pub fn new(
        shape: ArrayShape,
        data_type: Metadata,
        chunk_grid: Metadata,
        chunk_key_encoding: Metadata,
        fill_value: FillValueMetadata,
        codecs: Vec<Metadata>,
    ) -> Self {
        Self {
            zarr_format: monostate::MustBe!(3u64),
            node_type: monostate::MustBe!("array"),
            shape,
            data_type,
            chunk_grid,
            chunk_key_encoding,
            fill_value,
            codecs,
            attributes: serde_json::Map::new(),
            dimension_names: None,
            additional_fields: AdditionalFields::default(),
        }
    }

    /// Set the user attributes.
    #[must_use]
    pub fn with_attributes(
        mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the dimension names.
    #[must_use]
    pub fn with_dimension_names(mut self, dimension_names: Option<Vec<Option<String>>>) -> Self {
        self.dimension_names = dimension_names;
        self
    }

    /// Serialize the metadata as a pretty-printed String of JSON.
    ///
    /// # Panics
    ///
    /// Panics if the metadata is invalid, which is unreachable for a validated constructed array.
    #[must_use]
    pub fn to_string_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("array metadata is JSON serializable")
    }
}

impl TryFrom<&str> for ArrayMetadata {
    type Error = serde_json::Error;

    fn try_from(metadata_json: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(metadata_json)
    }
}

/// Zarr V3 group metadata (the `zarr.json` document of a group node).
///
/// See <https://zarr-specs.readthedocs.io/en/latest/v3/core/v3.0.html#group-metadata>.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct GroupMetadata {
    /// An integer defining the version of the storage specification to which the group store adheres. Must be `3`.
    pub zarr_format: monostate::MustBe!(3u64),
    /// A string defining the type of hierarchy node element, must be `group` here.
    pub node_type: monostate::MustBe!("group"),
    /// Optional user metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Additional fields.
    #[serde(flatten)]
    pub additional_fields: AdditionalFields,
}

impl Default for GroupMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupMetadata {
    /// Create group metadata with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zarr_format: monostate::MustBe!(3u64),
            node_type: monostate::MustBe!("group"),
            attributes: serde_json::Map::new(),
            additional_fields: AdditionalFields::default(),
        }
    }

    /// Set the user attributes.
    #[must_use]
    pub fn with_attributes(
        mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.attributes = attributes;
        self
    }

    /// Serialize the metadata as a pretty-printed String of JSON.
    ///
    /// # Panics
    ///
    /// Panics if the metadata is invalid, which is unreachable for a validated group.
    #[must_use]
    pub fn to_string_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("group metadata is JSON serializable")
    }
}

impl TryFrom<&str> for GroupMetadata {
    type Error = serde_json::Error;

    fn try_from(metadata_json: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(metadata_json)
    }
}
