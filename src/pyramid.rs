//! Multi-resolution pyramid creation.
//!
//! A pyramid is a set of progressively downsampled resolution levels of the same logical image,
//! stored as sibling arrays. [`create_pyramid`] materialises the hierarchy described by a
//! [`PyramidDescriptor`]:
//! - more than one series: a root group with one child per series, named `Series{i}`,
//! - a series with more than one resolution level: a group with one child array per level, named
//!   `Resolution{j}`,
//! - a single-series single-resolution descriptor: one array directly at the target path with no
//!   enclosing group.
//!
//! Each array is created through the chunk layout policy, so an incompatible shard request
//! degrades to unsharded chunking rather than failing pyramid creation.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::{
        ArrayBuilder, ArrayCreateError, ArrayShape, DataType, FillValueMetadata, PixelType,
    },
    group::{Group, GroupCreateError},
    layout::ShardStrategy,
    metadata::Metadata,
    node::{NodePath, NodePathError},
    storage::{StorageError, WritableStorageTraits},
};

/// One resolution level of a series.
#[derive(Clone, Debug)]
pub struct ResolutionDescriptor {
    /// The shape of the level.
    pub shape: ArrayShape,
    /// The element type of the level.
    pub pixel_type: PixelType,
}

/// One series of a pyramid: its resolution levels, finest first.
#[derive(Clone, Debug)]
pub struct SeriesDescriptor {
    /// The resolution levels of the series.
    pub resolutions: Vec<ResolutionDescriptor>,
}

/// A logical description of a pyramid: its series and their resolution levels.
#[derive(Clone, Debug)]
pub struct PyramidDescriptor {
    /// The series of the pyramid.
    pub series: Vec<SeriesDescriptor>,
}

impl PyramidDescriptor {
    /// A descriptor for a single series with a single resolution level.
    #[must_use]
    pub fn single(shape: ArrayShape, pixel_type: PixelType) -> Self {
        Self {
            series: vec![SeriesDescriptor {
                resolutions: vec![ResolutionDescriptor { shape, pixel_type }],
            }],
        }
    }
}

/// Options applied to every array of a created pyramid.
#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    /// The chunk shape. [`None`] derives a per-level default from the level shape.
    pub chunk_shape: Option<Vec<u64>>,
    /// The shard strategy. [`None`] disables sharding.
    pub shard_strategy: Option<ShardStrategy>,
    /// Bytes to bytes codecs (compressors, checksums) selected by name, resolved through the
    /// codec registry when each array is created.
    pub codecs: Vec<Metadata>,
}

/// A pyramid creation error.
#[derive(Debug, Error)]
pub enum PyramidCreateError {
    /// The descriptor has no series, or a series with no resolution levels.
    #[error("a pyramid descriptor needs at least one series with at least one resolution level")]
    EmptyDescriptor,
    /// Invalid node path.
    #[error(transparent)]
    NodePathError(#[from] NodePathError),
    /// An array could not be created.
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    /// A group could not be created.
    #[error(transparent)]
    GroupCreateError(#[from] GroupCreateError),
    /// Storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

/// Materialise the hierarchy described by `descriptor` at `path` of `storage`.
///
/// Group and array metadata are written; no chunk data is. Unwritten regions of the created
/// arrays read as their fill value.
///
/// # Errors
///
/// Returns [`PyramidCreateError`] if the descriptor is empty or any node cannot be created or
/// stored.
pub fn create_pyramid<TStorage: ?Sized + WritableStorageTraits>(
    storage: &Arc<TStorage>,
    path: &str,
    descriptor: &PyramidDescriptor,
    options: &CreateOptions,
) -> Result<(), PyramidCreateError> {
    if descriptor.series.is_empty()
        || descriptor
            .series
            .iter()
            .any(|series| series.resolutions.is_empty())
    {
        return Err(PyramidCreateError::EmptyDescriptor);
    }

    let root = NodePath::new(path)?;
    if descriptor.series.len() > 1 {
        Group::new(storage.clone(), root.as_str())?.store_metadata()?;
        for (index, series) in descriptor.series.iter().enumerate() {
            let series_path = root.child(&format!("Series{index}"))?;
            create_series(storage, &series_path, series, options)?;
        }
        Ok(())
    } else {
        create_series(storage, &root, &descriptor.series[0], options)
    }
}

fn create_series<TStorage: ?Sized + WritableStorageTraits>(
    storage: &Arc<TStorage>,
    path: &NodePath,
    series: &SeriesDescriptor,
    options: &CreateOptions,
) -> Result<(), PyramidCreateError> {
    if series.resolutions.len() > 1 {
        Group::new(storage.clone(), path.as_str())?.store_metadata()?;
        for (index, resolution) in series.resolutions.iter().enumerate() {
            let resolution_path = path.child(&format!("Resolution{index}"))?;
            create_resolution(storage, &resolution_path, resolution, options)?;
        }
        Ok(())
    } else {
        create_resolution(storage, path, &series.resolutions[0], options)
    }
}

fn create_resolution<TStorage: ?Sized + WritableStorageTraits>(
    storage: &Arc<TStorage>,
    path: &NodePath,
    resolution: &ResolutionDescriptor,
    options: &CreateOptions,
) -> Result<(), PyramidCreateError> {
    let data_type = resolution.pixel_type.to_data_type();
    let chunk_shape = options
        .chunk_shape
        .clone()
        .unwrap_or_else(|| default_chunk_shape(&resolution.shape));
    let array = ArrayBuilder::new(
        resolution.shape.clone(),
        data_type,
        chunk_shape,
        default_fill_value(data_type),
    )
    .shard_strategy(options.shard_strategy.clone())
    .bytes_to_bytes_codecs(options.codecs.clone())
    .build(storage.clone(), path.as_str())?;
    array.store_metadata()?;
    Ok(())
}

/// The default chunk shape of a resolution level.
///
/// The two leading axes are the fast spatial (x, y) axes by convention and are chunked at up to
/// 256 elements; every later axis is chunked per element.
fn default_chunk_shape(shape: &[u64]) -> Vec<u64> {
    shape
        .iter()
        .enumerate()
        .map(|(axis, &extent)| if axis < 2 { extent.clamp(1, 256) } else { 1 })
        .collect()
}

fn default_fill_value(data_type: DataType) -> FillValueMetadata {
    match data_type {
        DataType::Bool => FillValueMetadata::Bool(false),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            FillValueMetadata::Int(0)
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            FillValueMetadata::UInt(0)
        }
        DataType::Float32 | DataType::Float64 => FillValueMetadata::Float(0.0),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        array::Array,
        node::{Node, NodeMetadata},
        storage::store::MemoryStore,
    };

    use super::*;

    #[test]
    fn single_series_single_resolution() {
        let storage = Arc::new(MemoryStore::new());
        let descriptor = PyramidDescriptor::single(vec![100, 100], PixelType::UInt16);
        create_pyramid(&storage, "/image", &descriptor, &CreateOptions::default()).unwrap();

        // no enclosing group, the array sits at the target path
        let array = Array::open(storage.clone(), "/image").unwrap();
        assert_eq!(array.shape(), &[100, 100]);
        assert_eq!(array.data_type(), DataType::UInt16);
        let node = Node::open(&storage, "/image").unwrap();
        assert!(matches!(node.metadata(), NodeMetadata::Array(_)));
    }

    #[test]
    fn multi_series_multi_resolution_tree() {
        let storage = Arc::new(MemoryStore::new());
        let series = SeriesDescriptor {
            resolutions: vec![
                ResolutionDescriptor {
                    shape: vec![100, 100],
                    pixel_type: PixelType::UInt8,
                },
                ResolutionDescriptor {
                    shape: vec![50, 50],
                    pixel_type: PixelType::UInt8,
                },
            ],
        };
        let descriptor = PyramidDescriptor {
            series: vec![series.clone(), series],
        };
        create_pyramid(&storage, "/", &descriptor, &CreateOptions::default()).unwrap();

        let root = Node::open(&storage, "/").unwrap();
        assert!(root.is_group());
        let series_names: Vec<String> = root
            .children()
            .iter()
            .map(|node| node.name().to_string())
            .collect();
        assert_eq!(series_names, ["Series0", "Series1"]);
        for series in root.children() {
            assert!(series.is_group());
            let resolution_names: Vec<String> = series
                .children()
                .iter()
                .map(|node| node.name().to_string())
                .collect();
            assert_eq!(resolution_names, ["Resolution0", "Resolution1"]);
            for resolution in series.children() {
                assert!(matches!(resolution.metadata(), NodeMetadata::Array(_)));
            }
        }

        let finest = Array::open(storage, "/Series1/Resolution0").unwrap();
        assert_eq!(finest.shape(), &[100, 100]);
    }

    #[test]
    fn default_chunk_shape_clamps() {
        assert_eq!(default_chunk_shape(&[1000, 1000, 3, 4, 5]), [256, 256, 1, 1, 1]);
        assert_eq!(default_chunk_shape(&[100, 100]), [100, 100]);
    }

    #[test]
    fn empty_descriptor_rejected() {
        let storage = Arc::new(MemoryStore::new());
        let descriptor = PyramidDescriptor { series: vec![] };
        assert!(matches!(
            create_pyramid(&storage, "/", &descriptor, &CreateOptions::default()),
            Err(PyramidCreateError::EmptyDescriptor)
        ));
        use crate::storage::ListableStorageTraits;
        assert!(storage.list().unwrap().is_empty());
    }
}
