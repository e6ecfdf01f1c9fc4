//! A rust library for storing multi-resolution scientific image pyramids as
//! [Zarr V3](https://zarr.dev) hierarchies.
//!
//! `zarr_pyramid` stores very large N-dimensional image arrays as a tree of groups and arrays:
//! each array is split into independently addressable chunks (optionally grouped into shards),
//! each chunk passes through a configurable codec pipeline (compression, checksums) before being
//! written to a backing key-value byte store. Arbitrary sub-regions can be read and written
//! without touching the rest of the array.
//!
//! ## Getting Started
//! - [`service::ImageStore`] is the high-level entry point for imaging callers: typed region I/O
//!   through [`service::PixelBuffer`], hierarchy queries, and pyramid creation.
//! - [`array::Array`] and [`storage`] are the lower-level building blocks.
//! - [`layout`] holds the chunk and shard layout policy; [`pyramid`] materialises
//!   multi-resolution hierarchies.
//!
//! ## Example
//! ```
//! # use std::sync::Arc;
//! use zarr_pyramid::array::PixelType;
//! use zarr_pyramid::pyramid::{CreateOptions, PyramidDescriptor};
//! use zarr_pyramid::service::{ImageStore, PixelBuffer};
//! use zarr_pyramid::storage::store::MemoryStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ImageStore::new_with_store(Arc::new(MemoryStore::new()));
//! store.create_pyramid(
//!     "/image",
//!     &PyramidDescriptor::single(vec![512, 512], PixelType::UInt16),
//!     &CreateOptions::default(),
//! )?;
//!
//! let handle = store.open_array("/image")?;
//! handle.write_region(
//!     &PixelBuffer::UInt16 {
//!         shape: vec![2, 2],
//!         data: vec![1, 2, 3, 4],
//!     },
//!     &[100, 100],
//! )?;
//! let region = handle.read_region(&[2, 2], &[100, 100])?;
//! # assert_eq!(
//! #     region,
//! #     PixelBuffer::UInt16 { shape: vec![2, 2], data: vec![1, 2, 3, 4] }
//! # );
//! # Ok(())
//! # }
//! ```

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array;
pub mod array_subset;
pub mod byte_range;
pub mod group;
pub mod layout;
pub mod metadata;
pub mod node;
pub mod plugin;
pub mod pyramid;
pub mod service;
pub mod storage;
