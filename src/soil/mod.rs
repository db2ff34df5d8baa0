//! Soil parameters from SoilGrids texture, bulk density and organic carbon
//!
//! # Organization
//!
//! - [`texture`]: sand/clay/silt to USDA texture class
//! - [`hydraulics`]: per-class hydraulic table and derived quantities
//! - [`layers`]: aggregation of the seven SoilGrids nodes onto three model layers
//! - [`derive`]: gridded derivation of every soil layer parameter

pub mod derive;
pub mod hydraulics;
pub mod layers;
pub mod texture;

pub use derive::{derive_soil_parameters, total_depth, SoilInputs, SoilOptions, SoilParameters};
pub use hydraulics::SoilHydraulics;
pub use layers::Mean;
pub use texture::{classify, SoilTexture};
