//! Vegetation parameters from CLM plant functional types
//!
//! Every PFT becomes one vegetation tile. Canopy constants come from the NLDAS
//! vegetation library through a fixed PFT to NLDAS class mapping, while cover,
//! LAI and canopy height come from the regridded CLM surface data.

pub mod derive;
pub mod library;
pub mod pft;

pub use derive::{
    derive_vegetation_parameters, VegetationInputs, VegetationOptions, VegetationParameters,
};
pub use library::{VegClassParams, VegLibrary};
pub use pft::{map_pft_to_nldas, NldasClass, Pft, N_PFT};
