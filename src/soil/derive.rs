use super::hydraulics::{self, SoilHydraulics};
use super::layers::{self, Mean, N_NODES};
use super::texture::{self, SoilTexture};
use crate::config::{ConstantsConfig, SoilConfig};
use crate::domain::Domain;
use crate::errors::{Result, VicParamsError};
use crate::params::ParameterSet;
use crate::schema::N_LAYER;
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Organic carbon is reported in g/kg
const ORGANIC_G_PER_KG: f64 = 1000.0;

const CM_PER_M: f64 = 100.0;

/// Regridded SoilGrids fields
#[derive(Debug, Clone)]
pub struct SoilInputs {
    /// Sand percentage as `(7, nj, ni)`
    pub sand: Array3<f64>,
    pub clay: Array3<f64>,
    pub silt: Array3<f64>,
    /// Measured bulk density (kg/m3)
    pub bulk_density: Option<Array3<f64>>,
    /// Organic carbon (g/kg)
    pub organic: Option<Array3<f64>>,
    /// Total column depth (m)
    pub total_depth: Array2<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoilOptions {
    /// Also produce `organic`, `bulk_density_comb` and `soil_density_org`
    pub organic_fract: bool,
}

/// Soil layer parameters on `(nlayer, nj, ni)`
#[derive(Debug, Clone)]
pub struct SoilParameters {
    pub depth: Array3<f64>,
    pub ksat: Array3<f64>,
    pub expt: Array3<f64>,
    pub bubble: Array3<f64>,
    pub resid_moist: Array3<f64>,
    pub quartz: Array3<f64>,
    pub bulk_density: Array3<f64>,
    pub wpwp_fract: Array3<f64>,
    pub wcr_fract: Array3<f64>,
    pub soil_density: Array3<f64>,
    pub init_moist: Array3<f64>,
    pub phi_s: Array3<f64>,
    pub organic: Option<Array3<f64>>,
    pub bulk_density_comb: Option<Array3<f64>>,
    pub soil_density_org: Option<Array3<f64>>,
    /// Texture class code of the surface node, 0 where inactive or unclassified
    pub surface_texture: Array2<i32>,
}

impl SoilParameters {
    /// Move the layer parameters into a parameter set
    pub fn insert_into(self, set: &mut ParameterSet) -> Result<()> {
        set.insert_float("depth", self.depth)?;
        set.insert_float("Ksat", self.ksat)?;
        set.insert_float("expt", self.expt)?;
        set.insert_float("bubble", self.bubble)?;
        set.insert_float("resid_moist", self.resid_moist)?;
        set.insert_float("quartz", self.quartz)?;
        set.insert_float("bulk_density", self.bulk_density)?;
        set.insert_float("Wpwp_FRACT", self.wpwp_fract)?;
        set.insert_float("Wcr_FRACT", self.wcr_fract)?;
        set.insert_float("soil_density", self.soil_density)?;
        set.insert_float("init_moist", self.init_moist)?;
        set.insert_float("phi_s", self.phi_s)?;
        if let Some(organic) = self.organic {
            set.insert_float("organic", organic)?;
        }
        if let Some(comb) = self.bulk_density_comb {
            set.insert_float("bulk_density_comb", comb)?;
        }
        if let Some(org) = self.soil_density_org {
            set.insert_float("soil_density_org", org)?;
        }
        Ok(())
    }
}

/// Per-cell result, one value per model layer
#[derive(Debug, Clone, Copy)]
struct CellSoil {
    depth: [f64; 3],
    ksat: [f64; 3],
    expt: [f64; 3],
    bubble: [f64; 3],
    resid_moist: [f64; 3],
    quartz: [f64; 3],
    bulk_density: [f64; 3],
    wpwp_fract: [f64; 3],
    wcr_fract: [f64; 3],
    init_moist: [f64; 3],
    organic: [f64; 3],
    bulk_density_comb: [f64; 3],
    surface_texture: i32,
}

impl CellSoil {
    /// Cell without soil data, every layer taking the missing hydraulic row
    fn missing() -> Self {
        let row = SoilHydraulics::missing();
        let nan = [f64::NAN; 3];
        Self {
            depth: nan,
            ksat: [row.ksat_mm_per_day(); 3],
            expt: [row.expt(); 3],
            bubble: [row.bubble(); 3],
            resid_moist: [row.resid_moist; 3],
            quartz: [row.quartz; 3],
            bulk_density: [row.bulk_density; 3],
            wpwp_fract: [row.wpwp_fract; 3],
            wcr_fract: [row.wcr_fract; 3],
            init_moist: nan,
            organic: nan,
            bulk_density_comb: nan,
            surface_texture: 0,
        }
    }
}

fn column(array: &Array3<f64>, j: usize, i: usize) -> [f64; N_NODES] {
    let mut nodes = [f64::NAN; N_NODES];
    for (k, node) in nodes.iter_mut().enumerate() {
        *node = array[[k, j, i]];
    }
    nodes
}

fn derive_cell(
    inputs: &SoilInputs,
    constants: &ConstantsConfig,
    j: usize,
    i: usize,
) -> Result<CellSoil> {
    let total_depth = inputs.total_depth[[j, i]];
    let sand = column(&inputs.sand, j, i);
    let clay = column(&inputs.clay, j, i);
    let silt = column(&inputs.silt, j, i);

    let classes: Vec<Option<SoilTexture>> = (0..N_NODES)
        .map(|k| texture::classify(sand[k], clay[k], silt[k]))
        .collect();
    let rows: Vec<SoilHydraulics> = classes
        .iter()
        .map(|&c| SoilHydraulics::for_class(c))
        .collect();

    let nodes_of = |f: fn(&SoilHydraulics) -> f64| -> [f64; N_NODES] {
        let mut nodes = [f64::NAN; N_NODES];
        for (node, row) in nodes.iter_mut().zip(&rows) {
            *node = f(row);
        }
        nodes
    };

    let ksat = layers::aggregate(&nodes_of(SoilHydraulics::ksat_mm_per_day), total_depth, Mean::Harmonic)?;
    let b = layers::aggregate(&nodes_of(|r| r.b), total_depth, Mean::Arithmetic)?;
    let resid_moist = layers::aggregate(&nodes_of(|r| r.resid_moist), total_depth, Mean::Arithmetic)?;
    let quartz = layers::aggregate(&nodes_of(|r| r.quartz), total_depth, Mean::Arithmetic)?;
    let bulk_density = layers::aggregate(&nodes_of(|r| r.bulk_density), total_depth, Mean::Arithmetic)?;
    let wpwp_fract = layers::aggregate(&nodes_of(|r| r.wpwp_fract), total_depth, Mean::Arithmetic)?;
    let wcr_fract = layers::aggregate(&nodes_of(|r| r.wcr_fract), total_depth, Mean::Arithmetic)?;

    let depth = layers::layer_depths(total_depth);
    let expt = b.map(hydraulics::expt_from_b);
    let bubble = expt.map(hydraulics::bubble_from_expt);

    let mut init_moist = [f64::NAN; 3];
    for l in 0..N_LAYER {
        let porosity = hydraulics::porosity(bulk_density[l], constants.soil_density);
        init_moist[l] = hydraulics::init_moist(porosity, depth[l]);
    }

    let organic = match &inputs.organic {
        Some(organic) => layers::aggregate(&column(organic, j, i), total_depth, Mean::Arithmetic)?
            .map(|v| v / ORGANIC_G_PER_KG),
        None => [f64::NAN; 3],
    };
    let bulk_density_comb = match &inputs.bulk_density {
        Some(measured) => layers::aggregate(&column(measured, j, i), total_depth, Mean::Arithmetic)?,
        None => [f64::NAN; 3],
    };

    Ok(CellSoil {
        depth,
        ksat,
        expt,
        bubble,
        resid_moist,
        quartz,
        bulk_density,
        wpwp_fract,
        wcr_fract,
        init_moist,
        organic,
        bulk_density_comb,
        surface_texture: classes[0].map_or(0, SoilTexture::code),
    })
}

fn check_inputs(inputs: &SoilInputs, domain: &Domain) -> Result<()> {
    let (nj, ni) = domain.shape();
    let expected = [N_NODES, nj, ni];
    let mut fields = vec![("sand", &inputs.sand), ("clay", &inputs.clay), ("silt", &inputs.silt)];
    if let Some(b) = &inputs.bulk_density {
        fields.push(("bulk_density", b));
    }
    if let Some(o) = &inputs.organic {
        fields.push(("organic", o));
    }
    for (name, array) in fields {
        if array.shape() != &expected[..] {
            return Err(VicParamsError::ShapeMismatch {
                var: name.to_string(),
                expected: expected.to_vec(),
                found: array.shape().to_vec(),
            });
        }
    }
    if inputs.total_depth.dim() != (nj, ni) {
        return Err(VicParamsError::ShapeMismatch {
            var: "total_depth".to_string(),
            expected: vec![nj, ni],
            found: inputs.total_depth.shape().to_vec(),
        });
    }
    Ok(())
}

/// Derive the soil layer parameters on every active cell
///
/// Each SoilGrids node is classified into a texture class and given that
/// class's hydraulic row. Conductivity is aggregated onto the model layers
/// with a harmonic mean, everything else with an arithmetic mean. Inactive
/// cells are NaN.
///
/// # Errors
///
/// Returns an error if an input does not match the domain or a layer cannot
/// be assigned for a cell's total depth.
pub fn derive_soil_parameters(
    inputs: &SoilInputs,
    domain: &Domain,
    constants: &ConstantsConfig,
    options: SoilOptions,
) -> Result<SoilParameters> {
    check_inputs(inputs, domain)?;
    if options.organic_fract && (inputs.organic.is_none() || inputs.bulk_density.is_none()) {
        return Err(VicParamsError::Generic(
            "organic soil parameters need organic carbon and bulk density inputs".to_string(),
        ));
    }

    let (nj, ni) = domain.shape();
    info!(
        cells = domain.active_count(),
        threads = rayon::current_num_threads(),
        "deriving soil parameters"
    );

    let cells: Vec<CellSoil> = (0..nj * ni)
        .into_par_iter()
        .map(|flat| {
            let (j, i) = (flat / ni, flat % ni);
            if domain.is_active(j, i) {
                derive_cell(inputs, constants, j, i)
            } else {
                Ok(CellSoil::missing())
            }
        })
        .collect::<Result<_>>()?;

    let layered = |f: fn(&CellSoil) -> [f64; 3]| -> Array3<f64> {
        Array3::from_shape_fn((N_LAYER, nj, ni), |(l, j, i)| f(&cells[j * ni + i])[l])
    };
    let constant = |value: f64| -> Array3<f64> {
        Array3::from_shape_fn((N_LAYER, nj, ni), |(_, j, i)| {
            if domain.is_active(j, i) {
                value
            } else {
                f64::NAN
            }
        })
    };

    let surface_texture = Array2::from_shape_fn((nj, ni), |(j, i)| cells[j * ni + i].surface_texture);
    let active_cells = || (0..nj * ni).filter(move |&flat| domain.is_active(flat / ni, flat % ni));
    let unclassified = active_cells()
        .filter(|&flat| !hydraulics::is_soil_class(cells[flat].surface_texture))
        .count();
    if unclassified > 0 {
        debug!(cells = unclassified, "surface soil left unclassified, loam values used");
    }
    let unassigned = active_cells()
        .filter(|&flat| !cells[flat].ksat.iter().all(|&k| hydraulics::is_param_value(k)))
        .count();
    if unassigned > 0 {
        warn!(cells = unassigned, "active cells without a positive saturated conductivity");
    }

    let (organic, bulk_density_comb, soil_density_org) = if options.organic_fract {
        (
            Some(layered(|c| c.organic)),
            Some(layered(|c| c.bulk_density_comb)),
            Some(constant(constants.soil_density_org)),
        )
    } else {
        (None, None, None)
    };

    Ok(SoilParameters {
        depth: layered(|c| c.depth),
        ksat: layered(|c| c.ksat),
        expt: layered(|c| c.expt),
        bubble: layered(|c| c.bubble),
        resid_moist: layered(|c| c.resid_moist),
        quartz: layered(|c| c.quartz),
        bulk_density: layered(|c| c.bulk_density),
        wpwp_fract: layered(|c| c.wpwp_fract),
        wcr_fract: layered(|c| c.wcr_fract),
        soil_density: constant(constants.soil_density),
        init_moist: layered(|c| c.init_moist),
        phi_s: constant(constants.phi_s),
        organic,
        bulk_density_comb,
        soil_density_org,
        surface_texture,
    })
}

/// Total column depth per cell
///
/// Uses SoilGrids depth to bedrock (cm) when given, clamped to the configured
/// bounds; cells without a bedrock value, or runs without bedrock data, get
/// the configured constant depth.
pub fn total_depth(domain: &Domain, bedrock_cm: Option<&Array2<f64>>, config: &SoilConfig) -> Array2<f64> {
    let (nj, ni) = domain.shape();
    Array2::from_shape_fn((nj, ni), |(j, i)| {
        if !domain.is_active(j, i) {
            return f64::NAN;
        }
        match bedrock_cm.map(|b| b[[j, i]]) {
            Some(cm) if config.use_bedrock_depth && cm.is_finite() => {
                (cm / CM_PER_M).clamp(config.min_total_depth, config.max_total_depth)
            }
            _ => config.total_depth,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn domain() -> Domain {
        Domain::from_parts(
            array![[1, 0]],
            array![[10.0, 11.0]],
            array![[50.0, 50.0]],
        )
        .unwrap()
    }

    fn uniform(value: f64) -> Array3<f64> {
        Array3::from_elem((N_NODES, 1, 2), value)
    }

    fn loam_inputs() -> SoilInputs {
        SoilInputs {
            sand: uniform(40.0),
            clay: uniform(20.0),
            silt: uniform(40.0),
            bulk_density: Some(uniform(1300.0)),
            organic: Some(uniform(50.0)),
            total_depth: array![[2.0, f64::NAN]],
        }
    }

    #[test]
    fn uniform_loam_column() {
        let constants = ConstantsConfig::default();
        let params = derive_soil_parameters(
            &loam_inputs(),
            &domain(),
            &constants,
            SoilOptions { organic_fract: true },
        )
        .unwrap();

        let loam = SoilHydraulics::for_class(Some(SoilTexture::Loam));
        for l in 0..N_LAYER {
            assert_relative_eq!(params.ksat[[l, 0, 0]], loam.ksat_mm_per_day(), max_relative = 1e-12);
            assert_relative_eq!(params.expt[[l, 0, 0]], loam.expt());
            assert_relative_eq!(params.bubble[[l, 0, 0]], loam.bubble());
            assert_relative_eq!(params.wpwp_fract[[l, 0, 0]], loam.wpwp_fract);
            assert_relative_eq!(params.organic.as_ref().unwrap()[[l, 0, 0]], 0.05);
            assert_relative_eq!(params.bulk_density_comb.as_ref().unwrap()[[l, 0, 0]], 1300.0);
            assert_eq!(params.phi_s[[l, 0, 0]], -999.0);
            assert!(params.ksat[[l, 0, 1]].is_nan());
            assert!(params.soil_density[[l, 0, 1]].is_nan());
        }

        // the inactive cell carries the missing hydraulic row on every layer
        let missing = CellSoil::missing();
        for l in 0..N_LAYER {
            for value in [
                params.expt[[l, 0, 1]],
                params.bubble[[l, 0, 1]],
                params.quartz[[l, 0, 1]],
                params.wcr_fract[[l, 0, 1]],
                params.bulk_density[[l, 0, 1]],
            ] {
                assert!(value.is_nan());
            }
            assert!(!hydraulics::is_param_value(missing.ksat[l]));
            assert!(hydraulics::is_param_value(params.ksat[[l, 0, 0]]));
        }
        assert!(!hydraulics::is_soil_class(missing.surface_texture));

        let porosity = 1.0 - 1490.0 / 2685.0;
        assert_relative_eq!(params.init_moist[[0, 0, 0]], porosity * 100.0, max_relative = 1e-12);
        assert_relative_eq!(params.depth[[1, 0, 0]], 1.4, epsilon = 1e-12);
        assert_eq!(params.surface_texture[[0, 0]], SoilTexture::Loam.code());
        assert_eq!(params.surface_texture[[0, 1]], 0);
    }

    #[test]
    fn conductivity_uses_harmonic_mean() {
        let mut inputs = loam_inputs();
        // sand at the surface node, loam below
        inputs.sand[[0, 0, 0]] = 92.0;
        inputs.clay[[0, 0, 0]] = 3.0;
        inputs.silt[[0, 0, 0]] = 5.0;
        let params = derive_soil_parameters(
            &inputs,
            &domain(),
            &ConstantsConfig::default(),
            SoilOptions::default(),
        )
        .unwrap();

        let sand = SoilHydraulics::for_class(Some(SoilTexture::Sand)).ksat_mm_per_day();
        let loam = SoilHydraulics::for_class(Some(SoilTexture::Loam)).ksat_mm_per_day();
        assert_relative_eq!(
            params.ksat[[0, 0, 0]],
            2.0 / (1.0 / sand + 1.0 / loam),
            max_relative = 1e-12
        );
        assert_relative_eq!(params.quartz[[0, 0, 0]], (0.92 + 0.40) / 2.0);
        assert!(params.organic.is_none());
        assert_eq!(params.surface_texture[[0, 0]], SoilTexture::Sand.code());
    }

    #[test]
    fn organic_run_requires_inputs() {
        let mut inputs = loam_inputs();
        inputs.organic = None;
        let result = derive_soil_parameters(
            &inputs,
            &domain(),
            &ConstantsConfig::default(),
            SoilOptions { organic_fract: true },
        );
        assert!(result.is_err());
    }

    #[test]
    fn bedrock_depth_is_clamped() {
        let config = SoilConfig {
            use_bedrock_depth: true,
            ..SoilConfig::default()
        };
        let bedrock = array![[1000.0, 50.0]];
        let depths = total_depth(&domain(), Some(&bedrock), &config);
        assert_eq!(depths[[0, 0]], 3.0);
        assert!(depths[[0, 1]].is_nan());

        let bedrock = array![[f64::NAN, 50.0]];
        let depths = total_depth(&domain(), Some(&bedrock), &config);
        assert_eq!(depths[[0, 0]], 2.0);
    }
}
