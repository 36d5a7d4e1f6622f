//! Per-cell economic objective. A [`Model`] turns one cell's static and
//! distance attributes plus the global parameters into derived outputs; it
//! never looks at other cells.

use crate::config::ConfigError;
use crate::grid::{DerivedAttrs, FarmType, HexCell, HexGrid};
use crate::params::ParameterSet;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvaluationStats {
    pub cells: usize,
    pub producing: usize,
    pub total_output: f64,
    pub total_profit: f64,
}

pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    /// Recomputes derived attributes for every cell. Parameters are resolved
    /// before any cell is touched, so a configuration error leaves the grid
    /// unchanged.
    fn evaluate(&self, grid: &mut HexGrid, params: &ParameterSet) -> Result<EvaluationStats, ConfigError>;
}

/// Fish farming siting model.
#[derive(Debug, Clone, Copy, Default)]
pub struct FishModel;

impl FishModel {
    pub fn new() -> Self {
        Self
    }
}

impl Model for FishModel {
    fn name(&self) -> &str {
        "fish"
    }

    fn evaluate(&self, grid: &mut HexGrid, params: &ParameterSet) -> Result<EvaluationStats, ConfigError> {
        let resolved = FishParams::resolve(params)?;
        grid.update_derived(|cell| resolved.evaluate_cell(cell));

        let mut stats = EvaluationStats {
            cells: grid.len(),
            ..EvaluationStats::default()
        };
        for cell in grid.cells() {
            let derived = cell.derived();
            if derived.fish_output > 0.0 {
                stats.producing += 1;
                stats.total_output += derived.fish_output;
                stats.total_profit += derived.profit;
            }
        }
        Ok(stats)
    }
}

/// Parameter values the fish model reads, clamped to their declared bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct FishParams {
    pub duration: f64,
    pub interest_rate: f64,
    pub fish_price: f64,
    pub max_fish_output: f64,
    pub labor_per_hh: f64,
    pub hh_size: f64,
    pub fish_per_worker: f64,
    pub pond_yield_factor: f64,
    pub min_pop: f64,
    pub max_pop: f64,
    pub max_lake_dist: f64,
    pub max_water_dist: f64,
    pub min_precip: f64,
    pub truck_econ_multi: f64,
    pub traffic_pp: f64,
    pub truck_cost_ptkm: f64,
    pub road_cost_pkm: f64,
    pub grid_cost_pkm: f64,
    pub grid_tariff: f64,
    pub mg_cost_pkw: f64,
    pub elec_ice: f64,
    pub ice_power: f64,
    pub aeration_power: f64,
    pub wage: f64,
    pub local_share: f64,
}

impl FishParams {
    pub fn resolve(params: &ParameterSet) -> Result<Self, ConfigError> {
        let p = |id: &str| params.clamped(id);
        Ok(Self {
            duration: p("duration")?,
            interest_rate: p("interest_rate")?,
            fish_price: p("fish_price")?,
            max_fish_output: p("max_fish_output")?,
            labor_per_hh: p("labor_per_hh")?,
            hh_size: p("hh_size")?,
            fish_per_worker: p("fish_per_worker")?,
            pond_yield_factor: p("pond_yield_factor")?,
            min_pop: p("min_pop")?,
            max_pop: p("max_pop")?,
            max_lake_dist: p("max_lake_dist")?,
            max_water_dist: p("max_water_dist")?,
            min_precip: p("min_precip")?,
            truck_econ_multi: p("truck_econ_multi")?,
            traffic_pp: p("traffic_pp")?,
            truck_cost_ptkm: p("truck_cost_ptkm")?,
            road_cost_pkm: p("road_cost_pkm")?,
            grid_cost_pkm: p("grid_cost_pkm")?,
            grid_tariff: p("grid_tariff")?,
            mg_cost_pkw: p("mg_cost_pkw")?,
            elec_ice: p("elec_ice")?,
            ice_power: p("ice_power")?,
            aeration_power: p("aeration_power")?,
            wage: p("wage")?,
            local_share: p("local_share")?,
        })
    }

    /// Annual repayment per unit of capital over `duration` years.
    pub fn capital_recovery_factor(&self) -> f64 {
        let years = self.duration.max(1.0);
        let rate = self.interest_rate.max(0.0) / 100.0;
        if rate <= 0.0 {
            return 1.0 / years;
        }
        let growth = (1.0 + rate).powf(years);
        rate * growth / (growth - 1.0)
    }

    pub fn farm_type(&self, cell: &HexCell) -> FarmType {
        let s = cell.static_attrs();
        let in_population_band = s.pop >= self.min_pop && s.pop <= self.max_pop;
        let wet_enough = s.precip >= self.min_precip;
        let market_access = cell.distances().road_dist.is_finite();
        if !(in_population_band && wet_enough && market_access) {
            return FarmType::None;
        }
        if s.lake_dist <= self.max_lake_dist {
            FarmType::Cage
        } else if s.water_dist <= self.max_water_dist {
            FarmType::Pond
        } else {
            FarmType::None
        }
    }

    pub fn evaluate_cell(&self, cell: &HexCell) -> DerivedAttrs {
        let tech = self.farm_type(cell);
        let yield_factor = match tech {
            FarmType::Cage => 1.0,
            FarmType::Pond => self.pond_yield_factor,
            FarmType::None => return DerivedAttrs::default(),
        };

        let s = cell.static_attrs();
        let d = cell.distances();
        let labor = s.pop / self.hh_size.max(1.0) * self.labor_per_hh;
        let per_worker = self.fish_per_worker * yield_factor;
        let fish_output = (labor * per_worker).min(self.max_fish_output).max(0.0);
        if !(fish_output > 0.0) {
            return DerivedAttrs::default();
        }

        let crf = self.capital_recovery_factor();
        let revenue = fish_output * self.fish_price;

        let aeration = if tech == FarmType::Pond {
            self.aeration_power
        } else {
            0.0
        };
        let power_kw = fish_output * (self.ice_power + aeration);
        let energy_kwh = fish_output * self.elec_ice;

        // cheaper of a grid extension (public) or an own microgrid (farm)
        let grid_extension = d.grid_dist.max(0.0) * self.grid_cost_pkm;
        let microgrid = power_kw * self.mg_cost_pkw;
        let (farm_capex, gov_power, energy_cost) = if grid_extension <= microgrid {
            (0.0, grid_extension, energy_kwh * self.grid_tariff)
        } else {
            (microgrid, 0.0, 0.0)
        };

        let road_dist = d.road_dist.max(0.0);
        let traffic = self.traffic_pp * s.pop.max(0.0);
        let logistics = fish_output * road_dist * self.truck_cost_ptkm / (1.0 + self.truck_econ_multi * traffic);

        let jobs = if self.fish_per_worker > 0.0 {
            fish_output / self.fish_per_worker
        } else {
            0.0
        };
        let wages = jobs * self.wage;

        let annual_cost = farm_capex * crf + energy_cost + logistics + wages;
        let gov_costs = gov_power + road_dist * self.road_cost_pkm;

        DerivedAttrs {
            tech,
            fish_output,
            revenue,
            profit: revenue - annual_cost,
            gov_costs,
            gov_annual: gov_costs * crf,
            social: wages + revenue * self.local_share,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::geometry::Polygon;
    use crate::grid::{DistanceAttrs, StaticAttrs};

    fn params() -> ParameterSet {
        ModelConfig::builtin().unwrap().parameter_set().unwrap()
    }

    fn cell(pop: f64, precip: f64, lake: f64, water: f64, grid: f64, road: f64) -> HexCell {
        HexCell::new(
            0,
            Polygon::default(),
            [None; 6],
            StaticAttrs {
                adm1: "Test".into(),
                pop,
                precip,
                lake_dist: lake,
                water_dist: water,
            },
        )
        .with_distances(DistanceAttrs {
            grid_dist: grid,
            road_dist: road,
        })
    }

    #[test]
    fn lake_side_cell_gets_a_profitable_cage_farm() {
        let p = FishParams::resolve(&params()).unwrap();
        let derived = p.evaluate_cell(&cell(50_000.0, 800.0, 2.0, 30.0, 10.0, 10.0));
        assert_eq!(derived.tech, FarmType::Cage);
        // 10_000 households * 0.5 workers * 0.5 t
        assert!((derived.fish_output - 2_500.0).abs() < 1e-9);
        assert!((derived.revenue - 15_000_000.0).abs() < 1e-6);
        assert!(derived.profit > 0.0);
        assert!(derived.gov_costs > 0.0);
        assert!(derived.social > 0.0);
    }

    #[test]
    fn pond_cell_pays_wages_per_worker_not_per_pond_yield() {
        let p = FishParams::resolve(&params()).unwrap();
        let derived = p.evaluate_cell(&cell(50_000.0, 800.0, 50.0, 2.0, 10.0, 10.0));
        assert_eq!(derived.tech, FarmType::Pond);
        // 5_000 workers * 0.5 t * 0.6 pond yield
        assert!((derived.fish_output - 1_500.0).abs() < 1e-9);
        assert!((derived.revenue - 9_000_000.0).abs() < 1e-6);
        // 3_000 jobs * 1_200 wage + 20% of revenue
        assert!((derived.social - 5_400_000.0).abs() < 1e-6);
        assert!(derived.profit < derived.revenue);
    }

    #[test]
    fn dry_cell_produces_exactly_nothing() {
        let mut set = params();
        set.set("min_precip", 500.0).unwrap();
        let p = FishParams::resolve(&set).unwrap();
        let derived = p.evaluate_cell(&cell(50_000.0, 400.0, 2.0, 30.0, 10.0, 10.0));
        assert_eq!(derived, DerivedAttrs::default());
        assert_eq!(derived.profit, 0.0);
    }

    #[test]
    fn unreached_grid_forces_microgrid() {
        let p = FishParams::resolve(&params()).unwrap();
        let near = p.evaluate_cell(&cell(50_000.0, 800.0, 2.0, 30.0, 0.0, 10.0));
        let far = p.evaluate_cell(&cell(50_000.0, 800.0, 2.0, 30.0, f64::INFINITY, 10.0));
        assert!(far.profit.is_finite());
        assert!(far.profit < near.profit);
        assert!(far.gov_costs < near.gov_costs + 1e-9);
    }

    #[test]
    fn no_road_means_no_market() {
        let p = FishParams::resolve(&params()).unwrap();
        let derived = p.evaluate_cell(&cell(50_000.0, 800.0, 2.0, 30.0, 0.0, f64::INFINITY));
        assert_eq!(derived.tech, FarmType::None);
        assert_eq!(derived.fish_output, 0.0);
    }

    #[test]
    fn capital_recovery_handles_zero_interest() {
        let mut set = params();
        set.set("interest_rate", 0.0).unwrap();
        let p = FishParams::resolve(&set).unwrap();
        assert!((p.capital_recovery_factor() - 0.1).abs() < 1e-12);
        set.set("interest_rate", -50.0).unwrap();
        let p = FishParams::resolve(&set).unwrap();
        assert!((p.capital_recovery_factor() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn missing_parameter_is_a_config_error() {
        let set = ParameterSet::default();
        assert!(matches!(
            FishParams::resolve(&set),
            Err(ConfigError::UnknownParameter(ref id)) if id == "duration"
        ));
    }
}
