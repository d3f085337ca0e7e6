//! Built-in metro station schema

use super::{Derivation, FieldSchema, FieldSpec, Rounding};

/// Training target column
pub const TARGET_COLUMN: &str = "Total_Civil_Cost_Crore";

pub const CITIES: [&str; 17] = [
    "Delhi",
    "Mumbai",
    "Kolkata",
    "Bengaluru",
    "Chennai",
    "Hyderabad",
    "Ahmedabad",
    "Pune",
    "Jaipur",
    "Lucknow",
    "Kochi",
    "Noida",
    "Kanpur",
    "Agra",
    "Indore",
    "Navi Mumbai",
    "Gurugram",
];

/// Excavated volume swell over the station box
pub const BULKING_FACTOR: f64 = 1.15;
pub const SHUTTERING_PER_RCC: f64 = 1.4;
pub const REBAR_TONS_PER_RCC: f64 = 0.11;
pub const CEMENT_TONS_PER_RCC: f64 = 0.4;
pub const SAND_PER_RCC: f64 = 0.65;
pub const AGGREGATE_PER_RCC: f64 = 1.0;
pub const FOUNDATION_PER_METRE: f64 = 1.1;
pub const WATERPROOFING_RATIO: f64 = 0.25;
pub const TBM_DIAMETER_M: f64 = 6.5;

const HALF_EVEN: Rounding = Rounding::HalfEven { digits: 0 };

impl FieldSchema {
    /// Station record as collected by the estimator form and used for training
    pub fn metro_station() -> Self {
        let fields = vec![
            FieldSpec::categorical("City", Derivation::input("Delhi")).with_choices(CITIES),
            FieldSpec::categorical("Metro_Type", Derivation::input("underground"))
                .with_label("Metro Type")
                .with_choices(["underground", "elevated"]),
            FieldSpec::categorical("Station_Typology", Derivation::input("Regular"))
                .with_label("Station Typology")
                .with_choices(["Regular", "Interchange", "Terminal"]),
            FieldSpec::categorical("Soil_Type", Derivation::input("Alluvial"))
                .with_label("Soil Type")
                .with_choices(["Alluvial", "Rock", "Clay", "Mixed"]),
            FieldSpec::categorical("Seismic_Zone", Derivation::input("II"))
                .with_label("Seismic Zone")
                .with_choices(["II", "III", "IV", "V"]),
            FieldSpec::categorical("Weather_Impact", Derivation::input("Dry"))
                .with_label("Weather Impact")
                .with_choices(["Dry", "Rainy", "Flood Prone"]),
            FieldSpec::categorical("TBM_Used", Derivation::input("Yes"))
                .with_label("TBM Used")
                .with_choices(["Yes", "No"]),
            FieldSpec::categorical("Tower_Crane_Required", Derivation::input("Yes"))
                .with_label("Tower Crane Required")
                .with_choices(["Yes", "No"]),
            FieldSpec::numeric("Excavator_Count", Derivation::constant(4)),
            FieldSpec::categorical("Dewatering_Method", Derivation::constant("Wellpoint")),
            FieldSpec::categorical("Gantry_DG_Setup", Derivation::constant("Yes")),
            FieldSpec::categorical("Contract_Type", Derivation::constant("Item Rate")),
            FieldSpec::categorical(
                "Construction_Method",
                Derivation::when(
                    "Metro_Type",
                    "underground",
                    Derivation::constant("Top-down"),
                    Derivation::constant("Bottom-up"),
                ),
            ),
            FieldSpec::categorical("Concrete_Grade", Derivation::constant("M30")),
            FieldSpec::categorical("Waterproofing_Type", Derivation::constant("membrane")),
            FieldSpec::categorical("Rebar_Type", Derivation::constant("Fe500D")),
            FieldSpec::categorical("Exchange_Rate_Sensitivity", Derivation::constant("Medium")),
            FieldSpec::categorical("Flood_Risk", Derivation::constant("No")),
            FieldSpec::categorical("Heritage_Nearby", Derivation::constant("No")),
            FieldSpec::numeric("Levels", Derivation::input(2))
                .with_label("Number of Levels")
                .with_choices([2, 3]),
            FieldSpec::numeric("Station_Depth_m", Derivation::input(20))
                .with_label("Station Depth (m)")
                .with_range(10.0, Some(30.0), Some(1.0)),
            FieldSpec::numeric("Station_Length_m", Derivation::input(180))
                .with_label("Station Length (m)")
                .with_range(120.0, Some(250.0), Some(1.0)),
            FieldSpec::numeric("Station_Width_m", Derivation::input(20))
                .with_label("Station Width (m)")
                .with_range(15.0, Some(30.0), Some(1.0)),
            FieldSpec::numeric(
                "Excavation_Volume_cum",
                Derivation::scaled(
                    &["Station_Length_m", "Station_Width_m", "Station_Depth_m"],
                    BULKING_FACTOR,
                    HALF_EVEN,
                ),
            ),
            FieldSpec::numeric("Diaphragm_Wall_Area_sqm", Derivation::input(0))
                .with_label("Diaphragm Wall Area (sqm)")
                .with_range(0.0, None, Some(1.0)),
            FieldSpec::numeric(
                "Waterproofing_Area_sqm",
                Derivation::when(
                    "Metro_Type",
                    "underground",
                    Derivation::scaled(
                        &["Station_Length_m", "Station_Depth_m"],
                        WATERPROOFING_RATIO,
                        Rounding::None,
                    ),
                    Derivation::scaled(&["Station_Length_m"], WATERPROOFING_RATIO, Rounding::None),
                ),
            ),
            FieldSpec::numeric("RCC_Volume_cum", Derivation::input(12000))
                .with_label("RCC Volume (cum)")
                .with_range(3000.0, Some(20000.0), Some(100.0)),
            FieldSpec::numeric(
                "Shuttering_Area_sqm",
                Derivation::scaled(&["RCC_Volume_cum"], SHUTTERING_PER_RCC, HALF_EVEN),
            ),
            FieldSpec::numeric(
                "Reinforcement_TMT_tons",
                Derivation::scaled(
                    &["RCC_Volume_cum"],
                    REBAR_TONS_PER_RCC,
                    Rounding::HalfEven { digits: 2 },
                ),
            ),
            FieldSpec::numeric(
                "Structural_Steel_tons",
                Derivation::when(
                    "Metro_Type",
                    "underground",
                    Derivation::constant(120),
                    Derivation::constant(60),
                ),
            ),
            FieldSpec::numeric("Water_Table_m", Derivation::constant(6)),
            FieldSpec::numeric("Material_Inflation_Rate_percent", Derivation::constant(6.0)),
            FieldSpec::numeric("Regional_Cost_Index", Derivation::input(1.0))
                .with_label("Regional Cost Index")
                .with_range(0.85, Some(1.15), Some(0.01)),
            FieldSpec::numeric("Peak_Labor_Count", Derivation::input(450))
                .with_label("Peak Labor Count")
                .with_range(200.0, Some(700.0), Some(1.0)),
            FieldSpec::numeric(
                "Foundation_Quantity",
                Derivation::scaled(&["Station_Length_m"], FOUNDATION_PER_METRE, Rounding::Truncate),
            ),
            FieldSpec::numeric(
                "Cement_Qty_tons",
                Derivation::scaled(&["RCC_Volume_cum"], CEMENT_TONS_PER_RCC, Rounding::Truncate),
            ),
            FieldSpec::numeric(
                "Sand_Qty_cum",
                Derivation::scaled(&["RCC_Volume_cum"], SAND_PER_RCC, Rounding::Truncate),
            ),
            FieldSpec::numeric(
                "Aggregate_Qty_cum",
                Derivation::scaled(&["RCC_Volume_cum"], AGGREGATE_PER_RCC, Rounding::Truncate),
            ),
            FieldSpec::numeric(
                "TBM_Diameter_m",
                Derivation::when(
                    "TBM_Used",
                    "Yes",
                    Derivation::constant(TBM_DIAMETER_M),
                    Derivation::constant(0),
                ),
            )
            .with_gate("TBM_Used", "Yes"),
        ];

        Self::new(TARGET_COLUMN, fields)
    }
}
