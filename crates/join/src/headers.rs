//! Per-dataset header cleanup.
//!
//! Each source spreadsheet has its own header quirks: footnote digits glued to
//! column names ("arson3"), several spellings of the same measure, and columns
//! that are dropped before the final table is written. The transforms are
//! static data keyed by [`DataSource`], so an unknown dataset label fails at
//! parse time instead of silently skipping cleanup.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JoinError;
use crate::key::{normalize_key_values, split_geographic_area, COUNTY_FIPS, DEFAULT_CITY_SUFFIXES, STATE};
use crate::table::Table;

const GEOGRAPHIC_AREA: &str = "geographic area";
const STATE_FIPS_PART: &str = "state_fips_part";
const COUNTY_FIPS_PART: &str = "county_fips_part";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DataSource {
    #[serde(rename = "census_2010")]
    Census2010,
    #[serde(rename = "census_2019")]
    Census2019,
    #[serde(rename = "cdc")]
    Cdc,
    #[serde(rename = "zillow_city_codes")]
    ZillowCityCodes,
    #[serde(rename = "zillow")]
    Zillow,
    #[serde(rename = "experian")]
    Experian,
    #[serde(rename = "fbi_2014")]
    Fbi2014,
    #[serde(rename = "fbi_2015")]
    Fbi2015,
    #[serde(rename = "fbi_2016")]
    Fbi2016,
    #[serde(rename = "fbi_2017")]
    Fbi2017,
    #[serde(rename = "fbi")]
    Fbi,
    #[serde(rename = "walkscore")]
    Walkscore,
    #[serde(rename = "elections_2020")]
    Elections2020,
    #[serde(rename = "generic")]
    Generic,
    #[serde(rename = "final_csv")]
    FinalCsv,
}

impl DataSource {
    pub const ALL: &'static [DataSource] = &[
        Self::Census2010,
        Self::Census2019,
        Self::Cdc,
        Self::ZillowCityCodes,
        Self::Zillow,
        Self::Experian,
        Self::Fbi2014,
        Self::Fbi2015,
        Self::Fbi2016,
        Self::Fbi2017,
        Self::Fbi,
        Self::Walkscore,
        Self::Elections2020,
        Self::Generic,
        Self::FinalCsv,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Census2010 => "census_2010",
            Self::Census2019 => "census_2019",
            Self::Cdc => "cdc",
            Self::ZillowCityCodes => "zillow_city_codes",
            Self::Zillow => "zillow",
            Self::Experian => "experian",
            Self::Fbi2014 => "fbi_2014",
            Self::Fbi2015 => "fbi_2015",
            Self::Fbi2016 => "fbi_2016",
            Self::Fbi2017 => "fbi_2017",
            Self::Fbi => "fbi",
            Self::Walkscore => "walkscore",
            Self::Elections2020 => "elections_2020",
            Self::Generic => "generic",
            Self::FinalCsv => "final_csv",
        }
    }

    pub fn is_fbi(&self) -> bool {
        matches!(
            self,
            Self::Fbi | Self::Fbi2014 | Self::Fbi2015 | Self::Fbi2016 | Self::Fbi2017
        )
    }

    pub fn headers_change(&self) -> &'static HeaderChange {
        match self {
            Self::Census2010 => &CENSUS_2010,
            Self::Census2019 => &CENSUS_2019,
            Self::Cdc => &CDC,
            Self::ZillowCityCodes => &ZILLOW_CITY_CODES,
            Self::Experian => &EXPERIAN,
            Self::Fbi2014 | Self::Fbi2015 | Self::Fbi2016 => &FBI_2014_2016,
            Self::Fbi2017 => &FBI_2017,
            Self::Elections2020 => &ELECTIONS_2020,
            Self::FinalCsv => &FINAL_CSV,
            Self::Zillow | Self::Fbi | Self::Walkscore | Self::Generic => &NO_CHANGE,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|source| source.label() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|s| s.label()).collect();
                format!("unknown data source '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// Header change tables
// ---------------------------------------------------------------------------

/// `prefix` + each year in `first..=last`, e.g. `births2010`..`births2019`.
#[derive(Debug)]
pub struct YearSeries {
    pub prefix: &'static str,
    pub first: u16,
    pub last: u16,
}

#[derive(Debug)]
pub struct HeaderChange {
    pub rename: &'static [(&'static str, &'static str)],
    pub drop: &'static [&'static str],
    pub drop_series: &'static [YearSeries],
}

impl HeaderChange {
    /// Every column name this change drops, with year series expanded.
    pub fn dropped_columns(&self) -> Vec<Cow<'static, str>> {
        let mut out: Vec<Cow<'static, str>> = self.drop.iter().map(|d| Cow::Borrowed(*d)).collect();
        for series in self.drop_series {
            for year in series.first..=series.last {
                out.push(Cow::Owned(format!("{}{year}", series.prefix)));
            }
        }
        out
    }
}

const NO_CHANGE: HeaderChange = HeaderChange { rename: &[], drop: &[], drop_series: &[] };

const CENSUS_2010: HeaderChange = HeaderChange {
    rename: &[
        ("area in square miles - land area", "land area sqmi census_2010"),
        ("area in square miles - total area", "total area sqmi census_2010"),
        ("area in square miles - water area", "water area sqmi census_2010"),
        ("target geo id2", "geoid"),
    ],
    drop: &[
        "density per square mile of land area - housing units",
        "density per square mile of land area - population",
        "geographic area",
        "geographic area.1",
        "geography",
        "housing units",
        "id",
        "id2",
        "population",
        "target geo id",
    ],
    drop_series: &[],
};

const CENSUS_2019: HeaderChange = HeaderChange {
    rename: &[
        ("state", STATE_FIPS_PART),
        ("county", COUNTY_FIPS_PART),
        ("popestimate2019", "county_population"),
    ],
    drop: &[
        "sumlev",
        "region",
        "division",
        "stname",
        "ctyname",
        "census2010pop",
        "estimatesbase2010",
        "gqestimatesbase2010",
    ],
    drop_series: &[
        YearSeries { prefix: "popestimate", first: 2010, last: 2018 },
        YearSeries { prefix: "npopchg_", first: 2010, last: 2019 },
        YearSeries { prefix: "births", first: 2010, last: 2019 },
        YearSeries { prefix: "deaths", first: 2010, last: 2019 },
        YearSeries { prefix: "naturalinc", first: 2010, last: 2019 },
        YearSeries { prefix: "internationalmig", first: 2010, last: 2019 },
        YearSeries { prefix: "domesticmig", first: 2010, last: 2019 },
        YearSeries { prefix: "netmig", first: 2010, last: 2019 },
        YearSeries { prefix: "residual", first: 2010, last: 2019 },
        YearSeries { prefix: "gqestimates", first: 2010, last: 2019 },
        YearSeries { prefix: "rbirth", first: 2011, last: 2019 },
        YearSeries { prefix: "rdeath", first: 2011, last: 2019 },
        YearSeries { prefix: "rnaturalinc", first: 2011, last: 2019 },
        YearSeries { prefix: "rinternationalmig", first: 2011, last: 2019 },
        YearSeries { prefix: "rdomesticmig", first: 2011, last: 2019 },
        YearSeries { prefix: "rnetmig", first: 2011, last: 2019 },
    ],
};

const CDC: HeaderChange = HeaderChange {
    rename: &[
        ("fips county code", "county_fips"),
        ("deaths involving covid-19", "county_covid19_deaths"),
        ("deaths from all causes", "county_all_cause_deaths"),
    ],
    drop: &[
        "date as of",
        "start date",
        "end date",
        "state",
        "county name",
        "urban rural code",
        "footnote",
    ],
    drop_series: &[],
};

const ZILLOW_CITY_CODES: HeaderChange = HeaderChange {
    rename: &[("code", "city_code")],
    drop: &["area"],
    drop_series: &[],
};

const EXPERIAN: HeaderChange = HeaderChange {
    rename: &[
        ("city ", "city"),
        ("vantagescore 3.0 credit score", "credit score"),
        ("avg vantagescore 3.0", "credit score"),
        ("average vantagescore 3.0 credit score", "credit score"),
        ("avg. vantagescore 3.0", "credit score"),
        ("weighted vantage score", "credit score"),
        ("sum of adjusted credit score", "credit score"),
        (" average vantagescore 3.0 credit score", "credit score"),
        ("vantage score", "credit score"),
        ("county name", "county"),
    ],
    drop: &["rank", "population", "unnamed: 5", "unnamed: 4"],
    drop_series: &[],
};

const FBI_2014_2016: HeaderChange = HeaderChange {
    rename: &[
        ("rape (revised definition)1", "rape"),
        ("larceny- theft", "larceny theft"),
        ("arson3", "arson"),
    ],
    drop: &["rape (legacy definition)2"],
    drop_series: &[],
};

const FBI_2017: HeaderChange = HeaderChange {
    rename: &[
        ("rape1", "rape"),
        ("larceny- theft", "larceny theft"),
        ("arson2", "arson"),
    ],
    drop: &[
        "unnamed: 13",
        "unnamed: 14",
        "unnamed: 15",
        "unnamed: 16",
        "unnamed: 17",
        "unnamed: 18",
    ],
    drop_series: &[],
};

const ELECTIONS_2020: HeaderChange = HeaderChange {
    rename: &[("fips5", "county_fips")],
    drop: &[],
    drop_series: &[],
};

const FINAL_CSV: HeaderChange = HeaderChange {
    rename: &[],
    drop: &[
        "city_code",
        "city_fbi_crime",
        "city_walkscore",
        "cityexperian_2017",
        "cityzillow",
        "geography census_2010",
        "geography.1",
        "geography.2",
        "latitudezillow",
        "longitudezillow",
        "rape_legacy",
        "reverse_address",
        "reverse_addresszillow",
        "state_fbi_crime",
        "state_walkscore",
        "stateexperian_2017",
        "statezillow",
        "target geo id2",
    ],
    drop_series: &[],
};

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Rename then drop per the source's header change. Missing columns are ignored.
pub fn apply_header_change(source: DataSource, table: Table) -> Result<Table, JoinError> {
    let change = source.headers_change();
    let table = table.rename_columns(change.rename)?;
    Ok(table.drop_columns(&change.dropped_columns()))
}

/// Full header normalization for one raw dataset:
/// newlines -> spaces, lower-case headers, rename, drop, then canonical
/// `state` / `city` / `county` values.
///
/// Census 2010 rows are keyed by their "geographic area" column. FBI sheets
/// only name the state on its first city, so the state is filled down.
/// Census 2019 county rows get a `county_fips` key built from their split codes.
pub fn normalize_headers(source: DataSource, table: Table) -> Result<Table, JoinError> {
    let mut table = table.map_headers(|h| h.replace(['\n', '\r'], " ").to_lowercase())?;
    if source == DataSource::Census2010 && table.has_column(GEOGRAPHIC_AREA) {
        table = split_geographic_area(table, GEOGRAPHIC_AREA)?;
    }
    if source.is_fbi() && table.has_column(STATE) {
        table = table.fill_down(STATE)?;
    }
    let mut table = apply_header_change(source, table)?;
    if source == DataSource::Census2019 {
        table = compose_county_fips(table)?;
    }
    Ok(normalize_key_values(table, DEFAULT_CITY_SUFFIXES))
}

/// `county_fips = state_fips * 1000 + county_fips`, the five-digit code the
/// CDC uses without its leading zero ("08", "013" -> "8013"). The part columns
/// are dropped. Rows with a non-numeric part get an empty key.
fn compose_county_fips(table: Table) -> Result<Table, JoinError> {
    let (Some(states), Some(counties)) = (table.column(STATE_FIPS_PART), table.column(COUNTY_FIPS_PART)) else {
        return Ok(table);
    };
    let values: Vec<String> = states
        .iter()
        .zip(counties)
        .map(|(state, county)| match (state.trim().parse::<u32>(), county.trim().parse::<u32>()) {
            (Ok(state), Ok(county)) if county < 1000 => (state * 1000 + county).to_string(),
            _ => String::new(),
        })
        .collect();
    Ok(table
        .with_column(COUNTY_FIPS, values)?
        .drop_columns(&[STATE_FIPS_PART, COUNTY_FIPS_PART]))
}

/// Cleanup applied once to the fully merged table.
pub fn cleanup_final(table: Table) -> Result<Table, JoinError> {
    apply_header_change(DataSource::FinalCsv, table)
}
