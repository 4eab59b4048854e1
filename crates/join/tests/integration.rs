use std::path::PathBuf;

use citycmp_join::headers::normalize_headers;
use citycmp_join::{join_on_state_and_city, merge_tables, JoinOptions, MatchMethod, MergePlan, Table};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Fixtures are plain comma-separated text without quoting.
fn load_table(name: &str) -> Table {
    let path = fixtures_dir().join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let mut lines = text.lines();
    let headers: Vec<String> = lines.next().unwrap().split(',').map(String::from).collect();
    let rows = lines
        .filter(|l| !l.is_empty())
        .map(|l| l.split(',').map(String::from).collect())
        .collect();
    Table::from_rows(headers, rows).unwrap()
}

fn load_plan(name: &str) -> (MergePlan, Vec<Table>) {
    let toml = std::fs::read_to_string(fixtures_dir().join(name)).unwrap();
    let plan = MergePlan::from_toml(&toml).unwrap();
    let tables = plan
        .datasets
        .iter()
        .map(|d| normalize_headers(d.source, load_table(&d.file)).unwrap())
        .collect();
    (plan, tables)
}

// -------------------------------------------------------------------------
// Pairwise joins
// -------------------------------------------------------------------------

#[test]
fn census_walkscore_prefix_join() {
    let (_, tables) = load_plan("cities.plan.toml");
    let result = join_on_state_and_city(&tables[0], &tables[1], &JoinOptions::default()).unwrap();

    assert_eq!(result.summary.exact, 2);
    assert_eq!(result.summary.fuzzy, 1);
    assert_eq!(result.summary.left_unmatched, 1);
    assert_eq!(result.summary.right_unmatched, 1);

    let austin = result.fuzzy_matches().next().unwrap();
    assert_eq!(austin.key.city, "austin");
    assert_eq!(austin.right_city, "austin-round rock");
    assert_eq!(austin.method, MatchMethod::Prefix);

    // Exact rows first, in left order; the fuzzy row takes the left spelling.
    assert_eq!(result.table.column("city").unwrap(), &["abbeville", "sunnyvale", "austin"]);
    assert_eq!(result.table.value(2, "walk score"), Some("40"));
}

#[test]
fn census_walkscore_ratio_join_respects_threshold() {
    let (_, tables) = load_plan("cities.plan.toml");

    // "austin" vs "austin-round rock" scores 52; "adamsville" vs "mobile" scores 50.
    let result = join_on_state_and_city(&tables[0], &tables[1], &JoinOptions::ratio(50)).unwrap();
    assert_eq!(result.summary.fuzzy, 1);
    assert_eq!(
        result.fuzzy_matches().next().unwrap().method,
        MatchMethod::Ratio { score: 52 }
    );

    let result = join_on_state_and_city(&tables[0], &tables[1], &JoinOptions::ratio(49)).unwrap();
    assert_eq!(result.summary.fuzzy, 2);

    let result = join_on_state_and_city(&tables[0], &tables[1], &JoinOptions::ratio(52)).unwrap();
    assert_eq!(result.summary.fuzzy, 0);
}

#[test]
fn fbi_footnotes_do_not_block_exact_matches() {
    let (_, tables) = load_plan("cities.plan.toml");
    let result = join_on_state_and_city(&tables[0], &tables[2], &JoinOptions::default()).unwrap();
    assert_eq!(result.summary.exact, 4);
    assert_eq!(result.summary.fuzzy, 0);
    assert_eq!(result.table.value(1, "city"), Some("adamsville"));
    assert_eq!(result.table.value(1, "state"), Some("alabama"));
}

// -------------------------------------------------------------------------
// Merge plan
// -------------------------------------------------------------------------

#[test]
fn plan_merge_end_to_end() {
    let (plan, tables) = load_plan("cities.plan.toml");
    let result = merge_tables(&plan, tables).unwrap();
    let t = &result.table;

    assert_eq!(
        t.headers(),
        &[
            "city",
            "state",
            "population density",
            "geoid",
            "land area sqmi census_2010",
            "population",
            "walk score",
            "population_fbi_crime",
            "violent crime",
            "rape",
            "arson",
        ]
    );
    assert_eq!(t.column("state").unwrap(), &["alabama", "california", "texas"]);
    assert_eq!(t.column("city").unwrap(), &["abbeville", "sunnyvale", "austin"]);
    assert_eq!(t.column("population density").unwrap(), &["174", "6912", "3191"]);
    assert_eq!(t.value(2, "arson"), Some("76"));

    let rows: Vec<usize> = result.steps.iter().map(|s| s.rows).collect();
    assert_eq!(rows, vec![4, 3, 3]);
}

#[test]
fn merged_output_is_sorted_by_state_then_city() {
    let (plan, tables) = load_plan("cities.plan.toml");
    let t = merge_tables(&plan, tables).unwrap().table;
    let keys: Vec<(String, String)> = (0..t.row_count())
        .map(|r| {
            (
                t.value(r, "state").unwrap().to_string(),
                t.value(r, "city").unwrap().to_string(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

// -------------------------------------------------------------------------
// County-level datasets
// -------------------------------------------------------------------------

#[test]
fn county_rates_from_cdc_and_census_population() {
    let (plan, tables) = load_plan("county.plan.toml");
    assert_eq!(tables[2].headers(), &["county_population", "county_fips"]);

    let result = merge_tables(&plan, tables).unwrap();
    let t = &result.table;
    assert_eq!(
        t.headers(),
        &[
            "city",
            "state",
            "county_fips",
            "county_population",
            "county_2020_all_cause_deaths_per_100k",
            "county_covid19_deaths_per_100k",
        ]
    );
    assert_eq!(t.column("city").unwrap(), &["abbeville", "mobile", "boulder", "longmont"]);
    assert_eq!(t.column("county_population").unwrap(), &["", "413210", "326196", "326196"]);
    assert_eq!(
        t.column("county_2020_all_cause_deaths_per_100k").unwrap(),
        &["", "556.62", "895.17", "895.17"]
    );
    assert_eq!(
        t.column("county_covid19_deaths_per_100k").unwrap(),
        &["", "72.60", "91.66", "91.66"]
    );

    let rows: Vec<usize> = result.steps.iter().map(|s| s.rows).collect();
    assert_eq!(rows, vec![4, 4, 4]);
}
